//! Construction parameters for instances and timelines.
//!
//! Any timing or property value may be fixed or computed per target through a
//! closure receiving `(target, index, total)`; staggers plug in that way.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::binding::PropertyHost;
use crate::config::{Direction, InstanceSettings, LoopCount, TweenSettings};
use crate::instance::Instance;
use crate::interp::Easing;
use crate::path::PathValue;
use crate::value::RawValue;

/// Closure computing a value for `(target, index, total)`.
pub type TargetFn<T> = Arc<dyn Fn(&str, usize, usize) -> T + Send + Sync>;

/// A parameter that is either fixed or computed per target.
#[derive(Clone)]
pub enum ParamValue<T> {
    Fixed(T),
    PerTarget(TargetFn<T>),
}

impl<T: Clone> ParamValue<T> {
    pub fn per_target(f: impl Fn(&str, usize, usize) -> T + Send + Sync + 'static) -> Self {
        ParamValue::PerTarget(Arc::new(f))
    }

    /// Value for the `index`-th of `total` targets.
    pub fn resolve(&self, target: &str, index: usize, total: usize) -> T {
        match self {
            ParamValue::Fixed(v) => v.clone(),
            ParamValue::PerTarget(f) => f(target, index, total),
        }
    }

    pub fn is_per_target(&self) -> bool {
        matches!(self, ParamValue::PerTarget(_))
    }

    pub fn fixed(&self) -> Option<&T> {
        match self {
            ParamValue::Fixed(v) => Some(v),
            ParamValue::PerTarget(_) => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ParamValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            ParamValue::PerTarget(_) => f.write_str("PerTarget(..)"),
        }
    }
}

impl<T> From<T> for ParamValue<T> {
    fn from(v: T) -> Self {
        ParamValue::Fixed(v)
    }
}

impl From<i32> for ParamValue<f64> {
    fn from(v: i32) -> Self {
        ParamValue::Fixed(v as f64)
    }
}

impl From<f64> for ParamValue<RawValue> {
    fn from(v: f64) -> Self {
        ParamValue::Fixed(RawValue::Number(v))
    }
}

impl From<i32> for ParamValue<RawValue> {
    fn from(v: i32) -> Self {
        ParamValue::Fixed(RawValue::from(v))
    }
}

impl From<&str> for ParamValue<RawValue> {
    fn from(v: &str) -> Self {
        ParamValue::Fixed(RawValue::from(v))
    }
}

/// Tween timing with per-target parameters, after defaults are applied.
#[derive(Clone, Debug)]
pub struct TweenParams {
    pub duration: ParamValue<f64>,
    pub delay: ParamValue<f64>,
    pub end_delay: ParamValue<f64>,
    pub easing: Easing,
    pub round: Option<f64>,
}

impl From<TweenSettings> for TweenParams {
    fn from(s: TweenSettings) -> Self {
        Self {
            duration: s.duration.into(),
            delay: s.delay.into(),
            end_delay: s.end_delay.into(),
            easing: s.easing,
            round: s.round,
        }
    }
}

impl Default for TweenParams {
    fn default() -> Self {
        TweenSettings::default().into()
    }
}

/// Optional tween settings; set fields win over the settings they are merged onto.
#[derive(Clone, Debug, Default)]
pub struct TweenOverrides {
    pub duration: Option<ParamValue<f64>>,
    pub delay: Option<ParamValue<f64>>,
    pub end_delay: Option<ParamValue<f64>>,
    pub easing: Option<Easing>,
    pub round: Option<f64>,
}

impl TweenOverrides {
    /// Apply these overrides on top of `base`.
    pub fn apply_to(&self, base: &TweenParams) -> TweenParams {
        TweenParams {
            duration: self.duration.clone().unwrap_or_else(|| base.duration.clone()),
            delay: self.delay.clone().unwrap_or_else(|| base.delay.clone()),
            end_delay: self.end_delay.clone().unwrap_or_else(|| base.end_delay.clone()),
            easing: self.easing.clone().unwrap_or_else(|| base.easing.clone()),
            round: self.round.or(base.round),
        }
    }

    /// Field-wise merge where `self` wins over `other`.
    pub fn or(&self, other: &TweenOverrides) -> TweenOverrides {
        TweenOverrides {
            duration: self.duration.clone().or_else(|| other.duration.clone()),
            delay: self.delay.clone().or_else(|| other.delay.clone()),
            end_delay: self.end_delay.clone().or_else(|| other.end_delay.clone()),
            easing: self.easing.clone().or_else(|| other.easing.clone()),
            round: self.round.or(other.round),
        }
    }
}

/// Value a single keyframe animates towards.
#[derive(Clone, Debug)]
pub enum KeyframeValue {
    /// From the previous keyframe (or the current target value) to this value.
    To(ParamValue<RawValue>),
    /// Explicit start and end values.
    FromTo(ParamValue<RawValue>, ParamValue<RawValue>),
    /// Distance along a motion path.
    Path(PathValue),
}

/// One tween of a property, with optional per-keyframe timing.
#[derive(Clone, Debug)]
pub struct Keyframe {
    pub value: KeyframeValue,
    pub tween: TweenOverrides,
}

impl Keyframe {
    pub fn to(value: impl Into<ParamValue<RawValue>>) -> Self {
        Self {
            value: KeyframeValue::To(value.into()),
            tween: TweenOverrides::default(),
        }
    }

    pub fn from_to(from: impl Into<ParamValue<RawValue>>, to: impl Into<ParamValue<RawValue>>) -> Self {
        Self {
            value: KeyframeValue::FromTo(from.into(), to.into()),
            tween: TweenOverrides::default(),
        }
    }

    pub fn path(value: PathValue) -> Self {
        Self {
            value: KeyframeValue::Path(value),
            tween: TweenOverrides::default(),
        }
    }

    pub fn duration(mut self, v: impl Into<ParamValue<f64>>) -> Self {
        self.tween.duration = Some(v.into());
        self
    }

    pub fn delay(mut self, v: impl Into<ParamValue<f64>>) -> Self {
        self.tween.delay = Some(v.into());
        self
    }

    pub fn end_delay(mut self, v: impl Into<ParamValue<f64>>) -> Self {
        self.tween.end_delay = Some(v.into());
        self
    }

    pub fn easing(mut self, easing: impl Into<Easing>) -> Self {
        self.tween.easing = Some(easing.into());
        self
    }

    pub fn round(mut self, round: f64) -> Self {
        self.tween.round = Some(round);
        self
    }
}

/// What a property animates through: one tween, or keyframes sharing the duration.
#[derive(Clone, Debug)]
pub enum PropertyValue {
    Single(Keyframe),
    Keyframes(Vec<Keyframe>),
}

impl PropertyValue {
    pub fn keyframes(frames: impl IntoIterator<Item = Keyframe>) -> Self {
        PropertyValue::Keyframes(frames.into_iter().collect())
    }

    /// Keyframes in order, plus whether the tween duration is split between them.
    pub(crate) fn frames(&self) -> (&[Keyframe], bool) {
        match self {
            PropertyValue::Single(k) => (std::slice::from_ref(k), false),
            PropertyValue::Keyframes(frames) => (frames.as_slice(), true),
        }
    }
}

impl From<Keyframe> for PropertyValue {
    fn from(k: Keyframe) -> Self {
        PropertyValue::Single(k)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Keyframe::to(RawValue::Number(v)).into()
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Keyframe::to(RawValue::from(v)).into()
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Keyframe::to(RawValue::from(v)).into()
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Keyframe::to(RawValue::from(v)).into()
    }
}

impl From<RawValue> for PropertyValue {
    fn from(v: RawValue) -> Self {
        Keyframe::to(v).into()
    }
}

impl From<ParamValue<RawValue>> for PropertyValue {
    fn from(v: ParamValue<RawValue>) -> Self {
        Keyframe::to(v).into()
    }
}

impl From<PathValue> for PropertyValue {
    fn from(v: PathValue) -> Self {
        Keyframe::path(v).into()
    }
}

impl From<Vec<Keyframe>> for PropertyValue {
    fn from(v: Vec<Keyframe>) -> Self {
        PropertyValue::Keyframes(v)
    }
}

/// Named lifecycle notifications.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Begin,
    LoopBegin,
    ChangeBegin,
    Change,
    ChangeComplete,
    LoopComplete,
    Complete,
    Update,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 8] = [
        LifecycleEvent::Begin,
        LifecycleEvent::LoopBegin,
        LifecycleEvent::ChangeBegin,
        LifecycleEvent::Change,
        LifecycleEvent::ChangeComplete,
        LifecycleEvent::LoopComplete,
        LifecycleEvent::Complete,
        LifecycleEvent::Update,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::LoopBegin => "loopBegin",
            Self::ChangeBegin => "changeBegin",
            Self::Change => "change",
            Self::ChangeComplete => "changeComplete",
            Self::LoopComplete => "loopComplete",
            Self::Complete => "complete",
            Self::Update => "update",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Notification handler. It may call playback operations on the instance it receives.
pub type Callback = Box<dyn FnMut(&mut Instance, &mut dyn PropertyHost) + Send>;

/// Handlers per lifecycle event.
#[derive(Default)]
pub struct Callbacks {
    slots: [Option<Callback>; 8],
}

impl Callbacks {
    pub fn set(&mut self, event: LifecycleEvent, cb: Callback) {
        self.slots[event.slot()] = Some(cb);
    }

    pub fn is_set(&self, event: LifecycleEvent) -> bool {
        self.slots[event.slot()].is_some()
    }

    /// Take a handler out for the duration of a call.
    pub(crate) fn take(&mut self, event: LifecycleEvent) -> Option<Callback> {
        self.slots[event.slot()].take()
    }

    /// Put a handler back unless it was replaced while it ran.
    pub(crate) fn restore(&mut self, event: LifecycleEvent, cb: Callback) {
        let slot = &mut self.slots[event.slot()];
        if slot.is_none() {
            *slot = Some(cb);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = LifecycleEvent::ALL
            .iter()
            .filter(|e| self.is_set(**e))
            .map(LifecycleEvent::name)
            .collect();
        f.debug_tuple("Callbacks").field(&set).finish()
    }
}

/// Everything needed to construct an instance.
#[derive(Debug, Default)]
pub struct AnimeParams {
    /// Target selectors, resolved through the host.
    pub targets: Vec<String>,
    /// Animated properties in declaration order.
    pub properties: IndexMap<String, PropertyValue>,
    pub tween: TweenOverrides,
    pub instance: InstanceSettings,
    pub callbacks: Callbacks,
}

impl AnimeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn duration(mut self, v: impl Into<ParamValue<f64>>) -> Self {
        self.tween.duration = Some(v.into());
        self
    }

    pub fn delay(mut self, v: impl Into<ParamValue<f64>>) -> Self {
        self.tween.delay = Some(v.into());
        self
    }

    pub fn end_delay(mut self, v: impl Into<ParamValue<f64>>) -> Self {
        self.tween.end_delay = Some(v.into());
        self
    }

    pub fn easing(mut self, easing: impl Into<Easing>) -> Self {
        self.tween.easing = Some(easing.into());
        self
    }

    pub fn round(mut self, round: f64) -> Self {
        self.tween.round = Some(round);
        self
    }

    pub fn loop_count(mut self, count: LoopCount) -> Self {
        self.instance.loop_count = count;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.instance.direction = direction;
        self
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.instance.autoplay = autoplay;
        self
    }

    /// Register a handler for `event`.
    pub fn on(
        mut self,
        event: LifecycleEvent,
        cb: impl FnMut(&mut Instance, &mut dyn PropertyHost) + Send + 'static,
    ) -> Self {
        self.callbacks.set(event, Box::new(cb));
        self
    }
}

/// Timeline construction parameters: instance settings and callbacks for the
/// timeline itself, plus tween defaults and targets inherited by every child.
#[derive(Debug, Default)]
pub struct TimelineParams {
    pub targets: Vec<String>,
    pub tween: TweenOverrides,
    pub instance: InstanceSettings,
    pub callbacks: Callbacks,
}

impl TimelineParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn duration(mut self, v: impl Into<ParamValue<f64>>) -> Self {
        self.tween.duration = Some(v.into());
        self
    }

    pub fn delay(mut self, v: impl Into<ParamValue<f64>>) -> Self {
        self.tween.delay = Some(v.into());
        self
    }

    pub fn easing(mut self, easing: impl Into<Easing>) -> Self {
        self.tween.easing = Some(easing.into());
        self
    }

    pub fn loop_count(mut self, count: LoopCount) -> Self {
        self.instance.loop_count = count;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.instance.direction = direction;
        self
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.instance.autoplay = autoplay;
        self
    }

    pub fn on(
        mut self,
        event: LifecycleEvent,
        cb: impl FnMut(&mut Instance, &mut dyn PropertyHost) + Send + 'static,
    ) -> Self {
        self.callbacks.set(event, Box::new(cb));
        self
    }
}

/// Where a child is placed on its timeline.
#[derive(Clone, Debug, PartialEq)]
pub enum TimelineOffset {
    /// Absolute time on the timeline.
    At(f64),
    /// Relative to the current timeline duration (`"-=200"`, `"+=100"`, `"*=0.5"`).
    Relative(String),
}

impl From<f64> for TimelineOffset {
    fn from(v: f64) -> Self {
        TimelineOffset::At(v)
    }
}

impl From<i32> for TimelineOffset {
    fn from(v: i32) -> Self {
        TimelineOffset::At(v as f64)
    }
}

impl From<&str> for TimelineOffset {
    fn from(v: &str) -> Self {
        TimelineOffset::Relative(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_target_values_resolve_with_index() {
        let fixed: ParamValue<f64> = 5.0.into();
        assert_eq!(fixed.resolve("a", 3, 4), 5.0);
        let per = ParamValue::per_target(|_, i, total| (i * 10 + total) as f64);
        assert_eq!(per.resolve("a", 2, 4), 24.0);
        assert!(per.is_per_target());
        assert!(per.fixed().is_none());
    }

    #[test]
    fn overrides_win_over_base() {
        let base = TweenParams::default();
        let overrides = TweenOverrides {
            duration: Some(200.0.into()),
            round: Some(1.0),
            ..Default::default()
        };
        let merged = overrides.apply_to(&base);
        assert_eq!(merged.duration.resolve("", 0, 1), 200.0);
        assert_eq!(merged.delay.resolve("", 0, 1), 0.0);
        assert_eq!(merged.round, Some(1.0));

        let call_site = TweenOverrides {
            delay: Some(50.0.into()),
            ..Default::default()
        };
        let combined = call_site.or(&overrides);
        assert_eq!(combined.duration.unwrap().resolve("", 0, 1), 200.0);
        assert_eq!(combined.delay.unwrap().resolve("", 0, 1), 50.0);
    }

    #[test]
    fn builder_keeps_property_order() {
        let params = AnimeParams::new()
            .targets(["a", "b"])
            .property("y", 1)
            .property("x", "10px")
            .duration(300)
            .on(LifecycleEvent::Complete, |_, _| {});
        let names: Vec<&str> = params.properties.keys().map(String::as_str).collect();
        assert_eq!(names, ["y", "x"]);
        assert!(params.callbacks.is_set(LifecycleEvent::Complete));
        assert!(!params.callbacks.is_set(LifecycleEvent::Begin));
    }
}
