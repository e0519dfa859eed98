//! Animation units and their tween segments, built from construction parameters.
//!
//! Model:
//! - One [`Animation`] per (target, property) pair the host can animate.
//! - Its [`Tween`]s are contiguous: each starts where the previous one ends and
//!   spans `delay + duration + end_delay`.
//! - `from`/`to` are decomposed values (numbers + literal separators) sharing one unit.

use indexmap::IndexMap;
use tracing::warn;

use crate::binding::{AnimationType, PropertyHost, TargetHandle};
use crate::error::AnimationError;
use crate::interp::Easing;
use crate::params::{KeyframeValue, ParamValue, PropertyValue, TweenParams};
use crate::path::PathValue;
use crate::value::{decompose_value, get_unit, is_color, relative_value, DecomposedValue, RawValue, TweenValue};

/// One keyframe segment of an animation.
#[derive(Clone, Debug)]
pub struct Tween {
    pub start: f64,
    pub end: f64,
    pub delay: f64,
    pub duration: f64,
    pub end_delay: f64,
    pub easing: Easing,
    pub from: DecomposedValue,
    pub to: DecomposedValue,
    /// Rounding factor; `None` keeps full precision.
    pub round: Option<f64>,
    /// Set when the tween follows a motion path.
    pub path: Option<PathValue>,
    pub inside_svg: bool,
    pub is_color: bool,
}

/// A (target, property) pair and its ordered tweens.
#[derive(Clone, Debug)]
pub struct Animation {
    pub target: TargetHandle,
    pub property: String,
    pub kind: AnimationType,
    pub tweens: Vec<Tween>,
    pub duration: f64,
    pub delay: f64,
    pub end_delay: f64,
    /// Last value written to the host.
    pub current_value: Option<TweenValue>,
}

/// Keyframe after per-target values and default timing are resolved.
struct ResolvedFrame {
    value: ResolvedValue,
    duration: f64,
    delay: f64,
    end_delay: f64,
    easing: Easing,
    round: Option<f64>,
}

enum ResolvedValue {
    To(RawValue),
    FromTo(RawValue, RawValue),
    Path(PathValue),
}

fn resolve_frames(
    value: &PropertyValue,
    tween: &TweenParams,
    target: &str,
    index: usize,
    total: usize,
) -> Vec<ResolvedFrame> {
    let (frames, split) = value.frames();
    let count = frames.len();
    let mut base_duration = tween.duration.resolve(target, index, total);
    if let Some(settle) = tween.easing.spring_duration() {
        base_duration = settle;
    }
    if split && !tween.duration.is_per_target() {
        base_duration = tween.duration.resolve(target, index, total) / count as f64;
    }

    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let own = &frame.tween;
            let resolve = |v: &ParamValue<f64>| v.resolve(target, index, total);
            let delay = match &own.delay {
                Some(d) => resolve(d),
                None if i == 0 => resolve(&tween.delay),
                None => 0.0,
            };
            let end_delay = match &own.end_delay {
                Some(d) => resolve(d),
                None if i == count - 1 => resolve(&tween.end_delay),
                None => 0.0,
            };
            let value = match &frame.value {
                KeyframeValue::To(v) => ResolvedValue::To(v.resolve(target, index, total)),
                KeyframeValue::FromTo(a, b) => ResolvedValue::FromTo(
                    a.resolve(target, index, total),
                    b.resolve(target, index, total),
                ),
                KeyframeValue::Path(p) => ResolvedValue::Path(p.clone()),
            };
            ResolvedFrame {
                value,
                duration: own.duration.as_ref().map(resolve).unwrap_or(base_duration),
                delay,
                end_delay,
                easing: own.easing.clone().unwrap_or_else(|| tween.easing.clone()),
                round: own.round.or(tween.round),
            }
        })
        .collect()
}

fn raw_unit(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Text(s) => get_unit(s),
        RawValue::Number(_) => None,
    }
}

/// Resolve `to` against `from` when it carries a relative operator.
fn relative_to(to: RawValue, from: &RawValue) -> Result<RawValue, AnimationError> {
    match to {
        RawValue::Text(s) => relative_value(&s, &from.to_text()).map(RawValue::Text),
        number => Ok(number),
    }
}

fn build_tweens(
    frames: Vec<ResolvedFrame>,
    target: &str,
    property: &str,
    host: &dyn PropertyHost,
) -> Result<Vec<Tween>, AnimationError> {
    let mut tweens: Vec<Tween> = Vec::with_capacity(frames.len());
    for frame in frames {
        let (from_raw, to_raw, path) = match frame.value {
            ResolvedValue::To(to) => (None, Some(to), None),
            ResolvedValue::FromTo(from, to) => (Some(from), Some(to), None),
            ResolvedValue::Path(p) => (None, None, Some(p)),
        };
        let to_unit = to_raw.as_ref().and_then(raw_unit);
        let original = RawValue::Text(host.original_value(target, property, to_unit.as_deref()));
        let previous = match tweens.last() {
            Some(prev) => RawValue::Text(prev.to.original.clone()),
            None => original.clone(),
        };
        let from = from_raw.unwrap_or_else(|| previous.clone());
        let from_unit = raw_unit(&from).or_else(|| raw_unit(&original));
        let unit = to_unit.or(from_unit);

        let to_decomposed = match &path {
            Some(p) => decompose_value(&RawValue::Number(p.path.total_length()), unit.as_deref()),
            None => {
                let to = relative_to(to_raw.unwrap_or(previous), &from)?;
                decompose_value(&to, unit.as_deref())
            }
        };
        let from_decomposed = decompose_value(&from, unit.as_deref());

        let start = tweens.last().map(|t| t.end).unwrap_or(0.0);
        let is_color = is_color(&from_decomposed.original);
        tweens.push(Tween {
            start,
            end: start + frame.delay + frame.duration + frame.end_delay,
            delay: frame.delay,
            duration: frame.duration,
            end_delay: frame.end_delay,
            easing: frame.easing.for_duration(frame.duration),
            from: from_decomposed,
            to: to_decomposed,
            round: if is_color {
                Some(1.0)
            } else {
                frame.round.filter(|r| *r != 0.0)
            },
            inside_svg: path.is_some() && host.is_svg_target(target),
            path,
            is_color,
        });
    }
    Ok(tweens)
}

/// Build the animation units for every (target, property) pair, targets outermost.
///
/// Properties the host reports as not animatable on a target are skipped.
pub fn build_animations(
    host: &dyn PropertyHost,
    targets: &[TargetHandle],
    properties: &IndexMap<String, PropertyValue>,
    tween: &TweenParams,
) -> Result<Vec<Animation>, AnimationError> {
    let total = targets.len();
    let mut animations = Vec::new();
    for (index, target) in targets.iter().enumerate() {
        for (property, value) in properties {
            let Some(kind) = host.animation_type(target, property) else {
                warn!(handle = %target, property = %property, "property is not animatable; skipping");
                continue;
            };
            let frames = resolve_frames(value, tween, target, index, total);
            if frames.is_empty() {
                continue;
            }
            let tweens = build_tweens(frames, target, property, host)?;
            let (Some(first), Some(last)) = (tweens.first(), tweens.last()) else {
                continue;
            };
            animations.push(Animation {
                target: target.clone(),
                property: property.clone(),
                kind,
                duration: last.end,
                delay: first.delay,
                end_delay: last.end_delay,
                tweens,
                current_value: None,
            });
        }
    }
    Ok(animations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ObjectHost;
    use crate::params::Keyframe;
    use crate::path::{PathProperty, Polyline};
    use crate::value::TweenValue;
    use std::sync::Arc;

    fn props(entries: Vec<(&str, PropertyValue)>) -> IndexMap<String, PropertyValue> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn linear(duration: f64) -> TweenParams {
        TweenParams {
            duration: duration.into(),
            easing: Easing::Linear,
            ..TweenParams::default()
        }
    }

    #[test]
    fn single_tween_reads_original_value() {
        let host = ObjectHost::new().with("a", "x", 10.0);
        let anims = build_animations(
            &host,
            &["a".into()],
            &props(vec![("x", 110.into())]),
            &linear(500.0),
        )
        .unwrap();
        assert_eq!(anims.len(), 1);
        let t = &anims[0].tweens[0];
        assert_eq!(t.from.numbers, vec![10.0]);
        assert_eq!(t.to.numbers, vec![110.0]);
        assert!(t.to.strings.is_empty());
        assert_eq!((t.start, t.end), (0.0, 500.0));
        assert_eq!(anims[0].duration, 500.0);
    }

    #[test]
    fn keyframes_split_duration_and_chain() {
        let host = ObjectHost::new().with("a", "x", 0.0);
        let frames = PropertyValue::keyframes([Keyframe::to(10), Keyframe::to("+=5"), Keyframe::to(0)]);
        let tween = TweenParams {
            delay: 100.0.into(),
            end_delay: 50.0.into(),
            ..linear(900.0)
        };
        let anims = build_animations(&host, &["a".into()], &props(vec![("x", frames)]), &tween).unwrap();
        let tweens = &anims[0].tweens;
        assert_eq!(tweens.len(), 3);
        assert_eq!(tweens[0].delay, 100.0);
        assert_eq!(tweens[1].delay, 0.0);
        assert_eq!(tweens[2].end_delay, 50.0);
        assert_eq!(tweens[0].duration, 300.0);
        assert_eq!(tweens[1].start, tweens[0].end);
        assert_eq!(tweens[1].from.numbers, vec![10.0]);
        assert_eq!(tweens[1].to.numbers, vec![15.0]);
        assert_eq!(anims[0].duration, 100.0 + 900.0 + 50.0);
        assert_eq!(anims[0].delay, 100.0);
        assert_eq!(anims[0].end_delay, 50.0);
    }

    #[test]
    fn from_to_pair_and_units() {
        let mut host = ObjectHost::new();
        host.insert("a", "width", TweenValue::Text("20px".into()));
        let anims = build_animations(
            &host,
            &["a".into()],
            &props(vec![
                ("width", Keyframe::from_to(5, "50%").into()),
                ("missing", 1.into()),
            ]),
            &linear(100.0),
        )
        .unwrap();
        assert_eq!(anims.len(), 1);
        let t = &anims[0].tweens[0];
        assert_eq!(t.from.original, "5%");
        assert_eq!(t.to.original, "50%");
    }

    #[test]
    fn colors_round_channels() {
        let mut host = ObjectHost::new();
        host.insert("a", "fill", TweenValue::Text("#000".into()));
        let anims = build_animations(&host, &["a".into()], &props(vec![("fill", "#fff".into())]), &linear(100.0))
            .unwrap();
        let t = &anims[0].tweens[0];
        assert!(t.is_color);
        assert_eq!(t.round, Some(1.0));
        assert_eq!(t.to.numbers, vec![255.0, 255.0, 255.0, 1.0]);
    }

    #[test]
    fn per_target_values_and_spring_duration() {
        let host = ObjectHost::new().with("a", "x", 0.0).with("b", "x", 0.0);
        let tween = TweenParams {
            delay: ParamValue::per_target(|_, i, _| i as f64 * 100.0),
            easing: Easing::parse("spring(1, 80, 10, 0)").unwrap(),
            ..TweenParams::default()
        };
        let value = PropertyValue::from(ParamValue::per_target(|_, i, total| RawValue::Number((i + total) as f64)));
        let anims = build_animations(&host, &["a".into(), "b".into()], &props(vec![("x", value)]), &tween).unwrap();
        assert_eq!(anims[1].delay, 100.0);
        assert_eq!(anims[1].tweens[0].to.numbers, vec![3.0]);
        let settle = tween.easing.spring_duration().unwrap();
        assert_eq!(anims[0].tweens[0].duration, settle);
    }

    #[test]
    fn path_tween_uses_total_length() {
        let host = ObjectHost::new().with("a", "x", 0.0);
        let path = PathValue::new(Arc::new(Polyline::new([(0.0, 0.0), (30.0, 40.0)])), PathProperty::X);
        let anims = build_animations(&host, &["a".into()], &props(vec![("x", path.into())]), &linear(100.0))
            .unwrap();
        let t = &anims[0].tweens[0];
        assert!(t.path.is_some());
        assert_eq!(t.to.numbers, vec![50.0]);
    }

    #[test]
    fn bad_relative_value_is_an_error() {
        let host = ObjectHost::new().with("a", "x", 0.0);
        let err = build_animations(&host, &["a".into()], &props(vec![("x", "+=oops".into())]), &linear(100.0))
            .unwrap_err();
        assert_eq!(err.category(), "value");
    }
}
