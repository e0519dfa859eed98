//! Timeline composition and timing aggregation.
//!
//! A timeline is an [`Instance`] whose body holds child instances placed at
//! offsets. Every `add` re-derives the timeline's delay, end delay and duration
//! from the full child set.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binding::PropertyHost;
use crate::data::Animation;
use crate::error::AnimationError;
use crate::ids::InstanceId;
use crate::instance::{Instance, InstanceBody};
use crate::params::{AnimeParams, TimelineOffset, TweenParams};
use crate::value::{format_number, parse_float, relative_value};

/// Aggregate timing of an instance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    pub duration: f64,
    pub delay: f64,
    pub end_delay: f64,
}

/// Anything placed on an instance's time axis.
pub trait Timed {
    /// Start relative to the owning instance.
    fn offset(&self) -> f64 {
        0.0
    }
    fn duration(&self) -> f64;
    fn delay(&self) -> f64;
    fn end_delay(&self) -> f64;
}

impl Timed for Animation {
    fn duration(&self) -> f64 {
        self.duration
    }
    fn delay(&self) -> f64 {
        self.delay
    }
    fn end_delay(&self) -> f64 {
        self.end_delay
    }
}

impl Timed for Instance {
    fn offset(&self) -> f64 {
        self.timeline_offset()
    }
    fn duration(&self) -> f64 {
        Instance::duration(self)
    }
    fn delay(&self) -> f64 {
        Instance::delay(self)
    }
    fn end_delay(&self) -> f64 {
        Instance::end_delay(self)
    }
}

/// Span covering every item: latest end, earliest delayed start, and the end
/// delay left after the latest active end. An empty set yields `empty`.
pub fn instance_timings<'a, T, I>(items: I, empty: Timings) -> Timings
where
    T: Timed + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut any = false;
    let mut duration = f64::NEG_INFINITY;
    let mut delay = f64::INFINITY;
    let mut active_end = f64::NEG_INFINITY;
    for item in items {
        any = true;
        let offset = item.offset();
        duration = duration.max(offset + item.duration());
        delay = delay.min(offset + item.delay());
        active_end = active_end.max(offset + item.duration() - item.end_delay());
    }
    if !any {
        return empty;
    }
    Timings {
        duration,
        delay,
        end_delay: duration - active_end,
    }
}

/// Resolve where a new child starts on a timeline of `duration`.
pub fn resolve_offset(offset: Option<&TimelineOffset>, duration: f64) -> Result<f64, AnimationError> {
    match offset {
        None => Ok(duration),
        Some(TimelineOffset::At(at)) => Ok(*at),
        Some(TimelineOffset::Relative(expr)) => {
            let resolved = relative_value(expr, &format_number(duration))?;
            let value = parse_float(&resolved);
            if value.is_nan() {
                return Err(AnimationError::InvalidRelativeValue { value: expr.clone() });
            }
            Ok(value)
        }
    }
}

fn set_pass_through(timeline: &mut Instance) {
    timeline.state.pass_through = true;
    for child in timeline.children_mut() {
        child.state.pass_through = true;
    }
}

/// Append a child built from `params` to `timeline`.
///
/// The child inherits the timeline's tween settings and targets unless it sets
/// its own, never autoplays and follows the timeline's current direction. The
/// timeline ends reset at time 0.
pub fn add_child(
    timeline: &mut Instance,
    child_id: InstanceId,
    mut params: AnimeParams,
    offset: Option<TimelineOffset>,
    host: &mut dyn PropertyHost,
) -> Result<(), AnimationError> {
    let InstanceBody::Timeline(body) = &timeline.body else {
        return Err(AnimationError::NotATimeline { id: timeline.id() });
    };
    params.tween = params.tween.or(&body.tween);
    if params.targets.is_empty() {
        params.targets = body.targets.clone();
    }
    params.instance.autoplay = false;
    params.instance.direction = timeline.direction();

    let offset = resolve_offset(offset.as_ref(), timeline.duration())?;
    set_pass_through(timeline);
    timeline.seek(offset, host);

    let mut child = match Instance::new(child_id, params, &TweenParams::default(), host) {
        Ok(child) => child,
        Err(err) => {
            timeline.seek(0.0, host);
            timeline.reset(host);
            return Err(err);
        }
    };
    child.timeline_offset = offset;
    child.state.pass_through = true;

    if let InstanceBody::Timeline(body) = &mut timeline.body {
        body.children.push(child);
    }
    let empty = Timings {
        duration: timeline.duration(),
        delay: timeline.delay(),
        end_delay: timeline.end_delay(),
    };
    let timings = instance_timings(timeline.children().iter(), empty);
    timeline.delay = timings.delay;
    timeline.end_delay = timings.end_delay;
    timeline.duration = timings.duration;
    debug!(
        timeline = %timeline.id(),
        child = %child_id,
        offset,
        duration = timings.duration,
        "timeline child added"
    );

    timeline.seek(0.0, host);
    timeline.reset(host);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ObjectHost;
    use crate::params::TimelineParams;

    struct Span(f64, f64, f64, f64);

    impl Timed for Span {
        fn offset(&self) -> f64 {
            self.0
        }
        fn duration(&self) -> f64 {
            self.1
        }
        fn delay(&self) -> f64 {
            self.2
        }
        fn end_delay(&self) -> f64 {
            self.3
        }
    }

    #[test]
    fn timings_span_all_items() {
        let items = [Span(0.0, 500.0, 100.0, 0.0), Span(400.0, 300.0, 0.0, 50.0)];
        let t = instance_timings(items.iter(), Timings::default());
        assert_eq!(t.duration, 700.0);
        assert_eq!(t.delay, 100.0);
        assert_eq!(t.end_delay, 50.0);

        let fallback = Timings {
            duration: 1000.0,
            ..Timings::default()
        };
        assert_eq!(instance_timings(std::iter::empty::<&Span>(), fallback), fallback);
    }

    #[test]
    fn offsets_resolve_against_duration() {
        assert_eq!(resolve_offset(None, 800.0).unwrap(), 800.0);
        assert_eq!(resolve_offset(Some(&TimelineOffset::At(120.0)), 800.0).unwrap(), 120.0);
        assert_eq!(resolve_offset(Some(&"-=200".into()), 800.0).unwrap(), 600.0);
        assert_eq!(resolve_offset(Some(&"+=50".into()), 800.0).unwrap(), 850.0);
        assert_eq!(resolve_offset(Some(&"300".into()), 800.0).unwrap(), 300.0);
        assert!(resolve_offset(Some(&"soon".into()), 800.0).is_err());
    }

    #[test]
    fn add_places_children_sequentially() {
        let mut host = ObjectHost::new().with("a", "x", 0.0);
        let mut tl = Instance::new_timeline(
            InstanceId(0),
            TimelineParams::new().targets(["a"]).easing("linear"),
            &mut host,
        );
        add_child(&mut tl, InstanceId(1), AnimeParams::new().property("x", 100).duration(500), None, &mut host)
            .unwrap();
        add_child(&mut tl, InstanceId(2), AnimeParams::new().property("x", 0).duration(300), None, &mut host)
            .unwrap();

        assert_eq!(tl.children().len(), 2);
        assert_eq!(tl.children()[1].timeline_offset(), 500.0);
        assert_eq!(tl.duration(), 800.0);
        assert!(!tl.children()[0].autoplay());
        assert!(!tl.state().pass_through);
        assert_eq!(host.number("a", "x"), Some(0.0));

        tl.seek(500.0, &mut host);
        assert_eq!(host.number("a", "x"), Some(100.0));
        tl.seek(650.0, &mut host);
        assert_eq!(host.number("a", "x"), Some(50.0));
    }

    #[test]
    fn add_requires_a_timeline() {
        let mut host = ObjectHost::new().with("a", "x", 0.0);
        let mut leaf = Instance::new(
            InstanceId(0),
            AnimeParams::new().target("a").property("x", 1),
            &TweenParams::default(),
            &mut host,
        )
        .unwrap();
        let err = add_child(&mut leaf, InstanceId(1), AnimeParams::new(), None, &mut host).unwrap_err();
        assert_eq!(err, AnimationError::NotATimeline { id: InstanceId(0) });
    }
}
