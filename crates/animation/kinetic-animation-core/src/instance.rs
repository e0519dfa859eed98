//! Instance state machine.
//!
//! An [`Instance`] converts a delivered timestamp into instance time, drives its
//! animation units (leaf) or child instances (timeline), and fires lifecycle
//! notifications exactly once per occurrence.
//!
//! Time flow per advance:
//! - `tick(now)` maps wall time to engine time through the instance clock and speed.
//! - Engine time is mirrored when reversed, giving instance time.
//! - Instance time moves values, flags and notifications; reaching the duration
//!   in engine time rolls the loop over.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::binding::{resolve_all, PropertyHost, TargetHandle};
use crate::completion::{Completion, CompletionSlot};
use crate::config::{Direction, InstanceSettings, LoopCount};
use crate::data::{build_animations, Animation};
use crate::error::AnimationError;
use crate::ids::InstanceId;
use crate::params::{
    AnimeParams, Callbacks, LifecycleEvent, ParamValue, TimelineParams, TweenOverrides, TweenParams,
};
use crate::sampling::set_animations_progress;
use crate::timeline::{instance_timings, Timings};
use crate::value::clamp;

/// Iterations left to play.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Remaining {
    Finite(u32),
    Infinite,
}

impl Remaining {
    #[inline]
    fn is_exhausted(&self) -> bool {
        matches!(self, Remaining::Finite(0))
    }
}

impl From<LoopCount> for Remaining {
    fn from(count: LoopCount) -> Self {
        match count {
            LoopCount::Finite(n) => Remaining::Finite(n),
            LoopCount::Infinite => Remaining::Infinite,
        }
    }
}

/// Mutable playback state of an instance.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    /// Instance time in `[0, duration]`.
    pub current_time: f64,
    /// Percentage in `[0, 100]`.
    pub progress: f64,
    pub remaining: Remaining,
    pub reversed: bool,
    /// The last advance moved backwards.
    pub reverse_playback: bool,
    pub paused: bool,
    pub began: bool,
    pub loop_began: bool,
    pub change_began: bool,
    pub change_completed: bool,
    pub completed: bool,
    /// Notifications are suppressed.
    pub pass_through: bool,
    /// A loop just rolled over; the next advance starts from the loop boundary.
    pub loop_restarted: bool,
}

impl InstanceState {
    fn initial(direction: Direction, loop_count: LoopCount) -> Self {
        Self {
            current_time: 0.0,
            progress: 0.0,
            remaining: loop_count.into(),
            reversed: direction == Direction::Reverse,
            reverse_playback: false,
            paused: true,
            began: false,
            loop_began: false,
            change_began: false,
            change_completed: false,
            completed: false,
            pass_through: false,
            loop_restarted: false,
        }
    }
}

/// Wall-clock anchoring of an instance.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Clock {
    /// Wall time of the first tick since the last re-anchor.
    start_time: Option<f64>,
    /// Engine time already elapsed at the last re-anchor, in wall units.
    last_time: f64,
    /// Most recent wall time delivered.
    now: f64,
    speed: f64,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            start_time: None,
            last_time: 0.0,
            now: 0.0,
            speed: 1.0,
        }
    }
}

/// What an instance drives.
#[derive(Debug)]
pub enum InstanceBody {
    Leaf(Vec<Animation>),
    Timeline(TimelineBody),
}

/// Children of a timeline and the settings they inherit.
#[derive(Debug)]
pub struct TimelineBody {
    pub children: Vec<Instance>,
    pub(crate) tween: TweenOverrides,
    pub(crate) targets: Vec<String>,
}

/// A leaf animation or a timeline, with its own playback state machine.
#[derive(Debug)]
pub struct Instance {
    id: InstanceId,
    pub(crate) duration: f64,
    pub(crate) delay: f64,
    pub(crate) end_delay: f64,
    pub(crate) direction: Direction,
    pub(crate) loop_count: LoopCount,
    pub(crate) autoplay: bool,
    pub(crate) timeline_offset: f64,
    pub(crate) state: InstanceState,
    clock: Clock,
    pub(crate) body: InstanceBody,
    targets: Vec<TargetHandle>,
    callbacks: Callbacks,
    completion: CompletionSlot,
    activation_requested: bool,
}

fn fallback_timings(tween: &TweenParams) -> Timings {
    let fixed = |v: &ParamValue<f64>, default: f64| v.fixed().copied().unwrap_or(default);
    Timings {
        duration: fixed(&tween.duration, 1000.0),
        delay: fixed(&tween.delay, 0.0),
        end_delay: fixed(&tween.end_delay, 0.0),
    }
}

impl Instance {
    fn with_body(
        id: InstanceId,
        timings: Timings,
        settings: &InstanceSettings,
        body: InstanceBody,
        targets: Vec<TargetHandle>,
        callbacks: Callbacks,
    ) -> Self {
        Self {
            id,
            duration: timings.duration,
            delay: timings.delay,
            end_delay: timings.end_delay,
            direction: settings.direction,
            loop_count: settings.loop_count,
            autoplay: settings.autoplay,
            timeline_offset: 0.0,
            state: InstanceState::initial(settings.direction, settings.loop_count),
            clock: Clock::default(),
            body,
            targets,
            callbacks,
            completion: CompletionSlot::new(),
            activation_requested: false,
        }
    }

    /// Build a leaf instance and reset it to its initial pose.
    pub fn new(
        id: InstanceId,
        params: AnimeParams,
        defaults: &TweenParams,
        host: &mut dyn PropertyHost,
    ) -> Result<Self, AnimationError> {
        let tween = params.tween.apply_to(defaults);
        let targets = resolve_all(&*host, &params.targets);
        let animations = build_animations(&*host, &targets, &params.properties, &tween)?;
        let timings = instance_timings(animations.iter(), fallback_timings(&tween));
        let mut instance = Self::with_body(
            id,
            timings,
            &params.instance,
            InstanceBody::Leaf(animations),
            targets,
            params.callbacks,
        );
        debug!(instance = %id, duration = instance.duration, units = instance.animations().len(), "instance created");
        instance.reset(host);
        Ok(instance)
    }

    /// Build an empty timeline and reset it.
    pub fn new_timeline(id: InstanceId, params: TimelineParams, host: &mut dyn PropertyHost) -> Self {
        let tween = params.tween.apply_to(&TweenParams::default());
        let timings = fallback_timings(&tween);
        let body = InstanceBody::Timeline(TimelineBody {
            children: Vec::new(),
            tween: params.tween,
            targets: params.targets,
        });
        let mut instance = Self::with_body(id, timings, &params.instance, body, Vec::new(), params.callbacks);
        instance.reset(host);
        instance.duration = 0.0;
        debug!(instance = %id, "timeline created");
        instance
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn end_delay(&self) -> f64 {
        self.end_delay
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn loop_count(&self) -> LoopCount {
        self.loop_count
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    /// Parent-relative start time (0 outside timelines).
    pub fn timeline_offset(&self) -> f64 {
        self.timeline_offset
    }

    pub fn state(&self) -> &InstanceState {
        &self.state
    }

    pub fn current_time(&self) -> f64 {
        self.state.current_time
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn paused(&self) -> bool {
        self.state.paused
    }

    pub fn completed(&self) -> bool {
        self.state.completed
    }

    pub fn reversed(&self) -> bool {
        self.state.reversed
    }

    /// Resolved targets of a leaf instance.
    pub fn targets(&self) -> &[TargetHandle] {
        &self.targets
    }

    pub fn is_timeline(&self) -> bool {
        matches!(self.body, InstanceBody::Timeline(_))
    }

    /// Animation units (empty for timelines).
    pub fn animations(&self) -> &[Animation] {
        match &self.body {
            InstanceBody::Leaf(animations) => animations,
            InstanceBody::Timeline(_) => &[],
        }
    }

    /// Child instances (empty for leaves).
    pub fn children(&self) -> &[Instance] {
        match &self.body {
            InstanceBody::Leaf(_) => &[],
            InstanceBody::Timeline(tl) => &tl.children,
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Instance] {
        match &mut self.body {
            InstanceBody::Leaf(_) => &mut [],
            InstanceBody::Timeline(tl) => &mut tl.children,
        }
    }

    fn is_empty(&self) -> bool {
        self.animations().is_empty() && self.children().is_empty()
    }

    /// Completion of the current play-through.
    pub fn finished(&self) -> Completion {
        self.completion.completion()
    }

    pub(crate) fn set_speed(&mut self, speed: f64) {
        self.clock.speed = speed;
    }

    /// Consume a pending request to join the engine's active set.
    pub(crate) fn take_activation_request(&mut self) -> bool {
        std::mem::take(&mut self.activation_requested)
    }

    fn notify(&mut self, event: LifecycleEvent, host: &mut dyn PropertyHost) {
        if self.state.pass_through {
            return;
        }
        let Some(mut cb) = self.callbacks.take(event) else {
            return;
        };
        trace!(instance = %self.id, event = event.name(), "notify");
        cb(self, host);
        self.callbacks.restore(event, cb);
    }

    fn adjust_time(&self, time: f64) -> f64 {
        if self.state.reversed {
            self.duration - time
        } else {
            time
        }
    }

    /// Re-anchor the clock so the next tick resumes from the current time.
    pub(crate) fn reset_time(&mut self) {
        // A stopped clock has no wall-time equivalent; keep the previous anchor.
        if self.clock.speed == 0.0 {
            return;
        }
        self.clock.start_time = None;
        self.clock.last_time = self.adjust_time(self.state.current_time) * (1.0 / self.clock.speed);
    }

    fn toggle_direction(&mut self) {
        if self.direction != Direction::Alternate {
            self.direction = if self.direction != Direction::Normal {
                Direction::Normal
            } else {
                Direction::Reverse
            };
        }
        self.state.reversed = !self.state.reversed;
        let reversed = self.state.reversed;
        for child in self.children_mut() {
            child.state.reversed = reversed;
        }
    }

    fn count_iteration(&mut self) {
        if let Remaining::Finite(n) = &mut self.state.remaining {
            if *n > 0 {
                *n -= 1;
            }
        }
    }

    fn set_animations_progress(&mut self, time: f64, host: &mut dyn PropertyHost) {
        if let InstanceBody::Leaf(animations) = &mut self.body {
            set_animations_progress(animations, time, host);
        }
    }

    fn sync_children(&mut self, time: f64, host: &mut dyn PropertyHost) {
        let backwards = self.state.reverse_playback;
        let children = self.children_mut();
        if backwards {
            for child in children.iter_mut().rev() {
                let offset = child.timeline_offset;
                child.seek(time - offset, host);
            }
        } else {
            for child in children.iter_mut() {
                let offset = child.timeline_offset;
                child.seek(time - offset, host);
            }
        }
    }

    /// Core transition for one engine time value.
    fn set_progress(&mut self, engine_time: f64, host: &mut dyn PropertyHost) {
        let duration = self.duration;
        let delay = self.delay;
        let end_delay_start = duration - self.end_delay;
        let ins_time = self.adjust_time(engine_time);
        let previous = match (self.state.loop_restarted, self.state.reversed) {
            (false, _) => self.state.current_time,
            (true, true) => duration,
            (true, false) => 0.0,
        };

        self.state.progress = if duration == 0.0 {
            100.0
        } else {
            clamp(ins_time / duration * 100.0, 0.0, 100.0)
        };
        self.state.reverse_playback = ins_time < self.state.current_time;
        if self.is_timeline() {
            self.sync_children(ins_time, host);
        }

        if !self.state.began && self.state.current_time > 0.0 {
            self.state.began = true;
            self.notify(LifecycleEvent::Begin, host);
        }
        if !self.state.loop_began && self.state.current_time > 0.0 {
            self.state.loop_began = true;
            self.notify(LifecycleEvent::LoopBegin, host);
        }
        if ins_time <= delay && self.state.current_time != 0.0 {
            self.set_animations_progress(0.0, host);
        }
        if (ins_time >= end_delay_start && self.state.current_time != duration) || duration == 0.0 {
            self.set_animations_progress(duration, host);
        }
        if ins_time > delay && ins_time < end_delay_start {
            if !self.state.change_began {
                self.state.change_began = true;
                self.state.change_completed = false;
                self.notify(LifecycleEvent::ChangeBegin, host);
            }
            self.notify(LifecycleEvent::Change, host);
            self.set_animations_progress(ins_time, host);
        } else if self.state.change_began {
            self.state.change_completed = true;
            self.state.change_began = false;
            self.notify(LifecycleEvent::ChangeComplete, host);
        } else if delay < end_delay_start
            && ((previous <= delay && ins_time >= end_delay_start)
                || (previous >= end_delay_start && ins_time <= delay))
        {
            // A single advance stepped over the whole change window.
            self.state.change_completed = true;
            self.notify(LifecycleEvent::ChangeBegin, host);
            self.notify(LifecycleEvent::ChangeComplete, host);
        }

        self.state.current_time = clamp(ins_time, 0.0, duration);
        self.state.loop_restarted = false;
        if self.state.began {
            self.notify(LifecycleEvent::Update, host);
        }

        if engine_time >= duration {
            self.clock.last_time = 0.0;
            self.count_iteration();
            if self.state.remaining.is_exhausted() {
                self.state.paused = true;
                if !self.state.completed {
                    self.state.completed = true;
                    self.notify(LifecycleEvent::LoopComplete, host);
                    self.notify(LifecycleEvent::Complete, host);
                    if !self.state.pass_through {
                        debug!(instance = %self.id, "instance completed");
                        self.completion.resolve();
                    }
                }
            } else {
                self.clock.start_time = Some(self.clock.now);
                self.notify(LifecycleEvent::LoopComplete, host);
                self.state.loop_began = false;
                self.state.loop_restarted = true;
                if self.direction == Direction::Alternate {
                    self.toggle_direction();
                }
            }
        }
    }

    /// Advance with a wall-clock timestamp.
    pub fn tick(&mut self, now: f64, host: &mut dyn PropertyHost) {
        self.clock.now = now;
        let start = *self.clock.start_time.get_or_insert(now);
        let engine_time = (now + (self.clock.last_time - start)) * self.clock.speed;
        self.set_progress(engine_time, host);
    }

    /// Jump to an absolute time without touching the clock anchor.
    pub fn seek(&mut self, time: f64, host: &mut dyn PropertyHost) {
        let engine_time = self.adjust_time(time);
        self.set_progress(engine_time, host);
    }

    pub fn pause(&mut self) {
        if !self.state.paused {
            debug!(instance = %self.id, "pause");
        }
        self.state.paused = true;
        self.reset_time();
    }

    /// Resume playback; restarts from the initial pose when completed.
    ///
    /// The owning engine registers the instance in its active set.
    pub fn play(&mut self, host: &mut dyn PropertyHost) {
        if !self.state.paused {
            return;
        }
        if self.state.completed {
            self.reset(host);
        }
        self.state.paused = false;
        self.activation_requested = true;
        self.reset_time();
        debug!(instance = %self.id, "play");
    }

    /// Flip the playback direction.
    pub fn reverse(&mut self) {
        self.toggle_direction();
        self.state.completed = !self.state.reversed;
        self.reset_time();
        debug!(instance = %self.id, reversed = self.state.reversed, "reverse");
    }

    pub fn restart(&mut self, host: &mut dyn PropertyHost) {
        self.reset(host);
        self.play(host);
    }

    /// Restore the initial pose and every runtime flag.
    pub fn reset(&mut self, host: &mut dyn PropertyHost) {
        let direction = self.direction;
        self.state = InstanceState::initial(direction, self.loop_count);
        for child in self.children_mut().iter_mut().rev() {
            child.reset(host);
        }
        // Reversed finite runs and single alternate runs would otherwise end one
        // loopComplete short.
        let compensate = (self.state.reversed && self.loop_count != LoopCount::Infinite)
            || (direction == Direction::Alternate && self.loop_count == LoopCount::Finite(1));
        if compensate {
            if let Remaining::Finite(n) = &mut self.state.remaining {
                *n = n.saturating_add(1);
            }
        }
        let boundary = if self.state.reversed { self.duration } else { 0.0 };
        self.set_animations_progress(boundary, host);
    }

    /// Drop every unit animating one of `targets`, here and one level of children
    /// down; emptied children are pruned and an emptied instance pauses.
    pub fn remove_targets(&mut self, targets: &[TargetHandle]) {
        let keep = |a: &Animation| !targets.contains(&a.target);
        match &mut self.body {
            InstanceBody::Leaf(animations) => animations.retain(keep),
            InstanceBody::Timeline(tl) => {
                tl.children.retain_mut(|child| {
                    if let InstanceBody::Leaf(animations) = &mut child.body {
                        animations.retain(keep);
                    }
                    !child.is_empty()
                });
            }
        }
        if self.is_empty() {
            self.pause();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ObjectHost;
    use crate::interp::Easing;
    use approx::assert_abs_diff_eq;
    use std::sync::{Arc, Mutex};

    fn linear() -> TweenParams {
        TweenParams {
            easing: Easing::Linear,
            ..TweenParams::default()
        }
    }

    fn build(params: AnimeParams, host: &mut ObjectHost) -> Instance {
        Instance::new(InstanceId(0), params, &linear(), host).unwrap()
    }

    #[test]
    fn construction_resets_to_start() {
        let mut host = ObjectHost::new().with("a", "x", 5.0);
        let ins = build(AnimeParams::new().target("a").property("x", 100).duration(1000), &mut host);
        assert_eq!(ins.duration(), 1000.0);
        assert!(ins.paused());
        assert_eq!(ins.state().remaining, Remaining::Finite(1));
        assert_eq!(host.number("a", "x"), Some(5.0));
    }

    #[test]
    fn seek_moves_values_and_progress() {
        let mut host = ObjectHost::new().with("a", "x", 0.0);
        let mut ins = build(AnimeParams::new().target("a").property("x", 100).duration(1000), &mut host);
        let done = ins.finished();
        ins.seek(250.0, &mut host);
        assert_abs_diff_eq!(host.number("a", "x").unwrap(), 25.0);
        assert_abs_diff_eq!(ins.progress(), 25.0);
        ins.seek(1000.0, &mut host);
        assert_eq!(host.number("a", "x"), Some(100.0));
        assert!(ins.completed());
        assert!(done.is_resolved());
        assert!(!ins.finished().is_resolved());
    }

    #[test]
    fn ticks_follow_the_clock_and_speed() {
        let mut host = ObjectHost::new().with("a", "x", 0.0);
        let mut ins = build(AnimeParams::new().target("a").property("x", 100).duration(1000), &mut host);
        ins.set_speed(2.0);
        ins.play(&mut host);
        assert!(ins.take_activation_request());
        ins.tick(5000.0, &mut host);
        ins.tick(5100.0, &mut host);
        assert_abs_diff_eq!(ins.current_time(), 200.0);
        ins.pause();
        ins.play(&mut host);
        ins.tick(9000.0, &mut host);
        assert_abs_diff_eq!(ins.current_time(), 200.0);
        ins.tick(9050.0, &mut host);
        assert_abs_diff_eq!(ins.current_time(), 300.0);
    }

    #[test]
    fn callbacks_can_pause_reentrantly() {
        let mut host = ObjectHost::new().with("a", "x", 0.0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let mut ins = build(
            AnimeParams::new()
                .target("a")
                .property("x", 100)
                .duration(1000)
                .on(LifecycleEvent::Change, move |ins, _| {
                    log.lock().unwrap().push(ins.current_time());
                    ins.pause();
                }),
            &mut host,
        );
        ins.play(&mut host);
        ins.tick(0.0, &mut host);
        ins.tick(100.0, &mut host);
        assert!(ins.paused());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn reverse_direction_starts_at_end() {
        let mut host = ObjectHost::new().with("a", "x", 0.0);
        let ins = build(
            AnimeParams::new()
                .target("a")
                .property("x", 100)
                .duration(1000)
                .direction(Direction::Reverse),
            &mut host,
        );
        assert!(ins.reversed());
        assert_eq!(ins.state().remaining, Remaining::Finite(2));
        assert_eq!(host.number("a", "x"), Some(100.0));
    }

    #[test]
    fn reversed_run_with_max_loops_saturates() {
        let mut host = ObjectHost::new().with("a", "x", 0.0);
        let mut ins = build(
            AnimeParams::new()
                .target("a")
                .property("x", 100)
                .duration(1000)
                .loop_count(LoopCount::Finite(u32::MAX))
                .direction(Direction::Reverse),
            &mut host,
        );
        assert_eq!(ins.state().remaining, Remaining::Finite(u32::MAX));
        ins.reset(&mut host);
        assert_eq!(ins.state().remaining, Remaining::Finite(u32::MAX));
        assert_eq!(host.number("a", "x"), Some(100.0));
    }

    #[test]
    fn zero_speed_keeps_the_clock_usable() {
        let mut host = ObjectHost::new().with("a", "x", 0.0);
        let mut ins = build(AnimeParams::new().target("a").property("x", 100).duration(1000), &mut host);
        ins.set_speed(0.0);
        ins.play(&mut host);
        ins.tick(0.0, &mut host);
        assert_eq!(ins.current_time(), 0.0);
        ins.set_speed(1.0);
        ins.tick(500.0, &mut host);
        assert_abs_diff_eq!(ins.current_time(), 500.0);
        ins.tick(1000.0, &mut host);
        assert!(ins.completed());
    }

    #[test]
    fn removing_every_target_pauses() {
        let mut host = ObjectHost::new().with("a", "x", 0.0).with("b", "x", 0.0);
        let mut ins = build(
            AnimeParams::new().targets(["a", "b"]).property("x", 100).duration(1000),
            &mut host,
        );
        ins.play(&mut host);
        ins.remove_targets(&["a".to_string()]);
        assert_eq!(ins.animations().len(), 1);
        assert!(!ins.paused());
        ins.remove_targets(&["b".to_string()]);
        assert!(ins.animations().is_empty());
        assert!(ins.paused());
    }
}
