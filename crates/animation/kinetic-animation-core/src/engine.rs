//! Engine: owns the host, every top-level instance and the active set the
//! external frame source drives.
//!
//! Methods:
//! - construction: animate, timeline, add, build_timeline
//! - playback: play, pause, reverse, restart, seek, reset, remove_targets, discard
//! - bulk: set, remove
//! - driving: tick, start, is_running, set_document_hidden, set_speed

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::binding::{resolve_all, PropertyHost};
use crate::completion::Completion;
use crate::config::EngineConfig;
use crate::error::AnimationError;
use crate::ids::{IdAllocator, InstanceId};
use crate::instance::Instance;
use crate::loader::TimelineSpec;
use crate::params::{AnimeParams, ParamValue, TimelineOffset, TimelineParams, TweenParams};
use crate::timeline::add_child;
use crate::value::{get_unit, relative_value, validate_value, RawValue, TweenValue};

/// Engine (core) generic over the property host.
#[derive(Debug)]
pub struct Engine<H: PropertyHost> {
    cfg: EngineConfig,
    ids: IdAllocator,
    host: H,
    instances: IndexMap<InstanceId, Instance>,
    /// Instances receiving ticks, in registration order.
    active: Vec<InstanceId>,
    running: bool,
    document_hidden: bool,
}

impl<H: PropertyHost> Engine<H> {
    pub fn new(host: H, cfg: EngineConfig) -> Self {
        Self {
            cfg,
            ids: IdAllocator::new(),
            host,
            instances: IndexMap::new(),
            active: Vec::new(),
            running: false,
            document_hidden: false,
        }
    }

    pub fn with_host(host: H) -> Self {
        Self::new(host, EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Global multiplier applied to every delivered tick.
    pub fn set_speed(&mut self, speed: f64) {
        self.cfg.speed = speed;
        for instance in self.instances.values_mut() {
            instance.set_speed(speed);
        }
    }

    // ---------- construction ----------

    /// Build an instance, reset it to its initial pose and play it if it autoplays.
    pub fn animate(&mut self, params: AnimeParams) -> Result<InstanceId, AnimationError> {
        let id = self.ids.alloc_instance();
        let mut instance = Instance::new(id, params, &TweenParams::default(), &mut self.host)?;
        instance.set_speed(self.cfg.speed);
        let autoplay = instance.autoplay();
        self.instances.insert(id, instance);
        if autoplay {
            self.play(id)?;
        }
        Ok(id)
    }

    /// Create an empty timeline.
    pub fn timeline(&mut self, params: TimelineParams) -> InstanceId {
        let id = self.ids.alloc_instance();
        let mut instance = Instance::new_timeline(id, params, &mut self.host);
        instance.set_speed(self.cfg.speed);
        if instance.autoplay() {
            instance.play(&mut self.host);
        }
        let activate = instance.take_activation_request();
        self.instances.insert(id, instance);
        if activate {
            self.activate(id);
        }
        id
    }

    /// Append a child to a timeline at `offset` (end of the timeline when `None`).
    pub fn add(
        &mut self,
        timeline: InstanceId,
        params: AnimeParams,
        offset: Option<TimelineOffset>,
    ) -> Result<(), AnimationError> {
        let tl = self
            .instances
            .get_mut(&timeline)
            .ok_or(AnimationError::InstanceNotFound { id: timeline })?;
        if !tl.is_timeline() {
            return Err(AnimationError::NotATimeline { id: timeline });
        }
        self.active.retain(|a| *a != timeline);
        let child_id = self.ids.alloc_instance();
        let added = add_child(tl, child_id, params, offset, &mut self.host);
        for child in tl.children_mut() {
            child.set_speed(self.cfg.speed);
        }
        // A rejected offset leaves a playing timeline untouched.
        let resume = !tl.paused();
        let autoplay = tl.autoplay();
        if resume {
            self.activate(timeline);
        } else if autoplay {
            self.play(timeline)?;
        }
        added
    }

    /// Create a timeline and add every child of a parsed [`TimelineSpec`].
    pub fn build_timeline(&mut self, spec: TimelineSpec) -> Result<InstanceId, AnimationError> {
        let id = self.timeline(spec.params);
        for (child, offset) in spec.children {
            self.add(id, child, offset)?;
        }
        Ok(id)
    }

    // ---------- playback ----------

    fn instance_entry(&mut self, id: InstanceId) -> Result<&mut Instance, AnimationError> {
        self.instances
            .get_mut(&id)
            .ok_or(AnimationError::InstanceNotFound { id })
    }

    /// Run `f` on an instance, then honor any activation it requested.
    fn drive<R>(
        &mut self,
        id: InstanceId,
        f: impl FnOnce(&mut Instance, &mut dyn PropertyHost) -> R,
    ) -> Result<R, AnimationError> {
        let speed = self.cfg.speed;
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(AnimationError::InstanceNotFound { id })?;
        instance.set_speed(speed);
        let out = f(instance, &mut self.host);
        if instance.take_activation_request() {
            self.activate(id);
        }
        Ok(out)
    }

    fn activate(&mut self, id: InstanceId) {
        if !self.active.contains(&id) {
            self.active.push(id);
            debug!(instance = %id, active = self.active.len(), "instance activated");
        }
        self.start();
    }

    pub fn play(&mut self, id: InstanceId) -> Result<(), AnimationError> {
        self.drive(id, |ins, host| ins.play(host))
    }

    pub fn pause(&mut self, id: InstanceId) -> Result<(), AnimationError> {
        self.drive(id, |ins, _| ins.pause())
    }

    pub fn reverse(&mut self, id: InstanceId) -> Result<(), AnimationError> {
        self.drive(id, |ins, _| ins.reverse())
    }

    pub fn restart(&mut self, id: InstanceId) -> Result<(), AnimationError> {
        self.drive(id, |ins, host| ins.restart(host))
    }

    pub fn seek(&mut self, id: InstanceId, time: f64) -> Result<(), AnimationError> {
        self.drive(id, |ins, host| ins.seek(time, host))
    }

    pub fn reset(&mut self, id: InstanceId) -> Result<(), AnimationError> {
        self.drive(id, |ins, host| ins.reset(host))
    }

    /// Remove the units animating any of the selected targets from one instance.
    pub fn remove_targets<S: AsRef<str>>(&mut self, id: InstanceId, selectors: &[S]) -> Result<(), AnimationError> {
        let targets = self.resolve(selectors);
        self.instance_entry(id)?.remove_targets(&targets);
        Ok(())
    }

    /// Drop an instance entirely.
    pub fn discard(&mut self, id: InstanceId) -> Option<Instance> {
        self.active.retain(|a| *a != id);
        let removed = self.instances.shift_remove(&id);
        if removed.is_some() {
            debug!(instance = %id, "instance discarded");
        }
        removed
    }

    // ---------- bulk ----------

    fn resolve<S: AsRef<str>>(&self, selectors: &[S]) -> Vec<String> {
        let selectors: Vec<String> = selectors.iter().map(|s| s.as_ref().to_string()).collect();
        resolve_all(&self.host, &selectors)
    }

    /// Write property values immediately on every selected target.
    ///
    /// Values may be relative (`"+=10"`) and inherit the unit of the current value.
    pub fn set<S, K, V>(
        &mut self,
        selectors: &[S],
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), AnimationError>
    where
        S: AsRef<str>,
        K: Into<String>,
        V: Into<ParamValue<RawValue>>,
    {
        let targets = self.resolve(selectors);
        let properties: Vec<(String, ParamValue<RawValue>)> =
            properties.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        let total = targets.len();
        for (index, target) in targets.iter().enumerate() {
            for (property, value) in &properties {
                let value = value.resolve(target, index, total);
                let value_unit = match &value {
                    RawValue::Text(s) => get_unit(s),
                    RawValue::Number(_) => None,
                };
                let original = self.host.original_value(target, property, value_unit.as_deref());
                let unit = value_unit.or_else(|| get_unit(&original));
                let to = relative_value(&validate_value(&value, unit.as_deref()), &original)?;
                let Some(kind) = self.host.animation_type(target, property) else {
                    warn!(handle = %target, property = %property, "property is not settable; skipping");
                    continue;
                };
                let out = match to.parse::<f64>() {
                    Ok(n) if unit.is_none() => TweenValue::Number(n),
                    _ => TweenValue::Text(to),
                };
                self.host.apply(target, property, kind, &out, true);
            }
        }
        Ok(())
    }

    /// Remove the selected targets from every active instance.
    pub fn remove<S: AsRef<str>>(&mut self, selectors: &[S]) {
        let targets = self.resolve(selectors);
        for id in self.active.iter().rev() {
            if let Some(instance) = self.instances.get_mut(id) {
                instance.remove_targets(&targets);
            }
        }
    }

    // ---------- introspection ----------

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// Ids in the active set.
    pub fn running(&self) -> &[InstanceId] {
        &self.active
    }

    /// Completion of the instance's current play-through.
    pub fn finished(&self, id: InstanceId) -> Option<Completion> {
        self.instances.get(&id).map(Instance::finished)
    }

    // ---------- driving ----------

    /// Whether the frame source should keep delivering ticks.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn document_hidden(&self) -> bool {
        self.document_hidden
    }

    /// Start ticking if anything is active and the document is visible (or suspension is off).
    pub fn start(&mut self) {
        if self.running || self.active.is_empty() {
            return;
        }
        if !self.document_hidden || !self.cfg.suspend_when_document_hidden {
            self.running = true;
            debug!(active = self.active.len(), "engine started");
        }
    }

    /// Deliver one timestamp to every playing active instance; paused ones leave the set.
    pub fn tick(&mut self, now: f64) {
        if !self.running {
            return;
        }
        let speed = self.cfg.speed;
        let mut i = 0;
        while i < self.active.len() {
            let id = self.active[i];
            match self.instances.get_mut(&id) {
                Some(instance) if !instance.paused() => {
                    instance.set_speed(speed);
                    instance.tick(now, &mut self.host);
                    // Already active: a play issued from a callback needs no registration.
                    instance.take_activation_request();
                    i += 1;
                }
                _ => {
                    self.active.remove(i);
                }
            }
        }
        self.running = i > 0;
        if !self.running {
            debug!("engine idle");
        }
    }

    /// Visibility change of the host document.
    ///
    /// Hiding stops ticks when suspension is enabled; showing re-anchors every
    /// active instance so hidden time is not counted, then restarts.
    pub fn set_document_hidden(&mut self, hidden: bool) {
        self.document_hidden = hidden;
        if !self.cfg.suspend_when_document_hidden {
            return;
        }
        if hidden {
            self.running = false;
            debug!("engine suspended while hidden");
        } else {
            for id in &self.active {
                if let Some(instance) = self.instances.get_mut(id) {
                    instance.reset_time();
                }
            }
            self.start();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ObjectHost;

    fn engine() -> Engine<ObjectHost> {
        Engine::with_host(ObjectHost::new().with("a", "x", 0.0).with("b", "x", 0.0))
    }

    fn linear(target: &str) -> AnimeParams {
        AnimeParams::new()
            .target(target)
            .property("x", 100)
            .duration(1000)
            .easing("linear")
    }

    #[test]
    fn autoplay_registers_once() {
        let mut e = engine();
        let id = e.animate(linear("a")).unwrap();
        assert_eq!(e.running(), &[id]);
        assert!(e.is_running());
        e.play(id).unwrap();
        e.pause(id).unwrap();
        e.play(id).unwrap();
        assert_eq!(e.running(), &[id]);
    }

    #[test]
    fn paused_instances_leave_the_active_set() {
        let mut e = engine();
        let a = e.animate(linear("a")).unwrap();
        let b = e.animate(linear("b")).unwrap();
        e.tick(0.0);
        e.pause(a).unwrap();
        e.tick(100.0);
        assert_eq!(e.running(), &[b]);
        assert_eq!(e.host().number("b", "x"), Some(10.0));
        e.pause(b).unwrap();
        e.tick(200.0);
        assert!(e.running().is_empty());
        assert!(!e.is_running());
    }

    #[test]
    fn missing_instances_are_errors() {
        let mut e = engine();
        let err = e.play(InstanceId(42)).unwrap_err();
        assert_eq!(err.category(), "instance");
        let leaf = e.animate(linear("a")).unwrap();
        assert!(matches!(
            e.add(leaf, AnimeParams::new(), None),
            Err(AnimationError::NotATimeline { .. })
        ));
    }

    #[test]
    fn set_writes_immediately() {
        let mut e = engine();
        e.set(&["a", "b"], [("x", ParamValue::from(RawValue::from("+=5")))]).unwrap();
        assert_eq!(e.host().number("a", "x"), Some(5.0));
        e.set(&["a"], [("x", 42)]).unwrap();
        assert_eq!(e.host().get("a", "x"), Some(&TweenValue::Number(42.0)));
        assert!(e.host().writes() >= 3);
    }

    #[test]
    fn discard_drops_instance() {
        let mut e = engine();
        let id = e.animate(linear("a")).unwrap();
        assert!(e.discard(id).is_some());
        assert!(e.instance(id).is_none());
        assert!(e.running().is_empty());
        assert!(e.discard(id).is_none());
    }
}
