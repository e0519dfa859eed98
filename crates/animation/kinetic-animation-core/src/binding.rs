//! Host binding: how targets are resolved and how property values are read and written.
//!
//! Adapters (DOM, scene graphs, plain data) implement [`PropertyHost`] and hand it
//! to the [`Engine`](crate::engine::Engine). [`ObjectHost`] is the bundled
//! in-memory implementation used for animating plain key/value data.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::{format_number, TweenValue};

/// Opaque target handle (small string key).
pub type TargetHandle = String;

/// How a property is written back to its target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationType {
    /// Plain object field.
    Object,
    /// Element attribute.
    Attribute,
    /// Style property.
    Css,
    /// Transform function (`translateX`, `rotate`, ...).
    Transform,
}

/// Property system the engine reads original values from and writes tweened values to.
pub trait PropertyHost {
    /// Expand a selector into target handles. By default the selector is the handle.
    fn resolve_targets(&self, selector: &str) -> Vec<TargetHandle> {
        vec![selector.to_string()]
    }

    /// How `property` is written on `target`; `None` when it is not animatable there.
    fn animation_type(&self, target: &str, property: &str) -> Option<AnimationType>;

    /// Current value of `property`, converted to `unit` when one is requested.
    fn original_value(&self, target: &str, property: &str, unit: Option<&str>) -> String;

    /// Whether the target is drawn inside the SVG that owns a motion path.
    fn is_svg_target(&self, _target: &str) -> bool {
        false
    }

    /// Write a computed value. `immediate` marks bulk writes outside of a tick.
    fn apply(
        &mut self,
        target: &str,
        property: &str,
        kind: AnimationType,
        value: &TweenValue,
        immediate: bool,
    );
}

/// Resolve every selector and de-duplicate the handles, keeping first occurrence order.
pub fn resolve_all<H: PropertyHost + ?Sized>(host: &H, selectors: &[String]) -> Vec<TargetHandle> {
    let mut out: Vec<TargetHandle> = Vec::new();
    for selector in selectors {
        for handle in host.resolve_targets(selector) {
            if !out.contains(&handle) {
                out.push(handle);
            }
        }
    }
    out
}

/// In-memory property store: every property of every target is `Object`-typed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObjectHost {
    objects: IndexMap<TargetHandle, IndexMap<String, TweenValue>>,
    #[serde(skip)]
    writes: usize,
}

impl ObjectHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) a property on a target.
    pub fn insert(&mut self, target: impl Into<String>, property: impl Into<String>, value: TweenValue) {
        self.objects
            .entry(target.into())
            .or_default()
            .insert(property.into(), value);
    }

    /// Builder-style `insert` for numeric properties.
    pub fn with(mut self, target: &str, property: &str, value: f64) -> Self {
        self.insert(target, property, TweenValue::Number(value));
        self
    }

    pub fn get(&self, target: &str, property: &str) -> Option<&TweenValue> {
        self.objects.get(target)?.get(property)
    }

    /// Numeric reading of a property (leading number for strings).
    pub fn number(&self, target: &str, property: &str) -> Option<f64> {
        self.get(target, property)?.as_number()
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Number of values written since construction.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PropertyHost for ObjectHost {
    fn animation_type(&self, target: &str, property: &str) -> Option<AnimationType> {
        self.get(target, property).map(|_| AnimationType::Object)
    }

    fn original_value(&self, target: &str, property: &str, _unit: Option<&str>) -> String {
        match self.get(target, property) {
            Some(TweenValue::Number(n)) => format_number(*n),
            Some(TweenValue::Text(s)) => s.clone(),
            None => "0".to_string(),
        }
    }

    fn apply(
        &mut self,
        target: &str,
        property: &str,
        _kind: AnimationType,
        value: &TweenValue,
        _immediate: bool,
    ) {
        self.writes += 1;
        self.insert(target, property, value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_host_reads_and_writes() {
        let mut host = ObjectHost::new().with("box", "x", 10.0);
        host.insert("box", "width", TweenValue::Text("20px".into()));

        assert_eq!(host.animation_type("box", "x"), Some(AnimationType::Object));
        assert_eq!(host.animation_type("box", "y"), None);
        assert_eq!(host.original_value("box", "x", None), "10");
        assert_eq!(host.original_value("box", "width", None), "20px");

        host.apply("box", "x", AnimationType::Object, &TweenValue::Number(4.5), false);
        assert_eq!(host.number("box", "x"), Some(4.5));
        assert_eq!(host.writes(), 1);
    }

    #[test]
    fn resolve_all_dedups_in_order() {
        let host = ObjectHost::new();
        let handles = resolve_all(&host, &["a".into(), "b".into(), "a".into()]);
        assert_eq!(handles, vec!["a".to_string(), "b".to_string()]);
    }
}
