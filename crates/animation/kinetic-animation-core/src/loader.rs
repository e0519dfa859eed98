use indexmap::IndexMap;
use serde::Deserialize;

use crate::config::InstanceSettings;
use crate::error::AnimationError;
use crate::interp::Easing;
use crate::params::{AnimeParams, Keyframe, PropertyValue, TimelineOffset, TimelineParams, TweenOverrides};
use crate::value::RawValue;

/// A timeline read from JSON: its own parameters plus the children to add, in order.
#[derive(Debug, Default)]
pub struct TimelineSpec {
    pub params: TimelineParams,
    pub children: Vec<(AnimeParams, Option<TimelineOffset>)>,
}

/// Public API: parse a declarative animation description into [`AnimeParams`].
///
/// Shape:
/// - `targets`: selector list handed to the host.
/// - `duration`, `delay`, `endDelay`, `easing`, `round`: tween settings.
/// - `loop`, `direction`, `autoplay`: instance settings.
/// - `properties`: map of property name to a number/string, a `[from, to]`
///   pair, a keyframe array, or a keyframe object `{ "value": .., "duration": .. }`.
///
/// Callbacks cannot be expressed in JSON; attach them with [`AnimeParams::on`].
pub fn parse_animation_json(s: &str) -> Result<AnimeParams, AnimationError> {
    let raw: RawAnimation = serde_json::from_str(s)?;
    raw.into_params()
}

/// Public API: parse a timeline description with a `children` array.
///
/// Timeline-level tween settings and targets are inherited by children that do
/// not set their own. Each child may carry an `offset` (number or relative string).
pub fn parse_timeline_json(s: &str) -> Result<TimelineSpec, AnimationError> {
    let raw: RawTimeline = serde_json::from_str(s)?;
    let mut params = TimelineParams::new().targets(raw.targets);
    params.tween = raw.tween.into_overrides()?;
    params.instance = raw.instance;

    let children = raw
        .children
        .into_iter()
        .map(|child| {
            let offset = child.offset.clone().map(RawOffset::into_offset);
            child.into_params().map(|p| (p, offset))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TimelineSpec { params, children })
}

// ---------- Raw JSON model ----------

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawTween {
    duration: Option<f64>,
    delay: Option<f64>,
    end_delay: Option<f64>,
    easing: Option<String>,
    round: Option<f64>,
}

impl RawTween {
    fn into_overrides(self) -> Result<TweenOverrides, AnimationError> {
        Ok(TweenOverrides {
            duration: self.duration.map(Into::into),
            delay: self.delay.map(Into::into),
            end_delay: self.end_delay.map(Into::into),
            easing: self.easing.as_deref().map(Easing::parse).transpose()?,
            round: self.round,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawAnimation {
    #[serde(default)]
    targets: Vec<String>,
    #[serde(flatten)]
    tween: RawTween,
    #[serde(flatten)]
    instance: InstanceSettings,
    #[serde(default)]
    properties: IndexMap<String, RawProperty>,
    #[serde(default)]
    offset: Option<RawOffset>,
}

impl RawAnimation {
    fn into_params(self) -> Result<AnimeParams, AnimationError> {
        let mut params = AnimeParams::new().targets(self.targets);
        params.tween = self.tween.into_overrides()?;
        params.instance = self.instance;
        for (name, prop) in self.properties {
            let value = prop.into_property(&name)?;
            params.properties.insert(name, value);
        }
        Ok(params)
    }
}

#[derive(Debug, Deserialize)]
struct RawTimeline {
    #[serde(default)]
    targets: Vec<String>,
    #[serde(flatten)]
    tween: RawTween,
    #[serde(flatten)]
    instance: InstanceSettings,
    #[serde(default)]
    children: Vec<RawAnimation>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawOffset {
    At(f64),
    Relative(String),
}

impl RawOffset {
    fn into_offset(self) -> TimelineOffset {
        match self {
            RawOffset::At(at) => TimelineOffset::At(at),
            RawOffset::Relative(expr) => TimelineOffset::from(expr.as_str()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProperty {
    Scalar(RawValue),
    List(Vec<RawFrame>),
    Tween(RawKeyframe),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFrame {
    Scalar(RawValue),
    Tween(RawKeyframe),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawKeyframe {
    value: RawKeyframeValue,
    #[serde(flatten)]
    tween: RawTween,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawKeyframeValue {
    Scalar(RawValue),
    Pair(Vec<RawValue>),
}

fn from_to_pair(property: &str, mut values: Vec<RawValue>) -> Result<Keyframe, AnimationError> {
    if values.len() != 2 {
        return Err(AnimationError::InvalidValue {
            reason: format!("property '{property}' expects a [from, to] pair, got {} values", values.len()),
        });
    }
    let to = values.pop();
    let from = values.pop();
    match (from, to) {
        (Some(from), Some(to)) => Ok(Keyframe::from_to(from, to)),
        _ => Err(AnimationError::InvalidValue {
            reason: format!("property '{property}' has an incomplete [from, to] pair"),
        }),
    }
}

impl RawKeyframe {
    fn into_keyframe(self, property: &str) -> Result<Keyframe, AnimationError> {
        let mut frame = match self.value {
            RawKeyframeValue::Scalar(v) => Keyframe::to(v),
            RawKeyframeValue::Pair(values) => from_to_pair(property, values)?,
        };
        frame.tween = self.tween.into_overrides()?;
        Ok(frame)
    }
}

impl RawProperty {
    fn into_property(self, property: &str) -> Result<PropertyValue, AnimationError> {
        match self {
            RawProperty::Scalar(v) => Ok(PropertyValue::from(v)),
            RawProperty::Tween(k) => Ok(PropertyValue::from(k.into_keyframe(property)?)),
            RawProperty::List(frames) => {
                let all_scalars = frames.iter().all(|f| matches!(f, RawFrame::Scalar(_)));
                if all_scalars && frames.len() == 2 {
                    let values = frames
                        .into_iter()
                        .filter_map(|f| match f {
                            RawFrame::Scalar(v) => Some(v),
                            RawFrame::Tween(_) => None,
                        })
                        .collect();
                    return Ok(PropertyValue::from(from_to_pair(property, values)?));
                }
                let frames = frames
                    .into_iter()
                    .map(|f| match f {
                        RawFrame::Scalar(v) => Ok(Keyframe::to(v)),
                        RawFrame::Tween(k) => k.into_keyframe(property),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PropertyValue::keyframes(frames))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Direction, LoopCount};
    use crate::params::KeyframeValue;

    #[test]
    fn parses_settings_and_properties() {
        let params = parse_animation_json(
            r#"{
                "targets": ["box"],
                "duration": 800,
                "easing": "easeInOutQuad",
                "loop": 3,
                "direction": "alternate",
                "autoplay": false,
                "properties": {
                    "x": 250,
                    "width": ["10px", "50px"],
                    "opacity": [{ "value": 0.5, "duration": 200 }, 1, { "value": 0 }],
                    "angle": { "value": "+=90", "easing": "linear" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(params.targets, vec!["box".to_string()]);
        assert_eq!(params.tween.duration.as_ref().and_then(|d| d.fixed().copied()), Some(800.0));
        assert_eq!(params.tween.easing.as_ref().map(|e| e.to_string()).as_deref(), Some("easeInOutQuad"));
        assert_eq!(params.instance.loop_count, LoopCount::Finite(3));
        assert_eq!(params.instance.direction, Direction::Alternate);
        assert!(!params.instance.autoplay);

        let names: Vec<&str> = params.properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["x", "width", "opacity", "angle"]);

        match &params.properties["width"] {
            PropertyValue::Single(k) => assert!(matches!(k.value, KeyframeValue::FromTo(_, _))),
            other => panic!("expected from-to, got {other:?}"),
        }
        match &params.properties["opacity"] {
            PropertyValue::Keyframes(frames) => {
                assert_eq!(frames.len(), 3);
                assert!(frames[0].tween.duration.is_some());
                assert!(frames[1].tween.duration.is_none());
            }
            other => panic!("expected keyframes, got {other:?}"),
        }
        match &params.properties["angle"] {
            PropertyValue::Single(k) => assert!(k.tween.easing.is_some()),
            other => panic!("expected single tween, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_input() {
        let err = parse_animation_json(r#"{ "easing": "wobble" }"#).unwrap_err();
        assert_eq!(err.category(), "easing");

        let err = parse_animation_json(r#"{ "properties": { "x": { "value": [1, 2, 3] } } }"#).unwrap_err();
        assert_eq!(err.category(), "value");

        let err = parse_animation_json("{ not json").unwrap_err();
        assert_eq!(err.category(), "serialization");
    }

    #[test]
    fn parses_timeline_children() {
        let spec = parse_timeline_json(
            r#"{
                "targets": ["a"],
                "easing": "linear",
                "duration": 500,
                "children": [
                    { "properties": { "x": 100 } },
                    { "properties": { "y": 50 }, "offset": "-=200" },
                    { "targets": ["b"], "properties": { "x": 10 }, "offset": 0 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(spec.params.targets, vec!["a".to_string()]);
        assert!(spec.params.tween.easing.is_some());
        assert_eq!(spec.children.len(), 3);
        assert_eq!(spec.children[0].1, None);
        assert_eq!(spec.children[1].1, Some(TimelineOffset::Relative("-=200".into())));
        assert_eq!(spec.children[2].1, Some(TimelineOffset::At(0.0)));
        assert!(spec.children[1].0.targets.is_empty());
        assert_eq!(spec.children[2].0.targets, vec!["b".to_string()]);
    }
}
