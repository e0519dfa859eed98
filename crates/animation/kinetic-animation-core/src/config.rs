//! Engine, tween and instance configuration.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::interp::Easing;

/// Engine-wide settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Multiplier applied to every delivered tick.
    pub speed: f64,
    /// Stop ticking while the host document is hidden.
    pub suspend_when_document_hidden: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            suspend_when_document_hidden: true,
        }
    }
}

/// Playback direction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Normal,
    Reverse,
    Alternate,
}

/// Number of iterations an instance plays.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LoopCount {
    Finite(u32),
    Infinite,
}

impl Default for LoopCount {
    fn default() -> Self {
        LoopCount::Finite(1)
    }
}

impl Serialize for LoopCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LoopCount::Finite(n) => serializer.serialize_u32(*n),
            LoopCount::Infinite => serializer.serialize_str("infinite"),
        }
    }
}

impl<'de> Deserialize<'de> for LoopCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LoopVisitor;

        impl<'de> Visitor<'de> for LoopVisitor {
            type Value = LoopCount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative integer, true or \"infinite\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<LoopCount, E> {
                Ok(if v {
                    LoopCount::Infinite
                } else {
                    LoopCount::Finite(1)
                })
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<LoopCount, E> {
                u32::try_from(v)
                    .map(LoopCount::Finite)
                    .map_err(|_| E::custom("loop count out of range"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<LoopCount, E> {
                u64::try_from(v)
                    .map_err(|_| E::custom("loop count must be non-negative"))
                    .and_then(|v| self.visit_u64(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<LoopCount, E> {
                if v.is_infinite() && v > 0.0 {
                    return Ok(LoopCount::Infinite);
                }
                if v < 0.0 || v.fract() != 0.0 {
                    return Err(E::custom("loop count must be a non-negative integer"));
                }
                self.visit_u64(v as u64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<LoopCount, E> {
                match v {
                    "infinite" | "true" => Ok(LoopCount::Infinite),
                    other => other
                        .parse::<u32>()
                        .map(LoopCount::Finite)
                        .map_err(|_| E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(LoopVisitor)
    }
}

/// Per-tween defaults; every field can be overridden per property or keyframe.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TweenSettings {
    pub duration: f64,
    pub delay: f64,
    pub end_delay: f64,
    pub easing: Easing,
    /// Rounding factor (`round(v * r) / r`); `None` keeps full precision.
    pub round: Option<f64>,
}

impl Default for TweenSettings {
    fn default() -> Self {
        Self {
            duration: 1000.0,
            delay: 0.0,
            end_delay: 0.0,
            easing: Easing::default(),
            round: None,
        }
    }
}

/// Per-instance playback settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceSettings {
    #[serde(rename = "loop")]
    pub loop_count: LoopCount,
    pub direction: Direction,
    pub autoplay: bool,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            loop_count: LoopCount::default(),
            direction: Direction::Normal,
            autoplay: true,
        }
    }
}
