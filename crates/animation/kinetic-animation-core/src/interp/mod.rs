//! Easing library.
//!
//! Easings are parsed from their textual form (`"linear"`, `"easeOutElastic(1, .5)"`,
//! `"cubicBezier(.5,.05,.1,.3)"`, `"steps(5)"`, `"spring(1, 80, 10, 0)"`) or built
//! from a closure. Serialization round-trips through the textual form.

pub mod functions;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::value::parse_float;
use functions::{bezier_ease, penner, steps_ease, EaseMode, PennerFamily, SpringParams};

static PARAMS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("easing parameter regex should compile"));

/// User-supplied easing curve.
#[derive(Clone)]
pub struct CustomEasing(pub Arc<dyn Fn(f64) -> f64 + Send + Sync>);

impl fmt::Debug for CustomEasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomEasing(..)")
    }
}

/// An easing curve mapping linear progress in [0,1] to eased progress
/// (which may overshoot for Back/Elastic/spring curves).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Easing {
    Linear,
    Penner {
        family: PennerFamily,
        mode: EaseMode,
        amplitude: f64,
        period: f64,
    },
    CubicBezier([f64; 4]),
    Steps(u32),
    /// Spring solver; `duration_ms` is bound when the owning tween is built.
    Spring {
        params: SpringParams,
        duration_ms: f64,
    },
    Custom(CustomEasing),
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Penner {
            family: PennerFamily::Elastic,
            mode: EaseMode::Out,
            amplitude: 1.0,
            period: 0.5,
        }
    }
}

impl Easing {
    /// Wrap a closure as an easing.
    pub fn custom(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Easing::Custom(CustomEasing(Arc::new(f)))
    }

    /// Parse the textual form.
    pub fn parse(spec: &str) -> Result<Self, AnimationError> {
        parse_easing(spec)
    }

    /// Evaluate the curve at `t`.
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::Penner {
                family,
                mode,
                amplitude,
                period,
            } => penner(*family, *mode, t, *amplitude, *period),
            Easing::CubicBezier([x1, y1, x2, y2]) => bezier_ease(t, *x1, *y1, *x2, *y2),
            Easing::Steps(n) => steps_ease(t, *n),
            Easing::Spring {
                params,
                duration_ms,
            } => params.solve(t, *duration_ms),
            Easing::Custom(f) => (f.0)(t),
        }
    }

    /// Settle duration of a spring easing; springs dictate their tween's duration.
    pub fn spring_duration(&self) -> Option<f64> {
        match self {
            Easing::Spring { params, .. } => Some(params.settle_duration()),
            _ => None,
        }
    }

    /// Bind the tween duration (only meaningful for springs).
    pub fn for_duration(&self, duration_ms: f64) -> Self {
        match self {
            Easing::Spring { params, .. } => Easing::Spring {
                params: *params,
                duration_ms,
            },
            other => other.clone(),
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("linear"),
            Easing::Penner {
                family: PennerFamily::Elastic,
                mode,
                amplitude,
                period,
            } => write!(f, "{}Elastic({amplitude}, {period})", mode.prefix()),
            Easing::Penner { family, mode, .. } => write!(f, "{}{}", mode.prefix(), family.name()),
            Easing::CubicBezier([x1, y1, x2, y2]) => write!(f, "cubicBezier({x1},{y1},{x2},{y2})"),
            Easing::Steps(n) => write!(f, "steps({n})"),
            Easing::Spring { params, .. } => write!(
                f,
                "spring({}, {}, {}, {})",
                params.mass, params.stiffness, params.damping, params.velocity
            ),
            Easing::Custom(_) => f.write_str("custom"),
        }
    }
}

impl TryFrom<String> for Easing {
    type Error = AnimationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_easing(&value)
    }
}

impl From<Easing> for String {
    fn from(value: Easing) -> Self {
        value.to_string()
    }
}

impl From<&str> for Easing {
    /// Lenient conversion for literals; unknown names fall back to linear.
    fn from(value: &str) -> Self {
        parse_easing(value).unwrap_or(Easing::Linear)
    }
}

fn parse_params(name: &str, spec: &str) -> Result<Vec<f64>, AnimationError> {
    let Some(caps) = PARAMS_RE.captures(spec) else {
        return Ok(Vec::new());
    };
    caps[1]
        .split(',')
        .map(|raw| {
            let v = parse_float(raw);
            if v.is_nan() {
                Err(AnimationError::InvalidEasingParameters {
                    name: name.to_string(),
                    reason: format!("'{}' is not a number", raw.trim()),
                })
            } else {
                Ok(v)
            }
        })
        .collect()
}

fn lookup_penner(name: &str) -> Option<(PennerFamily, EaseMode)> {
    // Longest prefixes first so "easeInOut" is not read as "easeIn" + "OutX".
    const MODES: [EaseMode; 4] = [EaseMode::OutIn, EaseMode::InOut, EaseMode::Out, EaseMode::In];
    MODES.iter().find_map(|mode| {
        let rest = name.strip_prefix(mode.prefix())?;
        PennerFamily::ALL
            .iter()
            .find(|family| family.name() == rest)
            .map(|family| (*family, *mode))
    })
}

/// Parse an easing from its textual form.
pub fn parse_easing(spec: &str) -> Result<Easing, AnimationError> {
    let spec = spec.trim();
    let name = spec.split('(').next().unwrap_or_default().trim();
    let args = parse_params(name, spec)?;
    match name {
        "linear" => Ok(Easing::Linear),
        "cubicBezier" => {
            if args.len() != 4 {
                return Err(AnimationError::InvalidEasingParameters {
                    name: name.to_string(),
                    reason: format!("expected 4 control values, got {}", args.len()),
                });
            }
            Ok(Easing::CubicBezier([args[0], args[1], args[2], args[3]]))
        }
        "steps" => {
            let steps = args.first().copied().unwrap_or(10.0);
            Ok(Easing::Steps(steps.max(1.0) as u32))
        }
        "spring" => Ok(Easing::Spring {
            params: SpringParams::from_args(&args),
            duration_ms: 0.0,
        }),
        _ => {
            let (family, mode) = lookup_penner(name).ok_or_else(|| AnimationError::UnknownEasing {
                name: name.to_string(),
            })?;
            Ok(Easing::Penner {
                family,
                mode,
                amplitude: args.first().copied().unwrap_or(1.0),
                period: args.get(1).copied().unwrap_or(0.5),
            })
        }
    }
}
