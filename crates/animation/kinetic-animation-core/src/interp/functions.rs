//! Easing curves as plain `f64 -> f64` functions:
//! - Penner families (In / Out / InOut / OutIn variants derived from the In curve)
//! - cubic-bezier timing (x inverted by bisection)
//! - steps
//! - damped spring solver and its settle duration

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::value::clamp;

/// Penner easing family; each family is defined by its "in" curve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PennerFamily {
    Quad,
    Cubic,
    Quart,
    Quint,
    Expo,
    Sine,
    Circ,
    Back,
    Bounce,
    Elastic,
}

impl PennerFamily {
    pub const ALL: [PennerFamily; 10] = [
        PennerFamily::Quad,
        PennerFamily::Cubic,
        PennerFamily::Quart,
        PennerFamily::Quint,
        PennerFamily::Expo,
        PennerFamily::Sine,
        PennerFamily::Circ,
        PennerFamily::Back,
        PennerFamily::Bounce,
        PennerFamily::Elastic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Quad => "Quad",
            Self::Cubic => "Cubic",
            Self::Quart => "Quart",
            Self::Quint => "Quint",
            Self::Expo => "Expo",
            Self::Sine => "Sine",
            Self::Circ => "Circ",
            Self::Back => "Back",
            Self::Bounce => "Bounce",
            Self::Elastic => "Elastic",
        }
    }
}

/// How the "in" curve is mirrored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EaseMode {
    In,
    Out,
    InOut,
    OutIn,
}

impl EaseMode {
    pub const ALL: [EaseMode; 4] = [EaseMode::In, EaseMode::Out, EaseMode::InOut, EaseMode::OutIn];

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::In => "easeIn",
            Self::Out => "easeOut",
            Self::InOut => "easeInOut",
            Self::OutIn => "easeOutIn",
        }
    }
}

/// The "in" curve of a family. `amplitude`/`period` only affect Elastic.
pub fn ease_in(family: PennerFamily, t: f64, amplitude: f64, period: f64) -> f64 {
    match family {
        PennerFamily::Quad => t.powi(2),
        PennerFamily::Cubic => t.powi(3),
        PennerFamily::Quart => t.powi(4),
        PennerFamily::Quint => t.powi(5),
        PennerFamily::Expo => t.powi(6),
        PennerFamily::Sine => 1.0 - (t * PI / 2.0).cos(),
        PennerFamily::Circ => 1.0 - (1.0 - t * t).sqrt(),
        PennerFamily::Back => t * t * (3.0 * t - 2.0),
        PennerFamily::Bounce => bounce_in(t),
        PennerFamily::Elastic => elastic_in(t, amplitude, period),
    }
}

fn bounce_in(t: f64) -> f64 {
    let mut b = 4i32;
    let mut pow2;
    loop {
        b -= 1;
        pow2 = 2f64.powi(b);
        // b floor guards inputs below the curve's domain.
        if t >= (pow2 - 1.0) / 11.0 || b <= -16 {
            break;
        }
    }
    1.0 / 4f64.powi(3 - b) - 7.5625 * ((pow2 * 3.0 - 2.0) / 22.0 - t).powi(2)
}

fn elastic_in(t: f64, amplitude: f64, period: f64) -> f64 {
    let a = clamp(amplitude, 1.0, 10.0);
    let p = clamp(period, 0.1, 2.0);
    if t == 0.0 || t == 1.0 {
        return t;
    }
    -a * 2f64.powf(10.0 * (t - 1.0))
        * ((((t - 1.0) - (p / (PI * 2.0) * (1.0 / a).asin())) * (PI * 2.0)) / p).sin()
}

/// Apply a family in the requested mode.
pub fn penner(family: PennerFamily, mode: EaseMode, t: f64, amplitude: f64, period: f64) -> f64 {
    let f = |x: f64| ease_in(family, x, amplitude, period);
    match mode {
        EaseMode::In => f(t),
        EaseMode::Out => 1.0 - f(1.0 - t),
        EaseMode::InOut => {
            if t < 0.5 {
                f(t * 2.0) / 2.0
            } else {
                1.0 - f(t * -2.0 + 2.0) / 2.0
            }
        }
        EaseMode::OutIn => {
            if t < 0.5 {
                (1.0 - f(1.0 - t * 2.0)) / 2.0
            } else {
                (f(t * 2.0 - 1.0) + 1.0) / 2.0
            }
        }
    }
}

#[inline]
fn cubic_bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Given control points (x1, y1, x2, y2) and an input t in [0,1],
/// compute the eased y by inverting the x bezier via binary search.
pub fn bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    // Diagonal control points are exactly linear.
    if x1 == y1 && x2 == y2 {
        return t;
    }
    if t <= 0.0 || t >= 1.0 {
        return clamp(t, 0.0, 1.0);
    }
    let mut lo = 0.0f64;
    let mut hi = 1.0f64;
    let mut mid = t;
    for _ in 0..48 {
        let x = cubic_bezier(0.0, x1, x2, 1.0, mid);
        if (x - t).abs() < 1e-9 {
            break;
        }
        if x < t {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    cubic_bezier(0.0, y1, y2, 1.0, mid)
}

/// Staircase easing with `steps` equal jumps.
pub fn steps_ease(t: f64, steps: u32) -> f64 {
    let steps = steps.max(1) as f64;
    (clamp(t, 0.000001, 1.0) * steps).ceil() * (1.0 / steps)
}

/// Damped harmonic oscillator parameters; every field is clamped to [0.1, 100].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringParams {
    pub mass: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub velocity: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            stiffness: 100.0,
            damping: 10.0,
            velocity: 0.0,
        }
    }
}

impl SpringParams {
    /// Build from positional arguments (mass, stiffness, damping, velocity), defaulting missing ones.
    pub fn from_args(args: &[f64]) -> Self {
        let d = Self::default();
        let arg = |i: usize, fallback: f64| args.get(i).copied().unwrap_or(fallback);
        Self {
            mass: clamp(arg(0, d.mass), 0.1, 100.0),
            stiffness: clamp(arg(1, d.stiffness), 0.1, 100.0),
            damping: clamp(arg(2, d.damping), 0.1, 100.0),
            velocity: clamp(arg(3, d.velocity), 0.1, 100.0),
        }
    }

    /// Spring position at normalized `t`; `duration_ms` maps t to seconds (0 = t is seconds).
    pub fn solve(&self, t: f64, duration_ms: f64) -> f64 {
        let w0 = (self.stiffness / self.mass).sqrt();
        let zeta = self.damping / (2.0 * (self.stiffness * self.mass).sqrt());
        let wd = if zeta < 1.0 {
            w0 * (1.0 - zeta * zeta).sqrt()
        } else {
            0.0
        };
        let a = 1.0;
        let b = if zeta < 1.0 {
            (zeta * w0 - self.velocity) / wd
        } else {
            -self.velocity + w0
        };
        let mut progress = if duration_ms != 0.0 {
            duration_ms * t / 1000.0
        } else {
            t
        };
        progress = if zeta < 1.0 {
            (-progress * zeta * w0).exp() * (a * (wd * progress).cos() + b * (wd * progress).sin())
        } else {
            (a + b * progress) * (-progress * w0).exp()
        };
        if t == 0.0 || t == 1.0 {
            return t;
        }
        1.0 - progress
    }

    /// Time in milliseconds until the spring settles (16 consecutive samples at rest).
    pub fn settle_duration(&self) -> f64 {
        const FRAME: f64 = 1.0 / 6.0;
        const MAX_FRAMES: u32 = 200_000;
        let mut elapsed = 0.0;
        let mut rest = 0;
        for _ in 0..MAX_FRAMES {
            elapsed += FRAME;
            if self.solve(elapsed, 0.0) == 1.0 {
                rest += 1;
                if rest >= 16 {
                    break;
                }
            } else {
                rest = 0;
            }
        }
        elapsed * FRAME * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    #[test]
    fn families_hit_endpoints() {
        for family in PennerFamily::ALL {
            for mode in EaseMode::ALL {
                approx(penner(family, mode, 0.0, 1.0, 0.5), 0.0, 1e-9);
                approx(penner(family, mode, 1.0, 1.0, 0.5), 1.0, 1e-9);
            }
        }
    }

    #[test]
    fn quad_modes() {
        approx(penner(PennerFamily::Quad, EaseMode::In, 0.5, 1.0, 0.5), 0.25, 1e-12);
        approx(penner(PennerFamily::Quad, EaseMode::Out, 0.5, 1.0, 0.5), 0.75, 1e-12);
        approx(penner(PennerFamily::Quad, EaseMode::InOut, 0.5, 1.0, 0.5), 0.5, 1e-12);
        approx(penner(PennerFamily::Quad, EaseMode::OutIn, 0.25, 1.0, 0.5), 0.375, 1e-12);
    }

    #[test]
    fn elastic_out_overshoots() {
        let peak = (1..100)
            .map(|i| penner(PennerFamily::Elastic, EaseMode::Out, i as f64 / 100.0, 1.0, 0.5))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn bezier_linear_and_ease() {
        approx(bezier_ease(0.3, 0.0, 0.0, 1.0, 1.0), 0.3, 1e-12);
        let mid = bezier_ease(0.5, 0.42, 0.0, 0.58, 1.0);
        approx(mid, 0.5, 1e-6);
        assert!(bezier_ease(0.25, 0.42, 0.0, 0.58, 1.0) < 0.25);
    }

    #[test]
    fn steps_jump() {
        approx(steps_ease(0.0, 4), 0.25, 1e-12);
        approx(steps_ease(0.3, 4), 0.5, 1e-12);
        approx(steps_ease(1.0, 4), 1.0, 1e-12);
    }

    #[test]
    fn spring_settles() {
        let spring = SpringParams::from_args(&[1.0, 80.0, 10.0, 0.0]);
        let duration = spring.settle_duration();
        assert!(duration > 0.0);
        approx(spring.solve(1.0, duration), 1.0, 1e-12);
        approx(spring.solve(0.999, duration), 1.0, 1e-2);
    }
}
