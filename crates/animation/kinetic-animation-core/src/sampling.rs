//! Tween resolution and the animation progress pass.
//!
//! Model:
//! - For a query time, the active tween is the first one whose `end` exceeds it,
//!   else the last one (holds the final keyframe).
//! - Eased progress interpolates every numeric component; path tweens sample the
//!   path at `eased * total_length` instead.
//! - The composite value is reassembled by interleaving the literal separators.
//!
//! API:
//! - resolve_value(&Animation, t) for a single unit
//! - set_animations_progress(&mut [Animation], t, host) writes every unit

use crate::binding::PropertyHost;
use crate::data::{Animation, Tween};
use crate::path::path_progress;
use crate::value::{clamp, format_number, round_half_up, TweenValue};

/// Select the tween active at `t`.
fn active_tween(tweens: &[Tween], t: f64) -> Option<&Tween> {
    let last = tweens.last()?;
    if tweens.len() == 1 {
        return Some(last);
    }
    Some(tweens.iter().find(|tw| t < tw.end).unwrap_or(last))
}

/// Eased progress of `tween` at instance time `t`; zero-length tweens snap to 1.
fn eased_progress(tween: &Tween, t: f64) -> f64 {
    let elapsed = clamp(t - tween.start - tween.delay, 0.0, tween.duration) / tween.duration;
    if elapsed.is_nan() {
        1.0
    } else {
        tween.easing.apply(elapsed)
    }
}

fn interpolate(tween: &Tween, eased: f64) -> Vec<f64> {
    tween
        .to
        .numbers
        .iter()
        .enumerate()
        .map(|(n, &to)| {
            let from = tween
                .from
                .numbers
                .get(n)
                .copied()
                .filter(|v| !v.is_nan())
                .unwrap_or(0.0);
            let mut value = match &tween.path {
                Some(path) => path_progress(path, eased * to, tween.inside_svg),
                None => from + eased * (to - from),
            };
            if let Some(round) = tween.round {
                if !(tween.is_color && n > 2) {
                    value = round_half_up(value * round) / round;
                }
            }
            value
        })
        .collect()
}

/// Interleave separators and numbers; no separators yields the bare first number.
fn reassemble(strings: &[String], numbers: &[f64]) -> TweenValue {
    let Some(first) = strings.first() else {
        return TweenValue::Number(numbers.first().copied().unwrap_or(f64::NAN));
    };
    let mut out = first.clone();
    for s in 0..strings.len() {
        let Some(n) = numbers.get(s).copied().filter(|n| !n.is_nan()) else {
            continue;
        };
        out.push_str(&format_number(n));
        match strings.get(s + 1).filter(|b| !b.is_empty()) {
            Some(b) => out.push_str(b),
            None => out.push(' '),
        }
    }
    TweenValue::Text(out)
}

/// Resolve the value of one animation unit at instance time `t`.
pub fn resolve_value(anim: &Animation, t: f64) -> Option<TweenValue> {
    let tween = active_tween(&anim.tweens, t)?;
    let eased = eased_progress(tween, t);
    let numbers = interpolate(tween, eased);
    Some(reassemble(&tween.to.strings, &numbers))
}

/// Resolve every unit at `t`, write it through the host and cache it on the unit.
pub fn set_animations_progress(animations: &mut [Animation], t: f64, host: &mut dyn PropertyHost) {
    for anim in animations.iter_mut() {
        let Some(value) = resolve_value(anim, t) else {
            continue;
        };
        host.apply(&anim.target, &anim.property, anim.kind, &value, false);
        anim.current_value = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{AnimationType, ObjectHost};
    use crate::interp::Easing;
    use crate::value::{decompose_value, get_unit, RawValue};
    use approx::assert_abs_diff_eq;

    fn tween(from: &str, to: &str, start: f64, duration: f64) -> Tween {
        let unit = get_unit(to);
        Tween {
            start,
            end: start + duration,
            delay: 0.0,
            duration,
            end_delay: 0.0,
            easing: Easing::Linear,
            from: decompose_value(&RawValue::from(from), unit.as_deref()),
            to: decompose_value(&RawValue::from(to), unit.as_deref()),
            round: None,
            path: None,
            inside_svg: false,
            is_color: false,
        }
    }

    fn anim(tweens: Vec<Tween>) -> Animation {
        let duration = tweens.last().map(|t| t.end).unwrap_or(0.0);
        Animation {
            target: "a".into(),
            property: "x".into(),
            kind: AnimationType::Object,
            tweens,
            duration,
            delay: 0.0,
            end_delay: 0.0,
            current_value: None,
        }
    }

    #[test]
    fn interpolates_multi_number_strings() {
        let a = anim(vec![tween("0px 10px", "100px 20px", 0.0, 100.0)]);
        assert_eq!(resolve_value(&a, 50.0), Some(TweenValue::Text("50px 15px".into())));
        assert_eq!(resolve_value(&a, 500.0), Some(TweenValue::Text("100px 20px".into())));
    }

    #[test]
    fn selects_keyframe_by_end() {
        let a = anim(vec![tween("0px", "10px", 0.0, 100.0), tween("10px", "30px", 100.0, 100.0)]);
        assert_eq!(resolve_value(&a, 50.0), Some(TweenValue::Text("5px".into())));
        assert_eq!(resolve_value(&a, 100.0), Some(TweenValue::Text("10px".into())));
        assert_eq!(resolve_value(&a, 150.0), Some(TweenValue::Text("20px".into())));
        assert_eq!(resolve_value(&a, 1e6), Some(TweenValue::Text("30px".into())));
    }

    #[test]
    fn zero_duration_snaps_to_end() {
        let a = anim(vec![tween("0px", "10px", 0.0, 0.0)]);
        assert_eq!(resolve_value(&a, 0.0), Some(TweenValue::Text("10px".into())));
    }

    #[test]
    fn bare_numbers_stay_numeric() {
        let mut t = tween("0", "1", 0.0, 100.0);
        t.from = decompose_value(&RawValue::Number(0.0), None);
        t.to = decompose_value(&RawValue::Number(1.0), None);
        let a = anim(vec![t]);
        match resolve_value(&a, 25.0) {
            Some(TweenValue::Number(n)) => assert_abs_diff_eq!(n, 0.25),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn color_rounding_leaves_alpha() {
        let mut t = tween("rgba(0,0,0,0)", "rgba(255,255,255,1)", 0.0, 100.0);
        t.is_color = true;
        t.round = Some(1.0);
        let a = anim(vec![t]);
        assert_eq!(resolve_value(&a, 33.0), Some(TweenValue::Text("rgba(84,84,84,0.33)".into())));
    }

    #[test]
    fn trailing_separator_becomes_space() {
        let a = anim(vec![tween("0", "15", 0.0, 100.0)]);
        assert_eq!(resolve_value(&a, 100.0), Some(TweenValue::Text("15 ".into())));
    }

    #[test]
    fn progress_pass_writes_host_and_caches() {
        let mut host = ObjectHost::new().with("a", "x", 0.0);
        let mut anims = vec![anim(vec![tween("0px", "10px", 0.0, 100.0)])];
        set_animations_progress(&mut anims, 100.0, &mut host);
        assert_eq!(host.get("a", "x"), Some(&TweenValue::Text("10px".into())));
        assert_eq!(anims[0].current_value, Some(TweenValue::Text("10px".into())));
    }
}
