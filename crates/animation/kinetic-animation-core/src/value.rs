//! Property value model: units, colors, relative expressions and the
//! decomposition of composite values (e.g. `"10px 20px"`) into numeric
//! components and the literal separators between them.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[+-]?\d*\.?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?").expect("number regex should compile")
});

static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[+-]?\d*\.?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?(%|px|pt|em|rem|in|cm|mm|ex|ch|pc|vw|vh|vmin|vmax|deg|rad|turn)?$",
    )
    .expect("unit regex should compile")
});

static LEADING_FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("float regex should compile")
});

static HEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#(?:[0-9a-f]{6}|[0-9a-f]{3})$").expect("hex regex should compile")
});

static RGB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"rgb\((\d+,\s*\d+,\s*\d+)\)").expect("rgb regex should compile")
});

static HSL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"hsl\((\d+),\s*([\d.]+)%,\s*([\d.]+)%\)").expect("hsl regex should compile")
});

static HSLA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"hsla\((\d+),\s*([\d.]+)%,\s*([\d.]+)%,\s*([\d.]+)\)")
        .expect("hsla regex should compile")
});

static RELATIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\*=|\+=|-=)").expect("relative operator regex should compile"));

/// A property value as written in configuration: a bare number or a string
/// (`"10px"`, `"+=20"`, `"#fff"`, `"rotate(45deg) scale(2)"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self, RawValue::Text(_))
    }

    /// Textual form, numbers formatted the way they are written back to the host.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Number(n) => format_number(*n),
            RawValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Number(v as f64)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

/// Composite value produced by the tween resolver for one property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TweenValue {
    Number(f64),
    Text(String),
}

impl TweenValue {
    /// Numeric reading of the value: the number itself, or the leading number of a string.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            TweenValue::Number(n) => *n,
            TweenValue::Text(s) => parse_float(s),
        };
        (!n.is_nan()).then_some(n)
    }
}

impl fmt::Display for TweenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TweenValue::Number(n) => f.write_str(&format_number(*n)),
            TweenValue::Text(s) => f.write_str(s),
        }
    }
}

/// A value split into its numeric components and literal separators.
/// `strings` is empty for bare unitless numbers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecomposedValue {
    pub original: String,
    pub numbers: Vec<f64>,
    pub strings: Vec<String>,
}

/// Split `val` (validated against `unit`) into numbers and separators.
pub fn decompose_value(val: &RawValue, unit: Option<&str>) -> DecomposedValue {
    let value = validate_value(val, unit);
    let mut numbers: Vec<f64> = NUMBER_RE
        .find_iter(&value)
        .map(|m| m.as_str().parse::<f64>().unwrap_or(f64::NAN))
        .collect();
    if numbers.is_empty() {
        numbers.push(0.0);
    }
    let strings = if val.is_text() || unit.is_some() {
        NUMBER_RE.split(&value).map(str::to_string).collect()
    } else {
        Vec::new()
    };
    DecomposedValue {
        original: value,
        numbers,
        strings,
    }
}

/// Unit suffix of a value (`"10px"` -> `px`), if any.
pub fn get_unit(val: &str) -> Option<String> {
    UNIT_RE
        .captures(val)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Normalize a value: colors become `rgba(...)`, multi-token strings pass
/// through, otherwise the unit is replaced by `unit` when one is given.
pub fn validate_value(val: &RawValue, unit: Option<&str>) -> String {
    let text = val.to_text();
    if is_color(&text) {
        return color_to_rgba(&text);
    }
    if text.chars().any(char::is_whitespace) {
        return text;
    }
    let unitless = match get_unit(&text) {
        Some(original_unit) => text[..text.len() - original_unit.len()].to_string(),
        None => text,
    };
    match unit {
        Some(u) => format!("{unitless}{u}"),
        None => unitless,
    }
}

/// Evaluate a relative expression (`"+=10px"`, `"-=5"`, `"*=2"`) against `from`.
/// Values without an operator are returned unchanged.
pub fn relative_value(to: &str, from: &str) -> Result<String, AnimationError> {
    let Some(op) = RELATIVE_RE.find(to) else {
        return Ok(to.to_string());
    };
    let unit = get_unit(to).unwrap_or_default();
    let x = parse_float(from);
    let y = parse_float(&to[op.end()..]);
    if x.is_nan() || y.is_nan() {
        return Err(AnimationError::InvalidRelativeValue {
            value: format!("{to} (from {from})"),
        });
    }
    let result = match &op.as_str()[..1] {
        "+" => x + y,
        "-" => x - y,
        _ => x * y,
    };
    Ok(format!("{}{unit}", format_number(result)))
}

/// True for `#rgb`/`#rrggbb`, `rgb...` and `hsl...` values.
pub fn is_color(val: &str) -> bool {
    HEX_RE.is_match(val) || val.starts_with("rgb") || val.starts_with("hsl")
}

/// Convert any supported color notation to `rgba(r,g,b,a)`.
/// Unparseable input is returned unchanged.
pub fn color_to_rgba(val: &str) -> String {
    if val.starts_with("rgb") {
        return match RGB_RE.captures(val) {
            Some(c) => format!("rgba({},1)", &c[1]),
            None => val.to_string(),
        };
    }
    if HEX_RE.is_match(val) {
        return hex_to_rgba(val);
    }
    if val.starts_with("hsl") {
        return hsl_to_rgba(val).unwrap_or_else(|| val.to_string());
    }
    val.to_string()
}

fn hex_to_rgba(hex: &str) -> String {
    let digits: String = hex.trim_start_matches('#').to_string();
    let full = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits
    };
    let channel = |i: usize| u8::from_str_radix(&full[i..i + 2], 16).unwrap_or(0);
    format!("rgba({},{},{},1)", channel(0), channel(2), channel(4))
}

fn hsl_to_rgba(val: &str) -> Option<String> {
    let caps = HSL_RE.captures(val).or_else(|| HSLA_RE.captures(val))?;
    // Integer parse on purpose: "50.5%" reads as 50.
    let int = |s: &str| parse_float(s).trunc();
    let h = int(&caps[1]) / 360.0;
    let s = int(&caps[2]) / 100.0;
    let l = int(&caps[3]) / 100.0;
    let a = caps
        .get(4)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "1".to_string());

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 0.5 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    };
    Some(format!(
        "rgba({},{},{},{a})",
        format_number(r * 255.0),
        format_number(g * 255.0),
        format_number(b * 255.0)
    ))
}

/// Leading-number parse; NaN when the string does not start with a number.
pub fn parse_float(s: &str) -> f64 {
    LEADING_FLOAT_RE
        .find(s)
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Format a number the way it is written into host properties:
/// integral values without a decimal point, no negative zero, and exponent
/// notation (`1e+21`, `1e-7`) outside `[1e-6, 1e21)`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let exp = format!("{n:e}");
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }
    format!("{n}")
}

/// Round half up (towards positive infinity).
#[inline]
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Clamp without panicking on inverted or NaN bounds.
#[inline]
pub fn clamp(v: f64, min: f64, max: f64) -> f64 {
    v.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_are_detected_at_the_end() {
        assert_eq!(get_unit("10px").as_deref(), Some("px"));
        assert_eq!(get_unit("-2.5e2deg").as_deref(), Some("deg"));
        assert_eq!(get_unit("1 50%").as_deref(), Some("%"));
        assert_eq!(get_unit("42"), None);
        assert_eq!(get_unit("rotate(45deg)"), None);
    }

    #[test]
    fn decomposes_numbers_and_separators() {
        let d = decompose_value(&RawValue::from("10px 20px"), None);
        assert_eq!(d.numbers, vec![10.0, 20.0]);
        assert_eq!(d.strings, vec!["", "px ", "px"]);

        let bare = decompose_value(&RawValue::Number(5.0), None);
        assert_eq!(bare.numbers, vec![5.0]);
        assert!(bare.strings.is_empty());

        let with_unit = decompose_value(&RawValue::Number(5.0), Some("px"));
        assert_eq!(with_unit.original, "5px");
        assert_eq!(with_unit.strings, vec!["", "px"]);
    }

    #[test]
    fn unit_is_replaced_when_given() {
        assert_eq!(validate_value(&RawValue::from("10em"), Some("px")), "10px");
        assert_eq!(validate_value(&RawValue::from("10em"), None), "10");
        assert_eq!(validate_value(&RawValue::from("1px 2px"), Some("em")), "1px 2px");
    }

    #[test]
    fn colors_normalize_to_rgba() {
        assert_eq!(color_to_rgba("#fff"), "rgba(255,255,255,1)");
        assert_eq!(color_to_rgba("#FF0080"), "rgba(255,0,128,1)");
        assert_eq!(color_to_rgba("rgb(1, 2, 3)"), "rgba(1, 2, 3,1)");
        assert_eq!(color_to_rgba("rgba(1,2,3,.5)"), "rgba(1,2,3,.5)");
        assert_eq!(color_to_rgba("hsl(0, 100%, 50%)"), "rgba(255,0,0,1)");
        assert_eq!(color_to_rgba("hsla(0, 0%, 100%, 0.5)"), "rgba(255,255,255,0.5)");
        assert!(is_color("#abc"));
        assert!(!is_color("#abcd"));
    }

    #[test]
    fn relative_operators() {
        assert_eq!(relative_value("+=10", "5").unwrap(), "15");
        assert_eq!(relative_value("-=10px", "5px").unwrap(), "-5px");
        assert_eq!(relative_value("*=2", "2.5").unwrap(), "5");
        assert_eq!(relative_value("250", "5").unwrap(), "250");
        assert!(relative_value("+=abc", "5").is_err());
    }

    #[test]
    fn numbers_format_like_host_text() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(123456.0), "123456");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e22), "-2.5e+22");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(parse_float("1e+21px"), 1e21);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(2.5), 3.0);
    }

    #[test]
    fn parse_float_reads_prefix() {
        assert_eq!(parse_float("12.5px"), 12.5);
        assert_eq!(parse_float(" -3"), -3.0);
        assert!(parse_float("px").is_nan());
        assert_eq!(TweenValue::Text("7px".into()).as_number(), Some(7.0));
    }
}
