//! Stagger: per-element values spread by distance from an origin element.
//!
//! A [`Stagger`] precomputes the distance of every index from the origin (linear,
//! or Euclidean / single-axis on a grid) the first time it is queried for a
//! given total, then answers `start + spacing * round2(distance)` per index.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::Direction;
use crate::interp::Easing;
use crate::params::{ParamValue, PropertyValue};
use crate::value::{format_number, get_unit, parse_float, round_half_up, RawValue};

/// Base value of a stagger: a step, or a range spread across all elements.
#[derive(Clone, Debug, PartialEq)]
pub enum StaggerValue {
    Step(RawValue),
    Range(RawValue, RawValue),
}

impl From<f64> for StaggerValue {
    fn from(v: f64) -> Self {
        StaggerValue::Step(RawValue::Number(v))
    }
}

impl From<i32> for StaggerValue {
    fn from(v: i32) -> Self {
        StaggerValue::Step(RawValue::from(v))
    }
}

impl From<&str> for StaggerValue {
    fn from(v: &str) -> Self {
        StaggerValue::Step(RawValue::from(v))
    }
}

impl<A: Into<RawValue>, B: Into<RawValue>> From<(A, B)> for StaggerValue {
    fn from((a, b): (A, B)) -> Self {
        StaggerValue::Range(a.into(), b.into())
    }
}

/// Origin element the distances are measured from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaggerFrom {
    #[default]
    First,
    Center,
    Last,
    Index(f64),
}

/// Grid axis restricting the distance to one signed component.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

#[derive(Clone, Debug, Default)]
pub struct StaggerOptions {
    /// `Reverse` mirrors the distribution; other directions leave it as is.
    pub direction: Direction,
    pub easing: Option<Easing>,
    /// Grid as (columns, rows).
    pub grid: Option<(usize, usize)>,
    pub axis: Option<Axis>,
    pub from: StaggerFrom,
    pub start: Option<f64>,
}

/// Normalized distances for one total.
#[derive(Clone, Debug, PartialEq)]
pub struct StaggerDistribution {
    pub total: usize,
    pub values: Vec<f64>,
    pub max: f64,
}

#[derive(Debug)]
pub struct Stagger {
    low: f64,
    high: f64,
    is_range: bool,
    unit: Option<String>,
    start: f64,
    options: StaggerOptions,
    cache: OnceCell<StaggerDistribution>,
}

fn raw_number(v: &RawValue) -> f64 {
    match v {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => parse_float(s),
    }
}

fn raw_unit(v: &RawValue) -> Option<String> {
    match v {
        RawValue::Number(_) => None,
        RawValue::Text(s) => get_unit(s),
    }
}

impl Stagger {
    pub fn new(value: impl Into<StaggerValue>, options: StaggerOptions) -> Self {
        let (low, high, is_range, unit) = match value.into() {
            StaggerValue::Step(v) => (raw_number(&v), 0.0, false, raw_unit(&v)),
            StaggerValue::Range(a, b) => (raw_number(&a), raw_number(&b), true, raw_unit(&b)),
        };
        let start = options.start.unwrap_or(if is_range { low } else { 0.0 });
        Self {
            low,
            high,
            is_range,
            unit,
            start,
            options,
            cache: OnceCell::new(),
        }
    }

    fn compute(&self, total: usize) -> StaggerDistribution {
        let opts = &self.options;
        let from_center = opts.from == StaggerFrom::Center;
        let last = total.saturating_sub(1) as f64;
        let from_index = match opts.from {
            StaggerFrom::First => 0.0,
            StaggerFrom::Center => last / 2.0,
            StaggerFrom::Last => last,
            StaggerFrom::Index(i) => i,
        };

        let mut values: Vec<f64> = (0..total)
            .map(|index| {
                let Some((cols, rows)) = opts.grid else {
                    return (from_index - index as f64).abs();
                };
                let cols_f = cols.max(1) as f64;
                let (from_x, from_y) = if from_center {
                    ((cols_f - 1.0) / 2.0, (rows as f64 - 1.0) / 2.0)
                } else {
                    (from_index % cols_f, (from_index / cols_f).floor())
                };
                let to_x = (index % cols.max(1)) as f64;
                let to_y = (index / cols.max(1)) as f64;
                let dx = from_x - to_x;
                let dy = from_y - to_y;
                match opts.axis {
                    Some(Axis::X) => -dx,
                    Some(Axis::Y) => -dy,
                    None => dx.hypot(dy),
                }
            })
            .collect();
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max = if max.is_finite() { max } else { 0.0 };

        if let Some(easing) = &opts.easing {
            if max != 0.0 {
                for v in &mut values {
                    *v = easing.apply(*v / max) * max;
                }
            }
        }
        if opts.direction == Direction::Reverse {
            for v in &mut values {
                *v = if opts.axis.is_some() { -*v } else { (max - *v).abs() };
            }
        }
        StaggerDistribution { total, values, max }
    }

    /// Distribution for `total` elements; the first total queried is cached.
    pub fn distribution(&self, total: usize) -> StaggerDistribution {
        let cached = self.cache.get_or_init(|| self.compute(total));
        if cached.total == total {
            cached.clone()
        } else {
            self.compute(total)
        }
    }

    fn value_in(&self, dist: &StaggerDistribution, index: usize) -> f64 {
        let spacing = if self.is_range {
            if dist.max == 0.0 {
                0.0
            } else {
                (self.high - self.low) / dist.max
            }
        } else {
            self.low
        };
        let distance = dist.values.get(index).copied().unwrap_or(0.0);
        self.start + spacing * (round_half_up(distance * 100.0) / 100.0)
    }

    /// Numeric value for element `index` of `total`.
    pub fn value(&self, index: usize, total: usize) -> f64 {
        match self.cache.get() {
            Some(cached) if cached.total == total => self.value_in(cached, index),
            _ => self.value_in(&self.distribution(total), index),
        }
    }

    /// Value with the unit of the base value reattached.
    pub fn formatted(&self, index: usize, total: usize) -> RawValue {
        let v = self.value(index, total);
        match &self.unit {
            Some(unit) => RawValue::Text(format!("{}{unit}", format_number(v))),
            None => RawValue::Number(v),
        }
    }
}

/// Shorthand for [`Stagger::new`].
pub fn stagger(value: impl Into<StaggerValue>, options: StaggerOptions) -> Stagger {
    Stagger::new(value, options)
}

impl From<Stagger> for ParamValue<f64> {
    fn from(s: Stagger) -> Self {
        let s = Arc::new(s);
        ParamValue::per_target(move |_, i, total| s.value(i, total))
    }
}

impl From<Stagger> for ParamValue<RawValue> {
    fn from(s: Stagger) -> Self {
        let s = Arc::new(s);
        ParamValue::per_target(move |_, i, total| s.formatted(i, total))
    }
}

impl From<Stagger> for PropertyValue {
    fn from(s: Stagger) -> Self {
        PropertyValue::from(ParamValue::<RawValue>::from(s))
    }
}
