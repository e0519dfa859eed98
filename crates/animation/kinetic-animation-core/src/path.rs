//! Motion paths: a property can follow a path's x/y coordinate or its tangent angle.
//!
//! A path-valued tween interpolates a distance along the path (0..total length)
//! and samples the path at that distance through [`path_progress`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// 2D point in path space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Mapping between path coordinates and rendered coordinates: `origin` is the
/// viewBox origin, `size` the rendered size and `view_size` the viewBox size.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub view_width: f64,
    pub view_height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            view_width: 1.0,
            view_height: 1.0,
        }
    }
}

/// A sampled shape a property can travel along.
pub trait MotionPath: Send + Sync {
    fn total_length(&self) -> f64;
    fn point_at_length(&self, length: f64) -> Point;
    fn viewport(&self) -> Viewport {
        Viewport::default()
    }
}

/// Which reading of the path a property follows.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathProperty {
    X,
    Y,
    Angle,
}

/// A path bound to the reading a property takes from it.
#[derive(Clone)]
pub struct PathValue {
    pub path: Arc<dyn MotionPath>,
    pub property: PathProperty,
}

impl PathValue {
    pub fn new(path: Arc<dyn MotionPath>, property: PathProperty) -> Self {
        Self { path, property }
    }
}

impl fmt::Debug for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathValue")
            .field("property", &self.property)
            .field("total_length", &self.path.total_length())
            .finish()
    }
}

/// Sample `value` at `distance` along its path.
///
/// Coordinates are scaled from viewBox space to rendered space unless the
/// animated target lives inside the same SVG as the path.
pub fn path_progress(value: &PathValue, distance: f64, inside_svg: bool) -> f64 {
    let path = value.path.as_ref();
    let point = |offset: f64| {
        let l = if distance + offset >= 1.0 {
            distance + offset
        } else {
            0.0
        };
        path.point_at_length(l)
    };
    let vp = path.viewport();
    let p = point(0.0);
    match value.property {
        PathProperty::X => {
            let scale = if inside_svg { 1.0 } else { vp.width / vp.view_width };
            (p.x - vp.x) * scale
        }
        PathProperty::Y => {
            let scale = if inside_svg { 1.0 } else { vp.height / vp.view_height };
            (p.y - vp.y) * scale
        }
        PathProperty::Angle => {
            let p0 = point(-1.0);
            let p1 = point(1.0);
            (p1.y - p0.y).atan2(p1.x - p0.x).to_degrees()
        }
    }
}

/// Piecewise-linear path through a list of points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Point>,
    #[serde(default)]
    viewport: Option<Viewport>,
}

impl Polyline {
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            points: points.into_iter().map(|(x, y)| Point { x, y }).collect(),
            viewport: None,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

fn segment_length(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

impl MotionPath for Polyline {
    fn total_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| segment_length(w[0], w[1]))
            .sum()
    }

    fn point_at_length(&self, length: f64) -> Point {
        let Some(first) = self.points.first().copied() else {
            return Point::default();
        };
        let mut remaining = length.max(0.0);
        for w in self.points.windows(2) {
            let len = segment_length(w[0], w[1]);
            if remaining <= len && len > 0.0 {
                let t = remaining / len;
                return Point {
                    x: w[0].x + (w[1].x - w[0].x) * t,
                    y: w[0].y + (w[1].y - w[0].y) * t,
                };
            }
            remaining -= len;
        }
        self.points.last().copied().unwrap_or(first)
    }

    fn viewport(&self) -> Viewport {
        self.viewport.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn l_shape() -> Arc<dyn MotionPath> {
        Arc::new(Polyline::new([(0.0, 0.0), (100.0, 0.0), (100.0, 50.0)]))
    }

    #[test]
    fn polyline_measures_and_samples() {
        let path = Polyline::new([(0.0, 0.0), (100.0, 0.0), (100.0, 50.0)]);
        assert_abs_diff_eq!(path.total_length(), 150.0);
        assert_eq!(path.point_at_length(50.0), Point { x: 50.0, y: 0.0 });
        assert_eq!(path.point_at_length(125.0), Point { x: 100.0, y: 25.0 });
        assert_eq!(path.point_at_length(500.0), Point { x: 100.0, y: 50.0 });
        assert_eq!(Polyline::default().point_at_length(3.0), Point::default());
    }

    #[test]
    fn progress_reads_coordinates_and_angle() {
        let path = l_shape();
        let x = PathValue::new(path.clone(), PathProperty::X);
        let y = PathValue::new(path.clone(), PathProperty::Y);
        let angle = PathValue::new(path, PathProperty::Angle);
        assert_abs_diff_eq!(path_progress(&x, 60.0, false), 60.0);
        assert_abs_diff_eq!(path_progress(&y, 130.0, false), 30.0);
        assert_abs_diff_eq!(path_progress(&angle, 50.0, false), 0.0);
        assert_abs_diff_eq!(path_progress(&angle, 120.0, false), 90.0);
    }

    #[test]
    fn viewport_scales_unless_inside_svg() {
        let path: Arc<dyn MotionPath> = Arc::new(
            Polyline::new([(0.0, 0.0), (100.0, 0.0)]).with_viewport(Viewport {
                width: 200.0,
                view_width: 100.0,
                ..Viewport::default()
            }),
        );
        let x = PathValue::new(path, PathProperty::X);
        assert_abs_diff_eq!(path_progress(&x, 40.0, false), 80.0);
        assert_abs_diff_eq!(path_progress(&x, 40.0, true), 40.0);
    }
}
