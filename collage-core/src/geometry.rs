// collage-core/src/geometry.rs
//! Planar primitives shared by every layout stage
//!
//! - `Point2D`: image centre on the canvas
//! - `SizeBox`: on-canvas width/height of an image
//! - `Rect`: axis-aligned bounds, used for layout extent
//! - `boxes_overlap`: the padded overlap predicate
//!
//! Boxes are centred on their positions. Two boxes are separated when the gap
//! between them is at least `padding` along at least one axis.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Slack applied to every separation test so that boxes placed exactly at the
/// padding distance by a search do not flip to "overlapping" through rounding.
pub const OVERLAP_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const ORIGIN: Point2D = Point2D { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn squared_distance(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Point at fraction `t` of the way from `self` to `target`.
    pub fn lerp(&self, target: &Point2D, t: f64) -> Point2D {
        Point2D {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
        }
    }

    pub fn coord(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn with_coord(mut self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
        }
        self
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point2D {
    type Output = Point2D;

    fn add(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Point2D;

    fn sub(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2D {
    type Output = Point2D;

    fn mul(self, rhs: f64) -> Point2D {
        Point2D::new(self.x * rhs, self.y * rhs)
    }
}

/// Mean of a point set. Empty input yields the origin.
pub fn centroid(points: &[Point2D]) -> Point2D {
    if points.is_empty() {
        return Point2D::ORIGIN;
    }
    let sum = points.iter().fold(Point2D::ORIGIN, |acc, p| acc + *p);
    sum * (1.0 / points.len() as f64)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::X, Axis::Y];
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeBox {
    pub width: f64,
    pub height: f64,
}

impl SizeBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Box whose larger side equals `longest_side` and whose width/height
    /// ratio equals `aspect_ratio`.
    pub fn from_aspect_ratio(aspect_ratio: f64, longest_side: f64) -> Self {
        if aspect_ratio >= 1.0 {
            Self::new(longest_side, longest_side / aspect_ratio)
        } else {
            Self::new(longest_side * aspect_ratio, longest_side)
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }

    pub fn longest_side(&self) -> f64 {
        self.width.max(self.height)
    }

    pub fn shortest_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Axis-aligned rectangle given by its min/max corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point2D,
    pub max: Point2D,
}

impl Rect {
    /// Rectangle covered by a box of `size` centred on `center`.
    pub fn around(center: Point2D, size: SizeBox) -> Self {
        let half = Point2D::new(size.width / 2.0, size.height / 2.0);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: Point2D::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point2D::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.min.x >= self.min.x - OVERLAP_TOLERANCE
            && other.min.y >= self.min.y - OVERLAP_TOLERANCE
            && other.max.x <= self.max.x + OVERLAP_TOLERANCE
            && other.max.y <= self.max.y + OVERLAP_TOLERANCE
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Padded overlap test for two centred boxes.
///
/// The boxes overlap iff their padded projections intersect on both axes.
pub fn boxes_overlap(
    pos_i: &Point2D,
    size_i: &SizeBox,
    pos_j: &Point2D,
    size_j: &SizeBox,
    padding: f64,
) -> bool {
    let dx = (pos_i.x - pos_j.x).abs();
    let dy = (pos_i.y - pos_j.y).abs();
    let need_x = (size_i.width + size_j.width) / 2.0 + padding;
    let need_y = (size_i.height + size_j.height) / 2.0 + padding;
    dx < need_x - OVERLAP_TOLERANCE && dy < need_y - OVERLAP_TOLERANCE
}
