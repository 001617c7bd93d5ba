//! Axis-aligned geometry primitives shared by the placement pipeline.
//!
//! All coordinates here are **design units** (Y increases upward, the chip
//! sits at the origin). Normalized image-space coordinates
//! live in [`crate::canvas`] as a separate type so the two systems cannot be
//! mixed by accident.

use serde::{Deserialize, Serialize};

/// A point in design units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignPoint {
    pub x: f64,
    pub y: f64,
}

impl DesignPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: DesignPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box in design units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    /// Build a box centered on `center` with the given extents.
    pub fn from_center(center: DesignPoint, width: f64, height: f64) -> Self {
        Self {
            x_min: center.x - width / 2.0,
            x_max: center.x + width / 2.0,
            y_min: center.y - height / 2.0,
            y_max: center.y + height / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> DesignPoint {
        DesignPoint::new((self.x_min + self.x_max) / 2.0, (self.y_min + self.y_max) / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Grow the box by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            x_min: self.x_min - margin,
            x_max: self.x_max + margin,
            y_min: self.y_min - margin,
            y_max: self.y_max + margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    /// Margined overlap test — the single collision predicate used by the
    /// whole resolver. Two boxes overlap unless one is entirely to the left,
    /// right, above, or below the other once `margin` is accounted for.
    pub fn overlaps(&self, other: &BBox, margin: f64) -> bool {
        !(self.x_max + margin < other.x_min
            || other.x_max + margin < self.x_min
            || self.y_max + margin < other.y_min
            || other.y_max + margin < self.y_min)
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &BBox) -> Self {
        let x_min = self.x_min.min(other.x_min);
        let x_max = self.x_max.max(other.x_max);
        let y_min = self.y_min.min(other.y_min);
        let y_max = self.y_max.max(other.y_max);
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            width: x_max - x_min,
            height: y_max - y_min,
        }
    }

    /// Finite coordinates and positive extent in both axes.
    pub fn is_valid(&self) -> bool {
        self.x_min.is_finite()
            && self.x_max.is_finite()
            && self.y_min.is_finite()
            && self.y_max.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}
