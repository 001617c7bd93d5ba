//! Canvas frame derivation and normalized-coordinate conversion.
//!
//! Design units put Y up with the chip at the origin; detection datasets put
//! the origin at the top-left with Y down. The [`CanvasFrame`] pins down
//! that conversion once, after all positions are final, and is never
//! mutated. Normalized values are carried in their own type so they cannot
//! be confused with design units.

use crate::geometry::{BBox, DesignPoint};
use serde::{Deserialize, Serialize};

/// Margin added around the layout's union box, in design units.
pub const CANVAS_MARGIN: f64 = 2.0;

/// The bounded export coordinate space. `origin` is the canvas top-left
/// corner in design units; canvas Y runs downward from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasFrame {
    pub width: f64,
    pub height: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl CanvasFrame {
    /// Frame enclosing `union` (the union bbox of the chip and every
    /// component) with [`CANVAS_MARGIN`] on each side.
    pub fn from_union(union: &BBox) -> Self {
        Self {
            width: union.width + 2.0 * CANVAS_MARGIN,
            height: union.height + 2.0 * CANVAS_MARGIN,
            origin_x: union.x_min - CANVAS_MARGIN,
            // Top-left corner: canvas Y increases downward from y_max.
            origin_y: union.y_max + CANVAS_MARGIN,
        }
    }
}

/// A center-format box normalized to the canvas, all fields in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert a design-space center + extents to canvas-normalized form.
/// Returns the box and whether any coordinate had to be clamped into
/// `[0, 1]` — clamping silently discards geometry and callers should count
/// it rather than ignore it.
pub fn normalize(
    center: DesignPoint,
    width: f64,
    height: f64,
    frame: &CanvasFrame,
) -> (NormalizedBox, bool) {
    let canvas_x = center.x - frame.origin_x;
    let canvas_y = frame.origin_y - center.y; // Y flip

    let (x_center, cx_clamped) = clamp01(canvas_x / frame.width);
    let (y_center, cy_clamped) = clamp01(canvas_y / frame.height);
    let (w, w_clamped) = clamp01(width / frame.width);
    let (h, h_clamped) = clamp01(height / frame.height);

    (
        NormalizedBox {
            x_center,
            y_center,
            width: w,
            height: h,
        },
        cx_clamped || cy_clamped || w_clamped || h_clamped,
    )
}

/// Invert [`normalize`]: recover the design-space center and extents.
/// Exact (within floating-point tolerance) only when no clamping occurred.
pub fn denormalize(nbox: &NormalizedBox, frame: &CanvasFrame) -> (DesignPoint, f64, f64) {
    let x = nbox.x_center * frame.width + frame.origin_x;
    let y = frame.origin_y - nbox.y_center * frame.height;
    (
        DesignPoint::new(x, y),
        nbox.width * frame.width,
        nbox.height * frame.height,
    )
}

fn clamp01(v: f64) -> (f64, bool) {
    if v < 0.0 {
        (0.0, true)
    } else if v > 1.0 {
        (1.0, true)
    } else {
        (v, false)
    }
}
