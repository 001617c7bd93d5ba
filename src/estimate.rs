//! Connectivity-driven ideal position estimation.
//!
//! Maps each connected chip pin to a fixed anchor point just outside the
//! chip edge and averages them. Pure and deterministic: the resolver uses it
//! for the initial placement candidate and the orchestrator re-derives it
//! for distance-to-ideal diagnostics, so both calls must agree.

use crate::geometry::DesignPoint;
use crate::netlist::{Chip, Component, PinAnchor, PinSide};

/// Ideal position for a component with no chip connections.
pub const UNCONNECTED_POSITION: DesignPoint = DesignPoint { x: 2.0, y: 2.0 };

/// Anchor point in design units for a single chip pin.
pub fn pin_anchor_point(anchor: PinAnchor) -> DesignPoint {
    match anchor.side {
        PinSide::Left => DesignPoint::new(-3.0, anchor.offset * 1.5),
        PinSide::Right => DesignPoint::new(3.0, anchor.offset * 1.5),
        PinSide::Top => DesignPoint::new(anchor.offset * 1.5, 2.5),
        PinSide::Bottom => DesignPoint::new(anchor.offset * 1.5, -2.5),
    }
}

/// Connectivity-driven target position: the arithmetic mean of the anchor
/// points of every connected pin. Duplicate pins weight the mean.
pub fn estimate(chip: &Chip, component: &Component) -> DesignPoint {
    if component.connected_pins.is_empty() {
        return UNCONNECTED_POSITION;
    }

    let mut total_x = 0.0;
    let mut total_y = 0.0;
    for &pin in &component.connected_pins {
        let anchor = pin_anchor_point(chip.pin_anchor(pin));
        total_x += anchor.x;
        total_y += anchor.y;
    }
    let n = component.connected_pins.len() as f64;
    DesignPoint::new(total_x / n, total_y / n)
}
