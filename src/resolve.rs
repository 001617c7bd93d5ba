//! Greedy collision resolution around the chip.
//!
//! Components are placed one at a time, most-connected first. Each starts at
//! its ideal position and, on collision, probes a fixed pattern of offsets
//! from that *original* anchor: eight compass directions at radius 1.0, then
//! a widening spiral. After 50 failed tests the component is parked at a far
//! position on its first pin's side, accepted unconditionally.
//!
//! Overlap "failure" is never an error; only non-finite or non-positive
//! geometry aborts the run ([`LayoutError::InvalidGeometry`]).

use crate::estimate::estimate;
use crate::geometry::{BBox, DesignPoint};
use crate::netlist::{Chip, Component, PinSide};
use crate::LayoutError;
use std::cmp::Reverse;
use tracing::{debug, warn};

/// Collision tests per component before falling back to a far placement.
pub const MAX_ATTEMPTS: usize = 50;
/// Base probe radius in design units.
const SEARCH_RADIUS: f64 = 1.0;
/// Clearance between two component boxes.
pub const COMPONENT_MARGIN: f64 = 1.0;
/// Clearance between a component box and the chip box.
pub const CHIP_MARGIN: f64 = 2.0;

/// A component with its final position. One entry per component, in
/// placement (priority) order.
#[derive(Debug, Clone)]
pub struct Placement {
    pub component: Component,
    pub position: DesignPoint,
    pub bbox: BBox,
    /// The connectivity-driven target this search was anchored on.
    pub ideal: DesignPoint,
}

impl Placement {
    /// Distance between the final and ideal positions.
    pub fn distance_from_ideal(&self) -> f64 {
        self.position.distance(self.ideal)
    }

    /// True when the final position is within 0.5 design units of ideal.
    pub fn ideal_achieved(&self) -> bool {
        self.distance_from_ideal() < 0.5
    }
}

/// Place every component without overlap. Components are processed by
/// connected-pin count, descending; ties keep input order (stable sort).
///
/// Re-running recomputes every position from scratch — there is no
/// incremental update.
pub fn resolve(chip: &Chip, components: &[Component]) -> Result<Vec<Placement>, LayoutError> {
    if !chip.bbox.is_valid() {
        return Err(LayoutError::InvalidGeometry {
            id: chip.model.clone(),
            reason: format!("chip bbox {:?} is degenerate", chip.bbox),
        });
    }
    for comp in components {
        if !(comp.width > 0.0 && comp.height > 0.0 && comp.width.is_finite() && comp.height.is_finite())
        {
            return Err(LayoutError::InvalidGeometry {
                id: comp.id.clone(),
                reason: format!("size {}x{} is not positive finite", comp.width, comp.height),
            });
        }
    }

    let mut order: Vec<&Component> = components.iter().collect();
    order.sort_by_key(|c| Reverse(c.connected_pins.len()));

    // Chip clearance is baked into an expanded box tested at zero margin.
    let chip_box = chip.bbox.expand(CHIP_MARGIN);

    let mut placed: Vec<Placement> = Vec::with_capacity(components.len());
    for comp in order {
        let ideal = estimate(chip, comp);
        if !ideal.is_finite() {
            return Err(LayoutError::InvalidGeometry {
                id: comp.id.clone(),
                reason: format!("ideal position ({}, {}) is not finite", ideal.x, ideal.y),
            });
        }

        let position = search_position(comp, ideal, &chip_box, &placed)
            .unwrap_or_else(|| {
                let far = far_placement(chip, comp);
                warn!(
                    id = %comp.id,
                    x = far.x,
                    y = far.y,
                    "no collision-free position within {MAX_ATTEMPTS} attempts; using far placement"
                );
                far
            });

        placed.push(Placement {
            bbox: BBox::from_center(position, comp.width, comp.height),
            position,
            ideal,
            component: comp.clone(),
        });
    }

    Ok(placed)
}

/// Probe up to [`MAX_ATTEMPTS`] candidate positions. Every offset is taken
/// from the fixed `ideal` anchor, never from the previous failed candidate —
/// walking from the last failure would degenerate the spiral.
fn search_position(
    comp: &Component,
    ideal: DesignPoint,
    chip_box: &BBox,
    placed: &[Placement],
) -> Option<DesignPoint> {
    let mut candidate = ideal;
    for attempt in 0..MAX_ATTEMPTS {
        let bbox = BBox::from_center(candidate, comp.width, comp.height);
        let collides = bbox.overlaps(chip_box, 0.0)
            || placed
                .iter()
                .any(|p| bbox.overlaps(&p.bbox, COMPONENT_MARGIN));
        if !collides {
            if attempt > 0 {
                debug!(id = %comp.id, attempt, x = candidate.x, y = candidate.y, "placed after retries");
            }
            return Some(candidate);
        }
        let (dx, dy) = search_offset(attempt);
        candidate = DesignPoint::new(ideal.x + dx, ideal.y + dy);
    }
    None
}

/// Offset from the anchor after the failure at `attempt`: compass directions
/// first, then a spiral widening by half a radius per step.
fn search_offset(attempt: usize) -> (f64, f64) {
    let (angle_deg, radius) = if attempt < 8 {
        ((attempt * 45) as f64, SEARCH_RADIUS)
    } else {
        (
            ((attempt * 30) % 360) as f64,
            SEARCH_RADIUS * (1.0 + (attempt - 8) as f64 * 0.5),
        )
    };
    let angle = angle_deg.to_radians();
    (radius * angle.cos(), radius * angle.sin())
}

/// Last-resort position well away from the chip, on the side of the
/// component's first connected pin. Never collision-checked.
fn far_placement(chip: &Chip, comp: &Component) -> DesignPoint {
    match comp.connected_pins.first() {
        Some(&pin) => {
            let anchor = chip.pin_anchor(pin);
            match anchor.side {
                PinSide::Left => DesignPoint::new(-10.0, anchor.offset * 3.0),
                PinSide::Right => DesignPoint::new(10.0, anchor.offset * 3.0),
                PinSide::Top => DesignPoint::new(anchor.offset * 3.0, 8.0),
                PinSide::Bottom => DesignPoint::new(anchor.offset * 3.0, -8.0),
            }
        }
        None => DesignPoint::new(10.0, 6.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{ComponentType, Netlist, NetlistDoc};

    fn chip_with_pin_1_left() -> Chip {
        let doc: NetlistDoc = serde_json::from_str(
            r#"{"chip": {"model": "TINY", "pin_count": 1,
                         "layout_size": {"width": 2.0, "height": 2.0},
                         "pin_definitions": [
                            {"number": 1, "name": "A", "side": "left", "offset": 0.0}
                         ]},
                "components": [], "nets": []}"#,
        )
        .unwrap();
        Netlist::from_doc(doc).unwrap().chip
    }

    fn component(id: &str, width: f64, height: f64, pins: Vec<u32>) -> Component {
        Component {
            id: id.into(),
            kind: ComponentType::Resistor,
            label: String::new(),
            value: String::new(),
            width,
            height,
            connected_pins: pins,
        }
    }

    #[test]
    fn placements_clear_the_expanded_chip_box() {
        let chip = chip_with_pin_1_left();
        let comps = vec![
            component("1", 2.0, 1.0, vec![1]),
            component("2", 1.0, 1.0, vec![]),
        ];
        let placed = resolve(&chip, &comps).unwrap();
        for p in &placed {
            assert!(
                !p.bbox.overlaps(&chip.bbox.expand(CHIP_MARGIN), 0.0),
                "{} overlaps the chip clearance zone",
                p.component.id
            );
        }
    }

    #[test]
    fn single_left_pin_search_is_anchored_on_ideal() {
        // One pin at (left, 0.0): the ideal is exactly (-3, 0). The chip's
        // 2.0 clearance zone always reaches past x = -2, so the 2x1 box at
        // the ideal collides and the search probes outward -- but every
        // probe is offset from the fixed (-3, 0) anchor, so the final
        // distance from ideal is an exact probe radius.
        let chip = chip_with_pin_1_left();
        let comps = vec![component("1", 2.0, 1.0, vec![1])];
        let placed = resolve(&chip, &comps).unwrap();
        assert_eq!(placed[0].ideal, DesignPoint::new(-3.0, 0.0));
        let d = placed[0].distance_from_ideal();
        let on_probe_ring = (0..MAX_ATTEMPTS).any(|a| {
            let (dx, dy) = search_offset(a);
            (d - (dx * dx + dy * dy).sqrt()).abs() < 1e-9
        });
        assert!(on_probe_ring, "distance {d} is not a probe radius");
    }

    #[test]
    fn second_component_walks_the_spiral() {
        // Two wide components on the same left pin: the second must collide
        // at its ideal and settle on a probe offset from the *anchor*.
        let chip = chip_with_pin_1_left();
        let comps = vec![
            component("1", 4.0, 1.0, vec![1]),
            component("2", 4.0, 1.0, vec![1]),
        ];
        let placed = resolve(&chip, &comps).unwrap();
        let first = &placed[0];
        let second = &placed[1];
        assert_ne!(second.position, second.ideal, "second must have moved");
        // No-overlap invariant with the same margins used during resolution.
        assert!(!first.bbox.overlaps(&second.bbox, COMPONENT_MARGIN));
        // Probes are anchored on the ideal, so the distance from ideal is an
        // exact probe radius.
        let d = second.distance_from_ideal();
        let on_probe_ring = (0..MAX_ATTEMPTS).any(|a| {
            let (dx, dy) = search_offset(a);
            (d - (dx * dx + dy * dy).sqrt()).abs() < 1e-9
        });
        assert!(on_probe_ring, "distance {d} is not a probe radius");
    }

    #[test]
    fn compass_probes_then_spiral() {
        // First eight offsets are unit-radius compass points.
        for a in 0..8 {
            let (dx, dy) = search_offset(a);
            assert!(((dx * dx + dy * dy).sqrt() - 1.0).abs() < 1e-12);
        }
        let (dx0, dy0) = search_offset(0);
        assert!((dx0 - 1.0).abs() < 1e-12 && dy0.abs() < 1e-12);
        // Spiral radius grows from attempt 8 on.
        let r8 = {
            let (dx, dy) = search_offset(8);
            (dx * dx + dy * dy).sqrt()
        };
        let r20 = {
            let (dx, dy) = search_offset(20);
            (dx * dx + dy * dy).sqrt()
        };
        assert!((r8 - 1.0).abs() < 1e-12);
        assert!((r20 - 7.0).abs() < 1e-12);
    }

    #[test]
    fn crowded_pin_falls_back_to_far_placement() {
        // Enough oversized components on one pin exhaust the 50-attempt
        // search; the stragglers take the unconditional far placement.
        let chip = chip_with_pin_1_left();
        let comps: Vec<Component> = (0..12)
            .map(|i| component(&format!("c{i}"), 16.0, 16.0, vec![1]))
            .collect();
        let placed = resolve(&chip, &comps).unwrap();
        assert_eq!(placed.len(), comps.len());
        // Pin 1 is (left, 0.0) -> far placement (-10, 0).
        assert!(
            placed
                .iter()
                .any(|p| p.position == DesignPoint::new(-10.0, 0.0)),
            "expected at least one far placement"
        );
    }

    #[test]
    fn more_connected_components_place_first() {
        let chip = chip_with_pin_1_left();
        let comps = vec![
            component("low", 1.0, 1.0, vec![1]),
            component("high", 1.0, 1.0, vec![1, 1, 1]),
        ];
        let placed = resolve(&chip, &comps).unwrap();
        assert_eq!(placed[0].component.id, "high");
        assert_eq!(placed[1].component.id, "low");
    }

    #[test]
    fn equal_pin_counts_keep_input_order() {
        let chip = chip_with_pin_1_left();
        let comps = vec![
            component("a", 1.0, 1.0, vec![1]),
            component("b", 1.0, 1.0, vec![1]),
            component("c", 1.0, 1.0, vec![1]),
        ];
        let placed = resolve(&chip, &comps).unwrap();
        let ids: Vec<&str> = placed.iter().map(|p| p.component.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn zero_size_component_fails_fast() {
        let chip = chip_with_pin_1_left();
        let comps = vec![component("bad", 0.0, 1.0, vec![1])];
        assert!(matches!(
            resolve(&chip, &comps),
            Err(LayoutError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn nan_size_component_fails_fast() {
        let chip = chip_with_pin_1_left();
        let comps = vec![component("bad", f64::NAN, 1.0, vec![1])];
        assert!(matches!(
            resolve(&chip, &comps),
            Err(LayoutError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn resolution_is_deterministic() {
        let chip = chip_with_pin_1_left();
        let comps: Vec<Component> = (0..6)
            .map(|i| component(&format!("c{i}"), 3.0, 1.0, vec![1]))
            .collect();
        let a = resolve(&chip, &comps).unwrap();
        let b = resolve(&chip, &comps).unwrap();
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.position, pb.position);
        }
    }
}
