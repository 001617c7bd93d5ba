//! Layout orchestration: netlist in, resolved positions and statistics out.
//!
//! Thin sequencing layer over the pipeline stages. [`ResolvedLayout`] holds
//! the chip plus one [`Placement`] per component and derives everything the
//! export surfaces need from that: the union bounding box, the canvas frame,
//! and the summary statistics.

use crate::canvas::CanvasFrame;
use crate::geometry::BBox;
use crate::netlist::Netlist;
use crate::resolve::{self, Placement};
use crate::LayoutError;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// A fully placed layout. Placements are in resolution (priority) order.
#[derive(Debug, Clone)]
pub struct ResolvedLayout {
    pub chip: crate::netlist::Chip,
    pub placements: Vec<Placement>,
}

impl ResolvedLayout {
    /// Run the full placement pipeline over a compiled netlist.
    pub fn resolve(netlist: &Netlist) -> Result<Self, LayoutError> {
        let placements = resolve::resolve(&netlist.chip, &netlist.components)?;
        info!(
            chip = %netlist.chip.model,
            components = placements.len(),
            "layout resolved"
        );
        Ok(Self {
            chip: netlist.chip.clone(),
            placements,
        })
    }

    /// Smallest box enclosing the chip and every placed component.
    pub fn union_bbox(&self) -> BBox {
        self.placements
            .iter()
            .fold(self.chip.bbox, |acc, p| acc.union(&p.bbox))
    }

    /// The export canvas frame for this layout.
    pub fn canvas(&self) -> CanvasFrame {
        CanvasFrame::from_union(&self.union_bbox())
    }

    /// Summary statistics over the final geometry.
    pub fn statistics(&self) -> LayoutStatistics {
        let union = self.union_bbox();
        let total = self.placements.len();

        // Density counts component area only; the chip is the fixed anchor.
        let component_area: f64 = self.placements.iter().map(|p| p.bbox.area()).sum();
        let density = if union.area() > 0.0 {
            component_area / union.area() * 100.0
        } else {
            0.0
        };

        let optimal = self.placements.iter().filter(|p| p.ideal_achieved()).count();
        let optimal_rate = if total > 0 {
            optimal as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let mut by_side = SideCounts::default();
        let mut by_distance = DistanceCounts::default();
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        for p in &self.placements {
            // Each component counts on one horizontal and one vertical side
            // of the chip center.
            if p.position.x < 0.0 {
                by_side.left += 1;
            } else {
                by_side.right += 1;
            }
            if p.position.y > 0.0 {
                by_side.top += 1;
            } else {
                by_side.bottom += 1;
            }

            let d = p.position.distance(self.chip.position());
            if d < 3.0 {
                by_distance.near += 1;
            } else if d < 6.0 {
                by_distance.medium += 1;
            } else {
                by_distance.far += 1;
            }

            *by_type
                .entry(p.component.kind.as_str().to_string())
                .or_insert(0) += 1;
        }

        LayoutStatistics {
            total_components: total,
            layout_area: LayoutArea {
                width: round2(union.width),
                height: round2(union.height),
                total_area: round2(union.area()),
            },
            overall_bounding_box: union,
            layout_density_percentage: round2(density),
            optimal_position_rate_percentage: round2(optimal_rate),
            component_distribution: ComponentDistribution {
                by_side,
                by_distance,
                by_type,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LayoutStatistics {
    pub total_components: usize,
    pub layout_area: LayoutArea,
    pub overall_bounding_box: BBox,
    pub layout_density_percentage: f64,
    pub optimal_position_rate_percentage: f64,
    pub component_distribution: ComponentDistribution,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutArea {
    pub width: f64,
    pub height: f64,
    pub total_area: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentDistribution {
    pub by_side: SideCounts,
    pub by_distance: DistanceCounts,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SideCounts {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DistanceCounts {
    pub near: usize,
    pub medium: usize,
    pub far: usize,
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
