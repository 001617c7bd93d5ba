//! Netlist-driven schematic placement and detection-dataset annotation.
//!
//! Places discrete components around a central chip without overlap, then
//! converts the resolved layout into normalized YOLO detection annotations
//! and companion JSON/text reports.
//!
//! # Pipeline
//!
//! ```text
//! netlist JSON
//!   → Netlist            (schema parse + connectivity analysis)
//!   → ideal positions    (per-pin anchors averaged per component)
//!   → collision search   (compass probes, widening spiral, far fallback)
//!   → ResolvedLayout     (placed arena + statistics)
//!   → CanvasFrame        (union bbox + margin, Y flip)
//!   → exports            (annotations, class list, JSON docs, text report)
//! ```

pub mod canvas;
pub mod estimate;
pub mod export;
pub mod geometry;
pub mod layout;
pub mod netlist;
pub mod resolve;

pub use canvas::{CanvasFrame, NormalizedBox, CANVAS_MARGIN};
pub use geometry::{BBox, DesignPoint};
pub use layout::{LayoutStatistics, ResolvedLayout};
pub use netlist::{Netlist, NetlistError};
pub use resolve::{Placement, CHIP_MARGIN, COMPONENT_MARGIN, MAX_ATTEMPTS};

use thiserror::Error;

/// Errors the placement pipeline can raise. Collisions are never errors;
/// only broken inputs and failed I/O are.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Non-positive or non-finite geometry. Fails the run before any
    /// partial layout is produced.
    #[error("invalid geometry for `{id}`: {reason}")]
    InvalidGeometry { id: String, reason: String },
    #[error(transparent)]
    Netlist(#[from] NetlistError),
    #[error("failed to serialize export document: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the full pipeline: compiled netlist in, placed layout out.
///
/// This is the main entry point. Exports are separate pure reads of the
/// returned [`ResolvedLayout`] (see [`export`]).
pub fn generate_layout(netlist: &Netlist) -> Result<ResolvedLayout, LayoutError> {
    ResolvedLayout::resolve(netlist)
}
