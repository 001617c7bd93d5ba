//! Netlist input schema and connectivity analysis.
//!
//! Deserializes the JSON netlist document (chip + components + nets) and
//! compiles it into the in-memory [`Netlist`] the placement engine consumes:
//! resolved component sizes, the chip's pin anchor table, and each
//! component's `connected_pins` derived from the net records.

use crate::geometry::{BBox, DesignPoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetlistError {
    #[error("failed to read netlist file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse netlist JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate component id `{0}`")]
    DuplicateComponent(String),
    #[error("component `{id}` has non-positive size {width}x{height}")]
    InvalidSize { id: String, width: f64, height: f64 },
}

// ---------------------------------------------------------------------------
// JSON document schema
// ---------------------------------------------------------------------------

/// Root of the netlist JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetlistDoc {
    pub chip: ChipDef,
    pub components: Vec<ComponentDef>,
    pub nets: Vec<NetDef>,
}

/// Central chip record as it appears in the JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChipDef {
    pub model: String,
    #[serde(default)]
    pub package: Option<String>,
    pub pin_count: u32,
    #[serde(default)]
    pub pin_definitions: Vec<PinDef>,
    /// Explicit layout size; overrides the pin-count-derived fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_size: Option<SizeDef>,
    /// Legacy size field, kept for older netlists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeDef>,
    /// Rendering parameters; opaque to the core except as a size fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_params: Option<ChipRenderParams>,
}

/// A chip pin declaration. `side`/`offset` are optional; missing values fall
/// back to the built-in pin table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinDef {
    pub number: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<PinSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
}

/// Which edge of the chip a pin sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinSide {
    Left,
    Right,
    Top,
    Bottom,
}

/// Explicit width/height in design units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SizeDef {
    pub width: f64,
    pub height: f64,
}

/// Chip drawing parameters used only to derive a footprint when no explicit
/// size is given.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChipRenderParams {
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    #[serde(default = "default_pad")]
    pub pad: f64,
    #[serde(default = "default_leadlen")]
    pub leadlen: f64,
}

fn default_spacing() -> f64 {
    1.5
}
fn default_pad() -> f64 {
    1.5
}
fn default_leadlen() -> f64 {
    1.0
}

impl Default for ChipRenderParams {
    fn default() -> Self {
        Self {
            spacing: default_spacing(),
            pad: default_pad(),
            leadlen: default_leadlen(),
        }
    }
}

/// Component record as it appears in the JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_size: Option<SizeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_params: Option<ComponentRenderParams>,
}

/// Component type tag. Picks default sizes and the annotation class name;
/// the placement algorithm itself is type-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentType {
    Resistor,
    Capacitor,
    Led,
    Ground,
    VoltageSource,
    /// Any type string the core does not know; kept verbatim so it still
    /// gets a class name of its own.
    Other(String),
}

impl ComponentType {
    /// The JSON/class-name string for this type.
    pub fn as_str(&self) -> &str {
        match self {
            ComponentType::Resistor => "resistor",
            ComponentType::Capacitor => "capacitor",
            ComponentType::Led => "LED",
            ComponentType::Ground => "ground",
            ComponentType::VoltageSource => "voltage_source",
            ComponentType::Other(name) => name,
        }
    }
}

impl From<String> for ComponentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "resistor" => ComponentType::Resistor,
            "capacitor" => ComponentType::Capacitor,
            "LED" => ComponentType::Led,
            "ground" => ComponentType::Ground,
            "voltage_source" => ComponentType::VoltageSource,
            _ => ComponentType::Other(s),
        }
    }
}

impl From<ComponentType> for String {
    fn from(t: ComponentType) -> String {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component drawing parameters used only to estimate a footprint when no
/// explicit size is given.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComponentRenderParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loops: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,
}

/// A net connecting chip pins and component ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_id: Option<serde_json::Value>,
    pub connections: Vec<Connection>,
}

/// One endpoint of a net.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Connection {
    #[serde(rename = "chip_pin")]
    ChipPin { pin_number: u32 },
    #[serde(rename = "component_port")]
    ComponentPort {
        #[serde(alias = "component")]
        component_id: String,
    },
}

// ---------------------------------------------------------------------------
// Compiled model
// ---------------------------------------------------------------------------

/// Pin placement on the chip edge: which side, and how far along it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinAnchor {
    pub side: PinSide,
    pub offset: f64,
}

/// Central chip with resolved geometry and pin anchor table. Immutable once
/// built; the chip always sits at the origin.
#[derive(Debug, Clone)]
pub struct Chip {
    pub model: String,
    pub pin_count: u32,
    pub pins: BTreeMap<u32, PinAnchor>,
    pub bbox: BBox,
}

impl Chip {
    /// Resolve a pin number to its `(side, offset)` anchor. Pins absent from
    /// both the netlist and the built-in table default to `(right, 0.0)`.
    pub fn pin_anchor(&self, pin_number: u32) -> PinAnchor {
        self.pins
            .get(&pin_number)
            .copied()
            .or_else(|| builtin_pin_anchor(pin_number))
            .unwrap_or(PinAnchor {
                side: PinSide::Right,
                offset: 0.0,
            })
    }

    pub fn position(&self) -> DesignPoint {
        DesignPoint::new(0.0, 0.0)
    }
}

/// Built-in 555-style pin placement table, used when the netlist does not
/// declare a pin's side/offset.
fn builtin_pin_anchor(pin_number: u32) -> Option<PinAnchor> {
    use PinSide::*;
    let (side, offset) = match pin_number {
        1 => (Bottom, 0.0),
        2 => (Left, 0.5),
        3 => (Right, 0.0),
        4 => (Top, -0.5),
        5 => (Right, 1.0),
        6 => (Left, -0.5),
        7 => (Left, 1.0),
        8 => (Top, 0.5),
        9 => (Right, -1.0),
        _ => return None,
    };
    Some(PinAnchor { side, offset })
}

/// A component with resolved size and derived connectivity. Position is
/// assigned later by the resolver.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: String,
    pub kind: ComponentType,
    pub label: String,
    pub value: String,
    pub width: f64,
    pub height: f64,
    /// Chip pins this component connects to, in net order. Duplicates are
    /// preserved: a pin reached through two nets weights the ideal-position
    /// mean twice.
    pub connected_pins: Vec<u32>,
}

/// Compiled netlist: the input the placement pipeline consumes. Also keeps
/// the raw pin/net records so exports can echo them through.
#[derive(Debug, Clone)]
pub struct Netlist {
    pub chip: Chip,
    pub components: Vec<Component>,
    pub pin_definitions: Vec<PinDef>,
    pub nets: Vec<NetDef>,
}

impl Netlist {
    /// Read and compile a netlist from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NetlistError> {
        let text = std::fs::read_to_string(path)?;
        let doc: NetlistDoc = serde_json::from_str(&text)?;
        Self::from_doc(doc)
    }

    /// Compile a parsed document into the in-memory model.
    pub fn from_doc(doc: NetlistDoc) -> Result<Self, NetlistError> {
        let chip = compile_chip(&doc.chip);
        let pin_map = analyze_connections(&doc.nets);

        let mut components = Vec::with_capacity(doc.components.len());
        let mut seen = std::collections::HashSet::new();
        for def in &doc.components {
            if !seen.insert(def.id.clone()) {
                return Err(NetlistError::DuplicateComponent(def.id.clone()));
            }
            let (width, height) = component_size(def)?;
            let label = def
                .label
                .as_deref()
                .or(def.value.as_deref())
                .unwrap_or("")
                .trim()
                .to_string();
            components.push(Component {
                id: def.id.clone(),
                kind: def.kind.clone(),
                label,
                value: def.value.clone().unwrap_or_default(),
                width,
                height,
                connected_pins: pin_map.get(&def.id).cloned().unwrap_or_default(),
            });
        }

        Ok(Netlist {
            chip,
            components,
            pin_definitions: doc.chip.pin_definitions.clone(),
            nets: doc.nets,
        })
    }
}

// ---------------------------------------------------------------------------
// Connectivity analysis
// ---------------------------------------------------------------------------

/// Derive `component_id → connected chip pins` from the net records: every
/// chip pin in a net attaches to every component port in the same net.
fn analyze_connections(nets: &[NetDef]) -> BTreeMap<String, Vec<u32>> {
    let mut component_to_pins: BTreeMap<String, Vec<u32>> = BTreeMap::new();

    for net in nets {
        let mut chip_pins = Vec::new();
        let mut component_ids = Vec::new();
        for conn in &net.connections {
            match conn {
                Connection::ChipPin { pin_number } => chip_pins.push(*pin_number),
                Connection::ComponentPort { component_id } => {
                    component_ids.push(component_id.clone())
                }
            }
        }
        for id in component_ids {
            component_to_pins.entry(id).or_default().extend(&chip_pins);
        }
    }

    component_to_pins
}

// ---------------------------------------------------------------------------
// Size resolution
// ---------------------------------------------------------------------------

/// Resolve a component footprint: explicit `layout_size`, then the legacy
/// `size` field, then an estimate from render parameters, then the per-type
/// default.
fn component_size(def: &ComponentDef) -> Result<(f64, f64), NetlistError> {
    let explicit = def.layout_size.or(def.size);
    if let Some(s) = explicit {
        if !(s.width > 0.0 && s.height > 0.0 && s.width.is_finite() && s.height.is_finite()) {
            return Err(NetlistError::InvalidSize {
                id: def.id.clone(),
                width: s.width,
                height: s.height,
            });
        }
        return Ok((s.width, s.height));
    }
    if let Some(params) = &def.render_params {
        return Ok(size_from_render_params(&def.kind, params));
    }
    Ok(default_size(&def.kind))
}

/// Footprint estimate from drawing parameters.
fn size_from_render_params(kind: &ComponentType, params: &ComponentRenderParams) -> (f64, f64) {
    match kind {
        ComponentType::Resistor => {
            let length = params.length.unwrap_or(3.0);
            let loops = params.loops.unwrap_or(6.0);
            (length + 0.5, 0.6 + loops / 10.0)
        }
        ComponentType::Capacitor => {
            let width = params.width.unwrap_or(1.5);
            let length = params.length.unwrap_or(0.8);
            (width + 0.5, length + 1.0)
        }
        ComponentType::Led => {
            let width = params.width.unwrap_or(1.0);
            let length = params.length.unwrap_or(1.0);
            (width + 0.5, length + 0.5)
        }
        ComponentType::VoltageSource => {
            let radius = params.radius.unwrap_or(1.0);
            let side = radius * 2.0 + 0.4;
            (side, side)
        }
        ComponentType::Ground => (1.0, 1.0),
        ComponentType::Other(_) => (2.0, 1.0),
    }
}

/// Default footprint per component type.
fn default_size(kind: &ComponentType) -> (f64, f64) {
    match kind {
        ComponentType::Resistor => (3.0, 0.8),
        ComponentType::Capacitor => (2.0, 1.5),
        ComponentType::Led => (1.5, 1.5),
        ComponentType::Ground => (1.2, 1.2),
        ComponentType::VoltageSource => (2.5, 2.5),
        ComponentType::Other(_) => (2.0, 1.0),
    }
}

/// Resolve the chip footprint and build its pin table. Explicit sizes win;
/// otherwise the core grows with the pin count and the lead/pad render
/// parameters pad it out.
fn compile_chip(def: &ChipDef) -> Chip {
    let (width, height) = if let Some(s) = def.layout_size.or(def.size) {
        (s.width, s.height)
    } else {
        let params = def.render_params.unwrap_or_default();
        let (core_w, core_h) = match def.pin_count {
            0..=8 => (2.5, 2.0),
            9..=14 => (2.5, 3.0),
            15..=16 => (2.5, 3.5),
            n => (2.5, 2.0 + f64::from(n - 8) * 0.2),
        };
        (
            core_w + 2.0 * (params.leadlen + params.pad),
            core_h + 2.0 * params.pad,
        )
    };

    let mut pins = BTreeMap::new();
    for pin in &def.pin_definitions {
        let fallback = builtin_pin_anchor(pin.number).unwrap_or(PinAnchor {
            side: PinSide::Right,
            offset: 0.0,
        });
        pins.insert(
            pin.number,
            PinAnchor {
                side: pin.side.unwrap_or(fallback.side),
                offset: pin.offset.unwrap_or(fallback.offset),
            },
        );
    }

    Chip {
        model: def.model.clone(),
        pin_count: def.pin_count,
        pins,
        bbox: BBox::from_center(DesignPoint::new(0.0, 0.0), width, height),
    }
}
