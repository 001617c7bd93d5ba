//! Export surfaces: YOLO annotations, JSON layout documents, text report.
//!
//! Everything here is a pure read of a [`ResolvedLayout`] producing strings;
//! writing files is the CLI's job. Repeated export of the same layout yields
//! byte-identical output (timestamps excepted in the JSON metadata blocks).

use crate::canvas::{self, CanvasFrame, NormalizedBox};
use crate::geometry::{BBox, DesignPoint};
use crate::layout::{round2, LayoutStatistics, ResolvedLayout};
use crate::netlist::{NetDef, Netlist, PinDef};
use crate::resolve::Placement;
use crate::LayoutError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

// ---------------------------------------------------------------------------
// Annotation set
// ---------------------------------------------------------------------------

/// One normalized detection record.
#[derive(Debug, Clone)]
pub struct AnnotationRecord {
    pub class_id: usize,
    pub nbox: NormalizedBox,
    /// Trailing comment tag (`{id}_{type}`); the chip record carries none.
    pub tag: Option<String>,
}

/// The full annotation output for one layout: class table, records in file
/// order, and the canvas frame they were normalized against.
#[derive(Debug, Clone)]
pub struct AnnotationSet {
    pub class_names: Vec<String>,
    pub records: Vec<AnnotationRecord>,
    pub frame: CanvasFrame,
    /// Boxes that had at least one coordinate clamped into `[0, 1]`.
    pub clamped: usize,
}

impl AnnotationSet {
    /// Normalize every entity. The chip comes first; components follow
    /// sorted by numeric id, non-numeric ids after them in layout order.
    pub fn build(layout: &ResolvedLayout) -> Self {
        let frame = layout.canvas();

        let mut names: Vec<String> = layout
            .placements
            .iter()
            .map(|p| p.component.kind.as_str().to_string())
            .collect();
        names.push("chip".to_string());
        names.sort();
        names.dedup();
        let class_id = |name: &str| -> usize {
            // The table is small and sorted; position lookup is the id.
            names.iter().position(|n| n == name).unwrap_or(0)
        };

        let mut clamped = 0;
        let mut records = Vec::with_capacity(layout.placements.len() + 1);

        let chip_box = layout.chip.bbox;
        let (nbox, was_clamped) =
            canvas::normalize(chip_box.center(), chip_box.width, chip_box.height, &frame);
        clamped += usize::from(was_clamped);
        records.push(AnnotationRecord {
            class_id: class_id("chip"),
            nbox,
            tag: None,
        });

        for p in ordered_placements(layout) {
            let (nbox, was_clamped) =
                canvas::normalize(p.position, p.component.width, p.component.height, &frame);
            clamped += usize::from(was_clamped);
            records.push(AnnotationRecord {
                class_id: class_id(p.component.kind.as_str()),
                nbox,
                tag: Some(format!("{}_{}", p.component.id, p.component.kind)),
            });
        }

        Self {
            class_names: names,
            records,
            frame,
            clamped,
        }
    }

    /// `class_id cx cy w h` lines, six decimals, with `# tag` comments.
    pub fn annotations_txt(&self) -> String {
        let mut out = String::new();
        for rec in &self.records {
            let _ = write!(
                out,
                "{} {:.6} {:.6} {:.6} {:.6}",
                rec.class_id,
                rec.nbox.x_center,
                rec.nbox.y_center,
                rec.nbox.width,
                rec.nbox.height
            );
            if let Some(tag) = &rec.tag {
                let _ = write!(out, "  # {tag}");
            }
            out.push('\n');
        }
        out
    }

    /// One class name per line; line index is the class id.
    pub fn classes_txt(&self) -> String {
        let mut out = String::new();
        for name in &self.class_names {
            out.push_str(name);
            out.push('\n');
        }
        out
    }

    /// `yolo_dataset_info.json` contents.
    pub fn dataset_info_json(&self) -> Result<String, LayoutError> {
        let mut per_class: BTreeMap<String, usize> = BTreeMap::new();
        for rec in &self.records {
            *per_class
                .entry(self.class_names[rec.class_id].clone())
                .or_insert(0) += 1;
        }

        let widths: Vec<f64> = self.records.iter().map(|r| r.nbox.width).collect();
        let heights: Vec<f64> = self.records.iter().map(|r| r.nbox.height).collect();
        let bbox_size_range = BoxSizeRange {
            min_width: fold_min(&widths),
            max_width: fold_max(&widths),
            min_height: fold_min(&heights),
            max_height: fold_max(&heights),
            avg_width: mean(&widths),
            avg_height: mean(&heights),
        };

        let doc = DatasetInfoDoc {
            metadata: ExportMetadata::new(
                "YOLO",
                "Detection annotations for a chip-centered schematic layout",
            ),
            canvas_info: self.frame,
            class_mapping: ClassMapping {
                total_classes: self.class_names.len(),
                classes: self
                    .class_names
                    .iter()
                    .enumerate()
                    .map(|(id, name)| ClassEntry {
                        id,
                        name: name.clone(),
                    })
                    .collect(),
                mapping: self
                    .class_names
                    .iter()
                    .enumerate()
                    .map(|(id, name)| (name.clone(), id))
                    .collect(),
            },
            annotation_format: AnnotationFormat {
                description: "per line: <class_id> <x_center> <y_center> <width> <height>",
                coordinate_range: "all values in [0, 1]",
                center_based: true,
            },
            statistics: DatasetStatistics {
                total_objects: self.records.len(),
                class_distribution: per_class,
                bbox_size_range,
                clamped_boxes: self.clamped,
            },
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}

/// Placements sorted for export: numeric ids ascending, then non-numeric
/// ids in their existing (priority) order.
fn ordered_placements(layout: &ResolvedLayout) -> Vec<&Placement> {
    let mut ordered: Vec<(usize, &Placement)> = layout.placements.iter().enumerate().collect();
    ordered.sort_by_key(|(idx, p)| match p.component.id.parse::<u64>() {
        Ok(n) => (0u8, n, *idx),
        Err(_) => (1u8, 0, *idx),
    });
    ordered.into_iter().map(|(_, p)| p).collect()
}

// ---------------------------------------------------------------------------
// JSON documents
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ExportMetadata {
    format: &'static str,
    description: &'static str,
    generation_time: String,
    coordinate_system: &'static str,
}

impl ExportMetadata {
    fn new(format: &'static str, description: &'static str) -> Self {
        Self {
            format,
            description,
            generation_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            coordinate_system: "design units, Y up, chip centered at the origin",
        }
    }
}

#[derive(Debug, Serialize)]
struct DatasetInfoDoc {
    metadata: ExportMetadata,
    canvas_info: CanvasFrame,
    class_mapping: ClassMapping,
    annotation_format: AnnotationFormat,
    statistics: DatasetStatistics,
}

#[derive(Debug, Serialize)]
struct ClassMapping {
    total_classes: usize,
    classes: Vec<ClassEntry>,
    mapping: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
struct ClassEntry {
    id: usize,
    name: String,
}

#[derive(Debug, Serialize)]
struct AnnotationFormat {
    description: &'static str,
    coordinate_range: &'static str,
    center_based: bool,
}

#[derive(Debug, Serialize)]
struct DatasetStatistics {
    total_objects: usize,
    class_distribution: BTreeMap<String, usize>,
    bbox_size_range: BoxSizeRange,
    clamped_boxes: usize,
}

#[derive(Debug, Serialize)]
struct BoxSizeRange {
    min_width: f64,
    max_width: f64,
    min_height: f64,
    max_height: f64,
    avg_width: f64,
    avg_height: f64,
}

fn fold_min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn fold_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Debug, Serialize)]
struct SizeRecord {
    width: f64,
    height: f64,
}

#[derive(Debug, Serialize)]
struct ChipRecord {
    model: String,
    pin_count: u32,
    position: DesignPoint,
    size: SizeRecord,
    bbox: BBox,
}

impl ChipRecord {
    fn from_layout(layout: &ResolvedLayout) -> Self {
        Self {
            model: layout.chip.model.clone(),
            pin_count: layout.chip.pin_count,
            position: layout.chip.position(),
            size: SizeRecord {
                width: layout.chip.bbox.width,
                height: layout.chip.bbox.height,
            },
            bbox: layout.chip.bbox,
        }
    }
}

#[derive(Debug, Serialize)]
struct ComponentRecord {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    label: String,
    value: String,
    position: DesignPoint,
    size: SizeRecord,
    bbox: BBox,
    connected_pins: Vec<u32>,
    placement_info: PlacementInfo,
}

#[derive(Debug, Serialize)]
struct PlacementInfo {
    ideal_position: DesignPoint,
    optimal_position_achieved: bool,
    distance_from_optimal: f64,
}

impl ComponentRecord {
    fn from_placement(p: &Placement) -> Self {
        Self {
            id: p.component.id.clone(),
            kind: p.component.kind.as_str().to_string(),
            label: p.component.label.clone(),
            value: p.component.value.clone(),
            position: p.position,
            size: SizeRecord {
                width: p.component.width,
                height: p.component.height,
            },
            bbox: p.bbox,
            connected_pins: p.component.connected_pins.clone(),
            placement_info: PlacementInfo {
                ideal_position: p.ideal,
                optimal_position_achieved: p.ideal_achieved(),
                distance_from_optimal: round2(p.distance_from_ideal()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct CompleteLayoutDoc {
    metadata: ExportMetadata,
    chip: ChipRecord,
    components: Vec<ComponentRecord>,
    statistics: LayoutStatistics,
    original_netlist: NetlistEcho,
}

#[derive(Debug, Serialize)]
struct NetlistEcho {
    pin_definitions: Vec<PinDef>,
    nets: Vec<NetDef>,
}

/// `complete_layout.json` contents: every placed entity with quality
/// diagnostics, plus the raw pins/nets echoed through for traceability.
pub fn complete_layout_json(
    netlist: &Netlist,
    layout: &ResolvedLayout,
) -> Result<String, LayoutError> {
    let doc = CompleteLayoutDoc {
        metadata: ExportMetadata::new(
            "circuitgen-layout",
            "Resolved schematic layout with placement diagnostics",
        ),
        chip: ChipRecord::from_layout(layout),
        components: ordered_placements(layout)
            .into_iter()
            .map(ComponentRecord::from_placement)
            .collect(),
        statistics: layout.statistics(),
        original_netlist: NetlistEcho {
            pin_definitions: netlist.pin_definitions.clone(),
            nets: netlist.nets.clone(),
        },
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

#[derive(Debug, Serialize)]
struct CoordinatesDoc {
    chip: CoordinatesChip,
    components: BTreeMap<String, CoordinatesEntry>,
}

#[derive(Debug, Serialize)]
struct CoordinatesChip {
    model: String,
    position: DesignPoint,
}

#[derive(Debug, Serialize)]
struct CoordinatesEntry {
    #[serde(rename = "type")]
    kind: String,
    position: DesignPoint,
    size: SizeRecord,
}

/// `component_coordinates.json` contents: the condensed position map.
pub fn coordinates_json(layout: &ResolvedLayout) -> Result<String, LayoutError> {
    let doc = CoordinatesDoc {
        chip: CoordinatesChip {
            model: layout.chip.model.clone(),
            position: layout.chip.position(),
        },
        components: layout
            .placements
            .iter()
            .map(|p| {
                (
                    p.component.id.clone(),
                    CoordinatesEntry {
                        kind: p.component.kind.as_str().to_string(),
                        position: p.position,
                        size: SizeRecord {
                            width: p.component.width,
                            height: p.component.height,
                        },
                    },
                )
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

/// `layout_summary.txt` contents: the human-readable run report.
pub fn summary_txt(layout: &ResolvedLayout) -> String {
    let stats = layout.statistics();
    let mut out = String::new();

    let _ = writeln!(out, "Circuit Layout Summary");
    let _ = writeln!(out, "======================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Chip: {} ({} pins)", layout.chip.model, layout.chip.pin_count);
    let _ = writeln!(out, "Components placed: {}", stats.total_components);
    let _ = writeln!(
        out,
        "Layout area: {} x {} ({} sq units)",
        stats.layout_area.width, stats.layout_area.height, stats.layout_area.total_area
    );
    let _ = writeln!(out, "Layout density: {}%", stats.layout_density_percentage);
    let _ = writeln!(
        out,
        "Optimal position rate: {}%",
        stats.optimal_position_rate_percentage
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Distribution");
    let _ = writeln!(out, "------------");
    let s = &stats.component_distribution.by_side;
    let _ = writeln!(
        out,
        "By side: left {} / right {} / top {} / bottom {}",
        s.left, s.right, s.top, s.bottom
    );
    let d = &stats.component_distribution.by_distance;
    let _ = writeln!(out, "By distance: near {} / medium {} / far {}", d.near, d.medium, d.far);
    for (kind, count) in &stats.component_distribution.by_type {
        let _ = writeln!(out, "  {kind}: {count}");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Components");
    let _ = writeln!(out, "----------");
    for p in ordered_placements(layout) {
        let mark = if p.ideal_achieved() { "" } else { "  [off-ideal]" };
        let _ = writeln!(
            out,
            "{} ({}): ({:.2}, {:.2}), {:.1}x{:.1}, pins {:?}, d={:.2}{}",
            p.component.id,
            p.component.kind,
            p.position.x,
            p.position.y,
            p.component.width,
            p.component.height,
            p.component.connected_pins,
            p.distance_from_ideal(),
            mark
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::NetlistDoc;

    fn netlist(json: &str) -> Netlist {
        let doc: NetlistDoc = serde_json::from_str(json).unwrap();
        Netlist::from_doc(doc).unwrap()
    }

    fn timer() -> (Netlist, ResolvedLayout) {
        let nl = netlist(
            r#"{
                "chip": {"model": "NE555", "pin_count": 8, "pin_definitions": []},
                "components": [
                    {"id": "2", "type": "capacitor"},
                    {"id": "1", "type": "resistor"},
                    {"id": "10", "type": "LED"},
                    {"id": "led_b", "type": "LED"}
                ],
                "nets": [
                    {"connections": [
                        {"type": "chip_pin", "pin_number": 7},
                        {"type": "component_port", "component_id": "1"}
                    ]},
                    {"connections": [
                        {"type": "chip_pin", "pin_number": 2},
                        {"type": "component_port", "component_id": "2"}
                    ]}
                ]
            }"#,
        );
        let layout = ResolvedLayout::resolve(&nl).unwrap();
        (nl, layout)
    }

    #[test]
    fn classes_are_sorted_and_include_chip() {
        let (_, layout) = timer();
        let set = AnnotationSet::build(&layout);
        assert_eq!(set.class_names, vec!["LED", "capacitor", "chip", "resistor"]);
        let mut sorted = set.class_names.clone();
        sorted.sort();
        assert_eq!(set.class_names, sorted);
    }

    #[test]
    fn chip_record_comes_first_then_numeric_id_order() {
        let (_, layout) = timer();
        let set = AnnotationSet::build(&layout);
        assert_eq!(set.records[0].tag, None);
        let tags: Vec<&str> = set.records[1..]
            .iter()
            .map(|r| r.tag.as_deref().unwrap())
            .collect();
        assert_eq!(
            tags,
            vec!["1_resistor", "2_capacitor", "10_LED", "led_b_LED"]
        );
    }

    #[test]
    fn annotation_lines_have_six_decimals_and_tags() {
        let (_, layout) = timer();
        let set = AnnotationSet::build(&layout);
        let txt = set.annotations_txt();
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 5);
        // Chip line: five fields, no comment.
        assert_eq!(lines[0].split_whitespace().count(), 5);
        assert!(!lines[0].contains('#'));
        // Component lines carry the tag comment.
        assert!(lines[1].ends_with("# 1_resistor"));
        // Six decimal places on every coordinate.
        let cx = lines[0].split_whitespace().nth(1).unwrap();
        assert_eq!(cx.split('.').nth(1).unwrap().len(), 6);
    }

    #[test]
    fn annotation_values_are_normalized() {
        let (_, layout) = timer();
        let set = AnnotationSet::build(&layout);
        for rec in &set.records {
            for v in [
                rec.nbox.x_center,
                rec.nbox.y_center,
                rec.nbox.width,
                rec.nbox.height,
            ] {
                assert!((0.0..=1.0).contains(&v), "value {v} out of range");
            }
        }
    }

    #[test]
    fn export_is_idempotent() {
        let (_, layout) = timer();
        let a = AnnotationSet::build(&layout);
        let b = AnnotationSet::build(&layout);
        assert_eq!(a.annotations_txt(), b.annotations_txt());
        assert_eq!(a.classes_txt(), b.classes_txt());
        assert_eq!(
            coordinates_json(&layout).unwrap(),
            coordinates_json(&layout).unwrap()
        );
        assert_eq!(summary_txt(&layout), summary_txt(&layout));
    }

    #[test]
    fn class_ids_match_class_file_lines() {
        let (_, layout) = timer();
        let set = AnnotationSet::build(&layout);
        let classes: Vec<&str> = set.class_names.iter().map(String::as_str).collect();
        // Chip record's class id points at "chip" in the table.
        assert_eq!(classes[set.records[0].class_id], "chip");
        for rec in &set.records[1..] {
            let tag = rec.tag.as_deref().unwrap();
            let kind = tag.split_once('_').unwrap().1;
            assert_eq!(classes[rec.class_id], kind);
        }
    }

    #[test]
    fn complete_layout_echoes_nets_and_reports_quality() {
        let (nl, layout) = timer();
        let json = complete_layout_json(&nl, &layout).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(doc["chip"]["model"], "NE555");
        assert_eq!(doc["original_netlist"]["nets"].as_array().unwrap().len(), 2);
        let comps = doc["components"].as_array().unwrap();
        assert_eq!(comps.len(), 4);
        for c in comps {
            assert!(c["placement_info"]["distance_from_optimal"].is_number());
            assert!(c["placement_info"]["optimal_position_achieved"].is_boolean());
        }
    }

    #[test]
    fn coordinates_doc_maps_every_component() {
        let (_, layout) = timer();
        let json = coordinates_json(&layout).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        let comps = doc["components"].as_object().unwrap();
        assert_eq!(comps.len(), 4);
        assert_eq!(comps["1"]["type"], "resistor");
        assert!(comps["1"]["position"]["x"].is_number());
    }

    #[test]
    fn dataset_info_counts_objects_and_clamps() {
        let (_, layout) = timer();
        let set = AnnotationSet::build(&layout);
        let json = set.dataset_info_json().unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(doc["statistics"]["total_objects"], 5);
        assert_eq!(doc["statistics"]["class_distribution"]["chip"], 1);
        assert_eq!(doc["statistics"]["class_distribution"]["LED"], 2);
        assert_eq!(doc["class_mapping"]["mapping"]["chip"], 2);
        assert_eq!(doc["class_mapping"]["total_classes"], 4);
        // Everything fits inside the frame by construction.
        assert_eq!(doc["statistics"]["clamped_boxes"], 0);
    }

    #[test]
    fn summary_flags_off_ideal_placements() {
        let (_, layout) = timer();
        let txt = summary_txt(&layout);
        assert!(txt.contains("Components placed: 4"));
        assert!(txt.contains("NE555"));
        // At least the crowded resistor is off its ideal in this layout.
        if layout.placements.iter().any(|p| !p.ideal_achieved()) {
            assert!(txt.contains("[off-ideal]"));
        }
    }
}
