use circuitgen::export::{self, AnnotationSet};
use circuitgen::{generate_layout, Netlist};
use std::path::Path;
use std::process;

/// Run the full pipeline and write the six output files.
pub fn run(netlist_path: &str, out_dir: &str) {
    let netlist = Netlist::load(netlist_path).unwrap_or_else(|e| {
        eprintln!("Error reading {netlist_path}: {e}");
        process::exit(1);
    });
    eprintln!(
        "Netlist: {} ({} chip, {} components, {} nets)",
        netlist_path,
        netlist.chip.model,
        netlist.components.len(),
        netlist.nets.len(),
    );

    let layout = generate_layout(&netlist).unwrap_or_else(|e| {
        eprintln!("Layout error: {e}");
        process::exit(1);
    });

    let dir = Path::new(out_dir);
    std::fs::create_dir_all(dir).unwrap_or_else(|e| {
        eprintln!("Error creating {out_dir}: {e}");
        process::exit(1);
    });

    let set = AnnotationSet::build(&layout);
    let outputs: Vec<(&str, String)> = vec![
        ("yolo_annotations.txt", set.annotations_txt()),
        ("yolo_classes.txt", set.classes_txt()),
        (
            "yolo_dataset_info.json",
            set.dataset_info_json().unwrap_or_else(die),
        ),
        (
            "complete_layout.json",
            export::complete_layout_json(&netlist, &layout).unwrap_or_else(die),
        ),
        (
            "component_coordinates.json",
            export::coordinates_json(&layout).unwrap_or_else(die),
        ),
        ("layout_summary.txt", export::summary_txt(&layout)),
    ];
    for (name, contents) in &outputs {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", path.display());
            process::exit(1);
        });
    }

    let stats = layout.statistics();
    eprintln!(
        "Placed {} components ({}% at their ideal position)",
        stats.total_components, stats.optimal_position_rate_percentage,
    );
    if set.clamped > 0 {
        eprintln!("Warning: {} annotation boxes were clamped to the canvas", set.clamped);
    }
    eprintln!("Output: {out_dir}/ ({} files)", outputs.len());
}

fn die(e: circuitgen::LayoutError) -> String {
    eprintln!("Export error: {e}");
    process::exit(1);
}
