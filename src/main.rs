mod cli;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "circuitgen",
    about = "Schematic placement engine — netlist JSON → YOLO annotations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Place all components and write the annotation/report files.
    Generate {
        /// Path to the netlist JSON file.
        netlist: String,
        /// Output directory for the generated files.
        #[arg(short, long, default_value = "data")]
        out_dir: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Generate { netlist, out_dir } => cli::generate::run(&netlist, &out_dir),
    }
}
