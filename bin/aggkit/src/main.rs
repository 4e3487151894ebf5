//! The aggkit node binary.

mod components;
mod config;

use clap::{Parser, Subcommand};
use components::Component;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "aggkit", version, about = "Bridges an L2 rollup to the agglayer and L1")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints the version and exits.
    Version,
    /// Runs the selected components.
    Run(RunArgs),
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Configuration files, merged in order.
    #[arg(long = "cfg", required = true, num_args = 1..)]
    cfg: Vec<PathBuf>,
    /// The components to run.
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = vec![
            Component::L1InfoTreeSync,
            Component::BridgeL1Sync,
            Component::BridgeL2Sync,
            Component::Bridge,
            Component::Aggsender,
            Component::ReorgDetectorL1,
            Component::ReorgDetectorL2,
        ]
    )]
    components: Vec<Component>,
    /// Writes the merged configuration to this directory and continues.
    #[arg(long)]
    save_config_path: Option<PathBuf>,
    /// Ignores the built-in default configuration values.
    #[arg(long)]
    disable_default_config_vars: bool,
    /// Tolerates deprecated configuration fields.
    #[arg(long)]
    allow_deprecated_fields: bool,
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Version => {
            println!("aggkit {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("tokio runtime builds");
            if let Err(err) = runtime.block_on(components::run(args)) {
                eprintln!("aggkit exited with error: {err:#}");
                std::process::exit(1);
            }
        }
    }
}
