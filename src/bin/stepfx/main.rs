//! stepfx - terminal step sequencer with a live effect graph
//!
//! Run with: cargo run --bin stepfx -- [--graph fx.json] [--bpm 128]

mod app;
mod demo;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use stepfx::{graph::FxGraph, EngineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stepfx", version, about = "Step sequencer with a modular effect graph")]
struct Args {
    /// Engine settings as TOML; missing keys use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Effect graph as JSON; the built-in demo graph is used otherwise
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Starting tempo
    #[arg(long)]
    bpm: Option<u32>,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "stepfx.log")]
    log: PathBuf,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let log_file = File::create(&args.log)
        .wrap_err_with(|| format!("failed to create log file {}", args.log.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stepfx=info")),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let mut config = match &args.config {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            EngineConfig::from_toml_str(&source)?
        }
        None => EngineConfig {
            track_count: demo::TRACKS.len(),
            ..EngineConfig::default()
        },
    };
    if let Some(bpm) = args.bpm {
        config.initial_bpm = bpm;
    }

    let graph = match &args.graph {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            FxGraph::from_json(&json)?
        }
        None => demo::fx_graph(),
    };

    tracing::info!(bpm = config.initial_bpm, nodes = graph.nodes.len(), "starting stepfx");
    app::run(config, graph)
}
