//! earmark-task - Annotation session replay tool
//!
//! Loads a task configuration (TOML or JSON) plus a recorded interaction
//! script (JSON), replays the session through the annotation engine, and
//! writes the resulting submission payload. Rendering and playback stay
//! external; the replay stands in for both.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use earmark_common::config::TaskConfig;
use earmark_common::events::EventBus;
use earmark_task::replay::{self, ReplayScript};

#[derive(Parser, Debug)]
#[command(name = "earmark-task", about = "Replay an annotation session against a task config")]
struct Args {
    /// Task configuration file (.toml or .json)
    #[arg(long)]
    task: PathBuf,

    /// Recorded interaction script (.json)
    #[arg(long)]
    script: PathBuf,

    /// Where to write the submission JSON (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    info!("Starting earmark-task replay");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = TaskConfig::load(&args.task)
        .with_context(|| format!("failed to load task config {}", args.task.display()))?;

    let script_raw = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {}", args.script.display()))?;
    let script: ReplayScript = serde_json::from_str(&script_raw)
        .with_context(|| format!("failed to parse script {}", args.script.display()))?;

    let event_bus = EventBus::new(256);
    let report = replay::run(config, &script, event_bus)?;

    for error in &report.errors {
        tracing::warn!(%error, "surfaced workflow error during replay");
    }

    let json = serde_json::to_string_pretty(&report.submission)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Submission written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
