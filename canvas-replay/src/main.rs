//! # Canvas Replay
//!
//! Drives the interaction engine from a JSON script of synthetic pointer and
//! transcript events. Every dispatched intent is written to stdout as one
//! JSON line; logs go to stderr.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use canvas_interact::InteractionConfig;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod script;

use script::ReplayScript;

/// Command-line arguments for canvas-replay.
#[derive(Debug, Clone, Parser)]
#[command(name = "canvas-replay")]
#[command(about = "Replay scripted input through the canvas interaction engine")]
#[command(version)]
struct Args {
    /// Replay script (JSON)
    script: PathBuf,

    /// Engine configuration file (JSON); overrides the script's `config`
    #[arg(long, env = "CANVAS_REPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Record a diagnostic trace for every recognized event
    #[arg(long)]
    debug: bool,

    /// Pace events by their timestamps instead of replaying instantly
    #[arg(long)]
    realtime: bool,
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,canvas_interact=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,canvas_interact=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let script = ReplayScript::from_path(&args.script)?;

    let config = match &args.config {
        Some(path) => InteractionConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => script.config.clone().unwrap_or_default(),
    };
    config.validate().context("Invalid engine configuration")?;

    let mut manager = script.build_manager(config)?;
    if args.debug {
        manager.enable_debug();
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = script::run(&script, &mut manager, args.realtime, &mut out).await?;
    out.flush()?;

    tracing::info!(intents = written, "Replay finished");
    manager.destroy();
    Ok(())
}
