//! Replays a command log into a fresh graph.
//!
//! Usage:
//!   refgraph-replay --schema schema.json --log commands.jsonl --status status.json
//!
//! The graph lives in memory only; pass `--output` to dump every entity.

use anyhow::{Context, Result};
use clap::Parser;
use refgraph_engine::{EngineConfig, PatchEngine};
use refgraph_model::SchemaCatalog;
use refgraph_replay::{CommandLog, Replayer};
use refgraph_storage::{EntityGraph, ViewOptions};
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "refgraph-replay")]
#[command(about = "Replay a refgraph command log")]
struct Args {
    /// Schema catalog (JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Command log (JSON lines)
    #[arg(short, long)]
    log: PathBuf,

    /// Where to write the status of every command
    #[arg(long, default_value = "status.json")]
    status: PathBuf,

    /// Engine configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write all entity views after replay
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include reverse links and roots in the output
    #[arg(long)]
    internals: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let schema_json = fs::read_to_string(&args.schema)
        .with_context(|| format!("reading schema {}", args.schema.display()))?;
    let schema = SchemaCatalog::from_json(&schema_json).context("parsing schema")?;

    let config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            EngineConfig::from_json(&json).context("parsing config")?
        }
        None => EngineConfig::default(),
    };

    let log = CommandLog::load(&args.log)
        .with_context(|| format!("loading command log {}", args.log.display()))?;
    info!("Loaded {} commands from {}", log.len(), args.log.display());

    let mut graph = EntityGraph::new();
    let mut replayer = Replayer::new(PatchEngine::new(schema, config));
    let summary = replayer.replay(&mut graph, log.commands());

    replayer
        .status()
        .save(&args.status)
        .with_context(|| format!("writing status {}", args.status.display()))?;

    if let Some(path) = &args.output {
        let options = if args.internals {
            ViewOptions::everything()
        } else {
            ViewOptions::default()
        };
        let json = serde_json::to_string_pretty(&graph.view_all(options))?;
        fs::write(path, json).with_context(|| format!("writing output {}", path.display()))?;
    }

    println!("\n========================================");
    println!("  refgraph replay");
    println!("========================================");
    println!("  Commands:  {}", log.len());
    println!("  Applied:   {}", summary.applied);
    println!("  Failed:    {}", summary.failed);
    println!("  Entities:  {}", graph.len());
    println!("========================================\n");
    Ok(())
}
