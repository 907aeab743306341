//! Bandscore operator CLI.
//!
//! ## Commands
//!
//! - `score`: grade a scoring request JSON from a file or stdin
//! - `health`: probe each configured judgment backend
//! - `weights`: print a section's rubric weights

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use bandscore_core::{
    init_tracing, EngineConfig, ScoreError, ScoreOrchestrator, ScoringRequest, Section,
};

#[derive(Parser)]
#[command(name = "bandscore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scoring engine for standardized language test practice", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a scoring request and print the canonical result
    Score {
        /// Path to the request JSON (stdin when omitted)
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Skip judgment backends; deterministic/heuristic paths only
        #[arg(long)]
        offline: bool,

        /// Per-call provider timeout in milliseconds
        #[arg(long, env = "BANDSCORE_AI_TIMEOUT_MS")]
        timeout_ms: Option<u64>,
    },

    /// Probe each configured judgment backend
    Health,

    /// Print a section's rubric weights
    Weights {
        /// Section name: speaking, writing, reading, or listening
        section: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<ScoreError>().is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Score {
            request,
            offline,
            timeout_ms,
        } => score(request, offline, timeout_ms).await,
        Commands::Health => health().await,
        Commands::Weights { section } => weights(&section),
    }
}

async fn score(path: Option<PathBuf>, offline: bool, timeout_ms: Option<u64>) -> Result<()> {
    let raw = match &path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read request from stdin")?;
            buffer
        }
    };

    let request: ScoringRequest =
        serde_json::from_str(&raw).context("request is not valid scoring-request JSON")?;

    let mut config = EngineConfig::from_env();
    if let Some(timeout_ms) = timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    if offline {
        config.providers.clear();
    }

    let orchestrator = ScoreOrchestrator::from_config(config);
    let result = orchestrator.score(&request).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn health() -> Result<()> {
    let orchestrator = ScoreOrchestrator::from_config(EngineConfig::from_env());

    for provider in orchestrator.providers() {
        let status = provider.health().await;
        if status.ok {
            println!(
                "{:<12} ok      model={} latency={}ms",
                provider.kind(),
                status.model.unwrap_or_default(),
                status.latency_ms.unwrap_or_default(),
            );
        } else {
            println!(
                "{:<12} failed  {}",
                provider.kind(),
                status.error.unwrap_or_default(),
            );
        }
    }
    Ok(())
}

fn weights(section: &str) -> Result<()> {
    let section: Section = section
        .parse()
        .map_err(|err: String| anyhow::anyhow!(err))?;

    let weights = bandscore_core::default_weights(section);
    for (dimension, weight) in &weights {
        println!("{dimension:<15} {weight:.2}");
    }
    Ok(())
}
