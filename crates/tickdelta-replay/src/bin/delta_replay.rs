//! Replay a recorded mutation log and print the closed deltas.
//!
//! ```text
//! delta-replay session.json --verify
//! RUST_LOG=tickdelta_state=trace delta-replay session.json --pretty
//! ```
//!
//! Deltas are written to stdout, one JSON document per closed tick. Logs go
//! to stderr.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tickdelta_replay::replay::{replay, MutationLog};
use tickdelta_state::config::PipelineConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "delta-replay", about = "Replay a tick mutation log into deltas")]
struct Cli {
    /// Mutation log (JSON)
    log: PathBuf,

    /// Pipeline config (JSON) overriding the one stored in the log
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Exit with an error if any checkpoint hash does not match
    #[arg(long)]
    verify: bool,

    /// Pretty-print each delta
    #[arg(long)]
    pretty: bool,

    /// Enable debug logging when RUST_LOG is not set
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut log = MutationLog::load(&cli.log)
        .with_context(|| format!("loading mutation log {}", cli.log.display()))?;

    if let Some(path) = &cli.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        log.config = PipelineConfig::from_json_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
    }

    let outcome = replay(&log).context("replaying mutation log")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for delta in &outcome.deltas {
        let json = if cli.pretty {
            delta.to_json_pretty()?
        } else {
            delta.to_json()?
        };
        writeln!(out, "{json}").context("writing delta to stdout")?;
    }

    tracing::info!(
        ticks = outcome.ticks_replayed,
        deltas = outcome.deltas.len(),
        completed = outcome.completed,
        "replay finished"
    );

    if let Some(divergence) = &outcome.first_divergence {
        if cli.verify {
            bail!(
                "delta {} (tick index {}) diverged: expected {}, got {}",
                divergence.sequence,
                divergence.tick_index,
                divergence.expected_hash,
                divergence.actual_hash.as_deref().unwrap_or("<dropped>")
            );
        }
        tracing::warn!(
            tick_index = divergence.tick_index,
            "replay diverged; rerun with --verify to fail on divergence"
        );
    }

    Ok(())
}
