//! Boss encounter simulator.
//!
//! Replays a scenario file through the engine and prints one report per
//! concluded encounter, as JSON or as a short text summary.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use boss_engine::EngineConfig;
use clap::Parser;
use tracing::info;

use crate::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(
    name = "boss-sim",
    version,
    about = "Replay boss encounters and print their reward reports"
)]
struct Args {
    /// Scenario file (JSON)
    #[arg(long)]
    scenario: PathBuf,

    /// Engine config file (TOML or JSON). Defaults to the per-user config if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json"). Overrides the config file.
    #[arg(long)]
    log_format: Option<String>,

    /// Print a text summary instead of JSON
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = EngineConfig::load(args.config.as_deref()).context("loading engine config")?;
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.log_format = format;
    }
    config.validate()?;

    init_logging(&config.log_level, &config.log_format);
    info!("boss-sim v{}", env!("CARGO_PKG_VERSION"));

    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.scenario.display()))?;

    let replay = scenario::replay(&scenario, config)?;
    if args.summary {
        print!("{}", replay.summary());
    } else {
        println!("{}", serde_json::to_string_pretty(&replay)?);
    }
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so stdout carries only the report. Pass
/// `format = "json"` for structured output; anything else is text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
