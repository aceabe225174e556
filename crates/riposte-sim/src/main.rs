//! # Riposte Sim
//!
//! Runs one scripted skirmish and prints its report.

#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use clap::Parser;
use riposte_combat::Genre;
use riposte_sim::{SimConfig, Skirmish, CONFIG_FILE};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Headless combat skirmish runner
#[derive(Parser, Debug)]
#[command(name = "riposte-sim", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    init: bool,

    /// Genre override (fantasy, sci-fi, horror, cyberpunk, post-apocalyptic)
    #[arg(long)]
    genre: Option<String>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let directive = if args.verbose {
        "riposte=debug"
    } else {
        "riposte=info"
    };
    tracing_subscriber::registry()
        .with((!args.json_logs).then(fmt::layer))
        .with(args.json_logs.then(|| fmt::layer().json()))
        .with(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    info!("Riposte sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if args.init {
        SimConfig::default().save_to(&args.config)?;
        return Ok(());
    }

    let mut config = SimConfig::load_from(&args.config);
    config.validate();
    if let Some(genre) = args.genre {
        config.combat.genre = Genre::from_id(&genre).id().to_string();
    }
    if args.seed.is_some() {
        config.combat.rng_seed = args.seed;
    }

    let report = Skirmish::new(&config)?.run()?;

    if args.json || config.json_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{:?} after {:.1}s: {} kills, {:.0} dealt, {:.0} taken, {} negated, best combo {}",
            report.outcome,
            report.sim_seconds,
            report.kills,
            report.damage_dealt,
            report.damage_taken,
            report.negated,
            report.best_combo,
        );
    }
    Ok(())
}
