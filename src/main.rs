//! Frontline - headless battle runner
//!
//! Loads a scenario, drives every battle hour by hour and prints either a
//! per-hour text summary or the final snapshots as JSON.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Serialize;

use frontline::battle::{BattleEvent, BattleSnapshot};
use frontline::core::config::BattleConfig;
use frontline::core::error::Result;
use frontline::scenario::{self, Scenario};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Run a battle scenario and report the outcome
#[derive(Parser, Debug)]
#[command(name = "frontline")]
#[command(about = "Hourly battle resolution over a TOML scenario")]
struct Args {
    /// Scenario file (TOML)
    scenario: PathBuf,

    /// Hours to simulate; stops early once every battle has ended
    #[arg(long, default_value_t = 72)]
    hours: u64,

    /// Random seed, overrides the config
    #[arg(long)]
    seed: Option<u64>,

    /// Engine config (TOML), overrides any `[config]` table in the scenario
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Serialize)]
struct RunReport {
    scenario: String,
    seed: u64,
    hours: u64,
    battles: Vec<BattleSnapshot>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("frontline=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let scenario = Scenario::load(&args.scenario)?;
    let mut config = match &args.config {
        Some(path) => BattleConfig::load(path)?,
        None => scenario.battle_config(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let seed = config.seed;

    let mut loaded = scenario::build(&scenario, config.clone())?;
    tracing::info!(
        scenario = %loaded.name,
        seed,
        battles = loaded.repository.len(),
        "scenario loaded"
    );

    let mut finished = Vec::new();
    let mut hour = 0;
    while hour < args.hours && !loaded.repository.is_empty() {
        hour += 1;
        let events = loaded.repository.hour_elapsed(&mut loaded.world);

        for battle in loaded.repository.drain_concluded() {
            finished.push(battle.snapshot(&loaded.world, &config));
        }
        if args.format == Format::Text {
            print_hour(hour, &events);
        }
    }

    let mut battles = finished;
    battles.extend(loaded.repository.iter().map(|b| b.snapshot(&loaded.world, &config)));
    battles.sort_by_key(|s| s.battle);

    match args.format {
        Format::Text => {
            println!();
            for snapshot in &battles {
                println!("{snapshot}");
            }
        }
        Format::Json => {
            let report = RunReport {
                scenario: loaded.name.clone(),
                seed,
                hours: hour,
                battles,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn print_hour(hour: u64, events: &[BattleEvent]) {
    for event in events {
        match event {
            BattleEvent::BattleStarted { battle, location, .. } => {
                println!("[h{hour:>3}] {battle} opens at ({}, {})", location.q, location.r)
            }
            BattleEvent::UnitAdded { battle, unit, is_attacker } => {
                let side = if *is_attacker { "attackers" } else { "defenders" };
                println!("[h{hour:>3}] {battle}: {unit} joins the {side}")
            }
            BattleEvent::UnitPromoted { battle, unit, .. } => {
                println!("[h{hour:>3}] {battle}: {unit} moves up to the front")
            }
            BattleEvent::UnitRelieved { battle, unit, .. } => {
                println!("[h{hour:>3}] {battle}: {unit} falls back to reserve")
            }
            BattleEvent::UnitRemoved { battle, unit, reason } => {
                println!("[h{hour:>3}] {battle}: {unit} leaves ({reason:?})")
            }
            BattleEvent::BattleEnded { battle, outcome, hours } => {
                println!("[h{hour:>3}] {battle} over after {hours}h: {outcome:?}")
            }
        }
    }
}
