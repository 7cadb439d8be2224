use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cyra_app::{Trainer, TrainingConfig};
use cyra_core::TrainingLedger;
use cyra_storage::Storage;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "cyra-train",
    version,
    about = "Evolve and train a population of Cyra creatures"
)]
struct Cli {
    /// JSON training configuration; missing fields use defaults.
    #[arg(short, long, env = "CYRA_CONFIG")]
    config: Option<PathBuf>,

    /// Number of generations to run (overrides the config file).
    #[arg(short, long)]
    generations: Option<u32>,

    /// Number of creatures and agents.
    #[arg(long)]
    population: Option<usize>,

    /// Seed for agents, sampling, mutation, and the arena.
    #[arg(long)]
    seed: Option<u64>,

    /// DuckDB ledger path.
    #[arg(long, env = "CYRA_DATABASE")]
    database: Option<PathBuf>,

    /// Keep run history in memory only.
    #[arg(long, conflicts_with = "database")]
    no_database: bool,

    /// Where the best model is written.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Resume a recorded training age.
    #[arg(long)]
    resume: Option<i64>,

    /// Use the configured reward magnitudes instead of drawing new ones.
    #[arg(long)]
    fixed_rewards: bool,

    /// Write the final arena draw state as JSON.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let generations = config.generations;

    let ledger = open_ledger(&config)?;
    let mut trainer = Trainer::new(config, ledger).context("failed to set up training")?;
    info!(
        age = ?trainer.age(),
        generation = trainer.generation(),
        generations,
        "Starting Cyra training"
    );

    let report = trainer.run(generations).context("training failed")?;
    info!(
        completed = report.generations_completed,
        next_generation = report.next_generation,
        best_reward = report.best_reward,
        interrupted = report.interrupted,
        "Training finished"
    );

    if let Some(path) = cli.snapshot.as_ref() {
        let json = serde_json::to_string_pretty(&trainer.draw_state())
            .context("failed to encode draw state")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn build_config(cli: &Cli) -> Result<TrainingConfig> {
    let mut config = match cli.config.as_ref() {
        Some(path) => TrainingConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    if let Some(generations) = cli.generations {
        config.generations = generations;
    }
    if let Some(population) = cli.population {
        config.population_size = population;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
        config.world.rng_seed = Some(seed);
    }
    if let Some(database) = cli.database.clone() {
        config.ledger_path = Some(database);
    }
    if cli.no_database {
        config.ledger_path = None;
    }
    if let Some(checkpoint) = cli.checkpoint.clone() {
        config.checkpoint_path = checkpoint;
    }
    if cli.resume.is_some() {
        config.resume_age = cli.resume;
    }
    if cli.fixed_rewards {
        config.randomize_rewards = false;
    }
    Ok(config)
}

fn open_ledger(config: &TrainingConfig) -> Result<Option<Box<dyn TrainingLedger>>> {
    let Some(path) = config.ledger_path.as_ref() else {
        warn!("No ledger configured; run history will not be persisted");
        return Ok(None);
    };
    let path_str = path
        .to_str()
        .with_context(|| format!("ledger path {} is not valid UTF-8", path.display()))?;
    let storage = Storage::open(path_str)
        .with_context(|| format!("failed to open ledger at {}", path.display()))?;
    Ok(Some(Box::new(storage)))
}
