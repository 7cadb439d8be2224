//! Training-run configuration: world, policy, and evolutionary knobs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use cyra_brain::PolicyConfig;
use cyra_core::WorldConfig;

use crate::trainer::TrainerError;

/// Everything needed to start or resume a training run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub world: WorldConfig,
    pub policy: PolicyConfig,
    /// Number of policy agents; also the number of creatures in the arena.
    pub population_size: usize,
    /// Generations to run before stopping.
    pub generations: u32,
    /// Episodes each agent plays before selection.
    pub episodes_per_generation: u32,
    /// Probability that a parameter tensor of a clone is perturbed.
    pub mutation_rate: f32,
    /// Standard deviation of the Gaussian perturbation.
    pub mutation_std: f32,
    /// Draw reward magnitudes uniformly from `[0, 1)` when a new run starts.
    pub randomize_rewards: bool,
    /// Where the best model so far is written.
    pub checkpoint_path: PathBuf,
    /// DuckDB ledger; `None` keeps run history in memory only.
    pub ledger_path: Option<PathBuf>,
    /// Resume this training age instead of starting a new one.
    pub resume_age: Option<i64>,
    /// Seed for agent initialization, sampling, and mutation.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            policy: PolicyConfig::default(),
            population_size: 5,
            generations: 100,
            episodes_per_generation: 1,
            mutation_rate: 0.05,
            mutation_std: 0.02,
            randomize_rewards: true,
            checkpoint_path: PathBuf::from("models/best_model.ckpt"),
            ledger_path: Some(PathBuf::from("cyra.duckdb")),
            resume_age: None,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Parse a JSON config file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TrainerError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.population_size == 0 {
            return Err(TrainerError::Config("population_size must be non-zero"));
        }
        if self.episodes_per_generation == 0 {
            return Err(TrainerError::Config(
                "episodes_per_generation must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(TrainerError::Config("mutation_rate must be within [0, 1]"));
        }
        if !(self.mutation_std >= 0.0) {
            return Err(TrainerError::Config("mutation_std must be non-negative"));
        }
        self.world_config().validate()?;
        self.policy.validate()?;
        Ok(())
    }

    /// World configuration with one creature per agent.
    #[must_use]
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            creature_count: self.population_size,
            ..self.world.clone()
        }
    }
}
