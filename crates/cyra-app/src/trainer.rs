//! Generation loop: episodes, episodic learning, elite selection, checkpointing, and ledger rows.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

use cyra_brain::PolicyError;
use cyra_core::{
    Action, DrawState, Environment, GenerationRecord, LedgerError, RewardConfig, TrainingLedger,
    WorldError,
};

use crate::config::TrainingConfig;
use crate::population::{Population, select_elite};

/// Errors raised while setting up or driving training.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("invalid training configuration: {0}")]
    Config(&'static str),
    #[error("world error: {0}")]
    World(#[from] WorldError),
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("training age {0} has no recorded run")]
    UnknownAge(i64),
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared "continue training" flag, polled once per tick.
#[derive(Debug, Clone)]
pub struct TrainingControl {
    running: Arc<AtomicBool>,
}

impl Default for TrainingControl {
    fn default() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl TrainingControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the trainer to stop at the next tick; the in-flight episode is discarded.
    pub fn pause(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Result of one completed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub generation: u32,
    pub cumulative_rewards: Vec<f32>,
    pub elite: usize,
    /// Elite's cumulative reward this generation.
    pub elite_reward: f32,
    /// Best cumulative reward ever seen in this run.
    pub best_reward: f32,
    /// Whether this generation produced a new best model.
    pub improved: bool,
    pub steps: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Completed(GenerationSummary),
    /// The control flag dropped mid-episode; no learning or selection happened.
    Interrupted { generation: u32 },
}

/// Summary of a call to [`Trainer::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub age: Option<i64>,
    pub generations_completed: u32,
    pub next_generation: u32,
    pub best_reward: f32,
    pub interrupted: bool,
}

/// Owns the arena, the population, and the run bookkeeping.
pub struct Trainer {
    config: TrainingConfig,
    env: Environment,
    population: Population,
    ledger: Option<Box<dyn TrainingLedger>>,
    control: TrainingControl,
    rng: SmallRng,
    age: Option<i64>,
    generation: u32,
    best_reward: f32,
}

impl Trainer {
    /// Validate `config`, register or resume a run in `ledger`, and build the population.
    pub fn new(
        config: TrainingConfig,
        mut ledger: Option<Box<dyn TrainingLedger>>,
    ) -> Result<Self, TrainerError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        };

        let mut generation = 0;
        let mut best_reward = f32::NEG_INFINITY;
        let (age, rewards) = match (config.resume_age, ledger.as_deref_mut()) {
            (Some(age), Some(ledger)) => {
                let rewards = ledger
                    .reward_config(age)?
                    .ok_or(TrainerError::UnknownAge(age))?;
                if let Some(last) = ledger.last_record(age)? {
                    generation = last.generation + 1;
                    best_reward = last.best_reward;
                }
                info!(age, generation, best_reward, "resuming training age");
                (Some(age), rewards)
            }
            (Some(_), None) => {
                return Err(TrainerError::Config("resuming an age requires a ledger"));
            }
            (None, ledger) => {
                let rewards = if config.randomize_rewards {
                    RewardConfig::randomized(&mut rng)
                } else {
                    config.world.rewards.clone()
                };
                let age = ledger.and_then(|ledger| match ledger.begin_run(&rewards) {
                    Ok(age) => Some(age),
                    Err(err) => {
                        warn!(%err, "failed to register training run; continuing without ledger age");
                        None
                    }
                });
                (age, rewards)
            }
        };

        let mut world = config.world_config();
        world.rewards = rewards;
        if world.rng_seed.is_none() {
            world.rng_seed = Some(rng.next_u64());
        }
        let env = Environment::new(world)?;

        let mut population = Population::new(config.population_size, &config.policy, &mut rng)?;
        if config.resume_age.is_some() {
            for agent in population.agents_mut() {
                agent.load_if_exists(&config.checkpoint_path)?;
            }
        }

        Ok(Self {
            config,
            env,
            population,
            ledger,
            control: TrainingControl::new(),
            rng,
            age,
            generation,
            best_reward,
        })
    }

    #[must_use]
    pub fn control(&self) -> TrainingControl {
        self.control.clone()
    }

    #[must_use]
    pub const fn age(&self) -> Option<i64> {
        self.age
    }

    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    #[must_use]
    pub const fn best_reward(&self) -> f32 {
        self.best_reward
    }

    #[must_use]
    pub const fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    #[must_use]
    pub fn draw_state(&self) -> DrawState {
        self.env.draw_state()
    }

    /// Play one generation: episodes, learning, selection, persistence, repopulation.
    pub fn run_generation(&mut self) -> Result<GenerationOutcome, TrainerError> {
        let generation = self.generation;
        info!(generation, agents = self.population.len(), "generation started");
        let mut totals = vec![0.0_f32; self.population.len()];
        let mut steps = 0;

        for _ in 0..self.config.episodes_per_generation {
            let mut observations = self.env.reset();
            loop {
                if !self.control.should_continue() {
                    self.population.discard_trajectories();
                    info!(generation, steps, "training paused; episode discarded");
                    return Ok(GenerationOutcome::Interrupted { generation });
                }
                let actions = self
                    .population
                    .agents_mut()
                    .iter_mut()
                    .zip(&observations)
                    .map(|(agent, observation)| agent.select_action(observation, &mut self.rng))
                    .collect::<Result<Vec<Action>, _>>()?;
                let outcome = self.env.step(&actions)?;
                for ((agent, total), reward) in self
                    .population
                    .agents_mut()
                    .iter_mut()
                    .zip(totals.iter_mut())
                    .zip(&outcome.rewards)
                {
                    agent.store_reward(*reward);
                    *total += reward;
                }
                steps += 1;
                observations = outcome.observations;
                if outcome.done {
                    debug!(generation, steps, truncated = outcome.truncated, "episode finished");
                    break;
                }
            }
            self.population.learn_all()?;
        }

        let Some(elite) = select_elite(&totals) else {
            return Err(TrainerError::Config("population produced no finite reward"));
        };
        let elite_reward = totals[elite];
        let improved = elite_reward > self.best_reward;
        if improved {
            self.best_reward = elite_reward;
            info!(generation, elite, reward = elite_reward, "new best model");
            if let Err(err) = self.population.agents()[elite].save(&self.config.checkpoint_path) {
                warn!(%err, path = %self.config.checkpoint_path.display(), "failed to save best model");
            }
        }

        if let (Some(age), Some(ledger)) = (self.age, self.ledger.as_deref_mut()) {
            let record = GenerationRecord {
                age,
                generation,
                best_reward: self.best_reward,
            };
            if let Err(err) = ledger.record_generation(&record) {
                warn!(%err, age, generation, "failed to record generation");
            }
        }

        self.population.repopulate(
            elite,
            self.config.mutation_rate,
            self.config.mutation_std,
            &mut self.rng,
        );
        self.generation += 1;
        info!(
            generation,
            elite,
            elite_reward,
            best_reward = self.best_reward,
            "generation finished"
        );

        Ok(GenerationOutcome::Completed(GenerationSummary {
            generation,
            cumulative_rewards: totals,
            elite,
            elite_reward,
            best_reward: self.best_reward,
            improved,
            steps,
        }))
    }

    /// Run up to `generations` generations, stopping early if paused.
    pub fn run(&mut self, generations: u32) -> Result<TrainingReport, TrainerError> {
        let mut completed = 0;
        let mut interrupted = false;
        while completed < generations {
            match self.run_generation()? {
                GenerationOutcome::Completed(_) => completed += 1,
                GenerationOutcome::Interrupted { .. } => {
                    interrupted = true;
                    break;
                }
            }
        }
        Ok(TrainingReport {
            age: self.age,
            generations_completed: completed,
            next_generation: self.generation,
            best_reward: self.best_reward,
            interrupted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyra_brain::PolicyConfig;
    use cyra_core::{MemoryLedger, WorldConfig};
    use tempfile::tempdir;

    fn quick_config(dir: &std::path::Path) -> TrainingConfig {
        TrainingConfig {
            world: WorldConfig {
                max_steps: 20,
                rng_seed: Some(3),
                ..WorldConfig::default()
            },
            policy: PolicyConfig {
                hidden_sizes: vec![8],
                ..PolicyConfig::default()
            },
            population_size: 3,
            generations: 2,
            checkpoint_path: dir.join("best.ckpt"),
            ledger_path: None,
            seed: Some(12),
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn generation_saves_best_model_and_advances() {
        let dir = tempdir().expect("tempdir");
        let config = quick_config(dir.path());
        let mut trainer = Trainer::new(config, Some(Box::new(MemoryLedger::new()))).expect("trainer");
        assert_eq!(trainer.age(), Some(1));

        let GenerationOutcome::Completed(summary) = trainer.run_generation().expect("generation")
        else {
            panic!("generation should complete");
        };
        assert_eq!(summary.generation, 0);
        assert_eq!(summary.steps, 20);
        assert!(summary.improved);
        assert_eq!(summary.best_reward, summary.elite_reward);
        assert_eq!(
            select_elite(&summary.cumulative_rewards),
            Some(summary.elite)
        );
        assert!(dir.path().join("best.ckpt").exists());
        assert_eq!(trainer.generation(), 1);
    }

    #[test]
    fn paused_control_discards_the_episode() {
        let dir = tempdir().expect("tempdir");
        let mut trainer = Trainer::new(quick_config(dir.path()), None).expect("trainer");
        let control = trainer.control();
        control.pause();
        assert_eq!(
            trainer.run_generation().expect("generation"),
            GenerationOutcome::Interrupted { generation: 0 }
        );
        assert_eq!(trainer.generation(), 0);
        assert!(
            trainer
                .population()
                .agents()
                .iter()
                .all(|agent| agent.trajectory_len() == 0)
        );
        control.resume();
        assert!(matches!(
            trainer.run_generation().expect("generation"),
            GenerationOutcome::Completed(_)
        ));
    }

    #[test]
    fn resume_requires_a_ledger() {
        let dir = tempdir().expect("tempdir");
        let config = TrainingConfig {
            resume_age: Some(1),
            ..quick_config(dir.path())
        };
        assert!(matches!(
            Trainer::new(config, None),
            Err(TrainerError::Config(_))
        ));
    }
}
