//! Actor-critic policy agent with Gaussian exploration and episodic updates.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use cyra_core::{Action, OBSERVATION_SIZE};

use crate::checkpoint::{CHECKPOINT_FORMAT_VERSION, Checkpoint};
use crate::network::{Gradients, Mlp, NetworkError};
use crate::optim::{Adam, StepDecay};
use crate::{Brain, BrainKind, gaussian};

/// Actor outputs: direction x, direction y, speed.
pub const ACTION_SIZE: usize = 3;

const NORMALIZE_EPS: f32 = 1e-8;
const LN_TWO_PI: f32 = 1.837_877_1;

/// Errors raised by policy agents.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid policy configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("observation has {actual} values, policy expects {expected}")]
    ObservationSize { expected: usize, actual: usize },
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("checkpoint topology {found:?} does not match policy topology {expected:?}")]
    Topology {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("unsupported checkpoint version {0}")]
    UnsupportedVersion(u32),
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint codec failed: {0}")]
    Codec(#[from] postcard::Error),
}

/// How the sampled direction components reach the creature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DirectionEncoding {
    /// Raw sampled components.
    #[default]
    Continuous,
    /// Each component collapsed to `+1` when positive, `-1` otherwise.
    SignBits,
}

/// Hyper-parameters for one policy agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    pub observation_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub leaky_slope: f32,
    pub gamma: f32,
    pub actor_learning_rate: f32,
    pub critic_learning_rate: f32,
    /// Learn calls between actor learning-rate decays.
    pub lr_step_size: u32,
    pub lr_step_gamma: f32,
    pub entropy_coefficient: f32,
    pub exploration_initial: f32,
    pub exploration_decay: f32,
    pub exploration_floor: f32,
    /// Upper bound on the speed handed to the creature.
    pub max_speed_request: f32,
    pub direction_encoding: DirectionEncoding,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            observation_size: OBSERVATION_SIZE,
            hidden_sizes: vec![128, 64],
            leaky_slope: 0.01,
            gamma: 0.99,
            actor_learning_rate: 1e-3,
            critic_learning_rate: 1e-3,
            lr_step_size: 10,
            lr_step_gamma: 0.95,
            entropy_coefficient: 0.01,
            exploration_initial: 1.0,
            exploration_decay: 0.995,
            exploration_floor: 0.1,
            max_speed_request: 5.0,
            direction_encoding: DirectionEncoding::Continuous,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.observation_size != OBSERVATION_SIZE {
            return Err(PolicyError::ObservationSize {
                expected: OBSERVATION_SIZE,
                actual: self.observation_size,
            });
        }
        if self.hidden_sizes.contains(&0) {
            return Err(PolicyError::InvalidConfig("hidden layers must be non-empty"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(PolicyError::InvalidConfig("gamma must be within [0, 1]"));
        }
        if !(self.exploration_floor > 0.0) || self.exploration_initial < self.exploration_floor {
            return Err(PolicyError::InvalidConfig(
                "exploration must start at or above a positive floor",
            ));
        }
        if !(0.0..=1.0).contains(&self.exploration_decay) {
            return Err(PolicyError::InvalidConfig(
                "exploration_decay must be within [0, 1]",
            ));
        }
        if self.max_speed_request < 0.0 {
            return Err(PolicyError::InvalidConfig(
                "max_speed_request must be non-negative",
            ));
        }
        Ok(())
    }

    fn layer_sizes(&self, outputs: usize) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_sizes.len() + 2);
        sizes.push(self.observation_size);
        sizes.extend_from_slice(&self.hidden_sizes);
        sizes.push(outputs);
        sizes
    }
}

/// Diagonal Gaussian over the actor outputs with a shared standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionDistribution {
    pub mean: [f32; ACTION_SIZE],
    pub std: f32,
}

impl ActionDistribution {
    pub fn sample(&self, rng: &mut dyn RngCore) -> [f32; ACTION_SIZE] {
        let mut out = self.mean;
        for value in &mut out {
            *value += gaussian(rng) * self.std;
        }
        out
    }

    /// Joint log-density of `sample`.
    #[must_use]
    pub fn log_prob(&self, sample: &[f32; ACTION_SIZE]) -> f32 {
        let log_std = self.std.ln();
        sample
            .iter()
            .zip(&self.mean)
            .map(|(x, m)| {
                let z = (x - m) / self.std;
                -0.5 * z * z - log_std - 0.5 * LN_TWO_PI
            })
            .sum()
    }

    #[must_use]
    pub fn entropy(&self) -> f32 {
        ACTION_SIZE as f32 * (0.5 + 0.5 * LN_TWO_PI + self.std.ln())
    }
}

/// Summary of one [`PolicyAgent::learn`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnReport {
    pub steps: usize,
    pub actor_loss: f32,
    pub critic_loss: f32,
    pub exploration: f32,
}

/// Actor-critic pair plus optimizer state and the current episode's trajectory.
#[derive(Debug, Clone)]
pub struct PolicyAgent {
    config: PolicyConfig,
    actor: Mlp,
    critic: Mlp,
    actor_optimizer: Adam,
    critic_optimizer: Adam,
    schedule: StepDecay,
    exploration: f32,
    observations: Vec<Vec<f32>>,
    samples: Vec<[f32; ACTION_SIZE]>,
    log_probs: Vec<f32>,
    entropies: Vec<f32>,
    values: Vec<f32>,
    rewards: Vec<f32>,
}

impl PolicyAgent {
    /// Trait identifier for this brain family.
    pub const KIND: BrainKind = BrainKind::new("policy.actor_critic");

    /// Build an agent with freshly initialized networks.
    pub fn new(config: PolicyConfig, rng: &mut dyn RngCore) -> Result<Self, PolicyError> {
        config.validate()?;
        let actor = Mlp::new(&config.layer_sizes(ACTION_SIZE), config.leaky_slope, rng)?;
        let critic = Mlp::new(&config.layer_sizes(1), config.leaky_slope, rng)?;
        Ok(Self::from_networks(config, actor, critic))
    }

    fn from_networks(config: PolicyConfig, actor: Mlp, critic: Mlp) -> Self {
        let actor_optimizer = Adam::new(&actor, config.actor_learning_rate);
        let critic_optimizer = Adam::new(&critic, config.critic_learning_rate);
        Self {
            schedule: StepDecay::new(config.lr_step_size, config.lr_step_gamma),
            exploration: config.exploration_initial,
            config,
            actor,
            critic,
            actor_optimizer,
            critic_optimizer,
            observations: Vec::new(),
            samples: Vec::new(),
            log_probs: Vec::new(),
            entropies: Vec::new(),
            values: Vec::new(),
            rewards: Vec::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &PolicyConfig {
        &self.config
    }

    #[must_use]
    pub const fn actor(&self) -> &Mlp {
        &self.actor
    }

    #[must_use]
    pub const fn critic(&self) -> &Mlp {
        &self.critic
    }

    #[must_use]
    pub const fn exploration(&self) -> f32 {
        self.exploration
    }

    #[must_use]
    pub const fn actor_optimizer(&self) -> &Adam {
        &self.actor_optimizer
    }

    #[must_use]
    pub const fn critic_optimizer(&self) -> &Adam {
        &self.critic_optimizer
    }

    #[must_use]
    pub fn actor_learning_rate(&self) -> f32 {
        self.actor_optimizer.learning_rate()
    }

    /// Steps buffered since the last learn or discard.
    #[must_use]
    pub fn trajectory_len(&self) -> usize {
        self.log_probs.len()
    }

    fn check_observation(&self, observation: &[f32]) -> Result<(), PolicyError> {
        if observation.len() == self.config.observation_size {
            Ok(())
        } else {
            Err(PolicyError::ObservationSize {
                expected: self.config.observation_size,
                actual: observation.len(),
            })
        }
    }

    /// Action distribution for `observation` at the current exploration scale.
    pub fn distribution(&self, observation: &[f32]) -> Result<ActionDistribution, PolicyError> {
        self.check_observation(observation)?;
        let output = self.actor.forward(observation)?;
        let mut mean = [0.0; ACTION_SIZE];
        mean.copy_from_slice(&output[..ACTION_SIZE]);
        Ok(ActionDistribution {
            mean,
            std: self.exploration,
        })
    }

    /// Critic estimate for `observation`.
    pub fn value(&self, observation: &[f32]) -> Result<f32, PolicyError> {
        self.check_observation(observation)?;
        Ok(self.critic.forward(observation)?[0])
    }

    /// Sample an action and append its log-probability, entropy, and value to the trajectory.
    pub fn select_action(
        &mut self,
        observation: &[f32],
        rng: &mut dyn RngCore,
    ) -> Result<Action, PolicyError> {
        let distribution = self.distribution(observation)?;
        let value = self.value(observation)?;
        let sample = distribution.sample(rng);

        self.observations.push(observation.to_vec());
        self.samples.push(sample);
        self.log_probs.push(distribution.log_prob(&sample));
        self.entropies.push(distribution.entropy());
        self.values.push(value);

        Ok(self.encode(&sample))
    }

    fn encode(&self, sample: &[f32; ACTION_SIZE]) -> Action {
        let (dx, dy) = match self.config.direction_encoding {
            DirectionEncoding::Continuous => (sample[0], sample[1]),
            DirectionEncoding::SignBits => {
                let bit = |v: f32| if v > 0.0 { 1.0 } else { -1.0 };
                (bit(sample[0]), bit(sample[1]))
            }
        };
        let speed = sample[2].abs().min(self.config.max_speed_request);
        Action::new(dx, dy, speed)
    }

    pub fn store_reward(&mut self, reward: f32) {
        self.rewards.push(reward);
    }

    /// Drop the buffered trajectory without updating the networks.
    pub fn discard_trajectory(&mut self) {
        self.observations.clear();
        self.samples.clear();
        self.log_probs.clear();
        self.entropies.clear();
        self.values.clear();
        self.rewards.clear();
    }

    /// One actor-critic update from the buffered episode, then clear it and decay exploration.
    ///
    /// Returns `Ok(None)` without touching the networks when no step has a reward.
    pub fn learn(&mut self) -> Result<Option<LearnReport>, PolicyError> {
        let n = self.log_probs.len().min(self.rewards.len());
        if n == 0 {
            self.discard_trajectory();
            return Ok(None);
        }

        let returns = discounted_returns(&self.rewards[..n], self.config.gamma);
        let raw_advantages: Vec<f32> = returns
            .iter()
            .zip(&self.values[..n])
            .map(|(r, v)| r - v)
            .collect();
        let advantages = normalize(&raw_advantages);
        let scale = 1.0 / n as f32;

        let mean_entropy = self.entropies[..n].iter().sum::<f32>() * scale;
        let actor_loss = -self.log_probs[..n]
            .iter()
            .zip(&advantages)
            .map(|(lp, a)| lp * a)
            .sum::<f32>()
            * scale
            - self.config.entropy_coefficient * mean_entropy;
        let critic_loss = raw_advantages.iter().map(|a| a * a).sum::<f32>() * scale;

        // The shared std is not learned, so the entropy term has no parameter gradient.
        let variance = self.exploration * self.exploration;
        let mut actor_grads = Gradients::zeros_like(&self.actor);
        let mut critic_grads = Gradients::zeros_like(&self.critic);
        for t in 0..n {
            let observation = &self.observations[t];

            let trace = self.actor.forward_trace(observation)?;
            let mean = trace.output();
            let d_mean: Vec<f32> = self.samples[t]
                .iter()
                .zip(mean)
                .map(|(x, m)| -advantages[t] * (x - m) / variance * scale)
                .collect();
            actor_grads.accumulate(&self.actor.backward(&trace, &d_mean)?);

            let trace = self.critic.forward_trace(observation)?;
            let d_value = [-2.0 * (returns[t] - trace.output()[0]) * scale];
            critic_grads.accumulate(&self.critic.backward(&trace, &d_value)?);
        }

        self.actor_optimizer.step(&mut self.actor, &actor_grads);
        self.critic_optimizer.step(&mut self.critic, &critic_grads);
        self.schedule.tick(&mut self.actor_optimizer);
        self.discard_trajectory();
        self.decay_exploration();

        debug!(
            steps = n,
            actor_loss,
            critic_loss,
            exploration = self.exploration,
            "policy updated"
        );
        Ok(Some(LearnReport {
            steps: n,
            actor_loss,
            critic_loss,
            exploration: self.exploration,
        }))
    }

    fn decay_exploration(&mut self) {
        self.exploration =
            (self.exploration * self.config.exploration_decay).max(self.config.exploration_floor);
    }

    /// Value copy of the networks, optimizer moments, learning-rate schedule, and
    /// exploration scale, with an empty trajectory.
    #[must_use]
    pub fn offspring(&self) -> Self {
        let mut child = self.clone();
        child.discard_trajectory();
        child
    }

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            version: CHECKPOINT_FORMAT_VERSION,
            actor: self.actor.clone(),
            critic: self.critic.clone(),
        }
    }

    /// Replace both networks with the checkpoint's, resetting optimizer state.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<(), PolicyError> {
        if checkpoint.version != CHECKPOINT_FORMAT_VERSION {
            return Err(PolicyError::UnsupportedVersion(checkpoint.version));
        }
        checkpoint.actor.validate()?;
        checkpoint.critic.validate()?;
        for (current, incoming) in [
            (&self.actor, &checkpoint.actor),
            (&self.critic, &checkpoint.critic),
        ] {
            if current.topology() != incoming.topology() {
                return Err(PolicyError::Topology {
                    expected: current.topology(),
                    found: incoming.topology(),
                });
            }
        }
        let exploration = self.exploration;
        *self = Self::from_networks(self.config.clone(), checkpoint.actor, checkpoint.critic);
        self.exploration = exploration;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PolicyError> {
        self.checkpoint().save(path)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), PolicyError> {
        let checkpoint = Checkpoint::load(path)?;
        self.restore(checkpoint)
    }

    /// Load `path` when it exists; a missing file means "no checkpoint yet".
    pub fn load_if_exists(&mut self, path: impl AsRef<Path>) -> Result<bool, PolicyError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no checkpoint found; starting from fresh parameters");
            return Ok(false);
        }
        self.load(path)?;
        info!(path = %path.display(), "checkpoint loaded");
        Ok(true)
    }
}

impl Brain for PolicyAgent {
    fn kind(&self) -> BrainKind {
        Self::KIND
    }

    fn parameter_count(&self) -> usize {
        self.actor.parameter_count() + self.critic.parameter_count()
    }

    fn mutate(&mut self, rng: &mut dyn RngCore, rate: f32, scale: f32) {
        self.actor.mutate(rng, rate, scale);
        self.critic.mutate(rng, rate, scale);
    }
}

/// Backward recursion `R_t = r_t + gamma * R_{t+1}`.
#[must_use]
pub fn discounted_returns(rewards: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut running = 0.0;
    for (slot, reward) in returns.iter_mut().zip(rewards).rev() {
        running = reward + gamma * running;
        *slot = running;
    }
    returns
}

/// Shift to zero mean and scale by `1 / (std + 1e-8)`; fewer than two values yield zeros.
#[must_use]
pub fn normalize(values: &[f32]) -> Vec<f32> {
    if values.len() < 2 {
        return vec![0.0; values.len()];
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let denom = variance.sqrt() + NORMALIZE_EPS;
    values.iter().map(|v| (v - mean) / denom).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn small_config() -> PolicyConfig {
        PolicyConfig {
            hidden_sizes: vec![16],
            ..PolicyConfig::default()
        }
    }

    fn observation(seed: f32) -> Vec<f32> {
        (0..OBSERVATION_SIZE)
            .map(|i| ((i as f32 + seed) * 0.37).sin())
            .collect()
    }

    #[test]
    fn discounted_returns_follow_backward_recursion() {
        let returns = discounted_returns(&[1.0, 0.0, 2.0], 0.5);
        assert_eq!(returns, vec![1.5, 1.0, 2.0]);
        assert!(discounted_returns(&[], 0.9).is_empty());
    }

    #[test]
    fn normalize_centers_and_scales() {
        let out = normalize(&[1.0, 2.0, 3.0, 10.0]);
        let mean = out.iter().sum::<f32>() / out.len() as f32;
        let var = out.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / out.len() as f32;
        assert!(mean.abs() < 1e-5);
        assert!((var.sqrt() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn normalize_handles_degenerate_inputs() {
        assert_eq!(normalize(&[4.2]), vec![0.0]);
        assert!(normalize(&[]).is_empty());
        let flat = normalize(&[3.0, 3.0, 3.0]);
        assert!(flat.iter().all(|v| v.is_finite() && *v == 0.0));
    }

    #[test]
    fn rejects_mismatched_observation_size() {
        let mut rng = SmallRng::seed_from_u64(1);
        let config = PolicyConfig {
            observation_size: OBSERVATION_SIZE + 1,
            ..small_config()
        };
        assert!(matches!(
            PolicyAgent::new(config, &mut rng),
            Err(PolicyError::ObservationSize { .. })
        ));
        let mut agent = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        assert!(matches!(
            agent.select_action(&[0.0; 4], &mut rng),
            Err(PolicyError::ObservationSize {
                expected: OBSERVATION_SIZE,
                actual: 4
            })
        ));
        assert_eq!(agent.trajectory_len(), 0);
    }

    #[test]
    fn select_action_grows_trajectory_and_clamps_speed() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut agent = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        for step in 0..20 {
            let action = agent
                .select_action(&observation(step as f32), &mut rng)
                .expect("action");
            assert!((0.0..=5.0).contains(&action.speed));
        }
        assert_eq!(agent.trajectory_len(), 20);
    }

    #[test]
    fn sign_bit_encoding_emits_unit_components() {
        let mut rng = SmallRng::seed_from_u64(3);
        let config = PolicyConfig {
            direction_encoding: DirectionEncoding::SignBits,
            ..small_config()
        };
        let mut agent = PolicyAgent::new(config, &mut rng).expect("agent");
        let action = agent.select_action(&observation(1.0), &mut rng).expect("action");
        assert_eq!(action.direction.x.abs(), 1.0);
        assert_eq!(action.direction.y.abs(), 1.0);
    }

    #[test]
    fn learn_on_empty_trajectory_is_a_no_op() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut agent = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        let before = agent.actor().clone();
        assert_eq!(agent.learn().expect("learn"), None);
        assert_eq!(agent.actor(), &before);
        assert_eq!(agent.exploration(), 1.0);
    }

    #[test]
    fn learn_updates_networks_and_clears_buffers() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut agent = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        let actor_before = agent.actor().clone();
        let critic_before = agent.critic().clone();
        for step in 0..12 {
            agent
                .select_action(&observation(step as f32), &mut rng)
                .expect("action");
            agent.store_reward(step as f32 * 0.1 - 0.5);
        }
        let report = agent.learn().expect("learn").expect("report");
        assert_eq!(report.steps, 12);
        assert!(report.actor_loss.is_finite() && report.critic_loss.is_finite());
        assert_eq!(agent.trajectory_len(), 0);
        assert_ne!(agent.actor(), &actor_before);
        assert_ne!(agent.critic(), &critic_before);
        assert!((agent.exploration() - 0.995).abs() < 1e-6);
    }

    #[test]
    fn single_step_episode_learns_without_nan() {
        let mut rng = SmallRng::seed_from_u64(6);
        let mut agent = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        agent.select_action(&observation(0.0), &mut rng).expect("action");
        agent.store_reward(1.0);
        agent.learn().expect("learn").expect("report");
        assert!(agent.actor().parameters().all(f32::is_finite));
        assert!(agent.critic().parameters().all(f32::is_finite));
    }

    #[test]
    fn exploration_decays_to_floor() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut agent = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        for _ in 0..1_000 {
            agent.select_action(&observation(0.5), &mut rng).expect("action");
            agent.store_reward(0.0);
            agent.learn().expect("learn");
        }
        assert_eq!(agent.exploration(), 0.1);
    }

    #[test]
    fn actor_learning_rate_steps_down() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut agent = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        for _ in 0..10 {
            agent.select_action(&observation(0.0), &mut rng).expect("action");
            agent.store_reward(1.0);
            agent.learn().expect("learn");
        }
        assert!((agent.actor_learning_rate() - 0.00095).abs() < 1e-9);
    }

    #[test]
    fn offspring_copies_parameters_by_value() {
        let mut rng = SmallRng::seed_from_u64(9);
        let elite = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        let mut child = elite.offspring();
        assert_eq!(child.actor(), elite.actor());
        child.mutate(&mut rng, 1.0, 0.02);
        assert_ne!(child.actor(), elite.actor());
        assert_eq!(child.trajectory_len(), 0);
    }

    #[test]
    fn offspring_inherits_optimizer_and_schedule() {
        let mut rng = SmallRng::seed_from_u64(10);
        let mut elite = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        for _ in 0..10 {
            elite.select_action(&observation(0.0), &mut rng).expect("action");
            elite.store_reward(1.0);
            elite.learn().expect("learn");
        }
        elite.select_action(&observation(1.0), &mut rng).expect("action");

        let mut child = elite.offspring();
        assert_eq!(child.actor_learning_rate(), elite.actor_learning_rate());
        assert!((child.actor_learning_rate() - 0.00095).abs() < 1e-9);
        assert_eq!(child.actor_optimizer(), elite.actor_optimizer());
        assert_eq!(child.critic_optimizer(), elite.critic_optimizer());
        assert_eq!(child.actor_optimizer().steps(), 10);
        assert_eq!(child.exploration(), elite.exploration());
        assert_eq!(child.trajectory_len(), 0);
        assert_eq!(elite.trajectory_len(), 1);

        for _ in 0..10 {
            child.select_action(&observation(0.0), &mut rng).expect("action");
            child.store_reward(1.0);
            child.learn().expect("learn");
        }
        assert!((child.actor_learning_rate() - 0.00095 * 0.95).abs() < 1e-9);
    }

    #[test]
    fn restore_rejects_inconsistent_checkpoint_and_keeps_acting() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut agent = PolicyAgent::new(small_config(), &mut rng).expect("agent");
        let before = agent.actor().clone();
        let mut checkpoint = agent.checkpoint();
        checkpoint.actor.truncate_weights(0, 10);
        assert!(matches!(
            agent.restore(checkpoint),
            Err(PolicyError::Network(NetworkError::InvalidTopology))
        ));
        assert_eq!(agent.actor(), &before);
        agent.select_action(&observation(0.0), &mut rng).expect("action");
    }

    #[test]
    fn gaussian_log_prob_and_entropy() {
        let dist = ActionDistribution {
            mean: [0.0; ACTION_SIZE],
            std: 1.0,
        };
        let lp = dist.log_prob(&[0.0; ACTION_SIZE]);
        assert!((lp - (-1.5 * LN_TWO_PI)).abs() < 1e-5);
        assert!((dist.entropy() - 3.0 * (0.5 + 0.5 * LN_TWO_PI)).abs() < 1e-5);
    }
}
