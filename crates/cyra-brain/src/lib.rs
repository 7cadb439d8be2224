//! Learned controllers for Cyra creatures: MLPs with manual backprop, Adam, and actor-critic agents.

use rand::{Rng, RngCore};

pub mod checkpoint;
pub mod network;
pub mod optim;
pub mod policy;

pub use checkpoint::{CHECKPOINT_FORMAT_VERSION, Checkpoint};
pub use network::{Gradients, Mlp, NetworkError, Trace};
pub use optim::{Adam, StepDecay};
pub use policy::{
    ACTION_SIZE, ActionDistribution, DirectionEncoding, LearnReport, PolicyAgent, PolicyConfig,
    PolicyError, discounted_returns, normalize,
};

/// Stable identifier for a brain family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrainKind(&'static str);

impl BrainKind {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

/// Shared interface implemented by every evolvable controller.
pub trait Brain {
    /// Immutable brain identifier (useful for analytics).
    fn kind(&self) -> BrainKind;

    /// Total number of trainable scalars.
    fn parameter_count(&self) -> usize;

    /// Perturb parameters: each tensor is selected with probability `rate`
    /// and receives Gaussian noise with standard deviation `scale`.
    fn mutate(&mut self, rng: &mut dyn RngCore, rate: f32, scale: f32);
}

/// Standard normal sample via Box-Muller.
pub(crate) fn gaussian(rng: &mut dyn RngCore) -> f32 {
    const TWO_PI: f32 = std::f32::consts::TAU;
    let u1 = (rng.random::<f32>()).clamp(f32::MIN_POSITIVE, 1.0);
    let u2 = rng.random::<f32>();
    (-2.0 * u1.ln()).sqrt() * (TWO_PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn gaussian_has_roughly_unit_moments() {
        let mut rng = SmallRng::seed_from_u64(5);
        let samples: Vec<f32> = (0..20_000).map(|_| gaussian(&mut rng)).collect();
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.1, "var {var}");
    }
}
