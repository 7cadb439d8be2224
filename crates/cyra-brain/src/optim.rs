//! Adam optimizer and a step learning-rate schedule.

use serde::{Deserialize, Serialize};

use crate::Brain;
use crate::network::{Gradients, Mlp};

/// Adam with bias correction, holding first/second moments for one network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    m: Vec<f32>,
    v: Vec<f32>,
    t: i32,
}

impl Adam {
    /// Fresh optimizer state sized for `network`.
    #[must_use]
    pub fn new(network: &Mlp, learning_rate: f32) -> Self {
        let n = network.parameter_count();
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            m: vec![0.0; n],
            v: vec![0.0; n],
            t: 0,
        }
    }

    #[must_use]
    pub const fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    #[must_use]
    pub const fn steps(&self) -> i32 {
        self.t
    }

    /// Descend along `grads`, updating `network` in place.
    pub fn step(&mut self, network: &mut Mlp, grads: &Gradients) {
        self.t = self.t.saturating_add(1);
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        for (((param, grad), m), v) in network
            .parameters_mut()
            .zip(grads.iter())
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * grad;
            *v = self.beta2 * *v + (1.0 - self.beta2) * grad * grad;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *param -= self.learning_rate * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

/// Multiplies the learning rate by `gamma` every `step_size` calls to [`StepDecay::tick`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StepDecay {
    step_size: u32,
    gamma: f32,
    ticks: u32,
}

impl StepDecay {
    #[must_use]
    pub const fn new(step_size: u32, gamma: f32) -> Self {
        Self {
            step_size,
            gamma,
            ticks: 0,
        }
    }

    pub fn tick(&mut self, optimizer: &mut Adam) {
        self.ticks = self.ticks.saturating_add(1);
        if self.step_size > 0 && self.ticks % self.step_size == 0 {
            optimizer.set_learning_rate(optimizer.learning_rate() * self.gamma);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn adam_reduces_a_quadratic_loss() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut net = Mlp::new(&[2, 8, 1], 0.01, &mut rng).expect("net");
        let mut adam = Adam::new(&net, 0.01);
        let input = [0.5, -0.5];
        let target = 2.0;
        let loss = |net: &Mlp| {
            let out = net.forward(&input).expect("forward")[0];
            (out - target) * (out - target)
        };
        let before = loss(&net);
        for _ in 0..300 {
            let trace = net.forward_trace(&input).expect("trace");
            let d = [2.0 * (trace.output()[0] - target)];
            let grads = net.backward(&trace, &d).expect("grads");
            adam.step(&mut net, &grads);
        }
        assert!(loss(&net) < before * 0.05);
        assert_eq!(adam.steps(), 300);
    }

    #[test]
    fn step_decay_applies_every_step_size_ticks() {
        let mut rng = SmallRng::seed_from_u64(8);
        let net = Mlp::new(&[2, 1], 0.01, &mut rng).expect("net");
        let mut adam = Adam::new(&net, 1.0);
        let mut schedule = StepDecay::new(10, 0.5);
        for _ in 0..9 {
            schedule.tick(&mut adam);
        }
        assert_eq!(adam.learning_rate(), 1.0);
        schedule.tick(&mut adam);
        assert_eq!(adam.learning_rate(), 0.5);
        for _ in 0..10 {
            schedule.tick(&mut adam);
        }
        assert_eq!(adam.learning_rate(), 0.25);
    }
}
