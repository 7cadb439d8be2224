//! Fully connected network with leaky-ReLU hidden layers and a linear head.
//!
//! Forward passes can record a [`Trace`] so [`Mlp::backward`] can compute
//! parameter gradients for a given output gradient without an autograd framework.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Brain, BrainKind, gaussian};

/// Errors raised by network construction and evaluation.
#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("network needs at least an input and an output layer, all non-empty")]
    InvalidTopology,
    #[error("expected {expected} inputs, got {actual}")]
    InputSize { expected: usize, actual: usize },
    #[error("expected {expected} output gradients, got {actual}")]
    OutputGradientSize { expected: usize, actual: usize },
}

/// Dense layer; `weights[o * inputs + i]` connects input `i` to output `o`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layer {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Layer {
    /// Kaiming-normal weights for a leaky-ReLU successor, zero biases.
    fn kaiming(inputs: usize, outputs: usize, slope: f32, rng: &mut dyn RngCore) -> Self {
        let gain = (2.0 / (1.0 + slope * slope)).sqrt();
        let std = gain / (inputs as f32).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| gaussian(rng) * std)
            .collect();
        Self {
            inputs,
            outputs,
            weights,
            biases: vec![0.0; outputs],
        }
    }

    fn is_consistent(&self) -> bool {
        self.inputs > 0
            && self.outputs > 0
            && self.weights.len() == self.inputs * self.outputs
            && self.biases.len() == self.outputs
    }

    fn affine(&self, input: &[f32]) -> Vec<f32> {
        let mut out = self.biases.clone();
        for (o, value) in out.iter_mut().enumerate() {
            let row = &self.weights[o * self.inputs..(o + 1) * self.inputs];
            *value += row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>();
        }
        out
    }
}

/// Activations recorded during a forward pass.
#[derive(Debug, Clone)]
pub struct Trace {
    /// `activations[0]` is the input; `activations[l + 1]` is the output of layer `l`.
    activations: Vec<Vec<f32>>,
    /// Pre-activation values of every layer.
    pre_activations: Vec<Vec<f32>>,
}

impl Trace {
    #[must_use]
    pub fn output(&self) -> &[f32] {
        self.activations.last().map(Vec::as_slice).unwrap_or_default()
    }
}

/// Parameter gradients with the same shapes as an [`Mlp`].
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub(crate) weights: Vec<Vec<f32>>,
    pub(crate) biases: Vec<Vec<f32>>,
}

impl Gradients {
    #[must_use]
    pub fn zeros_like(network: &Mlp) -> Self {
        Self {
            weights: network
                .layers
                .iter()
                .map(|layer| vec![0.0; layer.weights.len()])
                .collect(),
            biases: network
                .layers
                .iter()
                .map(|layer| vec![0.0; layer.biases.len()])
                .collect(),
        }
    }

    /// Element-wise accumulate `other` into `self`.
    pub fn accumulate(&mut self, other: &Self) {
        for (dst, src) in self.weights.iter_mut().zip(&other.weights) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s;
            }
        }
        for (dst, src) in self.biases.iter_mut().zip(&other.biases) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s;
            }
        }
    }

    /// Flatten in parameter order (per layer: weights then biases).
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.weights
            .iter()
            .zip(&self.biases)
            .flat_map(|(w, b)| w.iter().chain(b.iter()).copied())
    }
}

/// Multi-layer perceptron used for both actor and critic heads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mlp {
    layers: Vec<Layer>,
    leaky_slope: f32,
}

impl Mlp {
    /// Trait identifier for this brain family.
    pub const KIND: BrainKind = BrainKind::new("mlp.leaky_relu");

    /// Build a network with layer widths `sizes` (input first, output last).
    pub fn new(
        sizes: &[usize],
        leaky_slope: f32,
        rng: &mut dyn RngCore,
    ) -> Result<Self, NetworkError> {
        if sizes.len() < 2 || sizes.contains(&0) {
            return Err(NetworkError::InvalidTopology);
        }
        let layers = sizes
            .windows(2)
            .map(|pair| Layer::kaiming(pair[0], pair[1], leaky_slope, rng))
            .collect();
        Ok(Self {
            layers,
            leaky_slope,
        })
    }

    #[must_use]
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.inputs)
    }

    #[must_use]
    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.outputs)
    }

    /// Check that every tensor matches its declared shape and consecutive layers chain.
    ///
    /// Deserialized networks must pass this before they are evaluated.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.layers.is_empty() || !self.layers.iter().all(Layer::is_consistent) {
            return Err(NetworkError::InvalidTopology);
        }
        if self
            .layers
            .windows(2)
            .any(|pair| pair[0].outputs != pair[1].inputs)
        {
            return Err(NetworkError::InvalidTopology);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn truncate_weights(&mut self, layer: usize, len: usize) {
        if let Some(layer) = self.layers.get_mut(layer) {
            layer.weights.truncate(len);
        }
    }

    /// Layer widths, input first.
    #[must_use]
    pub fn topology(&self) -> Vec<usize> {
        let mut sizes = vec![self.input_size()];
        sizes.extend(self.layers.iter().map(|layer| layer.outputs));
        sizes
    }

    fn activate(&self, value: f32) -> f32 {
        if value > 0.0 {
            value
        } else {
            value * self.leaky_slope
        }
    }

    fn activate_grad(&self, pre: f32) -> f32 {
        if pre > 0.0 { 1.0 } else { self.leaky_slope }
    }

    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>, NetworkError> {
        let trace = self.forward_trace(input)?;
        Ok(trace.output().to_vec())
    }

    /// Forward pass that keeps every intermediate activation for backprop.
    pub fn forward_trace(&self, input: &[f32]) -> Result<Trace, NetworkError> {
        if self.layers.is_empty() {
            return Err(NetworkError::InvalidTopology);
        }
        if input.len() != self.input_size() {
            return Err(NetworkError::InputSize {
                expected: self.input_size(),
                actual: input.len(),
            });
        }
        let last = self.layers.len() - 1;
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        activations.push(input.to_vec());
        for (index, layer) in self.layers.iter().enumerate() {
            let z = layer.affine(&activations[index]);
            let a = if index == last {
                z.clone()
            } else {
                z.iter().map(|&v| self.activate(v)).collect()
            };
            pre_activations.push(z);
            activations.push(a);
        }
        Ok(Trace {
            activations,
            pre_activations,
        })
    }

    /// Gradients of a scalar loss given `d_output = dL/d(output)` for the recorded pass.
    pub fn backward(&self, trace: &Trace, d_output: &[f32]) -> Result<Gradients, NetworkError> {
        if self.layers.is_empty() {
            return Err(NetworkError::InvalidTopology);
        }
        if d_output.len() != self.output_size() {
            return Err(NetworkError::OutputGradientSize {
                expected: self.output_size(),
                actual: d_output.len(),
            });
        }
        let mut grads = Gradients::zeros_like(self);
        let last = self.layers.len() - 1;
        let mut delta = d_output.to_vec();

        for index in (0..self.layers.len()).rev() {
            let layer = &self.layers[index];
            if index != last {
                for (d, &pre) in delta.iter_mut().zip(&trace.pre_activations[index]) {
                    *d *= self.activate_grad(pre);
                }
            }
            let input = &trace.activations[index];
            let dw = &mut grads.weights[index];
            for (o, &d) in delta.iter().enumerate() {
                for (i, &x) in input.iter().enumerate() {
                    dw[o * layer.inputs + i] = d * x;
                }
            }
            grads.biases[index].copy_from_slice(&delta);

            if index > 0 {
                let mut previous = vec![0.0; layer.inputs];
                for (o, &d) in delta.iter().enumerate() {
                    let row = &layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
                    for (p, w) in previous.iter_mut().zip(row) {
                        *p += w * d;
                    }
                }
                delta = previous;
            }
        }
        Ok(grads)
    }

    /// Mutable view over every parameter, in the same order as [`Gradients::iter`].
    pub(crate) fn parameters_mut(&mut self) -> impl Iterator<Item = &mut f32> + '_ {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.weights.iter_mut().chain(layer.biases.iter_mut()))
    }

    pub fn parameters(&self) -> impl Iterator<Item = f32> + '_ {
        self.layers
            .iter()
            .flat_map(|layer| layer.weights.iter().chain(layer.biases.iter()).copied())
    }
}

impl Brain for Mlp {
    fn kind(&self) -> BrainKind {
        Self::KIND
    }

    fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| layer.weights.len() + layer.biases.len())
            .sum()
    }

    fn mutate(&mut self, rng: &mut dyn RngCore, rate: f32, scale: f32) {
        let sigma = scale.max(0.0);
        for layer in &mut self.layers {
            for tensor in [&mut layer.weights, &mut layer.biases] {
                if rng.random::<f32>() < rate {
                    for value in tensor.iter_mut() {
                        *value += gaussian(rng) * sigma;
                    }
                }
            }
        }
    }
}
