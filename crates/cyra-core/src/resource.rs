//! Bounded resource tracks (hunger, energy, health) and their derived discrete states.

use serde::{Deserialize, Serialize};

use crate::config::ResourceConfig;

/// A scalar resource clamped to `[0, max]` together with its rates and thresholds.
///
/// The discrete state is never stored; callers classify the current value on demand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResourceTrack {
    value: f32,
    max: f32,
    pub decay_rate: f32,
    pub recharge_rate: f32,
    pub low_threshold: f32,
    pub critical_threshold: f32,
}

impl ResourceTrack {
    /// Build a track from configuration, starting at the configured initial value.
    #[must_use]
    pub fn new(config: &ResourceConfig) -> Self {
        let mut track = Self {
            value: 0.0,
            max: config.max.max(0.0),
            decay_rate: config.decay_rate,
            recharge_rate: config.recharge_rate,
            low_threshold: config.low_threshold,
            critical_threshold: config.critical_threshold,
        };
        track.set(config.initial);
        track
    }

    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Value as a fraction of `max` (zero for a zero-capacity track).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.value / self.max
        } else {
            0.0
        }
    }

    /// Overwrite the value, clamping into `[0, max]`. NaN collapses to zero.
    pub fn set(&mut self, value: f32) {
        self.value = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, self.max)
        };
    }

    /// Add `amount` (which may be negative), clamping the result.
    pub fn add(&mut self, amount: f32) {
        if amount.is_nan() {
            return;
        }
        self.set(self.value + amount);
    }

    /// Remove `amount`, clamping the result.
    pub fn sub(&mut self, amount: f32) {
        if amount.is_nan() {
            return;
        }
        self.set(self.value - amount);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value <= 0.0
    }
}

/// Hunger tiers; hunger rises over time so larger values are worse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum HungerState {
    #[default]
    Good,
    Hungry,
    Critical,
}

impl HungerState {
    pub const COUNT: usize = 3;

    /// `Good` below the low threshold, `Critical` above the critical one, `Hungry` between.
    #[must_use]
    pub fn classify(track: &ResourceTrack) -> Self {
        let value = track.value();
        if value < track.low_threshold {
            Self::Good
        } else if value > track.critical_threshold {
            Self::Critical
        } else {
            Self::Hungry
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Energy tiers; energy drains with movement so smaller values are worse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum EnergyState {
    #[default]
    Good,
    Weary,
    Critical,
}

impl EnergyState {
    pub const COUNT: usize = 3;

    #[must_use]
    pub fn classify(track: &ResourceTrack) -> Self {
        let value = track.value();
        if value > track.low_threshold {
            Self::Good
        } else if value > track.critical_threshold {
            Self::Weary
        } else {
            Self::Critical
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Health tiers. `Dead` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum HealthState {
    #[default]
    Good,
    Wounded,
    Critical,
    Dead,
}

impl HealthState {
    pub const COUNT: usize = 4;

    /// Pure function of the health value and thresholds; `Dead` wins at or below zero.
    #[must_use]
    pub fn classify(track: &ResourceTrack) -> Self {
        let value = track.value();
        if value <= 0.0 {
            Self::Dead
        } else if value < track.critical_threshold {
            Self::Critical
        } else if value < track.low_threshold {
            Self::Wounded
        } else {
            Self::Good
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn is_dead(self) -> bool {
        matches!(self, Self::Dead)
    }
}

/// What the health track did during the last tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum HealthAction {
    Loss,
    Recover,
    #[default]
    Neutral,
}
