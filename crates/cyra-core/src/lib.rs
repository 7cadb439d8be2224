//! Core simulation types for Cyra training: creatures, food, reward shaping, and the arena loop.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

pub mod config;
pub mod creature;
pub mod environment;
pub mod food;
pub mod ledger;
pub mod resource;
pub mod reward;

pub use config::{CreatureConfig, ResourceConfig, WorldConfig};
pub use creature::{Creature, DetectedEntity, EntityKind, MoveReport, Perceivable};
pub use environment::{
    CreatureSprite, DrawState, Environment, EpisodeState, FoodSprite, OBSERVATION_SIZE,
    Observation, StepOutcome, TransitionSnapshot,
};
pub use food::Food;
pub use ledger::{GenerationRecord, LedgerError, MemoryLedger, TrainingLedger};
pub use resource::{EnergyState, HealthAction, HealthState, HungerState, ResourceTrack};
pub use reward::{RewardBreakdown, RewardConfig, RewardEngine, RewardSignal};

use thiserror::Error;

/// Distance below which a movement counts as standing still.
pub const IDLE_EPSILON: f32 = 1e-6;

/// Errors raised by the world layer.
#[derive(Debug, Error, PartialEq)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// `step` was called before the first `reset`.
    #[error("environment must be reset before stepping")]
    NotReset,
    /// `step` was called after the episode finished.
    #[error("episode already finished; call reset to start a new one")]
    EpisodeFinished,
    /// The number of actions does not match the number of creatures.
    #[error("expected {expected} actions, got {actual}")]
    ActionCount { expected: usize, actual: usize },
}

/// Plain 2D vector used for positions, directions, and displacements.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Construct a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or zero for a (near) zero vector.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= IDLE_EPSILON {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unsigned angle in radians between two vectors; zero if either is degenerate.
    #[must_use]
    pub fn angle_between(self, other: Self) -> f32 {
        let denom = self.length() * other.length();
        if denom <= IDLE_EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos()
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Movement request consumed by a creature: a direction plus a scalar speed.
///
/// Inputs are unconstrained; the creature normalizes the direction and clamps the speed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Action {
    pub direction: Vec2,
    pub speed: f32,
}

impl Action {
    #[must_use]
    pub const fn new(dx: f32, dy: f32, speed: f32) -> Self {
        Self {
            direction: Vec2::new(dx, dy),
            speed,
        }
    }

    /// Stand still for one tick.
    #[must_use]
    pub const fn idle() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}
