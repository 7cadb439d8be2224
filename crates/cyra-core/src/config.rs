//! Static configuration for the arena, its creatures, and their resource tracks.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::WorldError;
use crate::reward::RewardConfig;

/// Parameters for one resource track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResourceConfig {
    /// Upper bound of the track.
    pub max: f32,
    /// Value assigned when a creature is created.
    pub initial: f32,
    /// Per-tick (or per-distance) loss rate. For hunger this is the accrual increment.
    pub decay_rate: f32,
    /// Per-tick gain rate while recovering.
    pub recharge_rate: f32,
    /// First tier boundary (hungry / weary / wounded).
    pub low_threshold: f32,
    /// Second tier boundary (critical).
    pub critical_threshold: f32,
}

impl ResourceConfig {
    fn validate(&self, name: &'static str) -> Result<(), WorldError> {
        if !(self.max > 0.0) {
            return Err(WorldError::InvalidConfig(name));
        }
        if self.decay_rate < 0.0 || self.recharge_rate < 0.0 {
            return Err(WorldError::InvalidConfig(name));
        }
        if !(0.0..=self.max).contains(&self.low_threshold)
            || !(0.0..=self.max).contains(&self.critical_threshold)
        {
            return Err(WorldError::InvalidConfig(name));
        }
        Ok(())
    }
}

/// Physiology and senses shared by every creature in a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CreatureConfig {
    /// Hunger rises from 0 (sated) toward `max` (starving).
    pub hunger: ResourceConfig,
    /// Energy drains with movement and recharges while idle.
    pub energy: ResourceConfig,
    /// Health falls under critical hunger and recovers while sated.
    pub health: ResourceConfig,
    /// Per-distance energy depletion used when the creature is not sated.
    pub energy_hungry_decay_rate: f32,
    /// Radius within which food and other creatures are detected.
    pub perception_radius: f32,
    /// Upper bound applied to any requested speed.
    pub max_speed: f32,
    /// Multiplier on `max_speed` while energy is critical.
    pub exhausted_speed_factor: f32,
    /// Number of rounded past positions remembered for loitering checks.
    pub history_len: usize,
}

impl Default for CreatureConfig {
    fn default() -> Self {
        Self {
            hunger: ResourceConfig {
                max: 1.0,
                initial: 0.0,
                decay_rate: 0.002,
                recharge_rate: 0.0,
                low_threshold: 0.5,
                critical_threshold: 0.8,
            },
            energy: ResourceConfig {
                max: 1.0,
                initial: 1.0,
                decay_rate: 0.001,
                recharge_rate: 0.0015,
                low_threshold: 0.5,
                critical_threshold: 0.2,
            },
            health: ResourceConfig {
                max: 1.0,
                initial: 1.0,
                decay_rate: 0.01,
                recharge_rate: 0.015,
                low_threshold: 0.5,
                critical_threshold: 0.2,
            },
            energy_hungry_decay_rate: 0.002,
            perception_radius: 150.0,
            max_speed: 5.0,
            exhausted_speed_factor: 0.5,
            history_len: 5,
        }
    }
}

impl CreatureConfig {
    fn validate(&self) -> Result<(), WorldError> {
        self.hunger.validate("hunger track must have positive max, non-negative rates, and thresholds within [0, max]")?;
        self.energy.validate("energy track must have positive max, non-negative rates, and thresholds within [0, max]")?;
        self.health.validate("health track must have positive max, non-negative rates, and thresholds within [0, max]")?;
        if self.hunger.low_threshold > self.hunger.critical_threshold {
            return Err(WorldError::InvalidConfig(
                "hunger low_threshold cannot exceed critical_threshold",
            ));
        }
        if self.energy.critical_threshold > self.energy.low_threshold
            || self.health.critical_threshold > self.health.low_threshold
        {
            return Err(WorldError::InvalidConfig(
                "energy/health critical_threshold cannot exceed low_threshold",
            ));
        }
        if self.energy_hungry_decay_rate < 0.0 {
            return Err(WorldError::InvalidConfig(
                "energy_hungry_decay_rate must be non-negative",
            ));
        }
        if self.perception_radius <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "perception_radius must be positive",
            ));
        }
        if self.max_speed < 0.0 || !(0.0..=1.0).contains(&self.exhausted_speed_factor) {
            return Err(WorldError::InvalidConfig(
                "max_speed must be non-negative and exhausted_speed_factor within [0, 1]",
            ));
        }
        if self.history_len == 0 {
            return Err(WorldError::InvalidConfig("history_len must be non-zero"));
        }
        Ok(())
    }
}

/// Static configuration for a Cyra arena.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the arena in world units.
    pub arena_width: f32,
    /// Height of the arena in world units.
    pub arena_height: f32,
    /// Number of creatures (one per policy agent).
    pub creature_count: usize,
    /// Number of food items kept alive in the arena.
    pub food_count: usize,
    /// Step budget per episode.
    pub max_steps: u32,
    /// Post-move distance to the nearest food below which the creature eats it.
    pub eat_threshold: f32,
    /// Optional RNG seed for reproducible arenas.
    pub rng_seed: Option<u64>,
    /// Spawn each creature at a uniform random point; otherwise all start at the centre.
    pub random_spawn: bool,
    pub creature: CreatureConfig,
    pub rewards: RewardConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            arena_width: 1_200.0,
            arena_height: 800.0,
            creature_count: 5,
            food_count: 10,
            max_steps: 1_000,
            eat_threshold: 35.0,
            rng_seed: None,
            random_spawn: true,
            creature: CreatureConfig::default(),
            rewards: RewardConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Validate every nested section, failing on the first bad value.
    pub fn validate(&self) -> Result<(), WorldError> {
        if !(self.arena_width > 0.0) || !(self.arena_height > 0.0) {
            return Err(WorldError::InvalidConfig(
                "arena dimensions must be positive",
            ));
        }
        if self.creature_count == 0 {
            return Err(WorldError::InvalidConfig("creature_count must be non-zero"));
        }
        if self.max_steps == 0 {
            return Err(WorldError::InvalidConfig("max_steps must be non-zero"));
        }
        if self.eat_threshold < 0.0 {
            return Err(WorldError::InvalidConfig(
                "eat_threshold must be non-negative",
            ));
        }
        self.creature.validate()?;
        self.rewards.validate()
    }

    /// Returns the configured RNG, seeding from entropy when no seed is set.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(WorldConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_degenerate_arena() {
        let config = WorldConfig {
            arena_width: 0.0,
            ..WorldConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(WorldError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_inverted_hunger_thresholds() {
        let mut config = WorldConfig::default();
        config.creature.hunger.low_threshold = 0.9;
        config.creature.hunger.critical_threshold = 0.3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = WorldConfig {
            rng_seed: Some(7),
            ..WorldConfig::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let parsed: WorldConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, config);
    }
}
