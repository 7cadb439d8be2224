//! Reward shaping: scores one creature transition as a set of named, additive signals.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::WorldError;
use crate::environment::TransitionSnapshot;
use crate::resource::{EnergyState, HealthAction, HealthState, HungerState};

/// Number of tunable reward magnitudes.
pub const MAGNITUDE_COUNT: usize = 23;

/// Reward-shaping hyper-parameters for one training run.
///
/// Magnitudes are non-negative; penalties are subtracted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewardConfig {
    pub food_enabled: bool,
    pub energy_enabled: bool,
    pub health_enabled: bool,
    pub position_enabled: bool,

    pub food_found_bonus: f32,
    pub distance_improvement_bonus: f32,
    pub no_improvement_penalty: f32,
    pub eat_bonus: f32,
    pub hungry_eat_bonus: f32,
    pub no_food_in_range_penalty: f32,
    pub hunger_good_bonus: f32,
    pub hunger_hungry_penalty: f32,
    pub hunger_critical_penalty: f32,

    pub energy_good_bonus: f32,
    pub energy_weary_penalty: f32,
    pub energy_critical_penalty: f32,

    pub health_recover_bonus: f32,
    pub health_loss_penalty: f32,
    pub health_good_bonus: f32,
    pub health_wounded_penalty: f32,
    pub health_critical_penalty: f32,
    pub dead_penalty: f32,

    pub away_border_bonus: f32,
    pub direction_change_bonus: f32,
    pub border_penalty: f32,
    pub corner_penalty: f32,
    pub repeat_position_penalty: f32,

    /// Minimum angle (radians) between consecutive directions that counts as a change.
    pub direction_change_threshold: f32,
    /// Distance from any arena corner inside which the corner penalty applies.
    pub corner_radius: f32,
    /// Occurrences of the same rounded position tolerated in the history.
    pub max_repeat_position: usize,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            food_enabled: true,
            energy_enabled: true,
            health_enabled: true,
            position_enabled: true,
            food_found_bonus: 0.1,
            distance_improvement_bonus: 1.0,
            no_improvement_penalty: 0.1,
            eat_bonus: 10.0,
            hungry_eat_bonus: 5.0,
            no_food_in_range_penalty: 0.2,
            hunger_good_bonus: 0.1,
            hunger_hungry_penalty: 0.2,
            hunger_critical_penalty: 1.0,
            energy_good_bonus: 0.05,
            energy_weary_penalty: 0.1,
            energy_critical_penalty: 0.5,
            health_recover_bonus: 0.1,
            health_loss_penalty: 0.5,
            health_good_bonus: 0.05,
            health_wounded_penalty: 0.2,
            health_critical_penalty: 0.5,
            dead_penalty: 10.0,
            away_border_bonus: 0.05,
            direction_change_bonus: 0.02,
            border_penalty: 0.5,
            corner_penalty: 1.0,
            repeat_position_penalty: 0.2,
            direction_change_threshold: std::f32::consts::FRAC_PI_4,
            corner_radius: 50.0,
            max_repeat_position: 3,
        }
    }
}

impl RewardConfig {
    /// Default toggles and thresholds with every magnitude drawn uniformly from `[0, 1)`.
    pub fn randomized(rng: &mut dyn RngCore) -> Self {
        let mut config = Self::default();
        for magnitude in config.magnitudes_mut() {
            *magnitude = rng.random::<f32>();
        }
        config
    }

    fn magnitudes_mut(&mut self) -> [&mut f32; MAGNITUDE_COUNT] {
        [
            &mut self.food_found_bonus,
            &mut self.distance_improvement_bonus,
            &mut self.no_improvement_penalty,
            &mut self.eat_bonus,
            &mut self.hungry_eat_bonus,
            &mut self.no_food_in_range_penalty,
            &mut self.hunger_good_bonus,
            &mut self.hunger_hungry_penalty,
            &mut self.hunger_critical_penalty,
            &mut self.energy_good_bonus,
            &mut self.energy_weary_penalty,
            &mut self.energy_critical_penalty,
            &mut self.health_recover_bonus,
            &mut self.health_loss_penalty,
            &mut self.health_good_bonus,
            &mut self.health_wounded_penalty,
            &mut self.health_critical_penalty,
            &mut self.dead_penalty,
            &mut self.away_border_bonus,
            &mut self.direction_change_bonus,
            &mut self.border_penalty,
            &mut self.corner_penalty,
            &mut self.repeat_position_penalty,
        ]
    }

    /// Every magnitude paired with its field name, in declaration order.
    #[must_use]
    pub fn magnitudes(&self) -> [(&'static str, f32); MAGNITUDE_COUNT] {
        [
            ("food_found_bonus", self.food_found_bonus),
            ("distance_improvement_bonus", self.distance_improvement_bonus),
            ("no_improvement_penalty", self.no_improvement_penalty),
            ("eat_bonus", self.eat_bonus),
            ("hungry_eat_bonus", self.hungry_eat_bonus),
            ("no_food_in_range_penalty", self.no_food_in_range_penalty),
            ("hunger_good_bonus", self.hunger_good_bonus),
            ("hunger_hungry_penalty", self.hunger_hungry_penalty),
            ("hunger_critical_penalty", self.hunger_critical_penalty),
            ("energy_good_bonus", self.energy_good_bonus),
            ("energy_weary_penalty", self.energy_weary_penalty),
            ("energy_critical_penalty", self.energy_critical_penalty),
            ("health_recover_bonus", self.health_recover_bonus),
            ("health_loss_penalty", self.health_loss_penalty),
            ("health_good_bonus", self.health_good_bonus),
            ("health_wounded_penalty", self.health_wounded_penalty),
            ("health_critical_penalty", self.health_critical_penalty),
            ("dead_penalty", self.dead_penalty),
            ("away_border_bonus", self.away_border_bonus),
            ("direction_change_bonus", self.direction_change_bonus),
            ("border_penalty", self.border_penalty),
            ("corner_penalty", self.corner_penalty),
            ("repeat_position_penalty", self.repeat_position_penalty),
        ]
    }

    pub fn validate(&self) -> Result<(), WorldError> {
        if self
            .magnitudes()
            .iter()
            .any(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(WorldError::InvalidConfig(
                "reward magnitudes must be finite and non-negative",
            ));
        }
        if !(0.0..=std::f32::consts::PI).contains(&self.direction_change_threshold) {
            return Err(WorldError::InvalidConfig(
                "direction_change_threshold must be within [0, pi]",
            ));
        }
        if !(self.corner_radius >= 0.0) {
            return Err(WorldError::InvalidConfig(
                "corner_radius must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Identifies one reward contribution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RewardSignal {
    FoodFound,
    DistanceImprovement,
    NoImprovement,
    Eat,
    HungryEat,
    NoFoodInRange,
    HungerTier,
    EnergyTier,
    HealthAction,
    HealthTier,
    Death,
    AwayFromBorder,
    DirectionChange,
    Border,
    Corner,
    RepeatPosition,
}

impl RewardSignal {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FoodFound => "food_found",
            Self::DistanceImprovement => "distance_improvement",
            Self::NoImprovement => "no_improvement",
            Self::Eat => "eat",
            Self::HungryEat => "hungry_eat",
            Self::NoFoodInRange => "no_food_in_range",
            Self::HungerTier => "hunger_tier",
            Self::EnergyTier => "energy_tier",
            Self::HealthAction => "health_action",
            Self::HealthTier => "health_tier",
            Self::Death => "death",
            Self::AwayFromBorder => "away_from_border",
            Self::DirectionChange => "direction_change",
            Self::Border => "border",
            Self::Corner => "corner",
            Self::RepeatPosition => "repeat_position",
        }
    }
}

/// Named signal values for one transition, in emission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RewardBreakdown {
    entries: Vec<(RewardSignal, f32)>,
}

impl RewardBreakdown {
    fn push(&mut self, signal: RewardSignal, value: f32) {
        self.entries.push((signal, value));
    }

    /// Value of `signal`, if it fired.
    #[must_use]
    pub fn get(&self, signal: RewardSignal) -> Option<f32> {
        self.entries
            .iter()
            .find(|(name, _)| *name == signal)
            .map(|(_, value)| *value)
    }

    #[must_use]
    pub fn contains(&self, signal: RewardSignal) -> bool {
        self.get(signal).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RewardSignal, f32)> + '_ {
        self.entries.iter().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all signals, accumulated in emission order.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.entries.iter().fold(0.0, |acc, (_, value)| acc + value)
    }
}

/// Stateless scorer over a fixed [`RewardConfig`].
#[derive(Debug, Clone)]
pub struct RewardEngine {
    config: RewardConfig,
}

impl RewardEngine {
    #[must_use]
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Score a transition. Creatures that were already dead before the tick earn nothing.
    #[must_use]
    pub fn compute(&self, snapshot: &TransitionSnapshot) -> RewardBreakdown {
        let mut breakdown = RewardBreakdown::default();
        if snapshot.was_dead {
            return breakdown;
        }
        if self.config.food_enabled {
            self.food_signals(snapshot, &mut breakdown);
        }
        if self.config.energy_enabled {
            self.energy_signals(snapshot, &mut breakdown);
        }
        if self.config.health_enabled {
            self.health_signals(snapshot, &mut breakdown);
        }
        if self.config.position_enabled {
            self.position_signals(snapshot, &mut breakdown);
        }
        breakdown
    }

    fn food_signals(&self, snapshot: &TransitionSnapshot, out: &mut RewardBreakdown) {
        let cfg = &self.config;
        if snapshot.food_in_view > 0 {
            out.push(
                RewardSignal::FoodFound,
                cfg.food_found_bonus * snapshot.food_in_view as f32,
            );
        }
        if let (Some(old), Some(new)) = (snapshot.old_food_distance, snapshot.new_food_distance) {
            if new < old && old > 0.0 {
                out.push(
                    RewardSignal::DistanceImprovement,
                    cfg.distance_improvement_bonus * (old - new) / old,
                );
            } else if new > old {
                out.push(RewardSignal::NoImprovement, -cfg.no_improvement_penalty);
            }
        }
        if snapshot.ate {
            out.push(RewardSignal::Eat, cfg.eat_bonus);
            if snapshot.hunger_at_eat != HungerState::Good {
                out.push(RewardSignal::HungryEat, cfg.hungry_eat_bonus);
            }
        }
        if snapshot.food_in_view == 0 && snapshot.hunger != HungerState::Good {
            out.push(RewardSignal::NoFoodInRange, -cfg.no_food_in_range_penalty);
        }
        let tier = match snapshot.hunger {
            HungerState::Good => cfg.hunger_good_bonus,
            HungerState::Hungry => -cfg.hunger_hungry_penalty,
            HungerState::Critical => -cfg.hunger_critical_penalty,
        };
        out.push(RewardSignal::HungerTier, tier);
    }

    fn energy_signals(&self, snapshot: &TransitionSnapshot, out: &mut RewardBreakdown) {
        let cfg = &self.config;
        let tier = match snapshot.energy {
            EnergyState::Good => cfg.energy_good_bonus,
            EnergyState::Weary => -cfg.energy_weary_penalty,
            EnergyState::Critical => -cfg.energy_critical_penalty,
        };
        out.push(RewardSignal::EnergyTier, tier);
    }

    fn health_signals(&self, snapshot: &TransitionSnapshot, out: &mut RewardBreakdown) {
        let cfg = &self.config;
        match snapshot.health_action {
            HealthAction::Recover => out.push(RewardSignal::HealthAction, cfg.health_recover_bonus),
            HealthAction::Loss => out.push(RewardSignal::HealthAction, -cfg.health_loss_penalty),
            HealthAction::Neutral => {}
        }
        match snapshot.health {
            HealthState::Good => out.push(RewardSignal::HealthTier, cfg.health_good_bonus),
            HealthState::Wounded => {
                out.push(RewardSignal::HealthTier, -cfg.health_wounded_penalty);
            }
            HealthState::Critical => {
                out.push(RewardSignal::HealthTier, -cfg.health_critical_penalty);
            }
            // Only reachable on the tick of death; `was_dead` filters later ticks.
            HealthState::Dead => out.push(RewardSignal::Death, -cfg.dead_penalty),
        }
    }

    fn position_signals(&self, snapshot: &TransitionSnapshot, out: &mut RewardBreakdown) {
        let cfg = &self.config;
        if snapshot.new_border_distance > snapshot.old_border_distance {
            out.push(RewardSignal::AwayFromBorder, cfg.away_border_bonus);
        }
        if !snapshot.old_direction.is_zero()
            && !snapshot.new_direction.is_zero()
            && snapshot.old_direction.angle_between(snapshot.new_direction)
                > cfg.direction_change_threshold
        {
            out.push(RewardSignal::DirectionChange, cfg.direction_change_bonus);
        }
        if snapshot.touches_border {
            out.push(RewardSignal::Border, -cfg.border_penalty);
        }
        if snapshot.corner_distance < cfg.corner_radius {
            out.push(RewardSignal::Corner, -cfg.corner_penalty);
        }
        if snapshot.repeat_count > cfg.max_repeat_position {
            out.push(RewardSignal::RepeatPosition, -cfg.repeat_position_penalty);
        }
    }
}
