//! Creatures: the per-tick resource state machine, perception, and bounded movement.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::CreatureConfig;
use crate::food::Food;
use crate::resource::{EnergyState, HealthAction, HealthState, HungerState, ResourceTrack};
use crate::{Action, IDLE_EPSILON, Vec2};

/// Capabilities shared by everything a creature can see.
pub trait Perceivable {
    fn position(&self) -> Vec2;

    /// Nutrition offered by the entity, if it is edible.
    fn nutrition(&self) -> Option<f32>;
}

impl Perceivable for Food {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn nutrition(&self) -> Option<f32> {
        Some(self.nutrition)
    }
}

impl Perceivable for Creature {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn nutrition(&self) -> Option<f32> {
        None
    }
}

/// Kind tag for a detected entity, carrying its index in the owning collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum EntityKind {
    Food { index: usize, nutrition: f32 },
    Creature { id: usize },
}

/// One entry of a creature's per-tick detection list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetectedEntity {
    pub kind: EntityKind,
    pub position: Vec2,
    pub distance: f32,
}

impl DetectedEntity {
    #[must_use]
    pub const fn is_food(&self) -> bool {
        matches!(self.kind, EntityKind::Food { .. })
    }

    /// Index into the food collection when this entry is food.
    #[must_use]
    pub const fn food_index(&self) -> Option<usize> {
        match self.kind {
            EntityKind::Food { index, .. } => Some(index),
            EntityKind::Creature { .. } => None,
        }
    }
}

impl Perceivable for DetectedEntity {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn nutrition(&self) -> Option<f32> {
        match self.kind {
            EntityKind::Food { nutrition, .. } => Some(nutrition),
            EntityKind::Creature { .. } => None,
        }
    }
}

/// Result of applying one movement request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveReport {
    pub old_position: Vec2,
    pub new_position: Vec2,
    pub old_direction: Vec2,
    pub new_direction: Vec2,
    /// Magnitude of the requested displacement (before arena clamping).
    pub distance: f32,
}

/// An embodied creature in the arena.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Creature {
    id: usize,
    position: Vec2,
    last_speed: f32,
    prev_direction: Vec2,
    history: VecDeque<Vec2>,
    history_len: usize,
    hunger: ResourceTrack,
    energy: ResourceTrack,
    health: ResourceTrack,
    energy_hungry_decay_rate: f32,
    health_action: HealthAction,
    perception_radius: f32,
    max_speed: f32,
    exhausted_speed_factor: f32,
    #[serde(skip)]
    detected: Vec<DetectedEntity>,
}

impl Creature {
    /// Create a fresh creature at `position` with full resources.
    #[must_use]
    pub fn new(id: usize, position: Vec2, config: &CreatureConfig) -> Self {
        let history_len = config.history_len.max(1);
        Self {
            id,
            position,
            last_speed: 0.0,
            prev_direction: Vec2::ZERO,
            history: VecDeque::with_capacity(history_len),
            history_len,
            hunger: ResourceTrack::new(&config.hunger),
            energy: ResourceTrack::new(&config.energy),
            health: ResourceTrack::new(&config.health),
            energy_hungry_decay_rate: config.energy_hungry_decay_rate,
            health_action: HealthAction::Neutral,
            perception_radius: config.perception_radius,
            max_speed: config.max_speed,
            exhausted_speed_factor: config.exhausted_speed_factor,
            detected: Vec::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    #[must_use]
    pub const fn last_speed(&self) -> f32 {
        self.last_speed
    }

    #[must_use]
    pub const fn prev_direction(&self) -> Vec2 {
        self.prev_direction
    }

    #[must_use]
    pub const fn perception_radius(&self) -> f32 {
        self.perception_radius
    }

    #[must_use]
    pub const fn max_speed(&self) -> f32 {
        self.max_speed
    }

    #[must_use]
    pub const fn hunger(&self) -> &ResourceTrack {
        &self.hunger
    }

    pub fn hunger_mut(&mut self) -> &mut ResourceTrack {
        &mut self.hunger
    }

    #[must_use]
    pub const fn energy(&self) -> &ResourceTrack {
        &self.energy
    }

    pub fn energy_mut(&mut self) -> &mut ResourceTrack {
        &mut self.energy
    }

    #[must_use]
    pub const fn health(&self) -> &ResourceTrack {
        &self.health
    }

    pub fn health_mut(&mut self) -> &mut ResourceTrack {
        &mut self.health
    }

    #[must_use]
    pub const fn health_action(&self) -> HealthAction {
        self.health_action
    }

    #[must_use]
    pub fn hunger_state(&self) -> HungerState {
        HungerState::classify(&self.hunger)
    }

    #[must_use]
    pub fn energy_state(&self) -> EnergyState {
        EnergyState::classify(&self.energy)
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        HealthState::classify(&self.health)
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health_state().is_dead()
    }

    /// Speed cap after applying death and exhaustion.
    #[must_use]
    pub fn effective_max_speed(&self) -> f32 {
        if self.is_dead() {
            0.0
        } else if self.energy_state() == EnergyState::Critical {
            self.max_speed * self.exhausted_speed_factor
        } else {
            self.max_speed
        }
    }

    // ---- perception ----

    /// Rebuild the detection list from scratch.
    ///
    /// `creatures` holds every creature position indexed by id; the creature's own slot is skipped.
    pub fn perceive(&mut self, foods: &[Food], creatures: &[Vec2]) {
        self.detected.clear();
        let radius = self.perception_radius;
        for (index, food) in foods.iter().enumerate() {
            let distance = self.position.distance(food.position);
            if distance <= radius {
                self.detected.push(DetectedEntity {
                    kind: EntityKind::Food {
                        index,
                        nutrition: food.nutrition,
                    },
                    position: food.position,
                    distance,
                });
            }
        }
        for (id, &position) in creatures.iter().enumerate() {
            if id == self.id {
                continue;
            }
            let distance = self.position.distance(position);
            if distance <= radius {
                self.detected.push(DetectedEntity {
                    kind: EntityKind::Creature { id },
                    position,
                    distance,
                });
            }
        }
    }

    #[must_use]
    pub fn detected(&self) -> &[DetectedEntity] {
        &self.detected
    }

    pub fn detected_food(&self) -> impl Iterator<Item = &DetectedEntity> + '_ {
        self.detected.iter().filter(|entity| entity.is_food())
    }

    #[must_use]
    pub fn food_in_view(&self) -> usize {
        self.detected_food().count()
    }

    /// Closest detected food entry, by linear scan.
    #[must_use]
    pub fn nearest_food_entity(&self) -> Option<&DetectedEntity> {
        self.detected_food()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Position of the closest detected food, or the zero vector when nothing is in view.
    #[must_use]
    pub fn nearest_food(&self) -> Vec2 {
        self.nearest_food_entity()
            .map_or(Vec2::ZERO, |entity| entity.position)
    }

    // ---- movement ----

    /// Apply a movement request and clamp the result to a `width x height` arena.
    pub fn apply_action(&mut self, action: Action, width: f32, height: f32) -> MoveReport {
        let old_position = self.position;
        let requested = if action.speed.is_nan() {
            0.0
        } else {
            action.speed.max(0.0)
        };
        let speed = requested.min(self.effective_max_speed());
        let direction = if action.direction.x.is_finite() && action.direction.y.is_finite() {
            action.direction.normalized()
        } else {
            Vec2::ZERO
        };
        let displacement = direction * speed;
        let distance = displacement.length();

        if !self.is_dead() {
            self.position += displacement;
        }
        self.position.x = self.position.x.clamp(0.0, width);
        self.position.y = self.position.y.clamp(0.0, height);

        self.last_speed = distance;
        let old_direction = self.prev_direction;
        self.prev_direction = displacement;
        self.remember_position(old_position);

        MoveReport {
            old_position,
            new_position: self.position,
            old_direction,
            new_direction: displacement,
            distance,
        }
    }

    fn remember_position(&mut self, position: Vec2) {
        if self.history.len() >= self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(Self::round_position(position));
    }

    /// Round to one decimal place, the granularity used by the position history.
    #[must_use]
    pub fn round_position(position: Vec2) -> Vec2 {
        Vec2::new(
            (position.x * 10.0).round() / 10.0,
            (position.y * 10.0).round() / 10.0,
        )
    }

    /// How many history entries match `position` after rounding.
    #[must_use]
    pub fn repeat_count(&self, position: Vec2) -> usize {
        let rounded = Self::round_position(position);
        self.history.iter().filter(|&&entry| entry == rounded).count()
    }

    pub fn history(&self) -> impl Iterator<Item = &Vec2> + '_ {
        self.history.iter()
    }

    // ---- resource state machine ----

    /// Advance hunger, energy, and health by one tick.
    ///
    /// Cross-coupled tracks read the hunger state from before this tick.
    pub fn tick_resources(&mut self, distance: f32) {
        let hunger_before = self.hunger_state();
        let was_dead = self.is_dead();
        let distance = if distance.is_finite() {
            distance.max(0.0)
        } else {
            0.0
        };

        self.hunger.add(self.hunger.decay_rate * distance.max(1.0));

        if distance <= IDLE_EPSILON {
            self.energy.add(self.energy.recharge_rate);
        } else {
            let rate = match hunger_before {
                HungerState::Good => self.energy.decay_rate,
                HungerState::Hungry | HungerState::Critical => self.energy_hungry_decay_rate,
            };
            self.energy.sub(rate * distance);
        }

        if was_dead {
            self.health_action = HealthAction::Neutral;
            return;
        }
        self.health_action = match hunger_before {
            HungerState::Critical => {
                self.health.sub(self.health.decay_rate);
                HealthAction::Loss
            }
            HungerState::Good => {
                self.health.add(self.health.recharge_rate);
                HealthAction::Recover
            }
            HungerState::Hungry => HealthAction::Neutral,
        };
    }

    /// Consume `nutrition`: hunger falls and energy rises by the same amount.
    pub fn eat(&mut self, nutrition: f32) {
        let amount = if nutrition.is_nan() {
            0.0
        } else {
            nutrition.max(0.0)
        };
        self.hunger.sub(amount);
        self.energy.add(amount);
    }

    // ---- geometry helpers ----

    /// Distance to the closest of the four arena borders.
    #[must_use]
    pub fn border_distance(position: Vec2, width: f32, height: f32) -> f32 {
        position
            .x
            .min(width - position.x)
            .min(position.y)
            .min(height - position.y)
    }

    /// Whether `position` lies exactly on an arena bound.
    #[must_use]
    pub fn touches_border(position: Vec2, width: f32, height: f32) -> bool {
        position.x == 0.0 || position.y == 0.0 || position.x == width || position.y == height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn creature_at(x: f32, y: f32) -> Creature {
        Creature::new(0, Vec2::new(x, y), &CreatureConfig::default())
    }

    #[test]
    fn perception_uses_radius_and_skips_self() {
        let mut creature = creature_at(100.0, 100.0);
        let foods = [
            Food {
                position: Vec2::new(150.0, 100.0),
                nutrition: 0.5,
            },
            Food {
                position: Vec2::new(600.0, 600.0),
                nutrition: 0.5,
            },
        ];
        let creatures = [Vec2::new(100.0, 100.0), Vec2::new(120.0, 100.0)];
        creature.perceive(&foods, &creatures);
        assert_eq!(creature.detected().len(), 2);
        assert_eq!(creature.food_in_view(), 1);
        assert_eq!(creature.nearest_food(), Vec2::new(150.0, 100.0));
        let other = creature
            .detected()
            .iter()
            .find(|entity| !entity.is_food())
            .expect("other creature");
        assert_eq!(other.nutrition(), None);
    }

    #[test]
    fn nearest_food_is_zero_when_nothing_in_view() {
        let mut creature = creature_at(10.0, 10.0);
        creature.perceive(&[], &[]);
        assert_eq!(creature.nearest_food(), Vec2::ZERO);
        assert!(creature.nearest_food_entity().is_none());
    }

    #[test]
    fn movement_respects_max_speed_and_arena() {
        let mut creature = creature_at(2.0, 50.0);
        let report = creature.apply_action(Action::new(-1.0, 0.0, 100.0), 100.0, 100.0);
        assert!((report.distance - 5.0).abs() < 1e-6);
        assert_eq!(creature.position(), Vec2::new(0.0, 50.0));
        assert!(Creature::touches_border(creature.position(), 100.0, 100.0));
        assert_eq!(creature.prev_direction(), Vec2::new(-5.0, 0.0));
    }

    #[test]
    fn dead_creatures_do_not_move() {
        let mut creature = creature_at(50.0, 50.0);
        creature.health_mut().set(0.0);
        assert!(creature.is_dead());
        assert_eq!(creature.effective_max_speed(), 0.0);
        let report = creature.apply_action(Action::new(1.0, 1.0, 3.0), 100.0, 100.0);
        assert_eq!(report.distance, 0.0);
        assert_eq!(creature.position(), Vec2::new(50.0, 50.0));
    }

    #[test]
    fn exhausted_creatures_move_slower() {
        let mut creature = creature_at(50.0, 50.0);
        creature.energy_mut().set(0.1);
        let report = creature.apply_action(Action::new(0.0, 1.0, 100.0), 100.0, 100.0);
        assert!((report.distance - 2.5).abs() < 1e-6);
    }

    #[test]
    fn idle_tick_accrues_minimum_hunger_and_recharges_energy() {
        let mut creature = creature_at(50.0, 50.0);
        creature.energy_mut().set(0.5);
        creature.tick_resources(0.0);
        assert!((creature.hunger().value() - 0.002).abs() < 1e-7);
        assert!((creature.energy().value() - 0.5015).abs() < 1e-6);
        assert_eq!(creature.health_action(), HealthAction::Recover);
    }

    #[test]
    fn hungry_creatures_burn_energy_faster() {
        let mut sated = creature_at(50.0, 50.0);
        let mut hungry = creature_at(50.0, 50.0);
        hungry.hunger_mut().set(0.6);
        sated.tick_resources(4.0);
        hungry.tick_resources(4.0);
        assert!((sated.energy().value() - (1.0 - 0.004)).abs() < 1e-6);
        assert!((hungry.energy().value() - (1.0 - 0.008)).abs() < 1e-6);
        assert_eq!(hungry.health_action(), HealthAction::Neutral);
    }

    #[test]
    fn critical_hunger_drains_health_until_death_is_terminal() {
        let mut creature = creature_at(50.0, 50.0);
        creature.hunger_mut().set(0.95);
        creature.health_mut().set(0.015);
        creature.tick_resources(0.0);
        assert_eq!(creature.health_action(), HealthAction::Loss);
        assert!((creature.health().value() - 0.005).abs() < 1e-6);
        creature.tick_resources(0.0);
        assert!(creature.is_dead());

        creature.eat(1.0);
        assert_eq!(creature.hunger_state(), HungerState::Good);
        creature.tick_resources(0.0);
        assert!(creature.is_dead(), "death must be one-way");
        assert_eq!(creature.health_action(), HealthAction::Neutral);
    }

    #[test]
    fn eat_reduces_hunger_and_recharges_energy() {
        let mut creature = creature_at(50.0, 50.0);
        creature.hunger_mut().set(0.3);
        creature.energy_mut().set(0.8);
        creature.eat(0.4);
        assert_eq!(creature.hunger().value(), 0.0);
        assert_eq!(creature.energy().value(), 1.0);
        creature.eat(-3.0);
        assert_eq!(creature.hunger().value(), 0.0);
    }

    #[test]
    fn position_history_is_bounded() {
        let mut creature = creature_at(50.0, 50.0);
        for _ in 0..20 {
            creature.apply_action(Action::idle(), 100.0, 100.0);
        }
        assert_eq!(creature.history().count(), 5);
        assert_eq!(creature.repeat_count(Vec2::new(50.04, 49.96)), 5);
    }

    #[test]
    fn resources_stay_in_range_under_random_sequences() {
        let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
        for _ in 0..10_000 {
            let mut creature = creature_at(rng.random_range(0.0..100.0), rng.random_range(0.0..100.0));
            for _ in 0..8 {
                let action = Action::new(
                    rng.random_range(-10.0..10.0),
                    rng.random_range(-10.0..10.0),
                    rng.random_range(-10.0..20.0),
                );
                let report = creature.apply_action(action, 100.0, 100.0);
                creature.tick_resources(report.distance);
                if rng.random::<f32>() < 0.1 {
                    creature.eat(rng.random_range(-1.0..2.0));
                }
                for track in [creature.hunger(), creature.energy(), creature.health()] {
                    assert!(track.value() >= 0.0 && track.value() <= track.max());
                }
            }
        }
    }

    #[test]
    fn hunger_never_decreases_without_eating() {
        let mut rng = SmallRng::seed_from_u64(99);
        let mut creature = creature_at(50.0, 50.0);
        let mut previous = creature.hunger().value();
        for _ in 0..2_000 {
            let action = Action::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(0.0..6.0),
            );
            let report = creature.apply_action(action, 100.0, 100.0);
            creature.tick_resources(report.distance);
            assert!(creature.hunger().value() >= previous);
            previous = creature.hunger().value();
        }
    }
}
