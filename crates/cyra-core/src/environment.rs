//! The arena step loop: perception, movement, resource tick, eating, and reward per creature.

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WorldConfig;
use crate::creature::Creature;
use crate::food::Food;
use crate::resource::{EnergyState, HealthAction, HealthState, HungerState};
use crate::reward::{RewardBreakdown, RewardEngine};
use crate::{Action, Vec2, WorldError};

/// Length of the per-creature observation vector.
///
/// Layout:
/// * `0..2`   position x / width, y / height
/// * `2..5`   hunger, energy, health as fractions of their max
/// * `5`      last speed / max speed
/// * `6..9`   hunger state one-hot (good, hungry, critical)
/// * `9..12`  energy state one-hot (good, weary, critical)
/// * `12..16` health state one-hot (good, wounded, critical, dead)
/// * `16`     nearest food distance / perception radius (1.0 when none)
/// * `17..19` unit direction to nearest food (zero when none)
/// * `19..23` distance to left, right, top, bottom border, normalized
pub const OBSERVATION_SIZE: usize = 23;

pub type Observation = [f32; OBSERVATION_SIZE];

/// Lifecycle of an episode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EpisodeState {
    /// Waiting for the first `reset`.
    #[default]
    Reset,
    Running,
    Done,
}

/// Pre/post view of one creature's tick, consumed by the reward engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSnapshot {
    pub food_in_view: usize,
    /// Pre-move distance to the nearest detected food.
    pub old_food_distance: Option<f32>,
    /// Post-move distance to that same food item.
    pub new_food_distance: Option<f32>,
    pub ate: bool,
    /// Hunger state at the moment of eating (after the resource tick).
    pub hunger_at_eat: HungerState,
    pub hunger: HungerState,
    pub energy: EnergyState,
    pub health: HealthState,
    pub health_action: HealthAction,
    pub was_dead: bool,
    pub old_border_distance: f32,
    pub new_border_distance: f32,
    pub old_direction: Vec2,
    pub new_direction: Vec2,
    pub touches_border: bool,
    /// Distance from the new position to the closest arena corner.
    pub corner_distance: f32,
    /// Occurrences of the rounded new position in the position history.
    pub repeat_count: usize,
}

/// Everything produced by one call to [`Environment::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observations: Vec<Observation>,
    pub rewards: Vec<f32>,
    pub breakdowns: Vec<RewardBreakdown>,
    /// Every creature is dead, or the step budget ran out.
    pub done: bool,
    /// The episode ended on the step budget rather than extinction.
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatureSprite {
    pub id: usize,
    pub position: Vec2,
    pub hunger: HungerState,
    pub energy: EnergyState,
    pub health: HealthState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodSprite {
    pub position: Vec2,
    pub nutrition: f32,
}

/// Render-facing snapshot of the arena.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawState {
    pub width: f32,
    pub height: f32,
    pub step: u32,
    pub creatures: Vec<CreatureSprite>,
    pub foods: Vec<FoodSprite>,
}

/// One arena instance.
pub struct Environment {
    config: WorldConfig,
    engine: RewardEngine,
    rng: SmallRng,
    creatures: Vec<Creature>,
    foods: Vec<Food>,
    state: EpisodeState,
    steps: u32,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("creatures", &self.creatures.len())
            .field("foods", &self.foods.len())
            .finish()
    }
}

impl Environment {
    /// Validate `config` and build an environment waiting for `reset`.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let rng = config.seeded_rng();
        let engine = RewardEngine::new(config.rewards.clone());
        Ok(Self {
            config,
            engine,
            rng,
            creatures: Vec::new(),
            foods: Vec::new(),
            state: EpisodeState::Reset,
            steps: 0,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[must_use]
    pub const fn reward_engine(&self) -> &RewardEngine {
        &self.engine
    }

    #[must_use]
    pub const fn state(&self) -> EpisodeState {
        self.state
    }

    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }

    #[must_use]
    pub fn creatures(&self) -> &[Creature] {
        &self.creatures
    }

    pub fn creatures_mut(&mut self) -> &mut [Creature] {
        &mut self.creatures
    }

    #[must_use]
    pub fn foods(&self) -> &[Food] {
        &self.foods
    }

    pub fn foods_mut(&mut self) -> &mut [Food] {
        &mut self.foods
    }

    /// Recreate every creature and food item and start a new episode.
    pub fn reset(&mut self) -> Vec<Observation> {
        let width = self.config.arena_width;
        let height = self.config.arena_height;
        let centre = Vec2::new(width / 2.0, height / 2.0);
        let mut creatures = Vec::with_capacity(self.config.creature_count);
        for id in 0..self.config.creature_count {
            let spawn = if self.config.random_spawn {
                Vec2::new(
                    self.rng.random_range(0.0..=width),
                    self.rng.random_range(0.0..=height),
                )
            } else {
                centre
            };
            creatures.push(Creature::new(id, spawn, &self.config.creature));
        }
        self.creatures = creatures;
        self.foods = (0..self.config.food_count)
            .map(|_| Food::random(&mut self.rng, width, height))
            .collect();
        self.state = EpisodeState::Running;
        self.steps = 0;
        debug!(
            creatures = self.creatures.len(),
            foods = self.foods.len(),
            "environment reset"
        );
        self.observations()
    }

    /// Advance every creature by one tick, in population order.
    pub fn step(&mut self, actions: &[Action]) -> Result<StepOutcome, WorldError> {
        match self.state {
            EpisodeState::Reset => return Err(WorldError::NotReset),
            EpisodeState::Done => return Err(WorldError::EpisodeFinished),
            EpisodeState::Running => {}
        }
        if actions.len() != self.creatures.len() {
            return Err(WorldError::ActionCount {
                expected: self.creatures.len(),
                actual: actions.len(),
            });
        }

        let mut rewards = Vec::with_capacity(actions.len());
        let mut breakdowns = Vec::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            let snapshot = self.advance_creature(index, *action);
            let breakdown = self.engine.compute(&snapshot);
            rewards.push(breakdown.total());
            breakdowns.push(breakdown);
        }
        self.steps += 1;

        let extinct = self.creatures.iter().all(Creature::is_dead);
        let truncated = !extinct && self.steps >= self.config.max_steps;
        let done = extinct || truncated;
        if done {
            self.state = EpisodeState::Done;
            debug!(steps = self.steps, extinct, "episode finished");
        }

        Ok(StepOutcome {
            observations: self.observations(),
            rewards,
            breakdowns,
            done,
            truncated,
        })
    }

    fn advance_creature(&mut self, index: usize, action: Action) -> TransitionSnapshot {
        let width = self.config.arena_width;
        let height = self.config.arena_height;
        let positions: Vec<Vec2> = self.creatures.iter().map(Creature::position).collect();
        let creature = &mut self.creatures[index];
        let was_dead = creature.is_dead();

        creature.perceive(&self.foods, &positions);
        let food_in_view = creature.food_in_view();
        let target = creature.nearest_food_entity().copied();
        let old_border_distance = Creature::border_distance(creature.position(), width, height);

        let report = creature.apply_action(action, width, height);
        let new_food_distance = target.map(|food| report.new_position.distance(food.position));

        creature.tick_resources(report.distance);
        let hunger_at_eat = creature.hunger_state();

        let mut ate = false;
        if let (Some(food), Some(distance)) = (target, new_food_distance) {
            let reachable = distance < self.config.eat_threshold && !creature.is_dead();
            if let (true, Some(slot)) = (reachable, food.food_index()) {
                // An earlier creature may already have eaten and respawned this item.
                if self.foods[slot].position == food.position {
                    creature.eat(self.foods[slot].nutrition);
                    self.foods[slot].respawn(&mut self.rng, width, height);
                    ate = true;
                }
            }
        }

        let new_position = report.new_position;
        let corner_distance = [
            Vec2::ZERO,
            Vec2::new(width, 0.0),
            Vec2::new(0.0, height),
            Vec2::new(width, height),
        ]
        .into_iter()
        .map(|corner| corner.distance(new_position))
        .fold(f32::INFINITY, f32::min);

        TransitionSnapshot {
            food_in_view,
            old_food_distance: target.map(|food| food.distance),
            new_food_distance,
            ate,
            hunger_at_eat,
            hunger: creature.hunger_state(),
            energy: creature.energy_state(),
            health: creature.health_state(),
            health_action: creature.health_action(),
            was_dead,
            old_border_distance,
            new_border_distance: Creature::border_distance(new_position, width, height),
            old_direction: report.old_direction,
            new_direction: report.new_direction,
            touches_border: Creature::touches_border(new_position, width, height),
            corner_distance,
            repeat_count: creature.repeat_count(new_position),
        }
    }

    /// Refresh perception and encode an observation per creature.
    pub fn observations(&mut self) -> Vec<Observation> {
        let positions: Vec<Vec2> = self.creatures.iter().map(Creature::position).collect();
        for creature in &mut self.creatures {
            creature.perceive(&self.foods, &positions);
        }
        self.creatures
            .iter()
            .map(|creature| self.observe(creature))
            .collect()
    }

    fn observe(&self, creature: &Creature) -> Observation {
        let width = self.config.arena_width;
        let height = self.config.arena_height;
        let position = creature.position();
        let mut obs = [0.0; OBSERVATION_SIZE];

        obs[0] = position.x / width;
        obs[1] = position.y / height;
        obs[2] = creature.hunger().fraction();
        obs[3] = creature.energy().fraction();
        obs[4] = creature.health().fraction();
        obs[5] = if creature.max_speed() > 0.0 {
            creature.last_speed() / creature.max_speed()
        } else {
            0.0
        };
        obs[6 + creature.hunger_state().index()] = 1.0;
        obs[9 + creature.energy_state().index()] = 1.0;
        obs[12 + creature.health_state().index()] = 1.0;

        match creature.nearest_food_entity() {
            Some(food) if food.distance <= creature.perception_radius() => {
                obs[16] = food.distance / creature.perception_radius();
                let direction = (food.position - position).normalized();
                obs[17] = direction.x;
                obs[18] = direction.y;
            }
            _ => obs[16] = 1.0,
        }

        obs[19] = position.x / width;
        obs[20] = (width - position.x) / width;
        obs[21] = position.y / height;
        obs[22] = (height - position.y) / height;
        obs
    }

    /// Positions and discrete states for rendering.
    #[must_use]
    pub fn draw_state(&self) -> DrawState {
        DrawState {
            width: self.config.arena_width,
            height: self.config.arena_height,
            step: self.steps,
            creatures: self
                .creatures
                .iter()
                .map(|creature| CreatureSprite {
                    id: creature.id(),
                    position: creature.position(),
                    hunger: creature.hunger_state(),
                    energy: creature.energy_state(),
                    health: creature.health_state(),
                })
                .collect(),
            foods: self
                .foods
                .iter()
                .map(|food| FoodSprite {
                    position: food.position,
                    nutrition: food.nutrition,
                })
                .collect(),
        }
    }
}
