//! Food items scattered across the arena.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::Vec2;

/// A food item. Eating it respawns it elsewhere instead of destroying it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Food {
    pub position: Vec2,
    /// Nutrition in `(0, 1]`.
    pub nutrition: f32,
}

impl Food {
    /// Sample a food item uniformly inside a `width x height` arena.
    pub fn random(rng: &mut dyn RngCore, width: f32, height: f32) -> Self {
        let mut food = Self {
            position: Vec2::ZERO,
            nutrition: 1.0,
        };
        food.respawn(rng, width, height);
        food
    }

    /// Move to a new random position and draw a new nutrition value.
    pub fn respawn(&mut self, rng: &mut dyn RngCore, width: f32, height: f32) {
        self.position = Vec2::new(
            rng.random_range(0.0..=width),
            rng.random_range(0.0..=height),
        );
        // `random` yields [0, 1); flipping it gives (0, 1].
        self.nutrition = 1.0 - rng.random::<f32>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn respawn_stays_in_bounds_with_positive_nutrition() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut food = Food::random(&mut rng, 100.0, 50.0);
        for _ in 0..1_000 {
            food.respawn(&mut rng, 100.0, 50.0);
            assert!((0.0..=100.0).contains(&food.position.x));
            assert!((0.0..=50.0).contains(&food.position.y));
            assert!(food.nutrition > 0.0 && food.nutrition <= 1.0);
        }
    }
}
