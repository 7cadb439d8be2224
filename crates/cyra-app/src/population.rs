//! Fixed-size population of policy agents with elitist clone-and-mutate replacement.

use rand::RngCore;
use rayon::prelude::*;
use tracing::debug;

use cyra_brain::{Brain, LearnReport, PolicyAgent, PolicyConfig, PolicyError};

/// Index of the highest cumulative reward; the first index wins ties and non-finite totals never win.
#[must_use]
pub fn select_elite(rewards: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &reward) in rewards.iter().enumerate() {
        if !reward.is_finite() {
            continue;
        }
        match best {
            Some((_, current)) if reward <= current => {}
            _ => best = Some((index, reward)),
        }
    }
    best.map(|(index, _)| index)
}

/// One policy agent per creature slot.
#[derive(Debug, Clone)]
pub struct Population {
    agents: Vec<PolicyAgent>,
}

impl Population {
    /// `size` freshly initialized agents sharing one configuration.
    pub fn new(
        size: usize,
        config: &PolicyConfig,
        rng: &mut dyn RngCore,
    ) -> Result<Self, PolicyError> {
        let agents = (0..size)
            .map(|_| PolicyAgent::new(config.clone(), rng))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { agents })
    }

    #[must_use]
    pub fn agents(&self) -> &[PolicyAgent] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [PolicyAgent] {
        &mut self.agents
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Run every agent's episodic update in parallel; agents share no state.
    pub fn learn_all(&mut self) -> Result<Vec<Option<LearnReport>>, PolicyError> {
        self.agents
            .par_iter_mut()
            .map(PolicyAgent::learn)
            .collect()
    }

    pub fn discard_trajectories(&mut self) {
        for agent in &mut self.agents {
            agent.discard_trajectory();
        }
    }

    /// Keep `elite` untouched and replace every other slot with a mutated copy of it.
    pub fn repopulate(
        &mut self,
        elite: usize,
        mutation_rate: f32,
        mutation_std: f32,
        rng: &mut dyn RngCore,
    ) {
        let Some(parent) = self.agents.get(elite).cloned() else {
            return;
        };
        for (index, slot) in self.agents.iter_mut().enumerate() {
            if index == elite {
                continue;
            }
            let mut child = parent.offspring();
            child.mutate(rng, mutation_rate, mutation_std);
            *slot = child;
        }
        debug!(elite, size = self.agents.len(), "population repopulated from elite");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn small_policy() -> PolicyConfig {
        PolicyConfig {
            hidden_sizes: vec![8],
            ..PolicyConfig::default()
        }
    }

    #[test]
    fn elite_is_the_argmax() {
        assert_eq!(select_elite(&[3.0, 7.5, -1.0]), Some(1));
        assert_eq!(select_elite(&[2.0, 2.0]), Some(0));
        assert_eq!(select_elite(&[f32::NAN, -4.0]), Some(1));
        assert_eq!(select_elite(&[f32::INFINITY, 1.0]), Some(1));
        assert_eq!(select_elite(&[-2.0, f32::NEG_INFINITY]), Some(0));
        assert_eq!(select_elite(&[f32::NAN, f32::NEG_INFINITY]), None);
        assert_eq!(select_elite(&[]), None);
    }

    #[test]
    fn repopulate_keeps_elite_and_mutates_the_rest() {
        let mut rng = SmallRng::seed_from_u64(31);
        let mut population = Population::new(3, &small_policy(), &mut rng).expect("population");
        let rewards = [3.0, 7.5, -1.0];
        let elite = select_elite(&rewards).expect("elite");
        let elite_actor = population.agents()[elite].actor().clone();
        let elite_critic = population.agents()[elite].critic().clone();

        population.repopulate(elite, 1.0, 0.02, &mut rng);

        assert_eq!(population.agents()[1].actor(), &elite_actor);
        assert_eq!(population.agents()[1].critic(), &elite_critic);
        for index in [0, 2] {
            let agent = &population.agents()[index];
            assert_eq!(agent.actor().topology(), elite_actor.topology());
            assert_ne!(agent.actor(), &elite_actor);
            assert_ne!(agent.critic(), &elite_critic);
        }
        assert_ne!(population.agents()[0].actor(), population.agents()[2].actor());
    }

    #[test]
    fn zero_mutation_rate_yields_exact_clones() {
        let mut rng = SmallRng::seed_from_u64(32);
        let mut population = Population::new(2, &small_policy(), &mut rng).expect("population");
        population.repopulate(0, 0.0, 0.02, &mut rng);
        assert_eq!(population.agents()[0].actor(), population.agents()[1].actor());
    }

    #[test]
    fn parallel_learn_flushes_every_agent() {
        let mut rng = SmallRng::seed_from_u64(33);
        let mut population = Population::new(4, &small_policy(), &mut rng).expect("population");
        let observation = vec![0.25; cyra_core::OBSERVATION_SIZE];
        for agent in population.agents_mut() {
            for step in 0..5 {
                agent.select_action(&observation, &mut rng).expect("action");
                agent.store_reward(step as f32);
            }
        }
        let reports = population.learn_all().expect("learn");
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(Option::is_some));
        assert!(population.agents().iter().all(|a| a.trajectory_len() == 0));
    }
}
