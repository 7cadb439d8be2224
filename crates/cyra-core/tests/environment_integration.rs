use cyra_core::{
    Action, Environment, EpisodeState, HealthState, OBSERVATION_SIZE, RewardConfig, RewardSignal,
    WorldConfig, WorldError,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_actions(rng: &mut SmallRng, count: usize) -> Vec<Action> {
    (0..count)
        .map(|_| {
            Action::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-2.0..8.0),
            )
        })
        .collect()
}

#[test]
fn seeded_environments_advance_identically() {
    let config = WorldConfig {
        rng_seed: Some(0xDEADBEEF),
        max_steps: 200,
        ..WorldConfig::default()
    };
    let mut a = Environment::new(config.clone()).expect("env a");
    let mut b = Environment::new(config).expect("env b");
    assert_eq!(a.reset(), b.reset());

    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..200 {
        let actions = random_actions(&mut rng, a.creatures().len());
        let left = a.step(&actions).expect("step a");
        let right = b.step(&actions).expect("step b");
        assert_eq!(left, right);
        if left.done {
            break;
        }
    }
    assert_eq!(a.draw_state(), b.draw_state());
}

#[test]
fn long_random_episode_keeps_invariants() {
    let config = WorldConfig {
        rng_seed: Some(11),
        max_steps: 2_000,
        rewards: RewardConfig::randomized(&mut SmallRng::seed_from_u64(1)),
        ..WorldConfig::default()
    };
    let (width, height) = (config.arena_width, config.arena_height);
    let mut env = Environment::new(config).expect("env");
    env.reset();
    let mut rng = SmallRng::seed_from_u64(3);
    let mut dead_seen = vec![false; env.creatures().len()];
    let mut death_penalties = vec![0_usize; env.creatures().len()];

    loop {
        let actions = random_actions(&mut rng, env.creatures().len());
        let outcome = env.step(&actions).expect("step");
        for (index, creature) in env.creatures().iter().enumerate() {
            let position = creature.position();
            assert!((0.0..=width).contains(&position.x));
            assert!((0.0..=height).contains(&position.y));
            for track in [creature.hunger(), creature.energy(), creature.health()] {
                assert!((0.0..=track.max()).contains(&track.value()));
            }
            if dead_seen[index] {
                assert_eq!(creature.health_state(), HealthState::Dead);
            }
            dead_seen[index] = creature.is_dead();
            if outcome.breakdowns[index].contains(RewardSignal::Death) {
                death_penalties[index] += 1;
            }
        }
        for obs in &outcome.observations {
            assert_eq!(obs.len(), OBSERVATION_SIZE);
            assert!(obs.iter().all(|v| v.is_finite()));
        }
        if outcome.done {
            break;
        }
    }
    assert!(death_penalties.iter().all(|&count| count <= 1));
    assert_eq!(env.state(), EpisodeState::Done);
    assert_eq!(
        env.step(&vec![Action::idle(); env.creatures().len()]),
        Err(WorldError::EpisodeFinished)
    );
}

#[test]
fn reset_recreates_the_arena() {
    let mut env = Environment::new(WorldConfig {
        rng_seed: Some(21),
        ..WorldConfig::default()
    })
    .expect("env");
    env.reset();
    let foods_before: Vec<_> = env.foods().to_vec();
    env.creatures_mut()[0].health_mut().set(0.0);
    env.reset();
    assert!(env.creatures().iter().all(|creature| !creature.is_dead()));
    assert_eq!(env.steps(), 0);
    assert_ne!(env.foods(), foods_before.as_slice());
}
