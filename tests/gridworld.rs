#![cfg(feature = "gym")]

use float_eq::assert_float_eq;
use tabrl::{
    algo::{PolicyEvaluation, PolicyIteration, QValueIteration},
    env::Mdp,
    gym::{GridAction, Gridworld},
    util::seeded,
    Agent, AgentConfig, Policy,
};

fn config() -> AgentConfig {
    AgentConfig::default().discount(0.9)
}

#[test]
fn value_iteration_and_policy_iteration_agree() {
    for grid in [Gridworld::book(), Gridworld::bridge(), Gridworld::maze(), Gridworld::discount()] {
        let mut qvi = Agent::new(
            grid.clone(),
            QValueIteration::new(1e-6, 10_000),
            config(),
            seeded(0),
        )
        .unwrap();
        qvi.run().unwrap();
        let mut pi =
            Agent::new(grid.clone(), PolicyIteration::default(), config(), seeded(0)).unwrap();
        pi.run().unwrap();

        for state in grid.states() {
            assert_float_eq!(qvi.value(&state), pi.value(&state), abs <= 1e-3);
        }
    }
}

#[test]
fn policy_iteration_dominates_its_starting_policy() {
    let grid = Gridworld::book();
    let start = Policy::SingleAction(GridAction::North);

    let mut fixed = Agent::with_policy(
        grid.clone(),
        PolicyEvaluation::new(1e-6, 10_000),
        start.clone(),
        config(),
        seeded(0),
    )
    .unwrap();
    fixed.run().unwrap();
    let mut improved = Agent::with_policy(
        grid.clone(),
        PolicyIteration::default(),
        start,
        config(),
        seeded(0),
    )
    .unwrap();
    improved.run().unwrap();

    for state in grid.states() {
        assert!(improved.value(&state) >= fixed.value(&state) - 1e-6, "{state:?}");
    }
}

#[test]
fn living_penalty_shortens_the_path() {
    // with a harsh living penalty the agent prefers the -1 exit over the long way round
    let mut grid = Gridworld::book();
    grid.set_living_reward(-2.0);
    let mut agent = Agent::new(grid, QValueIteration::default(), config(), seeded(0)).unwrap();
    agent.run().unwrap();

    let state = tabrl::gym::GridState::Cell(2, 1);
    assert_eq!(agent.greedy_action(&state).unwrap(), Some(GridAction::East));
}

#[test]
fn model_discount_reaches_the_solver() {
    let solve = |grid: Gridworld| {
        let mut agent =
            Agent::new(grid, QValueIteration::default(), AgentConfig::default(), seeded(0))
                .unwrap();
        agent.run().unwrap();
        (agent.discount(), agent.value(&tabrl::gym::GridState::Cell(0, 0)))
    };

    let mut short_sighted = Gridworld::book();
    short_sighted.set_discount(0.5);
    let (discount, near) = solve(short_sighted);
    let (default_discount, far) = solve(Gridworld::book());

    assert_eq!(discount, 0.5);
    assert_eq!(default_discount, 0.9);
    assert!(near < far, "{near} should be below {far}");
}
