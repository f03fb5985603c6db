use std::error::Error;

use tabrl::{
    algo::{PolicyIteration, QLearning, QValueIteration},
    decay::InverseTime,
    env::{Mdp, MdpEnvironment},
    gym::{GridState, Gridworld},
    util::seeded,
    Agent, AgentConfig, Schedule,
};

/// Print one number per square, top row first
fn print_grid(grid: &Gridworld, value: impl Fn(&GridState) -> Option<f64>) {
    for y in (0..grid.height()).rev() {
        let row = (0..grid.width())
            .map(|x| match value(&GridState::Cell(x, y)) {
                Some(v) => format!("{v:>7.2}"),
                None => format!("{:>7}", "#"),
            })
            .collect::<Vec<_>>();
        println!("{}", row.join(" "));
    }
    println!();
}

fn main() -> Result<(), Box<dyn Error>> {
    let grid = Gridworld::book();
    let open = |s: &GridState| grid.states().contains(s);
    let config = || AgentConfig::default().discount(0.9);

    let mut qvi = Agent::new(grid.clone(), QValueIteration::default(), config(), seeded(0))?;
    let sweeps = qvi.run()?;
    println!("Q-value iteration: {sweeps} sweeps");
    print_grid(&grid, |s| open(s).then(|| qvi.value(s)));

    let mut pi = Agent::new(grid.clone(), PolicyIteration::default(), config(), seeded(0))?;
    let rounds = pi.run()?;
    println!("Policy iteration: {rounds} rounds");
    print_grid(&grid, |s| open(s).then(|| pi.value(s)));

    let env = MdpEnvironment::new(grid.clone(), seeded(1));
    let config = config()
        .alpha(Schedule::constant(0.2))
        .epsilon(Schedule::decaying(InverseTime::new(0.5, 0.0, 0.01)?));
    let mut ql = Agent::new(env, QLearning::new(), config, seeded(2))?;
    ql.train(2000)?;
    println!("Q-learning after {} episodes (epsilon = {:.3})", ql.episodes(), ql.epsilon());
    print_grid(&grid, |s| open(s).then(|| ql.value(s)));

    Ok(())
}
