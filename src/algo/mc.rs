use log::{debug, warn};

use crate::{
    agent::{AgentState, Algorithm, Capabilities, Continuation},
    ds::{Hashable, VisitCount},
    env::Environment,
    error::Result,
    memory::{Exp, Trajectory},
    policy::Policy,
};

/// Summary of one Monte Carlo episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Episode {
    /// Number of environment steps taken
    pub steps: usize,
    /// Undiscounted sum of rewards
    pub total_reward: f64,
}

impl Continuation for Episode {
    /// One call runs a whole episode
    fn continues(&self) -> bool {
        false
    }
}

/// Follow the agent's policy from the environment's current state until a terminal state
///
/// With `explore`, actions are chosen epsilon-greedily at the agent's current exploration rate.
fn rollout<E: Environment>(agent: &mut AgentState<E>, explore: bool) -> Result<Trajectory<E>> {
    let mut trajectory = Trajectory::new();
    let mut state = agent.domain.current_state();
    while !agent.domain.is_terminal(&state) {
        let action = if explore {
            agent.epsilon_greedy_action(&state)?
        } else {
            agent.greedy_action(&state)?
        };
        let Some(action) = action else {
            warn!("non-terminal state {state:?} has no legal actions; ending the episode");
            break;
        };
        let (next_state, reward) = agent.domain.step(action.clone())?;
        trajectory.push(Exp {
            state,
            action,
            reward,
            next_state: next_state.clone(),
        });
        state = next_state;
    }
    Ok(trajectory)
}

/// Every-visit Monte Carlo prediction
///
/// Each call plays one full episode under the fixed policy and moves V(s) towards the realized
/// return after every visit of s, with step size 1/n(s).
#[derive(Debug, Clone)]
pub struct MonteCarloPrediction<S> {
    visits: VisitCount<S>,
}

impl<S: Hashable> MonteCarloPrediction<S> {
    pub fn new() -> Self {
        Self {
            visits: VisitCount::new(),
        }
    }

    pub fn visits(&self) -> &VisitCount<S> {
        &self.visits
    }
}

impl<S: Hashable> Default for MonteCarloPrediction<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> Algorithm<E> for MonteCarloPrediction<E::State> {
    type Output = Episode;

    fn capabilities(&self) -> Capabilities {
        Capabilities::PREDICTION
    }

    fn install_policy(
        &self,
        given: Option<Policy<E::State, E::Action>>,
        _agent: &mut AgentState<E>,
    ) -> Result<Policy<E::State, E::Action>> {
        Ok(given.unwrap_or(Policy::Random))
    }

    /// Play one episode from the environment's current state and update V
    fn run(&mut self, agent: &mut AgentState<E>) -> Result<Episode> {
        let trajectory = rollout(agent, false)?;
        for (exp, ret) in trajectory.backward_returns(agent.discount) {
            let n = self.visits.increment(exp.state.clone());
            let value = agent.values.get_mut(exp.state.clone());
            *value += (ret - *value) / n as f64;
        }

        let episode = Episode {
            steps: trajectory.len(),
            total_reward: trajectory.total_reward(),
        };
        debug!("episode {}: {episode:?}", agent.episode);
        Ok(episode)
    }
}

/// Every-visit on-policy Monte Carlo control
///
/// Behaves epsilon-greedily with respect to its own Q values, so every episode is one step of
/// evaluation and improvement at once. Exploration decays per episode through the agent's
/// epsilon schedule.
#[derive(Debug, Clone)]
pub struct MonteCarloControl<S, A> {
    visits: VisitCount<(S, A)>,
}

impl<S: Hashable, A: Hashable> MonteCarloControl<S, A> {
    pub fn new() -> Self {
        Self {
            visits: VisitCount::new(),
        }
    }

    pub fn visits(&self) -> &VisitCount<(S, A)> {
        &self.visits
    }
}

impl<S: Hashable, A: Hashable> Default for MonteCarloControl<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> Algorithm<E> for MonteCarloControl<E::State, E::Action> {
    type Output = Episode;

    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTROL
    }

    fn install_policy(
        &self,
        given: Option<Policy<E::State, E::Action>>,
        _agent: &mut AgentState<E>,
    ) -> Result<Policy<E::State, E::Action>> {
        if given.is_some() {
            warn!("Monte Carlo control acts on its own Q values; ignoring the supplied policy");
        }
        Ok(Policy::FromQValues)
    }

    /// Play one epsilon-greedy episode and update Q
    fn run(&mut self, agent: &mut AgentState<E>) -> Result<Episode> {
        let trajectory = rollout(agent, true)?;
        for (exp, ret) in trajectory.backward_returns(agent.discount) {
            let n = self.visits.increment((exp.state.clone(), exp.action.clone()));
            let q = agent.q_values.get_mut(exp.state.clone(), exp.action.clone());
            *q += (ret - *q) / n as f64;
        }

        let episode = Episode {
            steps: trajectory.len(),
            total_reward: trajectory.total_reward(),
        };
        debug!("episode {}: {episode:?}, epsilon = {}", agent.episode, agent.epsilon());
        Ok(episode)
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::{
        agent::{Agent, AgentConfig},
        env::{
            tests::{chain, fork},
            MdpEnvironment,
        },
        schedule::Schedule,
        util::seeded,
    };

    #[test]
    fn prediction_on_deterministic_chain() {
        let env = MdpEnvironment::new(chain(0.9), seeded(0));
        let mut agent = Agent::new(
            env,
            MonteCarloPrediction::new(),
            AgentConfig::default(),
            seeded(1),
        )
        .unwrap();

        agent.train(3).unwrap();

        assert_float_eq!(agent.value(&1), 10.0, abs <= 1e-12);
        assert_float_eq!(agent.value(&0), 9.0, abs <= 1e-12);
        assert_eq!(agent.episodes(), 3);
        assert_eq!(agent.algorithm().visits().get(&0), 3);
    }

    #[test]
    fn returns_are_discounted_backwards() {
        // G(1) = 2, G(0) = 1 + 0.5 * 2
        let mdp = crate::env::MdpBuilder::new(0)
            .transition(0, 'a', 1, 1.0, 1.0)
            .transition(1, 'a', 2, 1.0, 2.0)
            .terminal(2)
            .build()
            .unwrap();
        let env = MdpEnvironment::new(mdp, seeded(0));
        let mut agent = Agent::new(
            env,
            MonteCarloPrediction::new(),
            AgentConfig::default().discount(0.5),
            seeded(0),
        )
        .unwrap();

        agent.reset();
        agent.new_episode().unwrap();
        let episode = agent.run().unwrap();

        assert_eq!(episode.steps, 2);
        assert_eq!(episode.total_reward, 3.0);
        assert!(!episode.continues());
        assert_eq!(agent.value(&1), 2.0);
        assert_eq!(agent.value(&0), 2.0);
    }

    #[test]
    fn run_from_terminal_state_is_empty() {
        let mut env = MdpEnvironment::new(chain(0.9), seeded(0));
        env.step('a').unwrap();
        env.step('a').unwrap();
        let mut agent = Agent::new(
            env,
            MonteCarloPrediction::new(),
            AgentConfig::default(),
            seeded(0),
        )
        .unwrap();
        let episode = agent.run().unwrap();
        assert_eq!(episode.steps, 0);
        assert!(agent.state().values().is_empty());
    }

    #[test]
    fn control_learns_the_better_action() {
        let env = MdpEnvironment::new(fork(), seeded(0));
        let config = AgentConfig::default().epsilon(Schedule::constant(0.5));
        let mut agent = Agent::new(env, MonteCarloControl::new(), config, seeded(2)).unwrap();

        agent.train(200).unwrap();

        assert_eq!(agent.q_value(&0, &'g').unwrap(), 1.0);
        assert_eq!(agent.q_value(&0, &'b').unwrap(), -1.0);
        assert_eq!(agent.greedy_action(&0).unwrap(), Some('g'));
        assert_eq!(agent.value(&0), 1.0);
        assert_eq!(*agent.policy(), Policy::FromQValues);
    }
}
