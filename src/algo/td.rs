use log::{trace, warn};

use crate::{
    agent::{AgentState, Algorithm, Capabilities},
    env::Environment,
    error::Result,
    policy::Policy,
};

/// Tabular TD(0) prediction
///
/// Each call takes one step under the agent's policy and moves V(s) towards
/// `r + γ V(s')`, with V(s') taken as 0 when s' is terminal.
#[derive(Debug, Clone, Default)]
pub struct TemporalDifference {
    steps: usize,
}

impl TemporalDifference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total steps taken across all episodes
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl<E: Environment> Algorithm<E> for TemporalDifference {
    type Output = bool;

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

    /// **Returns** `true` after a step, `false` without stepping when the current state is
    /// terminal or has no legal actions
    fn run(&mut self, agent: &mut AgentState<E>) -> Result<bool> {
        let state = agent.domain.current_state();
        if agent.domain.is_terminal(&state) {
            return Ok(false);
        }
        let Some(action) = agent.greedy_action(&state)? else {
            warn!("non-terminal state {state:?} has no legal actions; ending the episode");
            return Ok(false);
        };

        let (next_state, reward) = agent.domain.step(action)?;
        let done = agent.domain.is_terminal(&next_state);
        let bootstrap = if done { 0.0 } else { agent.values.get(&next_state) };
        let target = reward + agent.discount * bootstrap;

        let alpha = agent.alpha();
        let value = agent.values.get_mut(state.clone());
        *value += alpha * (target - *value);
        trace!("V({state:?}) <- {value} (target {target})");

        self.steps += 1;
        Ok(true)
    }
}

/// On-policy TD control
///
/// Both the acting and the bootstrapped action are chosen epsilon-greedily from the agent's
/// live Q values. The bootstrapped action is kept and taken on the next step, provided the
/// environment is still in the state it was chosen for.
#[derive(Debug, Clone)]
pub struct Sarsa<S, A> {
    pending: Option<(S, A)>,
    steps: usize,
}

impl<S, A> Sarsa<S, A> {
    pub fn new() -> Self {
        Self {
            pending: None,
            steps: 0,
        }
    }

    /// Total steps taken across all episodes
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl<S, A> Default for Sarsa<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> Algorithm<E> for Sarsa<E::State, E::Action> {
    type Output = bool;

    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTROL
    }

    fn install_policy(
        &self,
        given: Option<Policy<E::State, E::Action>>,
        _agent: &mut AgentState<E>,
    ) -> Result<Policy<E::State, E::Action>> {
        if given.is_some() {
            warn!("Sarsa acts on its own Q values; ignoring the supplied policy");
        }
        Ok(Policy::FromQValues)
    }

    /// Choose the first action of the episode
    fn new_episode(&mut self, agent: &mut AgentState<E>) -> Result<()> {
        let state = agent.domain.current_state();
        self.pending = agent.epsilon_greedy_action(&state)?.map(|a| (state, a));
        Ok(())
    }

    /// Take the pending action, or a fresh epsilon-greedy one if the environment moved
    ///
    /// **Returns** `true` after a step, `false` without stepping when the current state is
    /// terminal or has no legal actions
    fn run(&mut self, agent: &mut AgentState<E>) -> Result<bool> {
        let state = agent.domain.current_state();
        if agent.domain.is_terminal(&state) {
            self.pending = None;
            return Ok(false);
        }
        let action = match self.pending.take() {
            Some((s, a)) if s == state => Some(a),
            _ => agent.epsilon_greedy_action(&state)?,
        };
        let Some(action) = action else {
            warn!("non-terminal state {state:?} has no legal actions; ending the episode");
            return Ok(false);
        };

        let (next_state, reward) = agent.domain.step(action.clone())?;
        let done = agent.domain.is_terminal(&next_state);
        let next_action = if done {
            None
        } else {
            agent.epsilon_greedy_action(&next_state)?
        };
        let bootstrap = next_action
            .as_ref()
            .map_or(0.0, |a| agent.q_values.get(&next_state, a));
        let target = reward + agent.discount * bootstrap;

        let alpha = agent.alpha();
        let q = agent.q_values.get_mut(state.clone(), action.clone());
        *q += alpha * (target - *q);
        trace!("Q({state:?}, {action:?}) <- {q} (target {target})");

        self.pending = next_action.map(|a| (next_state, a));
        self.steps += 1;
        Ok(true)
    }
}

/// Off-policy TD control
///
/// Acts epsilon-greedily and bootstraps from the best action of the successor state.
#[derive(Debug, Clone, Default)]
pub struct QLearning {
    steps: usize,
}

impl QLearning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total steps taken across all episodes
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl<E: Environment> Algorithm<E> for QLearning {
    type Output = bool;

    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTROL
    }

    fn install_policy(
        &self,
        given: Option<Policy<E::State, E::Action>>,
        _agent: &mut AgentState<E>,
    ) -> Result<Policy<E::State, E::Action>> {
        if given.is_some() {
            warn!("Q-learning acts on its own Q values; ignoring the supplied policy");
        }
        Ok(Policy::FromQValues)
    }

    /// **Returns** `true` after a step, `false` without stepping when the current state is
    /// terminal or has no legal actions
    fn run(&mut self, agent: &mut AgentState<E>) -> Result<bool> {
        let state = agent.domain.current_state();
        if agent.domain.is_terminal(&state) {
            return Ok(false);
        }
        let Some(action) = agent.epsilon_greedy_action(&state)? else {
            warn!("non-terminal state {state:?} has no legal actions; ending the episode");
            return Ok(false);
        };

        let (next_state, reward) = agent.domain.step(action.clone())?;
        let done = agent.domain.is_terminal(&next_state);
        let bootstrap = if done { 0.0 } else { agent.max_q_value(&next_state) };
        let target = reward + agent.discount * bootstrap;

        let alpha = agent.alpha();
        let q = agent.q_values.get_mut(state.clone(), action.clone());
        *q += alpha * (target - *q);
        trace!("Q({state:?}, {action:?}) <- {q} (target {target})");

        self.steps += 1;
        Ok(true)
    }
}
