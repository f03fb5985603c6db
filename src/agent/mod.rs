use log::{debug, warn};

use crate::{
    ds::{QTable, ValueTable},
    env::{DiscreteSpace, Environment},
    error::Result,
    policy::Policy,
    util::RandomSource,
};

mod config;
mod state;

pub use config::AgentConfig;
pub use state::AgentState;

/// Which tables an algorithm learns directly
///
/// The other table is derived on request: V(s) = Q(s, π(s)) for Q learners, and a one-step
/// lookahead for model-based value learners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub value_prediction: bool,
    pub q_control: bool,
}

impl Capabilities {
    pub const PREDICTION: Self = Self {
        value_prediction: true,
        q_control: false,
    };

    pub const CONTROL: Self = Self {
        value_prediction: false,
        q_control: true,
    };
}

/// An algorithm-specific update rule an [`Agent`] delegates to
///
/// One call to [`Algorithm::run`] is one unit of work for the algorithm: a full solve for
/// dynamic programming, one episode for Monte Carlo, one step for temporal-difference methods.
pub trait Algorithm<D: DiscreteSpace> {
    /// What [`Algorithm::run`] reports back
    type Output;

    fn capabilities(&self) -> Capabilities;

    /// The discount the domain itself prescribes, if it has one
    ///
    /// Model-based algorithms read it from the [`Mdp`](crate::env::Mdp) they solve.
    fn domain_discount(&self, _domain: &D) -> Option<f64> {
        None
    }

    /// Decide the policy the agent starts with, given the one the caller supplied (if any)
    fn install_policy(
        &self,
        given: Option<Policy<D::State, D::Action>>,
        agent: &mut AgentState<D>,
    ) -> Result<Policy<D::State, D::Action>>;

    /// Per-episode initialization, run after the episode counter and schedules are updated
    fn new_episode(&mut self, _agent: &mut AgentState<D>) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, agent: &mut AgentState<D>) -> Result<Self::Output>;

    fn value(&self, agent: &AgentState<D>, state: &D::State) -> f64 {
        if self.capabilities().value_prediction {
            agent.values.get(state)
        } else {
            agent.max_q_value(state)
        }
    }

    fn values(&self, agent: &AgentState<D>) -> Result<ValueTable<D::State>> {
        if self.capabilities().value_prediction {
            Ok(agent.values.clone())
        } else {
            Ok(agent
                .q_values
                .states()
                .map(|s| (s.clone(), agent.max_q_value(s)))
                .collect())
        }
    }

    fn q_value(&self, agent: &AgentState<D>, state: &D::State, action: &D::Action) -> Result<f64> {
        Ok(agent.q_values.get(state, action))
    }

    fn q_values(&self, agent: &AgentState<D>) -> Result<QTable<D::State, D::Action>> {
        Ok(agent.q_values.clone())
    }
}

/// Whether the output of an online [`Algorithm::run`] asks to be called again within the
/// same episode
pub trait Continuation {
    fn continues(&self) -> bool;
}

impl Continuation for bool {
    fn continues(&self) -> bool {
        *self
    }
}

/// A tabular agent: value tables, a policy and hyperparameter schedules, driven by an
/// [`Algorithm`]
///
/// ### Generics
/// - `D` - The domain: an [`Mdp`](crate::env::Mdp) for dynamic programming, an
///   [`Environment`] for sampling-based methods
/// - `L` - The algorithm
pub struct Agent<D: DiscreteSpace, L> {
    state: AgentState<D>,
    algorithm: L,
}

impl<D, L> Agent<D, L>
where
    D: DiscreteSpace,
    L: Algorithm<D>,
{
    /// Initialize an agent with the algorithm's default policy
    ///
    /// The discount is `config.discount` if set, else the domain's own discount, else
    /// [`AgentConfig::DEFAULT_DISCOUNT`].
    ///
    /// **Panics** if the resulting discount is not in `[0, 1)`
    pub fn new(domain: D, algorithm: L, config: AgentConfig, rng: RandomSource) -> Result<Self> {
        Self::build(domain, algorithm, None, config, rng)
    }

    /// Initialize an agent that follows (or, for policy iteration, starts from) `policy`
    ///
    /// Control algorithms always act greedily with respect to their own Q values and ignore
    /// `policy`.
    ///
    /// **Errors** with [`Error::KeyNotFound`](crate::Error::KeyNotFound) if a tabular policy does
    /// not cover a state the algorithm will query
    pub fn with_policy(
        domain: D,
        algorithm: L,
        policy: Policy<D::State, D::Action>,
        config: AgentConfig,
        rng: RandomSource,
    ) -> Result<Self> {
        Self::build(domain, algorithm, Some(policy), config, rng)
    }

    fn build(
        domain: D,
        algorithm: L,
        policy: Option<Policy<D::State, D::Action>>,
        config: AgentConfig,
        rng: RandomSource,
    ) -> Result<Self> {
        let domain_discount = algorithm.domain_discount(&domain);
        let discount = match (config.discount, domain_discount) {
            (Some(configured), Some(model)) => {
                if configured != model {
                    warn!("configured discount {configured} overrides the domain's {model}");
                }
                configured
            }
            (Some(configured), None) => configured,
            (None, Some(model)) => model,
            (None, None) => AgentConfig::DEFAULT_DISCOUNT,
        };
        assert!(
            (0.0..1.0).contains(&discount),
            "Invalid value for `discount`. Must be in the interval [0, 1)."
        );
        let mut state = AgentState {
            domain,
            discount,
            policy: Policy::Random,
            values: ValueTable::new(),
            q_values: QTable::new(),
            episode: 0,
            alpha: config.alpha,
            epsilon: config.epsilon,
            rng,
        };
        state.policy = algorithm.install_policy(policy, &mut state)?;
        Ok(Self { state, algorithm })
    }

    /// Begin a new episode: bump the episode counter, recompute the scheduled learning and
    /// exploration rates, then let the algorithm prepare
    pub fn new_episode(&mut self) -> Result<()> {
        let state = &mut self.state;
        state.episode += 1;
        let alpha = state.alpha.update(state.episode);
        let epsilon = state.epsilon.update(state.episode);
        debug!("episode {}: alpha = {alpha}, epsilon = {epsilon}", state.episode);
        self.algorithm.new_episode(state)
    }

    /// Run one unit of the algorithm's work
    pub fn run(&mut self) -> Result<L::Output> {
        self.algorithm.run(&mut self.state)
    }

    /// V(state)
    pub fn value(&self, state: &D::State) -> f64 {
        self.algorithm.value(&self.state, state)
    }

    /// The state values, derived from Q for control algorithms
    pub fn values(&self) -> Result<ValueTable<D::State>> {
        self.algorithm.values(&self.state)
    }

    /// Q(state, action)
    pub fn q_value(&self, state: &D::State, action: &D::Action) -> Result<f64> {
        self.algorithm.q_value(&self.state, state, action)
    }

    /// The action values, derived by lookahead for model-based prediction
    pub fn q_values(&self) -> Result<QTable<D::State, D::Action>> {
        self.algorithm.q_values(&self.state)
    }

    /// Q(state, ·) for every legal action, as reported by [`Agent::q_value`]
    pub fn action_values(&self, state: &D::State) -> Result<Vec<(D::Action, f64)>> {
        self.state
            .domain
            .actions(state)
            .into_iter()
            .map(|a| {
                let q = self.algorithm.q_value(&self.state, state, &a)?;
                Ok((a, q))
            })
            .collect()
    }

    pub fn policy(&self) -> &Policy<D::State, D::Action> {
        &self.state.policy
    }

    pub fn greedy_action(&mut self, state: &D::State) -> Result<Option<D::Action>> {
        self.state.greedy_action(state)
    }

    pub fn epsilon_greedy_action(&mut self, state: &D::State) -> Result<Option<D::Action>> {
        self.state.epsilon_greedy_action(state)
    }

    /// π(·|state)
    pub fn action_distribution(&self, state: &D::State) -> Result<Vec<(D::Action, f64)>> {
        self.state.action_distribution(state)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.algorithm.capabilities()
    }

    pub fn algorithm(&self) -> &L {
        &self.algorithm
    }

    pub fn state(&self) -> &AgentState<D> {
        &self.state
    }

    /// Direct access to the agent's tables, e.g. to seed Q values before learning
    pub fn state_mut(&mut self) -> &mut AgentState<D> {
        &mut self.state
    }

    pub fn domain(&self) -> &D {
        &self.state.domain
    }

    pub fn domain_mut(&mut self) -> &mut D {
        &mut self.state.domain
    }

    pub fn discount(&self) -> f64 {
        self.state.discount
    }

    /// Number of episodes started so far
    pub fn episodes(&self) -> u32 {
        self.state.episode
    }

    pub fn alpha(&self) -> f64 {
        self.state.alpha()
    }

    pub fn epsilon(&self) -> f64 {
        self.state.epsilon()
    }
}

impl<E, L> Agent<E, L>
where
    E: Environment,
    L: Algorithm<E>,
    L::Output: Continuation,
{
    /// Reset the environment to its start state
    pub fn reset(&mut self) -> E::State {
        self.state.domain.reset()
    }

    /// Run `episodes` full episodes: reset, start a new episode, and run the algorithm until
    /// it reports the episode is over
    ///
    /// Every episode must reach a terminal state in finitely many steps.
    pub fn train(&mut self, episodes: u32) -> Result<()> {
        for _ in 0..episodes {
            self.reset();
            self.new_episode()?;
            while self.run()?.continues() {}
        }
        Ok(())
    }
}
