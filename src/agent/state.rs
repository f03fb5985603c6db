use crate::{
    ds::{QTable, ValueTable},
    env::DiscreteSpace,
    error::Result,
    policy::{argmax, Policy, PolicyView},
    schedule::Schedule,
    util::RandomSource,
};

/// Everything an agent owns, handed to its [`Algorithm`](super::Algorithm) on every call
///
/// The tables are private to the agent: algorithms write them, everyone else reads them
/// through [`Agent`](super::Agent).
pub struct AgentState<D: DiscreteSpace> {
    pub(crate) domain: D,
    pub(crate) discount: f64,
    pub(crate) policy: Policy<D::State, D::Action>,
    pub(crate) values: ValueTable<D::State>,
    pub(crate) q_values: QTable<D::State, D::Action>,
    pub(crate) episode: u32,
    pub(crate) alpha: Schedule,
    pub(crate) epsilon: Schedule,
    pub(crate) rng: RandomSource,
}

impl<D: DiscreteSpace> AgentState<D> {
    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn policy(&self) -> &Policy<D::State, D::Action> {
        &self.policy
    }

    pub fn values(&self) -> &ValueTable<D::State> {
        &self.values
    }

    pub fn q_values(&self) -> &QTable<D::State, D::Action> {
        &self.q_values
    }

    /// Number of episodes started so far
    pub fn episode(&self) -> u32 {
        self.episode
    }

    /// The current learning rate
    pub fn alpha(&self) -> f64 {
        self.alpha.value()
    }

    /// The current exploration rate
    pub fn epsilon(&self) -> f64 {
        self.epsilon.value()
    }

    pub fn values_mut(&mut self) -> &mut ValueTable<D::State> {
        &mut self.values
    }

    pub fn q_values_mut(&mut self) -> &mut QTable<D::State, D::Action> {
        &mut self.q_values
    }

    pub fn domain_mut(&mut self) -> &mut D {
        &mut self.domain
    }

    pub fn rng(&mut self) -> &mut RandomSource {
        &mut self.rng
    }

    pub(crate) fn view(&self) -> PolicyView<'_, D> {
        PolicyView {
            space: &self.domain,
            q_values: &self.q_values,
            epsilon: self.epsilon.value(),
        }
    }

    /// Stored Q(state, ·) for every legal action, in the domain's action order
    ///
    /// This is the row greedy policies choose from. Model-based prediction leaves it empty; use
    /// [`Agent::action_values`](crate::Agent::action_values) for its lookahead values.
    pub fn action_values(&self, state: &D::State) -> Vec<(D::Action, f64)> {
        let actions = self.domain.actions(state);
        self.q_values
            .row(state, &actions)
            .map(|(a, v)| (a.clone(), v))
            .collect()
    }

    /// max<sub>a</sub> Q(state, a), or `0.0` where there are no legal actions
    pub fn max_q_value(&self, state: &D::State) -> f64 {
        let actions = self.domain.actions(state);
        argmax(self.q_values.row(state, &actions))
            .map(|(_, v)| v)
            .unwrap_or_default()
    }

    pub fn greedy_action(&mut self, state: &D::State) -> Result<Option<D::Action>> {
        let view = PolicyView {
            space: &self.domain,
            q_values: &self.q_values,
            epsilon: self.epsilon.value(),
        };
        self.policy.greedy_action(view, state, &mut self.rng)
    }

    /// Epsilon-greedy selection at the agent's current exploration rate
    pub fn epsilon_greedy_action(&mut self, state: &D::State) -> Result<Option<D::Action>> {
        let view = PolicyView {
            space: &self.domain,
            q_values: &self.q_values,
            epsilon: self.epsilon.value(),
        };
        self.policy.epsilon_greedy_action(view, state, None, &mut self.rng)
    }

    pub fn action_distribution(&self, state: &D::State) -> Result<Vec<(D::Action, f64)>> {
        self.policy.probabilities(self.view(), state)
    }
}
