use log::{debug, info, warn};

use crate::{
    agent::{AgentState, Algorithm, Capabilities},
    ds::{QTable, ValueTable},
    env::Mdp,
    error::{Error, Result},
    policy::{argmax, Policy, PolicyView, TabularPolicy},
};

/// Slack within which policy improvement treats an action as tied with the incumbent
const IMPROVEMENT_TOLERANCE: f64 = 1e-9;

/// One-step lookahead Σ<sub>s'</sub> P(s'|s,a)·(R(s,a,s') + γV(s'))
fn lookahead<M: Mdp>(
    mdp: &M,
    discount: f64,
    state: &M::State,
    action: &M::Action,
    value: impl Fn(&M::State) -> f64,
) -> Result<f64> {
    let mut q = 0.0;
    for (next_state, prob) in mdp.transitions(state, action)? {
        if prob == 0.0 {
            continue;
        }
        q += prob * (mdp.reward(state, action, &next_state) + discount * value(&next_state));
    }
    Ok(q)
}

/// Q(s, a) derived from the agent's state values by one lookahead step
fn lookahead_from_values<M: Mdp>(
    agent: &AgentState<M>,
    state: &M::State,
    action: &M::Action,
) -> Result<f64> {
    lookahead(&agent.domain, agent.discount, state, action, |s| agent.values.get(s))
}

/// [`lookahead_from_values`] for every legal state-action pair of the model
fn q_table_from_values<M: Mdp>(agent: &AgentState<M>) -> Result<QTable<M::State, M::Action>> {
    let mut q_values = QTable::new();
    for state in agent.domain.states() {
        for action in agent.domain.actions(&state) {
            let q = lookahead_from_values(agent, &state, &action)?;
            q_values.set(state.clone(), action, q);
        }
    }
    Ok(q_values)
}

/// Stop once successive sweeps differ by less than ε(1−γ)/γ; any sweep suffices when γ = 0
fn stopping_threshold(error_threshold: f64, discount: f64) -> f64 {
    if discount == 0.0 {
        f64::INFINITY
    } else {
        error_threshold * (1.0 - discount) / discount
    }
}

fn tabular_over<M: Mdp>(
    given: Option<Policy<M::State, M::Action>>,
    agent: &mut AgentState<M>,
) -> Result<TabularPolicy<M::State, M::Action>> {
    let states = agent.domain.states();
    let table = match given {
        None => return Ok(TabularPolicy::random(states, &agent.domain, &mut agent.rng)),
        Some(Policy::Tabular(table)) => {
            table.validate(states.iter().filter(|s| !agent.domain.is_terminal(s)))?;
            table
        }
        Some(policy) => {
            // materialize any other rule once, state by state
            let mut table = TabularPolicy::new(Default::default());
            for state in &states {
                let view = PolicyView {
                    space: &agent.domain,
                    q_values: &agent.q_values,
                    epsilon: agent.epsilon.value(),
                };
                let action = policy.greedy_action(view, state, &mut agent.rng)?;
                table.set(state.clone(), action);
            }
            table
        }
    };
    Ok(table.fill(states, &agent.domain, &mut agent.rng))
}

/// Iterative policy evaluation
///
/// Computes V<sup>π</sup> for a fixed policy with synchronous sweeps: every state in a sweep is
/// backed up from the value table as it was at the start of that sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyEvaluation {
    /// Target approximation error of the values
    ///
    /// **Default**: `0.001`
    pub error_threshold: f64,
    /// Upper bound on sweeps
    ///
    /// **Default**: `1000`
    pub max_iters: usize,
}

impl Default for PolicyEvaluation {
    fn default() -> Self {
        Self {
            error_threshold: 0.001,
            max_iters: 1000,
        }
    }
}

impl PolicyEvaluation {
    pub fn new(error_threshold: f64, max_iters: usize) -> Self {
        Self {
            error_threshold,
            max_iters,
        }
    }

    /// One synchronous sweep over all non-terminal states
    ///
    /// **Returns** the largest absolute change of any value
    fn sweep<M: Mdp>(&self, agent: &mut AgentState<M>) -> Result<f64> {
        let previous = agent.values.clone();
        let mut delta: f64 = 0.0;
        for state in agent.domain.states() {
            if agent.domain.is_terminal(&state) {
                continue;
            }
            let mut value = 0.0;
            for (action, prob) in agent.policy.probabilities(agent.view(), &state)? {
                if prob == 0.0 {
                    continue;
                }
                let q = lookahead(&agent.domain, agent.discount, &state, &action, |s| {
                    previous.get(s)
                })?;
                value += prob * q;
            }
            delta = delta.max((previous.get(&state) - value).abs());
            agent.values.set(state, value);
        }
        Ok(delta)
    }

    /// Sweep until converged or `max_iters` sweeps have run
    ///
    /// **Returns** the number of sweeps performed. Reaching `max_iters` is not an error; the
    /// values are then a best-effort estimate.
    pub fn evaluate<M: Mdp>(&self, agent: &mut AgentState<M>) -> Result<usize> {
        let threshold = stopping_threshold(self.error_threshold, agent.discount);
        for sweep in 1..=self.max_iters {
            let delta = self.sweep(agent)?;
            debug!("policy evaluation sweep {sweep}: delta = {delta}");
            if delta < threshold {
                info!("policy evaluation converged after {sweep} sweeps");
                return Ok(sweep);
            }
        }
        warn!("policy evaluation stopped at max_iters = {} without converging", self.max_iters);
        Ok(self.max_iters)
    }
}

impl<M: Mdp> Algorithm<M> for PolicyEvaluation {
    type Output = usize;

    fn capabilities(&self) -> Capabilities {
        Capabilities::PREDICTION
    }

    fn domain_discount(&self, mdp: &M) -> Option<f64> {
        Some(mdp.discount())
    }

    fn install_policy(
        &self,
        given: Option<Policy<M::State, M::Action>>,
        agent: &mut AgentState<M>,
    ) -> Result<Policy<M::State, M::Action>> {
        let policy = given.unwrap_or(Policy::Random);
        if let Policy::Tabular(table) = &policy {
            let states = agent.domain.states();
            table.validate(states.iter().filter(|s| !agent.domain.is_terminal(s)))?;
        }
        Ok(policy)
    }

    fn run(&mut self, agent: &mut AgentState<M>) -> Result<usize> {
        self.evaluate(agent)
    }

    /// One-step lookahead from the evaluated values
    fn q_value(&self, agent: &AgentState<M>, state: &M::State, action: &M::Action) -> Result<f64> {
        lookahead_from_values(agent, state, action)
    }

    fn q_values(&self, agent: &AgentState<M>) -> Result<QTable<M::State, M::Action>> {
        q_table_from_values(agent)
    }
}

/// Q-value iteration
///
/// Applies the Bellman optimality backup
/// Q(s,a) ← Σ<sub>s'</sub> P(s'|s,a)·(R + γ max<sub>a'</sub> Q(s',a')) in place.
/// The agent acts greedily on the resulting Q values, and V(s) is read off as Q(s, π(s)).
#[derive(Debug, Clone, PartialEq)]
pub struct QValueIteration {
    /// Target approximation error of the Q values
    ///
    /// **Default**: `0.001`
    pub error_threshold: f64,
    /// Upper bound on sweeps
    ///
    /// **Default**: `1000`
    pub max_iters: usize,
}

impl Default for QValueIteration {
    fn default() -> Self {
        Self {
            error_threshold: 0.001,
            max_iters: 1000,
        }
    }
}

impl QValueIteration {
    pub fn new(error_threshold: f64, max_iters: usize) -> Self {
        Self {
            error_threshold,
            max_iters,
        }
    }

    fn sweep<M: Mdp>(&self, agent: &mut AgentState<M>) -> Result<f64> {
        let mut delta: f64 = 0.0;
        for state in agent.domain.states() {
            for action in agent.domain.actions(&state) {
                let q = lookahead(&agent.domain, agent.discount, &state, &action, |s| {
                    agent.max_q_value(s)
                })?;
                let previous = agent.q_values.set(state.clone(), action, q);
                delta = delta.max((previous - q).abs());
            }
        }
        Ok(delta)
    }
}

impl<M: Mdp> Algorithm<M> for QValueIteration {
    type Output = usize;

    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTROL
    }

    fn domain_discount(&self, mdp: &M) -> Option<f64> {
        Some(mdp.discount())
    }

    fn install_policy(
        &self,
        given: Option<Policy<M::State, M::Action>>,
        _agent: &mut AgentState<M>,
    ) -> Result<Policy<M::State, M::Action>> {
        if given.is_some() {
            warn!("Q-value iteration acts on its own Q values; ignoring the supplied policy");
        }
        Ok(Policy::FromQValues)
    }

    fn run(&mut self, agent: &mut AgentState<M>) -> Result<usize> {
        let threshold = stopping_threshold(self.error_threshold, agent.discount);
        for sweep in 1..=self.max_iters {
            let delta = self.sweep(agent)?;
            debug!("Q-value iteration sweep {sweep}: delta = {delta}");
            if delta < threshold {
                info!("Q-value iteration converged after {sweep} sweeps");
                return Ok(sweep);
            }
        }
        warn!("Q-value iteration stopped at max_iters = {} without converging", self.max_iters);
        Ok(self.max_iters)
    }

    fn values(&self, agent: &AgentState<M>) -> Result<ValueTable<M::State>> {
        Ok(agent
            .domain
            .states()
            .into_iter()
            .map(|s| {
                let v = agent.max_q_value(&s);
                (s, v)
            })
            .collect())
    }
}

/// Policy iteration
///
/// Alternates full evaluation of the current tabular policy with greedy improvement, and stops
/// as soon as an improvement step changes no state's action.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyIteration {
    /// Settings for the evaluation step
    ///
    /// **Default**: `PolicyEvaluation { error_threshold: 1e-6, max_iters: 1000 }`
    pub evaluation: PolicyEvaluation,
    /// Upper bound on evaluation/improvement rounds
    ///
    /// **Default**: `100`
    pub max_iters: usize,
}

impl Default for PolicyIteration {
    fn default() -> Self {
        Self {
            evaluation: PolicyEvaluation::new(1e-6, 1000),
            max_iters: 100,
        }
    }
}

impl PolicyIteration {
    pub fn new(evaluation: PolicyEvaluation, max_iters: usize) -> Self {
        Self {
            evaluation,
            max_iters,
        }
    }

    /// Make the policy greedy with respect to the current values
    ///
    /// Ties go to the first action in the domain's order unless the incumbent action is among
    /// the best, in which case it is kept.
    ///
    /// **Returns** the number of states whose action changed
    fn improve<M: Mdp>(&self, agent: &mut AgentState<M>) -> Result<usize> {
        let table = agent.policy.as_tabular().ok_or_else(|| {
            Error::InvalidParameter(String::from("policy iteration requires a tabular policy"))
        })?;

        let mut updates = Vec::new();
        for state in agent.domain.states() {
            if agent.domain.is_terminal(&state) {
                continue;
            }
            let actions = agent.domain.actions(&state);
            let mut action_values = Vec::with_capacity(actions.len());
            for action in &actions {
                action_values.push(lookahead_from_values(agent, &state, action)?);
            }
            let row = actions.iter().zip(action_values.iter().copied());
            let Some((best, best_value)) = argmax(row) else {
                continue;
            };

            let incumbent = table.get(&state)?;
            let incumbent_value = incumbent
                .and_then(|a| actions.iter().position(|b| b == a))
                .map(|i| action_values[i]);
            let keep = incumbent_value.is_some_and(|v| v >= best_value - IMPROVEMENT_TOLERANCE);
            if !keep {
                updates.push((state, best.clone()));
            }
        }

        let changed = updates.len();
        if let Some(table) = agent.policy.as_tabular_mut() {
            for (state, action) in updates {
                table.set(state, Some(action));
            }
        }
        Ok(changed)
    }
}

impl<M: Mdp> Algorithm<M> for PolicyIteration {
    type Output = usize;

    fn capabilities(&self) -> Capabilities {
        Capabilities::PREDICTION
    }

    fn domain_discount(&self, mdp: &M) -> Option<f64> {
        Some(mdp.discount())
    }

    /// Start from the supplied policy materialized as a table, or from random legal actions
    fn install_policy(
        &self,
        given: Option<Policy<M::State, M::Action>>,
        agent: &mut AgentState<M>,
    ) -> Result<Policy<M::State, M::Action>> {
        tabular_over(given, agent).map(Policy::Tabular)
    }

    /// **Returns** the number of evaluation/improvement rounds performed
    fn run(&mut self, agent: &mut AgentState<M>) -> Result<usize> {
        for iteration in 1..=self.max_iters {
            let sweeps = self.evaluation.evaluate(agent)?;
            let changed = self.improve(agent)?;
            debug!("policy iteration {iteration}: {sweeps} sweeps, {changed} actions changed");
            if changed == 0 {
                info!("policy iteration converged after {iteration} iterations");
                return Ok(iteration);
            }
        }
        warn!(
            "policy iteration stopped at max_iters = {} with an unstable policy",
            self.max_iters
        );
        Ok(self.max_iters)
    }

    /// One-step lookahead from the values of the final policy
    fn q_value(&self, agent: &AgentState<M>, state: &M::State, action: &M::Action) -> Result<f64> {
        lookahead_from_values(agent, state, action)
    }

    fn q_values(&self, agent: &AgentState<M>) -> Result<QTable<M::State, M::Action>> {
        q_table_from_values(agent)
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
            MdpBuilder, TabularMdp,
        },
        util::seeded,
    };

    fn config(discount: f64) -> AgentConfig {
        AgentConfig::default().discount(discount)
    }

    /// Two routes to the exit: `safe` pays 1 now, `risky` loops back half the time but pays 3
    fn detour() -> TabularMdp<&'static str, &'static str> {
        MdpBuilder::new("start")
            .discount(0.9)
            .transition("start", "safe", "end", 1.0, 1.0)
            .transition("start", "risky", "start", 0.5, 0.0)
            .transition("start", "risky", "end", 0.5, 3.0)
            .terminal("end")
            .build()
            .unwrap()
    }

    #[test]
    fn policy_evaluation_on_chain() {
        let mut agent =
            Agent::new(chain(0.9), PolicyEvaluation::default(), config(0.9), seeded(0)).unwrap();
        let sweeps = agent.run().unwrap();

        assert_float_eq!(agent.value(&1), 10.0, abs <= 1e-9);
        assert_float_eq!(agent.value(&0), 9.0, abs <= 1e-9);
        assert_eq!(agent.value(&2), 0.0);
        assert_eq!(sweeps, 3);
    }

    #[test]
    fn policy_evaluation_is_synchronous() {
        // a sweep must not see its own updates: after one sweep S0 is still 0
        let mut agent = Agent::new(
            chain(0.9),
            PolicyEvaluation::new(0.001, 1),
            config(0.9),
            seeded(0),
        )
        .unwrap();
        assert_eq!(agent.run().unwrap(), 1);
        assert_eq!(agent.value(&1), 10.0);
        assert_eq!(agent.value(&0), 0.0);
    }

    #[test]
    fn policy_evaluation_derives_q_values() {
        let mut agent =
            Agent::new(fork(), PolicyEvaluation::default(), config(0.9), seeded(0)).unwrap();
        agent.run().unwrap();

        // random policy: V = 0.5 * 1 + 0.5 * -1
        assert_float_eq!(agent.value(&0), 0.0, abs <= 1e-12);
        assert_eq!(agent.q_value(&0, &'g').unwrap(), 1.0);
        let q = agent.q_values().unwrap();
        assert_eq!(q.get(&0, &'b'), -1.0);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn policy_evaluation_rejects_partial_table() {
        let table = TabularPolicy::new(Default::default());
        let result = Agent::with_policy(
            chain(0.9),
            PolicyEvaluation::default(),
            Policy::Tabular(table),
            config(0.9),
            seeded(0),
        );
        assert!(matches!(result, Err(Error::KeyNotFound { .. })));
    }

    #[test]
    fn exhausting_max_iters_is_not_an_error() {
        let mut agent =
            Agent::new(detour(), PolicyEvaluation::new(1e-12, 2), config(0.9), seeded(0)).unwrap();
        assert_eq!(agent.run().unwrap(), 2);
    }

    #[test]
    fn zero_discount_needs_one_sweep() {
        let mut agent =
            Agent::new(chain(0.0), PolicyEvaluation::default(), config(0.0), seeded(0)).unwrap();
        assert_eq!(agent.run().unwrap(), 1);
        assert_eq!(agent.value(&1), 10.0);
        assert_eq!(agent.value(&0), 0.0);
    }

    #[test]
    fn discount_defaults_to_the_model() {
        let mut agent =
            Agent::new(chain(0.5), PolicyEvaluation::default(), AgentConfig::default(), seeded(0))
                .unwrap();
        assert_eq!(agent.discount(), 0.5);
        agent.run().unwrap();
        assert_float_eq!(agent.value(&0), 5.0, abs <= 1e-9);
    }

    #[test]
    fn configured_discount_overrides_the_model() {
        let mut agent =
            Agent::new(chain(0.5), QValueIteration::default(), config(0.9), seeded(0)).unwrap();
        assert_eq!(agent.discount(), 0.9);
        agent.run().unwrap();
        assert_float_eq!(agent.value(&0), 9.0, abs <= 1e-9);
    }

    #[test]
    fn q_value_iteration_on_fork() {
        let mut agent =
            Agent::new(fork(), QValueIteration::default(), config(0.9), seeded(0)).unwrap();
        agent.run().unwrap();

        assert_eq!(agent.q_value(&0, &'g').unwrap(), 1.0);
        assert_eq!(agent.q_value(&0, &'b').unwrap(), -1.0);
        assert_eq!(agent.greedy_action(&0).unwrap(), Some('g'));
        assert_eq!(agent.value(&0), 1.0);
        assert_eq!(agent.greedy_action(&1).unwrap(), None);
    }

    #[test]
    fn q_value_iteration_derives_values_for_every_state() {
        let mut agent =
            Agent::new(detour(), QValueIteration::new(1e-9, 1000), config(0.9), seeded(0)).unwrap();
        agent.run().unwrap();

        // risky: q = 0.5 * 3 + 0.5 * 0.9 * q  =>  q = 1.5 / 0.55
        let risky = 1.5 / 0.55;
        assert_float_eq!(agent.q_value(&"start", &"risky").unwrap(), risky, abs <= 1e-6);
        assert_eq!(agent.greedy_action(&"start").unwrap(), Some("risky"));

        let values = agent.values().unwrap();
        assert_float_eq!(values.get(&"start"), risky, abs <= 1e-6);
        assert!(values.contains(&"end"));
        assert_eq!(values.get(&"end"), 0.0);
    }

    #[test]
    fn q_value_iteration_matches_policy_evaluation_of_its_policy() {
        let mut qvi =
            Agent::new(detour(), QValueIteration::new(1e-9, 1000), config(0.9), seeded(0)).unwrap();
        qvi.run().unwrap();

        let mut pe = Agent::with_policy(
            detour(),
            PolicyEvaluation::new(1e-9, 1000),
            Policy::SingleAction("risky"),
            config(0.9),
            seeded(0),
        )
        .unwrap();
        pe.run().unwrap();

        assert_float_eq!(qvi.value(&"start"), pe.value(&"start"), abs <= 1e-6);
    }

    #[test]
    fn policy_iteration_finds_the_better_route() {
        let start = TabularPolicy::new([("start", Some("safe"))].into());
        let mut agent = Agent::with_policy(
            detour(),
            PolicyIteration::default(),
            Policy::Tabular(start),
            config(0.9),
            seeded(0),
        )
        .unwrap();

        let iterations = agent.run().unwrap();
        assert_eq!(iterations, 2);
        assert_eq!(agent.greedy_action(&"start").unwrap(), Some("risky"));
        assert_float_eq!(agent.value(&"start"), 1.5 / 0.55, abs <= 1e-4);
    }

    #[test]
    fn policy_iteration_keeps_tied_incumbent() {
        let mdp = MdpBuilder::new(0)
            .transition(0, 'a', 1, 1.0, 1.0)
            .transition(0, 'b', 1, 1.0, 1.0)
            .terminal(1)
            .build()
            .unwrap();
        let start = TabularPolicy::new([(0, Some('b'))].into());
        let mut agent = Agent::with_policy(
            mdp,
            PolicyIteration::default(),
            Policy::Tabular(start),
            config(0.9),
            seeded(0),
        )
        .unwrap();

        assert_eq!(agent.run().unwrap(), 1);
        assert_eq!(agent.greedy_action(&0).unwrap(), Some('b'));
    }

    #[test]
    fn policy_iteration_reports_lookahead_action_values() {
        let mut agent =
            Agent::new(fork(), PolicyIteration::default(), config(0.9), seeded(0)).unwrap();
        agent.run().unwrap();

        assert_eq!(agent.q_value(&0, &'g').unwrap(), 1.0);
        let q = agent.q_values().unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.get(&0, &'b'), -1.0);
        assert_eq!(agent.action_values(&0).unwrap(), [('b', -1.0), ('g', 1.0)]);
        assert!(agent.state().q_values().is_empty());
    }

    #[test]
    fn policy_evaluation_action_values_match_q_value() {
        let mut agent =
            Agent::new(chain(0.9), PolicyEvaluation::default(), config(0.9), seeded(0)).unwrap();
        agent.run().unwrap();

        let row = agent.action_values(&0).unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].1, agent.q_value(&0, &'a').unwrap());
        assert_float_eq!(row[0].1, 9.0, abs <= 1e-9);
        assert!(agent.action_values(&2).unwrap().is_empty());
    }

    #[test]
    fn policy_iteration_materializes_other_policies() {
        let agent = Agent::with_policy(
            detour(),
            PolicyIteration::default(),
            Policy::SingleAction("safe"),
            config(0.9),
            seeded(0),
        )
        .unwrap();
        let table = agent.policy().as_tabular().unwrap();
        assert_eq!(table.get(&"start").unwrap(), Some(&"safe"));
        assert_eq!(table.get(&"end").unwrap(), None);
    }
}
