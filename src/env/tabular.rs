use std::collections::{HashMap, HashSet};

use crate::{
    assert_interval,
    ds::Hashable,
    error::{Error, Result},
};

use super::{DiscreteSpace, Mdp};

#[derive(Debug, Clone, PartialEq)]
struct Outcome<S> {
    next_state: S,
    prob: f64,
    reward: f64,
}

/// An explicit, table-backed MDP for small hand-written problems
///
/// States are reported in the order they were first mentioned to the [`MdpBuilder`], and
/// actions in the order they were first added for their state.
#[derive(Debug, Clone)]
pub struct TabularMdp<S, A> {
    states: Vec<S>,
    actions: HashMap<S, Vec<A>>,
    outcomes: HashMap<(S, A), Vec<Outcome<S>>>,
    terminal: HashSet<S>,
    start: S,
    discount: f64,
}

impl<S: Hashable, A: Hashable> TabularMdp<S, A> {
    /// Check that the outgoing probability mass of every state-action pair is one
    ///
    /// Sampling performs the same check lazily; this runs it for the whole table at once.
    pub fn check(&self) -> Result<()> {
        for ((state, action), outcomes) in &self.outcomes {
            let mass: f64 = outcomes.iter().map(|o| o.prob).sum();
            if (mass - 1.0).abs() > super::PROBABILITY_TOLERANCE {
                return Err(Error::ModelInconsistency {
                    state: format!("{state:?}"),
                    action: format!("{action:?}"),
                    mass,
                });
            }
        }
        Ok(())
    }
}

impl<S: Hashable, A: Hashable> DiscreteSpace for TabularMdp<S, A> {
    type State = S;
    type Action = A;

    fn actions(&self, state: &S) -> Vec<A> {
        if self.terminal.contains(state) {
            return Vec::new();
        }
        self.actions.get(state).cloned().unwrap_or_default()
    }

    fn is_terminal(&self, state: &S) -> bool {
        self.terminal.contains(state)
    }
}

impl<S: Hashable, A: Hashable> Mdp for TabularMdp<S, A> {
    fn states(&self) -> Vec<S> {
        self.states.clone()
    }

    fn transitions(&self, state: &S, action: &A) -> Result<Vec<(S, f64)>> {
        if self.terminal.contains(state) {
            return Err(Error::invalid_action(state, action));
        }
        self.outcomes
            .get(&(state.clone(), action.clone()))
            .map(|outcomes| {
                outcomes
                    .iter()
                    .map(|o| (o.next_state.clone(), o.prob))
                    .collect()
            })
            .ok_or_else(|| Error::invalid_action(state, action))
    }

    fn reward(&self, state: &S, action: &A, next_state: &S) -> f64 {
        self.outcomes
            .get(&(state.clone(), action.clone()))
            .and_then(|outcomes| outcomes.iter().find(|o| &o.next_state == next_state))
            .map(|o| o.reward)
            .unwrap_or_default()
    }

    fn start_state(&self) -> S {
        self.start.clone()
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    fn set_discount(&mut self, discount: f64) {
        assert!(
            (0.0..1.0).contains(&discount),
            "Invalid value for `discount`. Must be in the interval [0, 1)."
        );
        self.discount = discount;
    }
}

/// Incrementally describes a [`TabularMdp`]
///
/// ```
/// # use tabrl::env::{MdpBuilder, Mdp};
/// let mdp = MdpBuilder::new("s0")
///     .transition("s0", "go", "end", 1.0, 1.0)
///     .terminal("end")
///     .build()
///     .unwrap();
/// assert_eq!(mdp.transitions(&"s0", &"go").unwrap(), [("end", 1.0)]);
/// ```
#[derive(Debug, Clone)]
pub struct MdpBuilder<S, A> {
    states: Vec<S>,
    actions: HashMap<S, Vec<A>>,
    outcomes: HashMap<(S, A), Vec<Outcome<S>>>,
    terminal: HashSet<S>,
    start: S,
    discount: f64,
}

impl<S: Hashable, A: Hashable> MdpBuilder<S, A> {
    pub fn new(start: S) -> Self {
        Self {
            states: Vec::new(),
            actions: HashMap::new(),
            outcomes: HashMap::new(),
            terminal: HashSet::new(),
            start,
            discount: 0.9,
        }
    }

    /// **Panics** if `discount` is not in `[0, 1)`
    pub fn discount(mut self, discount: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&discount),
            "Invalid value for `discount`. Must be in the interval [0, 1)."
        );
        self.discount = discount;
        self
    }

    /// Add the outcome `next_state` with probability `prob` and reward `reward` to
    /// `(state, action)`
    ///
    /// Repeated outcomes for the same successor accumulate probability; the last reward wins.
    ///
    /// **Panics** if `prob` is not in `[0, 1]`
    pub fn transition(
        mut self,
        state: S,
        action: A,
        next_state: S,
        prob: f64,
        reward: f64,
    ) -> Self {
        assert_interval!(prob, 0.0, 1.0);
        self.register(&state);
        self.register(&next_state);

        let actions = self.actions.entry(state.clone()).or_default();
        if !actions.contains(&action) {
            actions.push(action.clone());
        }

        let outcomes = self.outcomes.entry((state, action)).or_default();
        match outcomes.iter_mut().find(|o| o.next_state == next_state) {
            Some(o) => {
                o.prob += prob;
                o.reward = reward;
            }
            None => outcomes.push(Outcome {
                next_state,
                prob,
                reward,
            }),
        }
        self
    }

    pub fn terminal(mut self, state: S) -> Self {
        self.register(&state);
        self.terminal.insert(state);
        self
    }

    fn register(&mut self, state: &S) {
        if !self.states.contains(state) {
            self.states.push(state.clone());
        }
    }

    /// **Errors** if the start state was never mentioned, or a terminal state declares actions
    pub fn build(self) -> Result<TabularMdp<S, A>> {
        if !self.states.contains(&self.start) {
            return Err(Error::NoStartState);
        }
        if let Some(state) = self.terminal.iter().find(|s| self.actions.contains_key(*s)) {
            return Err(Error::InvalidParameter(format!(
                "terminal state {state:?} cannot declare actions"
            )));
        }
        Ok(TabularMdp {
            states: self.states,
            actions: self.actions,
            outcomes: self.outcomes,
            terminal: self.terminal,
            start: self.start,
            discount: self.discount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_action_is_rejected() {
        let mdp = MdpBuilder::new(0)
            .transition(0, 'a', 1, 1.0, 0.0)
            .terminal(1)
            .build()
            .unwrap();
        assert!(matches!(mdp.transitions(&0, &'z'), Err(Error::InvalidAction { .. })));
        assert!(matches!(mdp.transitions(&1, &'a'), Err(Error::InvalidAction { .. })));
    }

    #[test]
    fn repeated_outcomes_accumulate() {
        let mdp = MdpBuilder::new(0)
            .transition(0, 'a', 0, 0.25, 0.0)
            .transition(0, 'a', 0, 0.25, 0.0)
            .transition(0, 'a', 1, 0.5, 1.0)
            .terminal(1)
            .build()
            .unwrap();
        assert_eq!(mdp.transitions(&0, &'a').unwrap(), [(0, 0.5), (1, 0.5)]);
        assert!(mdp.check().is_ok());
    }

    #[test]
    fn check_reports_missing_mass() {
        let mdp = MdpBuilder::new(0)
            .transition(0, 'a', 1, 0.5, 0.0)
            .terminal(1)
            .build()
            .unwrap();
        assert!(matches!(mdp.check(), Err(Error::ModelInconsistency { mass, .. }) if mass == 0.5));
    }

    #[test]
    fn build_validates_structure() {
        let missing_start = MdpBuilder::<u8, char>::new(9).terminal(0).build();
        assert_eq!(missing_start.unwrap_err(), Error::NoStartState);

        let acting_terminal = MdpBuilder::new(0)
            .transition(0, 'a', 0, 1.0, 0.0)
            .terminal(0)
            .build();
        assert!(matches!(acting_terminal, Err(Error::InvalidParameter(_))));
    }
}
