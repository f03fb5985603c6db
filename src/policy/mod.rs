use rand::seq::SliceRandom;

use crate::{
    ds::{Hashable, QTable},
    env::DiscreteSpace,
    error::Result,
    exploration::{Choice, EpsilonGreedy},
    util::RandomSource,
};

mod tabular;

pub use tabular::TabularPolicy;

/// What a policy may look at when choosing: the legal actions, the owning agent's live
/// Q table and its current exploration rate
pub struct PolicyView<'a, D: DiscreteSpace> {
    pub space: &'a D,
    pub q_values: &'a QTable<D::State, D::Action>,
    pub epsilon: f64,
}

impl<D: DiscreteSpace> Clone for PolicyView<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: DiscreteSpace> Copy for PolicyView<'_, D> {}

/// Pick the highest-valued entry, breaking ties in favour of the first one encountered
///
/// **Returns** `None` if `values` is empty
pub fn argmax<'a, A: 'a>(values: impl IntoIterator<Item = (&'a A, f64)>) -> Option<(&'a A, f64)> {
    values.into_iter().fold(None, |best, (a, v)| match best {
        Some((_, bv)) if v <= bv => best,
        _ => Some((a, v)),
    })
}

/// Maps a state to an action or to a distribution over actions
///
/// All variants return `None` (or an empty distribution) at states without legal actions.
#[derive(Debug, Clone)]
pub enum Policy<S, A> {
    /// Uniform over the legal actions
    Random,
    /// Always the given action, or the first legal action where it is illegal
    SingleAction(A),
    /// A materialized state → action table
    Tabular(TabularPolicy<S, A>),
    /// Greedy with respect to the owning agent's current Q values
    FromQValues,
}

impl<S: Hashable, A: Hashable> Policy<S, A> {
    /// The action this policy's deterministic rule picks in `state`
    ///
    /// For [`Policy::Random`] this is a uniformly random legal action. Ties in
    /// [`Policy::FromQValues`] go to the first action in the domain's action order.
    ///
    /// **Errors** with [`Error::KeyNotFound`](crate::Error::KeyNotFound) if a tabular policy has
    /// no entry for `state`
    pub fn greedy_action<D>(
        &self,
        view: PolicyView<'_, D>,
        state: &S,
        rng: &mut RandomSource,
    ) -> Result<Option<A>>
    where
        D: DiscreteSpace<State = S, Action = A>,
    {
        let action = match self {
            Self::Tabular(table) => table.get(state)?.cloned(),
            _ if view.space.is_terminal(state) => None,
            Self::Random => view.space.actions(state).choose(rng).cloned(),
            Self::SingleAction(action) => single_action(action, &view.space.actions(state)),
            Self::FromQValues => {
                let actions = view.space.actions(state);
                argmax(view.q_values.row(state, &actions)).map(|(a, _)| a.clone())
            }
        };
        Ok(action)
    }

    /// π(·|state) over the legal actions
    ///
    /// Deterministic variants put all mass on their greedy action.
    pub fn probabilities<D>(&self, view: PolicyView<'_, D>, state: &S) -> Result<Vec<(A, f64)>>
    where
        D: DiscreteSpace<State = S, Action = A>,
    {
        let greedy = match self {
            Self::Random => {
                let actions = view.space.actions(state);
                let p = 1.0 / actions.len() as f64;
                return Ok(actions.into_iter().map(|a| (a, p)).collect());
            }
            Self::Tabular(table) => table.get(state)?.cloned(),
            Self::SingleAction(action) => single_action(action, &view.space.actions(state)),
            Self::FromQValues => {
                let actions = view.space.actions(state);
                argmax(view.q_values.row(state, &actions)).map(|(a, _)| a.clone())
            }
        };
        Ok(greedy.into_iter().map(|a| (a, 1.0)).collect())
    }

    /// With probability ε a uniformly random legal action, otherwise [`Policy::greedy_action`]
    ///
    /// `epsilon` defaults to the owning agent's current exploration rate.
    pub fn epsilon_greedy_action<D>(
        &self,
        view: PolicyView<'_, D>,
        state: &S,
        epsilon: Option<f64>,
        rng: &mut RandomSource,
    ) -> Result<Option<A>>
    where
        D: DiscreteSpace<State = S, Action = A>,
    {
        let exploration = EpsilonGreedy::new(epsilon.unwrap_or(view.epsilon))?;
        match exploration.choose(rng) {
            Choice::Explore => Ok(view.space.actions(state).choose(rng).cloned()),
            Choice::Exploit => self.greedy_action(view, state, rng),
        }
    }

    pub fn as_tabular(&self) -> Option<&TabularPolicy<S, A>> {
        match self {
            Self::Tabular(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_tabular_mut(&mut self) -> Option<&mut TabularPolicy<S, A>> {
        match self {
            Self::Tabular(table) => Some(table),
            _ => None,
        }
    }
}

impl<S: Hashable, A: Hashable> PartialEq for Policy<S, A> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Random, Self::Random) | (Self::FromQValues, Self::FromQValues) => true,
            (Self::SingleAction(a), Self::SingleAction(b)) => a == b,
            (Self::Tabular(a), Self::Tabular(b)) => a == b,
            _ => false,
        }
    }
}

fn single_action<A: Hashable>(action: &A, actions: &[A]) -> Option<A> {
    if actions.contains(action) {
        Some(action.clone())
    } else {
        actions.first().cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        env::{tests::fork, MdpBuilder, TabularMdp},
        util::seeded,
        Error,
    };

    fn view<'a>(
        mdp: &'a TabularMdp<u8, char>,
        q: &'a QTable<u8, char>,
    ) -> PolicyView<'a, TabularMdp<u8, char>> {
        PolicyView {
            space: mdp,
            q_values: q,
            epsilon: 0.0,
        }
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        let values = [('a', 1.0), ('b', 3.0), ('c', 3.0)];
        let best = argmax(values.iter().map(|(a, v)| (a, *v)));
        assert_eq!(best, Some((&'b', 3.0)));
        assert_eq!(argmax(std::iter::empty::<(&char, f64)>()), None);
    }

    #[test]
    fn greedy_over_q_values() {
        let mdp = fork();
        let mut q = QTable::new();
        let mut rng = seeded(0);

        // all zero: first legal action
        let policy = Policy::FromQValues;
        assert_eq!(policy.greedy_action(view(&mdp, &q), &0, &mut rng).unwrap(), Some('b'));

        q.set(0, 'g', 0.5);
        assert_eq!(policy.greedy_action(view(&mdp, &q), &0, &mut rng).unwrap(), Some('g'));
        assert_eq!(policy.probabilities(view(&mdp, &q), &0).unwrap(), [('g', 1.0)]);
        assert_eq!(policy.greedy_action(view(&mdp, &q), &1, &mut rng).unwrap(), None);
    }

    #[test]
    fn random_policy_is_uniform() {
        let mdp = fork();
        let q = QTable::new();
        let probs = Policy::Random.probabilities(view(&mdp, &q), &0).unwrap();
        assert_eq!(probs, [('b', 0.5), ('g', 0.5)]);
        assert!(Policy::Random.probabilities(view(&mdp, &q), &1).unwrap().is_empty());
    }

    #[test]
    fn single_action_falls_back_to_first_legal() {
        let mdp = fork();
        let q = QTable::new();
        let mut rng = seeded(0);
        let fixed = Policy::SingleAction('g');
        let missing = Policy::SingleAction('x');
        assert_eq!(fixed.greedy_action(view(&mdp, &q), &0, &mut rng).unwrap(), Some('g'));
        assert_eq!(missing.greedy_action(view(&mdp, &q), &0, &mut rng).unwrap(), Some('b'));
        assert_eq!(missing.probabilities(view(&mdp, &q), &0).unwrap(), [('b', 1.0)]);
    }

    #[test]
    fn tabular_policy_is_a_snapshot() {
        let mdp = fork();
        let q = QTable::new();
        let mut rng = seeded(5);
        let table = TabularPolicy::random([0, 1], &mdp, &mut rng);
        assert!(table.get(&0).unwrap().is_some());
        assert_eq!(table.get(&1).unwrap(), None);

        let mut policy = Policy::Tabular(table);
        policy.as_tabular_mut().unwrap().set(0, Some('g'));
        assert_eq!(policy.greedy_action(view(&mdp, &q), &0, &mut rng).unwrap(), Some('g'));
        assert!(matches!(
            policy.greedy_action(view(&mdp, &q), &7, &mut rng),
            Err(Error::KeyNotFound { .. })
        ));
    }

    #[test]
    fn policies_compare_by_rule() {
        let mdp = fork();
        let table = TabularPolicy::random([0, 1], &mdp, &mut seeded(5));

        assert_eq!(Policy::<u8, char>::Random, Policy::Random);
        assert_eq!(Policy::<u8, char>::SingleAction('g'), Policy::SingleAction('g'));
        assert_ne!(Policy::<u8, char>::SingleAction('g'), Policy::SingleAction('b'));
        assert_ne!(Policy::<u8, char>::Random, Policy::FromQValues);
        assert_eq!(Policy::Tabular(table.clone()), Policy::Tabular(table));
    }

    #[test]
    fn tabular_fill_keeps_existing_entries() {
        let mdp = fork();
        let mut rng = seeded(5);
        let table =
            TabularPolicy::new(HashMap::from([(0, Some('b'))])).fill([0, 1], &mdp, &mut rng);
        assert_eq!(table.get(&0).unwrap(), Some(&'b'));
        assert_eq!(table.len(), 2);
        assert!(table.validate(&[0, 1]).is_ok());
        assert!(table.validate(&[2]).is_err());
    }

    #[test]
    fn epsilon_greedy_explores_at_rate() {
        let mdp = MdpBuilder::new(0)
            .transition(0, 'a', 1, 1.0, 0.0)
            .transition(0, 'b', 1, 1.0, 0.0)
            .transition(0, 'c', 1, 1.0, 0.0)
            .transition(0, 'd', 1, 1.0, 0.0)
            .terminal(1)
            .build()
            .unwrap();
        let mut q = QTable::new();
        q.set(0, 'a', 1.0);
        let mut rng = seeded(11);
        let policy = Policy::FromQValues;

        let n = 20_000;
        let v = PolicyView {
            space: &mdp,
            q_values: &q,
            epsilon: 0.4,
        };
        let non_greedy = (0..n)
            .filter(|_| policy.epsilon_greedy_action(v, &0, None, &mut rng).unwrap() != Some('a'))
            .count();
        // explore picks one of the three non-greedy actions 3/4 of the time
        let rate = non_greedy as f64 / n as f64;
        assert!((rate - 0.3).abs() < 0.02, "observed {rate}");

        let always_greedy = (0..100).all(|_| {
            policy
                .epsilon_greedy_action(v, &0, Some(0.0), &mut rng)
                .unwrap()
                == Some('a')
        });
        assert!(always_greedy);
    }
}
