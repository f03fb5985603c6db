use std::collections::HashMap;

use rand::seq::SliceRandom;

use crate::{
    ds::Hashable,
    env::DiscreteSpace,
    error::{Error, Result},
    util::RandomSource,
};

/// An explicit state → action table
///
/// Built once from a set of states and afterwards mutated independently of any value table.
/// Terminal states map to `None`.
#[derive(Debug, Clone)]
pub struct TabularPolicy<S, A> {
    table: HashMap<S, Option<A>>,
}

impl<S: Hashable, A: Hashable> TabularPolicy<S, A> {
    /// Assign a uniformly random legal action to every non-terminal state in `states`
    pub fn random<D>(states: impl IntoIterator<Item = S>, space: &D, rng: &mut RandomSource) -> Self
    where
        D: DiscreteSpace<State = S, Action = A>,
    {
        Self::new(HashMap::new()).fill(states, space, rng)
    }

    /// Wrap an existing table as-is
    pub fn new(table: HashMap<S, Option<A>>) -> Self {
        Self { table }
    }

    /// Add random legal actions for those of `states` missing from the table
    pub fn fill<D>(
        mut self,
        states: impl IntoIterator<Item = S>,
        space: &D,
        rng: &mut RandomSource,
    ) -> Self
    where
        D: DiscreteSpace<State = S, Action = A>,
    {
        for state in states {
            if self.table.contains_key(&state) {
                continue;
            }
            let action = if space.is_terminal(&state) {
                None
            } else {
                space.actions(&state).choose(rng).cloned()
            };
            self.table.insert(state, action);
        }
        self
    }

    /// π(state)
    ///
    /// **Errors** with [`Error::KeyNotFound`] if the table was never built over `state`
    pub fn get(&self, state: &S) -> Result<Option<&A>> {
        self.table
            .get(state)
            .map(Option::as_ref)
            .ok_or_else(|| Error::key_not_found(state))
    }

    pub fn set(&mut self, state: S, action: Option<A>) {
        self.table.insert(state, action);
    }

    pub fn contains(&self, state: &S) -> bool {
        self.table.contains_key(state)
    }

    /// **Errors** with [`Error::KeyNotFound`] on the first of `states` without an entry
    pub fn validate<'a>(&self, states: impl IntoIterator<Item = &'a S>) -> Result<()>
    where
        S: 'a,
    {
        match states.into_iter().find(|s| !self.table.contains_key(*s)) {
            Some(state) => Err(Error::key_not_found(state)),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, Option<&A>)> {
        self.table.iter().map(|(s, a)| (s, a.as_ref()))
    }

    /// Number of states whose action differs from `other`
    pub fn diff(&self, other: &Self) -> usize {
        self.table
            .iter()
            .filter(|(s, a)| other.table.get(*s) != Some(*a))
            .count()
    }
}

impl<S: Hashable, A: PartialEq> PartialEq for TabularPolicy<S, A> {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}
