use std::{collections::HashMap, hash::Hash};

/// State values V(s), defaulting to `0.0` for unseen states
///
/// Entries are only ever inserted or overwritten, never removed.
#[derive(Debug, Clone)]
pub struct ValueTable<S> {
    table: HashMap<S, f64>,
}

impl<S: Eq + Hash> ValueTable<S> {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Get V(state), or `0.0` if the state has never been written
    pub fn get(&self, state: &S) -> f64 {
        self.table.get(state).copied().unwrap_or_default()
    }

    /// Overwrite V(state)
    ///
    /// **Returns** the previous value
    pub fn set(&mut self, state: S, value: f64) -> f64 {
        self.table.insert(state, value).unwrap_or_default()
    }

    /// Mutable access to V(state), inserting `0.0` first if unseen
    pub fn get_mut(&mut self, state: S) -> &mut f64 {
        self.table.entry(state).or_default()
    }

    pub fn contains(&self, state: &S) -> bool {
        self.table.contains_key(state)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.table.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, f64)> {
        self.table.iter().map(|(s, v)| (s, *v))
    }
}

impl<S: Eq + Hash> Default for ValueTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Eq + Hash> PartialEq for ValueTable<S> {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl<S: Eq + Hash> FromIterator<(S, f64)> for ValueTable<S> {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self {
            table: iter.into_iter().collect(),
        }
    }
}

/// Action values Q(s, a), defaulting to `0.0` for unseen pairs
///
/// Stored as one row per state so that Q(s, ·) is a single lookup.
#[derive(Debug, Clone)]
pub struct QTable<S, A> {
    table: HashMap<S, HashMap<A, f64>>,
}

impl<S: Eq + Hash, A: Eq + Hash> QTable<S, A> {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Get Q(state, action), or `0.0` if the pair has never been written
    pub fn get(&self, state: &S, action: &A) -> f64 {
        self.table
            .get(state)
            .and_then(|row| row.get(action))
            .copied()
            .unwrap_or_default()
    }

    /// Overwrite Q(state, action)
    ///
    /// **Returns** the previous value
    pub fn set(&mut self, state: S, action: A, value: f64) -> f64 {
        self.table
            .entry(state)
            .or_default()
            .insert(action, value)
            .unwrap_or_default()
    }

    /// Mutable access to Q(state, action), inserting `0.0` first if unseen
    pub fn get_mut(&mut self, state: S, action: A) -> &mut f64 {
        self.table.entry(state).or_default().entry(action).or_default()
    }

    /// The values Q(state, a) for each of `actions`, in the given order
    pub fn row<'a>(
        &'a self,
        state: &S,
        actions: &'a [A],
    ) -> impl Iterator<Item = (&'a A, f64)> + 'a {
        let row = self.table.get(state);
        actions.iter().map(move |a| {
            let value = row.and_then(|r| r.get(a)).copied().unwrap_or_default();
            (a, value)
        })
    }

    /// States with at least one written action value
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.table.keys()
    }

    /// Number of written state-action pairs
    pub fn len(&self) -> usize {
        self.table.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &A, f64)> {
        self.table
            .iter()
            .flat_map(|(s, row)| row.iter().map(move |(a, v)| (s, a, *v)))
    }
}

impl<S: Eq + Hash, A: Eq + Hash> Default for QTable<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Eq + Hash, A: Eq + Hash> PartialEq for QTable<S, A> {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

/// Visit counts for incremental sample means, keyed by state or by state-action pair
#[derive(Debug, Clone)]
pub struct VisitCount<K> {
    counts: HashMap<K, u32>,
}

impl<K: Eq + Hash> VisitCount<K> {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }

    /// Increment the count for `key`
    ///
    /// **Returns** the new count
    pub fn increment(&mut self, key: K) -> u32 {
        let n = self.counts.entry(key).or_default();
        *n += 1;
        *n
    }

    pub fn get(&self, key: &K) -> u32 {
        self.counts.get(key).copied().unwrap_or_default()
    }
}

impl<K: Eq + Hash> Default for VisitCount<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> PartialEq for VisitCount<K> {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts
    }
}
