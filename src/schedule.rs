use std::fmt;

use crate::decay::Decay;

/// A hyperparameter (learning rate or exploration rate) owned by one agent
///
/// The schedule is either constant or recomputed from the episode index through a [`Decay`]
/// rule. [`Schedule::update`] is the only transition and is a pure function of the index, so
/// calling it twice for the same episode yields the same value.
pub enum Schedule {
    Constant(f64),
    Decaying { rule: Box<dyn Decay>, value: f64 },
}

impl Schedule {
    pub fn constant(value: f64) -> Self {
        Self::Constant(value)
    }

    /// A decaying schedule starting at the rule's value for episode 0
    pub fn decaying(rule: impl Decay + 'static) -> Self {
        let value = rule.at(0);
        Self::Decaying {
            rule: Box::new(rule),
            value,
        }
    }

    /// The current value
    pub fn value(&self) -> f64 {
        match self {
            Self::Constant(value) => *value,
            Self::Decaying { value, .. } => *value,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// Recompute the value for `episode`
    ///
    /// **Returns** the new value
    pub fn update(&mut self, episode: u32) -> f64 {
        match self {
            Self::Constant(value) => *value,
            Self::Decaying { rule, value } => {
                *value = rule.at(episode);
                *value
            }
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Decaying { value, .. } => f
                .debug_struct("Decaying")
                .field("value", value)
                .finish_non_exhaustive(),
        }
    }
}
