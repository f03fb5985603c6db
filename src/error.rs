use thiserror::Error;

/// Errors raised while solving or sampling a finite MDP
///
/// States and actions are rendered with their `Debug` representation so the error type
/// stays independent of the domain's state and action types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The action is not legal in the given state
    #[error("illegal action {action} at state {state}")]
    InvalidAction { state: String, action: String },

    /// Transition probabilities for a state-action pair do not sum to one
    #[error("transition probabilities for state {state}, action {action} sum to {mass}, expected 1.0")]
    ModelInconsistency {
        state: String,
        action: String,
        mass: f64,
    },

    /// A tabular policy was queried for a state it was never built over
    #[error("policy has no entry for state {state}")]
    KeyNotFound { state: String },

    /// A hyperparameter or decay rule was constructed with invalid arguments
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("MDP has no start state")]
    NoStartState,
}

impl Error {
    pub(crate) fn invalid_action(
        state: &impl std::fmt::Debug,
        action: &impl std::fmt::Debug,
    ) -> Self {
        Self::InvalidAction {
            state: format!("{state:?}"),
            action: format!("{action:?}"),
        }
    }

    pub(crate) fn key_not_found(state: &impl std::fmt::Debug) -> Self {
        Self::KeyNotFound {
            state: format!("{state:?}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
