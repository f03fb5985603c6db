use crate::{ds::Hashable, error::Result};

mod simulator;
mod tabular;

pub use simulator::{sample_transition, MdpEnvironment, PROBABILITY_TOLERANCE};
pub use tabular::{MdpBuilder, TabularMdp};

/// The narrow view of a domain that agents and policies query: which actions are legal
/// and which states end an episode
///
/// Both [`Mdp`] and [`Environment`] extend this trait, so an agent is handed exactly this
/// capability when it is constructed over either one.
pub trait DiscreteSpace {
    /// A representation of the state of the environment to be passed to an agent
    type State: Hashable;

    /// A representation of an action that an agent can take to affect the environment
    type Action: Hashable;

    /// Get the legal actions for `state`, in a fixed order
    ///
    /// Empty for terminal states.
    fn actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Determine if the state is terminal
    fn is_terminal(&self, state: &Self::State) -> bool;
}

/// A finite Markov decision process with a fully known model
///
/// The model is read-only while an agent solves it; the discount may be configured
/// beforehand through [`Mdp::set_discount`].
pub trait Mdp: DiscreteSpace {
    /// All states of the process, terminal states included
    fn states(&self) -> Vec<Self::State>;

    /// The successor distribution P(·|state, action) as `(next_state, probability)` pairs
    ///
    /// **Errors** with [`Error::InvalidAction`](crate::Error::InvalidAction) if `action` is not
    /// legal in `state`
    fn transitions(
        &self,
        state: &Self::State,
        action: &Self::Action,
    ) -> Result<Vec<(Self::State, f64)>>;

    /// R(state, action, next_state)
    fn reward(&self, state: &Self::State, action: &Self::Action, next_state: &Self::State) -> f64;

    /// The state every episode starts from
    fn start_state(&self) -> Self::State;

    fn discount(&self) -> f64;

    fn set_discount(&mut self, discount: f64);
}

/// A stateful environment an agent interacts with one step at a time, without access to
/// the transition model
pub trait Environment: DiscreteSpace {
    fn current_state(&self) -> Self::State;

    /// Execute `action` in the current state, moving the environment to a sampled successor
    ///
    /// **Returns** `(next_state, reward)`
    fn step(&mut self, action: Self::Action) -> Result<(Self::State, f64)>;

    /// Reset the environment to its initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}
