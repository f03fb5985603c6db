use log::trace;
use rand::Rng;

use crate::{
    error::{Error, Result},
    util::RandomSource,
};

use super::{DiscreteSpace, Environment, Mdp};

/// Slack allowed when checking that transition probabilities sum to one
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Sample a successor of `(state, action)` from a single uniform draw in `[0, 1)`
///
/// Walks the successor list accumulating probability and returns the first successor whose
/// cumulative mass exceeds `draw`, together with its reward.
///
/// **Errors** with [`Error::ModelInconsistency`] if the running mass exceeds one, or the whole
/// list sums to less than one; the model is never renormalized.
pub fn sample_transition<M: Mdp>(
    mdp: &M,
    state: &M::State,
    action: &M::Action,
    draw: f64,
) -> Result<(M::State, f64)> {
    let inconsistent = |mass: f64| Error::ModelInconsistency {
        state: format!("{state:?}"),
        action: format!("{action:?}"),
        mass,
    };

    let successors = mdp.transitions(state, action)?;
    let mut mass = 0.0;
    let mut last = None;
    for (next_state, prob) in successors {
        mass += prob;
        if mass > 1.0 + PROBABILITY_TOLERANCE {
            return Err(inconsistent(mass));
        }
        if prob > 0.0 {
            if draw < mass {
                let reward = mdp.reward(state, action, &next_state);
                return Ok((next_state, reward));
            }
            last = Some(next_state);
        }
    }

    // A draw landing in the rounding gap below 1.0 belongs to the last successor
    match last {
        Some(next_state) if (mass - 1.0).abs() <= PROBABILITY_TOLERANCE => {
            let reward = mdp.reward(state, action, &next_state);
            Ok((next_state, reward))
        }
        _ => Err(inconsistent(mass)),
    }
}

/// An [`Environment`] that executes actions by sampling a known [`Mdp`]
///
/// This is the only place randomness enters model execution; the random source is provided
/// at construction so runs can be made reproducible.
#[derive(Debug, Clone)]
pub struct MdpEnvironment<M: Mdp> {
    mdp: M,
    state: M::State,
    rng: RandomSource,
}

impl<M: Mdp> MdpEnvironment<M> {
    /// Initialize an environment positioned at the MDP's start state
    pub fn new(mdp: M, rng: RandomSource) -> Self {
        let state = mdp.start_state();
        Self { mdp, state, rng }
    }

    pub fn mdp(&self) -> &M {
        &self.mdp
    }

    /// Mutable access to the MDP for configuration before a run
    pub fn mdp_mut(&mut self) -> &mut M {
        &mut self.mdp
    }
}

impl<M: Mdp> DiscreteSpace for MdpEnvironment<M> {
    type State = M::State;
    type Action = M::Action;

    fn actions(&self, state: &Self::State) -> Vec<Self::Action> {
        self.mdp.actions(state)
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        self.mdp.is_terminal(state)
    }
}

impl<M: Mdp> Environment for MdpEnvironment<M> {
    fn current_state(&self) -> Self::State {
        self.state.clone()
    }

    fn step(&mut self, action: Self::Action) -> Result<(Self::State, f64)> {
        let draw: f64 = self.rng.gen();
        let (next_state, reward) = sample_transition(&self.mdp, &self.state, &action, draw)?;
        trace!("{:?} --{:?}--> {:?} ({})", self.state, action, next_state, reward);
        self.state = next_state.clone();
        Ok((next_state, reward))
    }

    fn reset(&mut self) -> Self::State {
        self.state = self.mdp.start_state();
        self.state.clone()
    }
}
