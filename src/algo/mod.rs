/// Dynamic programming over a known model
pub mod dp;

/// Monte Carlo prediction and control
pub mod mc;

/// Temporal-difference prediction and control
pub mod td;

pub use dp::{PolicyEvaluation, PolicyIteration, QValueIteration};
pub use mc::{Episode, MonteCarloControl, MonteCarloPrediction};
pub use td::{QLearning, Sarsa, TemporalDifference};
