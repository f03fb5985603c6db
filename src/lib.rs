/// Agents and the algorithm interface they delegate to
pub mod agent;

/// Implemented RL algorithms
pub mod algo;

/// Rules that decay a hyperparameter with the episode index
pub mod decay;

/// Data structures
pub mod ds;

/// Models and environments
pub mod env;

/// Error type
pub mod error;

/// Exploration strategies
pub mod exploration;

/// Experience records
pub mod memory;

/// Action-selection policies
pub mod policy;

/// Hyperparameter schedules
pub mod schedule;

/// Testing environments
#[cfg(feature = "gym")]
pub mod gym;

pub mod util;

pub use agent::{Agent, AgentConfig};
pub use error::{Error, Result};
pub use policy::Policy;
pub use schedule::Schedule;
