pub mod gridworld;

pub use gridworld::{Cell, GridAction, GridState, Gridworld};
