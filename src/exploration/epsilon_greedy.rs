use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

use crate::error::{Error, Result};

use super::Choice;

/// Epsilon greedy exploration coin: explore with probability ε, exploit otherwise
///
/// The threshold is fixed at construction; agents build one per decision from their
/// scheduled exploration rate.
#[derive(Debug, Clone, Copy)]
pub struct EpsilonGreedy {
    coin: Bernoulli,
}

impl EpsilonGreedy {
    /// **Errors** if `epsilon` is not in the interval `[0, 1]`
    pub fn new(epsilon: f64) -> Result<Self> {
        let coin = Bernoulli::new(epsilon)
            .map_err(|_| Error::InvalidParameter(format!("epsilon {epsilon} is not in [0, 1]")))?;
        Ok(Self { coin })
    }

    /// Flip the coin
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Choice {
        if self.coin.sample(rng) {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}
