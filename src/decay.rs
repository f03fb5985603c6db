use crate::error::{Error, Result};

/// A rule mapping an episode index to a hyperparameter value
///
/// Episode 0 is the value before training starts. Episodes are numbered from 1 by
/// [`Agent::new_episode`](crate::Agent::new_episode).
pub trait Decay {
    fn at(&self, episode: u32) -> f64;
}

/// Any `Fn(u32) -> f64` is a decay rule, e.g. `|episode| 1.0 / (1 + episode) as f64`
impl<F> Decay for F
where
    F: Fn(u32) -> f64,
{
    fn at(&self, episode: u32) -> f64 {
        self(episode)
    }
}

/// Shared bounds for the built-in rules: a value that starts at `initial`, never rises and
/// approaches `floor`
fn check_bounds(initial: f64, floor: f64, rate: f64) -> Result<()> {
    if !(initial.is_finite() && floor.is_finite()) {
        return Err(Error::InvalidParameter(format!(
            "decay bounds must be finite, got initial {initial} and floor {floor}"
        )));
    }
    if floor > initial {
        return Err(Error::InvalidParameter(format!(
            "decay floor {floor} is above its initial value {initial}"
        )));
    }
    if !(rate.is_finite() && rate >= 0.0) {
        return Err(Error::InvalidParameter(format!(
            "decay rate must be finite and non-negative, got {rate}"
        )));
    }
    Ok(())
}

/// v(n) = floor + (initial - floor) · e<sup>-rate·n</sup>
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exponential {
    initial: f64,
    floor: f64,
    rate: f64,
}

impl Exponential {
    pub fn new(initial: f64, floor: f64, rate: f64) -> Result<Self> {
        check_bounds(initial, floor, rate)?;
        Ok(Self {
            initial,
            floor,
            rate,
        })
    }

    /// Halve the distance to `floor` every `episodes` episodes
    pub fn with_half_life(initial: f64, floor: f64, episodes: u32) -> Result<Self> {
        if episodes == 0 {
            return Err(Error::InvalidParameter(String::from(
                "decay half-life must be at least one episode",
            )));
        }
        Self::new(initial, floor, std::f64::consts::LN_2 / f64::from(episodes))
    }
}

impl Decay for Exponential {
    fn at(&self, episode: u32) -> f64 {
        let &Self {
            initial,
            floor,
            rate,
        } = self;
        floor + (initial - floor) * (-rate * f64::from(episode)).exp()
    }
}

/// v(n) = floor + (initial - floor) / (1 + rate·n)
///
/// `InverseTime::new(1.0, 0.0, 1.0)` is the classic `1 / (1 + n)` learning rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseTime {
    initial: f64,
    floor: f64,
    rate: f64,
}

impl InverseTime {
    pub fn new(initial: f64, floor: f64, rate: f64) -> Result<Self> {
        check_bounds(initial, floor, rate)?;
        Ok(Self {
            initial,
            floor,
            rate,
        })
    }
}

impl Decay for InverseTime {
    fn at(&self, episode: u32) -> f64 {
        let &Self {
            initial,
            floor,
            rate,
        } = self;
        floor + (initial - floor) / (1.0 + rate * f64::from(episode))
    }
}
