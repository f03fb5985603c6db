use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```should_panic
/// # use tabrl::assert_interval;
/// let value = 2.0;
/// assert_interval!(value, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`value\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// The random number generator threaded through environments, policies and agents
///
/// A single concrete, seedable generator keeps runs reproducible: seed it with [`seeded`] in
/// tests and with [`from_entropy`] otherwise.
pub type RandomSource = ChaCha8Rng;

/// Construct a deterministic random source from a seed
pub fn seeded(seed: u64) -> RandomSource {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Construct a random source seeded from the operating system
pub fn from_entropy() -> RandomSource {
    ChaCha8Rng::from_entropy()
}
