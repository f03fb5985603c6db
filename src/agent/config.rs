use crate::schedule::Schedule;

/// Configuration shared by every [`Agent`](super::Agent)
///
/// Algorithms that do not learn incrementally ignore `alpha`, and prediction algorithms
/// ignore `epsilon`.
#[derive(Debug)]
pub struct AgentConfig {
    /// The discount factor, in `[0, 1)`
    ///
    /// When unset, agents solving an [`Mdp`](crate::env::Mdp) use the model's own discount and
    /// every other agent uses [`AgentConfig::DEFAULT_DISCOUNT`].
    ///
    /// **Default**: `None`
    pub discount: Option<f64>,
    /// The learning rate and how it changes across episodes
    ///
    /// **Default**: constant `0.05`
    pub alpha: Schedule,
    /// The exploration rate for epsilon-greedy action selection and how it changes across episodes
    ///
    /// **Default**: constant `0.3`
    pub epsilon: Schedule,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            discount: None,
            alpha: Schedule::constant(0.05),
            epsilon: Schedule::constant(0.3),
        }
    }
}

impl AgentConfig {
    /// Discount used when neither the config nor the domain supplies one
    pub const DEFAULT_DISCOUNT: f64 = 0.9;

    pub fn discount(mut self, discount: f64) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn alpha(mut self, alpha: Schedule) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn epsilon(mut self, epsilon: Schedule) -> Self {
        self.epsilon = epsilon;
        self
    }
}
