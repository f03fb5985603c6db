use crate::env::DiscreteSpace;

/// Represents a single experience or transition in the environment
pub struct Exp<E: DiscreteSpace> {
    /// The state of the environment before taking the action
    pub state: E::State,
    /// The action taken in the given state
    pub action: E::Action,
    /// The reward received after taking the action
    pub reward: f64,
    /// The state of the environment after the action is taken
    pub next_state: E::State,
}

impl<E: DiscreteSpace> Clone for Exp<E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            action: self.action.clone(),
            reward: self.reward,
            next_state: self.next_state.clone(),
        }
    }
}

impl<E: DiscreteSpace> std::fmt::Debug for Exp<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exp")
            .field("state", &self.state)
            .field("action", &self.action)
            .field("reward", &self.reward)
            .field("next_state", &self.next_state)
            .finish()
    }
}

/// The ordered experiences of one episode
pub struct Trajectory<E: DiscreteSpace> {
    steps: Vec<Exp<E>>,
}

impl<E: DiscreteSpace> Trajectory<E> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn push(&mut self, exp: Exp<E>) {
        self.steps.push(exp);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Exp<E>] {
        &self.steps
    }

    /// Undiscounted sum of rewards
    pub fn total_reward(&self) -> f64 {
        self.steps.iter().map(|e| e.reward).sum()
    }

    /// Walk the episode backwards, pairing every experience with its discounted return
    ///
    /// G<sub>last</sub> = R<sub>last</sub>, G<sub>k</sub> = R<sub>k</sub> + γG<sub>k+1</sub>
    pub fn backward_returns(&self, discount: f64) -> impl Iterator<Item = (&Exp<E>, f64)> {
        self.steps.iter().rev().scan(0.0, move |ret, exp| {
            *ret = exp.reward + discount * *ret;
            Some((exp, *ret))
        })
    }
}

impl<E: DiscreteSpace> Default for Trajectory<E> {
    fn default() -> Self {
        Self::new()
    }
}
