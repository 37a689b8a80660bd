use std::collections::HashMap;

/// The outcome of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    pub info: HashMap<&'static str, f32>,
}

/// An episodic environment with a discrete action space.
pub trait Environment {
    /// Starts a new episode.
    ///
    /// # Returns
    /// The initial state.
    fn reset(&mut self) -> Vec<f32>;

    /// Advances the episode by one action.
    ///
    /// # Arguments
    /// * `action` - An index in `0..self.actions()`.
    fn step(&mut self, action: usize) -> Step;

    /// Draws the current state, diagnostics only.
    fn render(&mut self) {}

    /// The amount of discrete actions.
    fn actions(&self) -> usize;

    /// The length of every state.
    fn observation_size(&self) -> usize;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn reset(&mut self) -> Vec<f32> {
        (**self).reset()
    }

    fn step(&mut self, action: usize) -> Step {
        (**self).step(action)
    }

    fn render(&mut self) {
        (**self).render()
    }

    fn actions(&self) -> usize {
        (**self).actions()
    }

    fn observation_size(&self) -> usize {
        (**self).observation_size()
    }
}
