use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::{CartPole, Environment, MovingDot};

/// The environment identifier is not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEnv(pub String);

impl Display for UnknownEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown environment {}, expected one of {:?}",
            self.0,
            ["CartPole-v1", "MovingDot-v0"]
        )
    }
}

impl Error for UnknownEnv {}

/// Instantiates a registered environment.
///
/// # Arguments
/// * `env_id` - The environment identifier, e.g. `CartPole-v1`.
/// * `seed` - Seeds the environment's own randomness.
pub fn make(env_id: &str, seed: u64) -> Result<Box<dyn Environment + Send>, UnknownEnv> {
    match env_id {
        "CartPole-v1" => Ok(Box::new(CartPole::new(seed))),
        "MovingDot-v0" => Ok(Box::new(MovingDot::new(seed))),
        other => Err(UnknownEnv(other.to_string())),
    }
}

/// The observation size and action count of a registered environment.
pub fn dimensions_of(env_id: &str) -> Result<(usize, usize), UnknownEnv> {
    let env = make(env_id, 0)?;
    Ok((env.observation_size(), env.actions()))
}
