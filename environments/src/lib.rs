mod cartpole;
mod env;
mod moving_dot;
mod registry;

pub use cartpole::CartPole;
pub use env::{Environment, Step};
pub use moving_dot::MovingDot;
pub use registry::{UnknownEnv, dimensions_of, make};
