mod activations;
mod actor_critic;
mod dense;
mod layout;

pub use activations::ActFn;
pub use actor_critic::{ActorCritic, LossStats};
pub use dense::Dense;
pub use layout::{Layout, TensorSpec};
