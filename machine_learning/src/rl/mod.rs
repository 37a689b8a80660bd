mod clip;
mod distribution;
mod returns;

pub use clip::{clip_by_global_norm, global_norm};
pub use distribution::Categorical;
pub use returns::{discounted_returns, n_step_returns};
