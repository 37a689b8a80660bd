pub mod arch;
pub mod checkpoint;
pub mod error;
pub mod rl;

pub use error::{MlErr, Result};
