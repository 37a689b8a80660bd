mod error;
mod handle;
mod shard;
mod store;

pub use error::{LoadErr, Result, SizeMismatchErr};
pub use handle::ParameterHandle;
pub(super) use shard::ParameterShard;
pub use store::ParameterStore;
