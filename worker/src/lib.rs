pub mod acceptor;
pub mod builder;
pub mod error;
pub mod metrics;
pub mod model;
pub mod net;
pub mod profiler;
pub mod render;
pub mod rollout;
pub mod sync;
pub mod worker;

pub use builder::WorkerBuilder;
pub use error::WorkerErr;
pub use net::PsClient;
pub use sync::SyncClient;
pub use worker::{Worker, WorkerStats};
