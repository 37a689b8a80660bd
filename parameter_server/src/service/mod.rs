mod builder;
mod pserver;
mod server;

pub use builder::{BuildErr, ServerBuilder};
pub use pserver::ParameterServer;
pub use server::Server;
