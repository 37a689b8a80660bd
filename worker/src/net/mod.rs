mod client;

pub use client::PsClient;
