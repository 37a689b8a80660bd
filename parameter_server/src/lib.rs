pub mod initialization;
pub mod optimization;
pub mod service;
pub mod storage;
