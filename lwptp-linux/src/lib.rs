pub mod clock;
pub mod config;
pub mod network;
pub mod tracing;
