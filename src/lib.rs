pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod rubric;
pub mod session;
pub mod telemetry;
