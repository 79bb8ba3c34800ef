//! Pomo Core - Shared paths and configuration for the pomo task timer

pub mod config;
pub mod paths;

pub use config::{Config, Database, TimerConfig};
pub use paths::Paths;
