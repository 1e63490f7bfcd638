//! TOML configuration.

mod loader;
mod types;

pub use loader::{ConfigError, MAX_DEMO_COUNTERS};
pub use types::{Config, DemoConfig, HistoryConfig, LoggingConfig};
