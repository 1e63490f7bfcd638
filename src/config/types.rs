use serde::{Deserialize, Serialize};

use crate::store::HistoryPolicy;

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Time-travel history retention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Newest entries to keep; 0 keeps everything (default: 0).
    #[serde(default)]
    pub max_entries: usize,
}

impl HistoryConfig {
    pub fn policy(&self) -> HistoryPolicy {
        match self.max_entries {
            0 => HistoryPolicy::Unbounded,
            max => HistoryPolicy::Capped(max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Settings for the `demo` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Counters to add (default: 1).
    #[serde(default = "default_counters")]
    pub counters: usize,
    /// Simulated latency of the fact client in milliseconds (default: 10).
    #[serde(default = "default_fact_delay_ms")]
    pub fact_delay_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            counters: default_counters(),
            fact_delay_ms: default_fact_delay_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_counters() -> usize {
    1
}

fn default_fact_delay_ms() -> u64 {
    10
}
