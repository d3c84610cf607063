//! Logging configuration types.

use serde::Deserialize;

/// Logger configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default filter directive when `CALENDAR_LOG` is unset.
    pub level: String,
    /// Directory for the JSON log file. Stdout only when absent.
    pub path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            path: None,
        }
    }
}
