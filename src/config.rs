/*!
 * Runtime Configuration
 * Environment-driven settings for logging and the command-line runner
 */

use serde::{Deserialize, Serialize};

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

pub const LOG_FILTER_VAR: &str = "RUST_LOG";
pub const TRACE_JSON_VAR: &str = "PROCPIPE_TRACE_JSON";
pub const STATUS_JSON_VAR: &str = "PROCPIPE_STATUS_JSON";

/// Settings read once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuntimeConfig {
    /// `EnvFilter` directive string
    pub log_filter: String,
    /// Emit log lines as JSON instead of compact text
    pub trace_json: bool,
    /// Print the child's final status as JSON on stderr
    pub status_json: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            trace_json: false,
            status_json: false,
        }
    }
}

impl RuntimeConfig {
    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns `None` for unset keys
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_filter = lookup(LOG_FILTER_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            log_filter,
            trace_json: lookup(TRACE_JSON_VAR).is_some_and(|v| parse_flag(&v)),
            status_json: lookup(STATUS_JSON_VAR).is_some_and(|v| parse_flag(&v)),
        }
    }

    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_trace_json(mut self, enabled: bool) -> Self {
        self.trace_json = enabled;
        self
    }

    #[must_use]
    pub fn with_status_json(mut self, enabled: bool) -> Self {
        self.status_json = enabled;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
