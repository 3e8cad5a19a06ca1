//! Built-in defaults
//!
//! Values used for every setting the config file leaves out.

use crate::logs::{LogLevel, DEFAULT_NOISY_STEP};

/// Built-in default configuration values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDefaults {
    /// Pause between poll attempts in milliseconds (default: 2000)
    pub retry_interval_ms: u64,

    /// Timeout of one request in seconds (default: 10)
    pub request_timeout_seconds: u64,

    /// Application instance (default: "default")
    pub instance: String,

    /// Log verbosity (default: info)
    pub log_level: LogLevel,

    /// Run step whose log is filtered by level (default: "copyVespaLogs")
    pub noisy_step: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            retry_interval_ms: 2000,
            request_timeout_seconds: 10,
            instance: "default".to_string(),
            log_level: LogLevel::Info,
            noisy_step: DEFAULT_NOISY_STEP.to_string(),
        }
    }
}

pub(super) fn retry_interval_ms() -> u64 {
    BuiltinDefaults::default().retry_interval_ms
}

pub(super) fn request_timeout_seconds() -> u64 {
    BuiltinDefaults::default().request_timeout_seconds
}

pub(super) fn instance() -> String {
    BuiltinDefaults::default().instance
}

pub(super) fn log_level() -> String {
    BuiltinDefaults::default().log_level.to_string()
}

pub(super) fn noisy_step() -> String {
    BuiltinDefaults::default().noisy_step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.retry_interval_ms, 2000);
        assert_eq!(defaults.request_timeout_seconds, 10);
        assert_eq!(defaults.instance, "default");
        assert_eq!(defaults.log_level, LogLevel::Info);
        assert_eq!(defaults.noisy_step, "copyVespaLogs");
    }

    #[test]
    fn test_serde_default_functions() {
        assert_eq!(log_level(), "info");
        assert_eq!(retry_interval_ms(), 2000);
    }
}
