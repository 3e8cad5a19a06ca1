//! Log streaming
//!
//! Two incremental log sources:
//! - run logs, embedded in run status responses and tracked by message id
//! - the deployment log tail, tracked by entry timestamp
//!
//! Both cursors only ever move forward, so no entry is printed twice.

pub mod entry;
pub mod run_log;
pub mod tail;

pub use entry::{LogDecodeError, LogDecoder, LogEntry, TabSeparatedDecoder};
pub use run_log::{RunLogPrinter, Timestamps, DEFAULT_NOISY_STEP};
pub use tail::LogTail;

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::timeout::PollTimeout;

/// Verbosity level; lower codes are more severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    #[default]
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    /// Level of a message type name; unrecognized names count as debug
    pub fn from_name(name: &str) -> Self {
        match name {
            "fatal" | "error" => LogLevel::Error,
            "warning" => LogLevel::Warning,
            "info" => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse, for thresholds given by users
impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warning" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!(
                "invalid log level '{}': must be one of error, warning, info, debug",
                other
            )),
        }
    }
}

/// Options of one log tail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Only entries strictly newer than this are printed (default: epoch)
    pub from: Option<DateTime<Utc>>,
    /// Upper bound passed to the server
    pub to: Option<DateTime<Utc>>,
    /// Keep polling until interrupted
    pub follow: bool,
    pub level: LogLevel,
    /// Expand `\n` and `\t` escapes in messages
    pub dequote: bool,
    /// Bound of a non-follow tail (default: a single request)
    pub timeout: PollTimeout,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            follow: false,
            level: LogLevel::Info,
            dequote: false,
            timeout: PollTimeout::Once,
        }
    }
}

impl LogOptions {
    pub fn poll_timeout(&self) -> PollTimeout {
        if self.follow {
            PollTimeout::Never
        } else {
            self.timeout
        }
    }
}
