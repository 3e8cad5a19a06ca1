//! Deployment log entries
//!
//! The log endpoint returns one entry per line with seven tab-separated
//! fields: time, host, pid, service, component, level and message. Time is
//! given in fractional epoch seconds.

use chrono::{DateTime, Utc};

/// One decoded log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub host: String,
    pub pid: String,
    pub service: String,
    pub component: String,
    pub level: String,
    pub message: String,
}

impl LogEntry {
    /// Single-line rendering, optionally expanding escaped newlines and tabs
    pub fn format(&self, dequote: bool) -> String {
        let message = if dequote {
            dequote_message(&self.message)
        } else {
            self.message.clone()
        };
        format!(
            "[{}] {} {} {} {}\t{}",
            self.time.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.host,
            self.level,
            self.service,
            self.component,
            message
        )
    }
}

fn dequote_message(message: &str) -> String {
    message.replace("\\n", "\n").replace("\\t", "\t")
}

/// Log decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogDecodeError {
    #[error("line {line}: expected 7 tab-separated fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: invalid timestamp '{value}'")]
    InvalidTime { line: usize, value: String },
}

/// Decodes a log response body into entries, in server order
pub trait LogDecoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<Vec<LogEntry>, LogDecodeError>;
}

/// Decoder for the tab-separated line format
#[derive(Debug, Clone, Copy, Default)]
pub struct TabSeparatedDecoder;

impl LogDecoder for TabSeparatedDecoder {
    fn decode(&self, body: &[u8]) -> Result<Vec<LogEntry>, LogDecodeError> {
        let text = String::from_utf8_lossy(body);
        let mut entries = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.splitn(7, '\t').collect();
            if fields.len() != 7 {
                return Err(LogDecodeError::FieldCount {
                    line: line_number,
                    found: fields.len(),
                });
            }

            let time = parse_time(fields[0]).ok_or_else(|| LogDecodeError::InvalidTime {
                line: line_number,
                value: fields[0].to_string(),
            })?;

            entries.push(LogEntry {
                time,
                host: fields[1].to_string(),
                pid: fields[2].to_string(),
                service: fields[3].to_string(),
                component: fields[4].to_string(),
                level: fields[5].to_string(),
                message: fields[6].to_string(),
            });
        }

        Ok(entries)
    }
}

/// Parse `seconds[.fraction]` since the epoch
fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    let (seconds, fraction) = match value.split_once('.') {
        Some((seconds, fraction)) => (seconds, fraction),
        None => (value, ""),
    };
    let seconds: i64 = seconds.parse().ok()?;

    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut digits: String = fraction.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    let nanos: u32 = digits.parse().ok()?;

    DateTime::from_timestamp(seconds, nanos)
}
