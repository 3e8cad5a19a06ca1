//! Run log printing
//!
//! Run status responses carry the log messages added since the `after`
//! cursor, grouped by step. Each flush merges the steps, orders the messages
//! by time and prints them.

use std::io::{self, Write};

use chrono::TimeZone;
use hosted_api::{JobResponse, LogMessage};

use super::LogLevel;

/// Step whose messages are only shown up to the configured level
pub const DEFAULT_NOISY_STEP: &str = "copyVespaLogs";

/// Time zone of printed timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timestamps {
    #[default]
    Local,
    Utc,
}

impl Timestamps {
    /// `HH:MM:SS` of an epoch millisecond timestamp
    fn clock_time(&self, at: i64) -> String {
        let formatted = match self {
            Timestamps::Local => chrono::Local
                .timestamp_millis_opt(at)
                .earliest()
                .map(|t| t.format("%H:%M:%S").to_string()),
            Timestamps::Utc => chrono::Utc
                .timestamp_millis_opt(at)
                .single()
                .map(|t| t.format("%H:%M:%S").to_string()),
        };
        formatted.unwrap_or_else(|| "--:--:--".to_string())
    }
}

/// Prints run log messages to a writer
#[derive(Debug)]
pub struct RunLogPrinter<W> {
    writer: W,
    level: LogLevel,
    noisy_step: String,
    timestamps: Timestamps,
}

impl<W: Write> RunLogPrinter<W> {
    pub fn new(writer: W, level: LogLevel) -> Self {
        Self {
            writer,
            level,
            noisy_step: DEFAULT_NOISY_STEP.to_string(),
            timestamps: Timestamps::Local,
        }
    }

    pub fn with_noisy_step(mut self, step: impl Into<String>) -> Self {
        self.noisy_step = step.into();
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, timestamps: Timestamps) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Print the messages of one observation and return the new cursor
    ///
    /// An observation with `lastId` 0 carries no log and leaves the cursor
    /// untouched.
    pub fn flush(&mut self, observation: &JobResponse, cursor: i64) -> io::Result<i64> {
        if observation.last_id == 0 {
            return Ok(cursor);
        }

        let level = self.level;
        let noisy_step = self.noisy_step.as_str();
        let mut messages: Vec<&LogMessage> = observation
            .log
            .iter()
            .flat_map(|(step, messages)| {
                messages
                    .iter()
                    .filter(move |message| keep(step, message, noisy_step, level))
            })
            .collect();
        messages.sort_by_key(|message| message.at);

        for message in messages {
            writeln!(
                self.writer,
                "[{}] {:<7} {}",
                self.timestamps.clock_time(message.at),
                message.level,
                message.message
            )?;
        }
        self.writer.flush()?;

        Ok(cursor.max(observation.last_id))
    }
}

fn keep(step: &str, message: &LogMessage, noisy_step: &str, threshold: LogLevel) -> bool {
    let level = LogLevel::from_name(&message.level);
    if level == LogLevel::Debug {
        return false;
    }
    !(step == noisy_step && level > threshold)
}
