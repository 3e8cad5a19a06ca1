//! Poll deadlines
//!
//! A poll runs under one of three bounds:
//! - `Once`: a single attempt, no waiting (a zero timeout)
//! - `After(d)`: attempts until `d` of wall-clock time has elapsed
//! - `Never`: no bound, used when following logs
//!
//! The deadline only answers "may I try again, and after how long"; the
//! poller decides what an expired deadline means.

use std::time::{Duration, Instant};

/// Bound on the total duration of a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTimeout {
    Once,
    After(Duration),
    Never,
}

impl PollTimeout {
    pub fn from_secs(seconds: u64) -> Self {
        Duration::from_secs(seconds).into()
    }

    /// Bounded polls that actually wait (not `Once`)
    pub fn waits(&self) -> bool {
        !matches!(self, PollTimeout::Once)
    }
}

impl From<Duration> for PollTimeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            PollTimeout::Once
        } else {
            PollTimeout::After(duration)
        }
    }
}

/// Deadline check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStatus {
    /// More attempts are allowed
    Ok,
    /// The single attempt of a `Once` poll has been made
    Exhausted,
    /// Wall-clock bound exceeded
    Expired,
}

impl TimeoutStatus {
    pub fn is_timeout(&self) -> bool {
        !matches!(self, TimeoutStatus::Ok)
    }
}

/// Deadline of one poll, started when the poll starts
#[derive(Debug)]
pub struct Deadline {
    timeout: PollTimeout,
    start_time: Instant,
}

impl Deadline {
    pub fn start(timeout: PollTimeout) -> Self {
        Self {
            timeout,
            start_time: Instant::now(),
        }
    }

    pub fn timeout(&self) -> PollTimeout {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Time left, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        match self.timeout {
            PollTimeout::Once => Some(Duration::ZERO),
            PollTimeout::After(limit) => Some(limit.saturating_sub(self.elapsed())),
            PollTimeout::Never => None,
        }
    }

    /// Check whether another attempt may be made
    pub fn check(&self) -> TimeoutStatus {
        match self.timeout {
            PollTimeout::Once => TimeoutStatus::Exhausted,
            PollTimeout::Never => TimeoutStatus::Ok,
            PollTimeout::After(limit) => {
                if self.elapsed() >= limit {
                    TimeoutStatus::Expired
                } else {
                    TimeoutStatus::Ok
                }
            }
        }
    }

    /// Delay before the next attempt, capped so the last attempt lands on
    /// the deadline. `None` when no further attempt is allowed.
    pub fn next_delay(&self, interval: Duration) -> Option<Duration> {
        if self.check().is_timeout() {
            return None;
        }
        match self.remaining() {
            Some(remaining) => Some(interval.min(remaining)),
            None => Some(interval),
        }
    }
}
