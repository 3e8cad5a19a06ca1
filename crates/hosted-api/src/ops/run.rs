//! Deployment job run status.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::RUN_STATUS_SUCCESS;

/// One log message of a run step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Epoch milliseconds.
    pub at: i64,
    /// Level name (`info`, `warning`, `error`, `debug`, ...).
    #[serde(rename = "type")]
    pub level: String,
    pub message: String,
}

/// Run status observed by one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResponse {
    /// Whether the run is still executing.
    pub active: bool,
    /// Terminal status, `success` or a failure reason.
    #[serde(default)]
    pub status: String,
    /// New log messages keyed by step name.
    #[serde(default)]
    pub log: BTreeMap<String, Vec<LogMessage>>,
    /// Id of the newest log message included; 0 when there is none.
    #[serde(rename = "lastId", default)]
    pub last_id: i64,
}

impl JobResponse {
    pub fn is_success(&self) -> bool {
        self.status == RUN_STATUS_SUCCESS
    }
}
