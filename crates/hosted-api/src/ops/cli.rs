//! Client compatibility check.

use serde::{Deserialize, Serialize};

/// Response of the minimum client version endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliVersionResponse {
    /// Oldest client version the service accepts (semantic version).
    #[serde(rename = "minVersion")]
    pub min_version: String,
}
