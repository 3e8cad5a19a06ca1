//! Hosted API Wire Types
//!
//! Request paths and JSON response bodies of the deployment control plane.

pub mod ids;
pub mod ops;
pub mod paths;

pub use ids::{ApplicationId, Deployment, IdError, ZoneId};
pub use ops::{CliVersionResponse, DeploymentEndpoint, DeploymentResponse, JobResponse, LogMessage};

/// Endpoint scope retained by endpoint discovery.
pub const SCOPE_ZONE: &str = "zone";

/// Run status reported by a successful run.
pub const RUN_STATUS_SUCCESS: &str = "success";

/// Run-log cursor meaning "from the beginning".
pub const RUN_LOG_START: i64 = -1;

/// Query parameter names.
pub mod params {
    pub const AFTER: &str = "after";
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
}
