//! Control plane request paths.
//!
//! Paths are relative to the system URL and never carry a query string;
//! cursors are appended by the caller on every attempt.

use crate::ids::Deployment;

/// Minimum supported client version.
pub const CLI_VERSION: &str = "/cli/v1/";

/// Health page of the deploy service.
pub const DEPLOY_STATUS: &str = "/status.html";

/// Health page of data plane containers.
pub const APPLICATION_STATUS: &str = "/ApplicationStatus";

fn instance_path(deployment: &Deployment) -> String {
    let app = &deployment.application;
    format!(
        "/application/v4/tenant/{}/application/{}/instance/{}",
        app.tenant, app.application, app.instance
    )
}

/// Deployment description, listing the deployment's endpoints.
pub fn deployment(deployment: &Deployment) -> String {
    format!(
        "{}/environment/{}/region/{}",
        instance_path(deployment),
        deployment.zone.environment,
        deployment.zone.region
    )
}

/// Status and log of one deployment job run.
pub fn run(deployment: &Deployment, run_id: i64) -> String {
    format!(
        "{}/job/{}-{}/run/{}",
        instance_path(deployment),
        deployment.zone.environment,
        deployment.zone.region,
        run_id
    )
}

/// Log entries of a running deployment.
pub fn logs(deployment: &Deployment) -> String {
    format!("{}/logs", self::deployment(deployment))
}
