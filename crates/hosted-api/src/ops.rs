//! Response bodies.

pub mod cli;
pub mod deployment;
pub mod run;

pub use cli::CliVersionResponse;
pub use deployment::{DeploymentEndpoint, DeploymentResponse};
pub use run::{JobResponse, LogMessage};
