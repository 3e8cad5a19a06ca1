//! Target errors
//!
//! Every failure surfaced by a target maps onto one error kind, which in
//! turn determines the CLI exit code.

use std::time::Duration;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::host::{TlsError, TransportError};
use crate::logs::LogDecodeError;
use crate::state::StateError;

/// Error kind for exit code mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or ambiguous configuration (exit code 10)
    Configuration = 10,
    /// Rejected or missing credentials (exit code 20)
    Authentication = 20,
    /// Transport failures (exit code 30)
    Network = 30,
    /// Poll deadline exceeded (exit code 40)
    Timeout = 40,
    /// Deployment run ended unsuccessfully (exit code 50)
    RemoteJobFailure = 50,
    /// Unexpected responses from the control plane (exit code 60)
    Protocol = 60,
}

/// Target errors
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("status {status}: invalid credentials")]
    Unauthorized { status: u16 },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid client certificate: {0}")]
    Tls(#[from] TlsError),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("unknown cluster '{cluster}': must be one of {known:?}")]
    UnknownCluster { cluster: String, known: Vec<String> },

    #[error("multiple clusters, none chosen: {known:?}")]
    AmbiguousCluster { known: Vec<String> },

    #[error("no endpoints")]
    NoEndpoints,

    #[error("no endpoints discovered")]
    NoEndpointsDiscovered,

    #[error("giving up after {timeout:?}{}", status_suffix(.last_status))]
    Timeout {
        timeout: Duration,
        last_status: Option<u16>,
    },

    #[error("run {run_id} ended with unsuccessful status: {status}")]
    RunFailed { run_id: i64, status: String },

    #[error("got status {status} from {service} service at {url}")]
    UnexpectedStatus {
        service: String,
        status: u16,
        url: String,
    },

    #[error(transparent)]
    Network(#[from] TransportError),

    #[error("invalid log data: {0}")]
    LogDecode(#[from] LogDecodeError),

    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("invalid version: {0}")]
    Version(#[from] semver::Error),

    #[error("client version {client} is less than the minimum supported version: {minimum}")]
    UnsupportedVersion {
        client: semver::Version,
        minimum: semver::Version,
    },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl TargetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TargetError::Unauthorized { .. } => ErrorKind::Authentication,
            TargetError::Auth(e) if e.is_configuration() => ErrorKind::Configuration,
            TargetError::Auth(_) => ErrorKind::Authentication,
            TargetError::Config(_) => ErrorKind::Configuration,
            TargetError::Tls(_) => ErrorKind::Configuration,
            TargetError::UnknownService(_) => ErrorKind::Configuration,
            TargetError::UnknownCluster { .. } => ErrorKind::Configuration,
            TargetError::AmbiguousCluster { .. } => ErrorKind::Configuration,
            TargetError::NoEndpoints => ErrorKind::Configuration,
            TargetError::NoEndpointsDiscovered => ErrorKind::Configuration,
            TargetError::Timeout { .. } => ErrorKind::Timeout,
            TargetError::RunFailed { .. } => ErrorKind::RemoteJobFailure,
            TargetError::UnexpectedStatus { .. } => ErrorKind::Protocol,
            TargetError::Network(e) if !e.is_transient() => ErrorKind::Configuration,
            TargetError::Network(_) => ErrorKind::Network,
            TargetError::LogDecode(_) => ErrorKind::Protocol,
            TargetError::InvalidResponse(_) => ErrorKind::Protocol,
            TargetError::Version(_) => ErrorKind::Protocol,
            TargetError::UnsupportedVersion { .. } => ErrorKind::Configuration,
            TargetError::State(_) => ErrorKind::Protocol,
            TargetError::Output(_) => ErrorKind::Configuration,
        }
    }

    /// Exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.kind() as i32
    }
}

fn status_suffix(last_status: &Option<u16>) -> String {
    match last_status {
        Some(status) => format!(": last status was {}", status),
        None => String::new(),
    }
}

/// Result type for target operations
pub type TargetResult<T> = Result<T, TargetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(TargetError::Unauthorized { status: 401 }.exit_code(), 20);
        assert_eq!(TargetError::NoEndpoints.exit_code(), 10);
        assert_eq!(
            TargetError::RunFailed { run_id: 3, status: "error".into() }.exit_code(),
            50
        );
        assert_eq!(
            TargetError::Timeout { timeout: Duration::from_secs(1), last_status: None }.exit_code(),
            40
        );
    }

    #[test]
    fn test_missing_credential_is_configuration() {
        let err = TargetError::from(AuthError::MissingCredential("public".into()));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = TargetError::from(AuthError::CertificateRequired("main".into()));
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            TargetError::Unauthorized { status: 401 }.to_string(),
            "status 401: invalid credentials"
        );
        assert_eq!(
            TargetError::RunFailed { run_id: 42, status: "error".into() }.to_string(),
            "run 42 ended with unsuccessful status: error"
        );
        assert_eq!(
            TargetError::Timeout { timeout: Duration::from_secs(5), last_status: Some(503) }.to_string(),
            "giving up after 5s: last status was 503"
        );
        assert_eq!(
            TargetError::AmbiguousCluster { known: vec!["a".into(), "b".into()] }.to_string(),
            "multiple clusters, none chosen: [\"a\", \"b\"]"
        );
    }
}
