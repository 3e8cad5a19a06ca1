//! Hosted Target - client for a hosted deployment control plane
//!
//! This crate resolves service endpoints of a deployed application,
//! authenticates control plane requests, waits for deployment runs and
//! streams deployment logs without repeating entries.

pub mod auth;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod host;
pub mod logs;
pub mod poll;
pub mod run;
pub mod state;
pub mod system;
pub mod target;
pub mod timeout;

pub use auth::{AuthError, AuthStrategy, Authenticator};
pub use config::{ConfigError, TargetConfig};
pub use endpoints::ClusterEndpoints;
pub use error::{ErrorKind, TargetError, TargetResult};
pub use host::{HttpTransport, HttpRequest, HttpResponse, MockTransport, TlsIdentity, Transport};
pub use logs::{LogLevel, LogOptions};
pub use poll::{PollConfig, Poller};
pub use state::RunState;
pub use system::{System, TargetType, TrustMode};
pub use target::{Service, ServiceKind, Target};
pub use timeout::PollTimeout;

pub use hosted_api::{ApplicationId, Deployment, ZoneId};
