//! Service handles

use std::fmt;
use std::str::FromStr;

use hosted_api::paths;

use crate::auth::AuthStrategy;
use crate::error::{TargetError, TargetResult};
use crate::host::{HttpRequest, HttpResponse, TlsIdentity};
use crate::poll::{poll_fn, Poller, Progress};
use crate::timeout::PollTimeout;

/// Services reachable through a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// The control plane's deploy API
    Deploy,
    /// Query endpoint of a container cluster
    Query,
    /// Document API endpoint of a container cluster
    Document,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Deploy => "deploy",
            ServiceKind::Query => "query",
            ServiceKind::Document => "document",
        }
    }

    /// Served by the deployment's own clusters
    pub fn is_data_plane(&self) -> bool {
        !matches!(self, ServiceKind::Deploy)
    }

    /// Path polled by `Service::wait`
    pub fn health_path(&self) -> &'static str {
        match self {
            ServiceKind::Deploy => paths::DEPLOY_STATUS,
            ServiceKind::Query | ServiceKind::Document => paths::APPLICATION_STATUS,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deploy" => Ok(ServiceKind::Deploy),
            "query" => Ok(ServiceKind::Query),
            "document" => Ok(ServiceKind::Document),
            other => Err(TargetError::UnknownService(other.to_string())),
        }
    }
}

/// Handle on one resolved service
#[derive(Clone)]
pub struct Service {
    pub kind: ServiceKind,
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Client identity presented to the service
    pub identity: TlsIdentity,
    /// How data plane requests authenticate; `None` for the control plane,
    /// whose requests are signed by the target's authenticator
    pub auth: Option<AuthStrategy>,
    /// Organizational domain of certificate authentication
    pub domain: String,
    poller: Poller,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .field("domain", &self.domain)
            .finish()
    }
}

impl Service {
    pub(crate) fn new(
        kind: ServiceKind,
        base_url: impl Into<String>,
        identity: TlsIdentity,
        auth: Option<AuthStrategy>,
        domain: impl Into<String>,
        poller: Poller,
    ) -> Self {
        Self {
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity,
            auth,
            domain: domain.into(),
            poller,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Poll the health path until it answers 2xx; returns the last status
    ///
    /// A `Once` wait that is not healthy returns the unhealthy status rather
    /// than an error.
    pub fn wait(&self, timeout: PollTimeout) -> TargetResult<u16> {
        let url = self.url(self.kind.health_path());
        let mut task = poll_fn(
            || Ok(HttpRequest::get(url.clone())),
            |response: &HttpResponse| {
                Ok(if response.is_success() {
                    Progress::Done
                } else {
                    Progress::Pending
                })
            },
        );
        let outcome = self.poller.wait(&mut task, &self.identity, timeout)?;
        Ok(outcome.last_status.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockTransport;
    use crate::poll::PollConfig;
    use std::sync::Arc;
    use std::time::Duration;

    fn service(kind: ServiceKind, transport: Arc<MockTransport>) -> Service {
        let poller = Poller::new(
            transport,
            PollConfig {
                retry_interval: Duration::from_millis(5),
                request_timeout: Duration::from_secs(1),
            },
        );
        Service::new(kind, "https://svc.example.com/", TlsIdentity::none(), None, "", poller)
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("deploy".parse::<ServiceKind>().unwrap(), ServiceKind::Deploy);
        assert_eq!("document".parse::<ServiceKind>().unwrap(), ServiceKind::Document);
        let err = "feed".parse::<ServiceKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown service: feed");
        assert!(!ServiceKind::Deploy.is_data_plane());
        assert!(ServiceKind::Query.is_data_plane());
    }

    #[test]
    fn test_wait_polls_health_path() {
        let transport = Arc::new(MockTransport::new());
        transport.push(503, "").push(200, "OK");
        let status = service(ServiceKind::Query, transport.clone())
            .wait(PollTimeout::from_secs(5))
            .unwrap();

        assert_eq!(status, 200);
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "https://svc.example.com/ApplicationStatus");
    }

    #[test]
    fn test_single_wait_returns_unhealthy_status() {
        let transport = Arc::new(MockTransport::new());
        transport.push(503, "");
        let status = service(ServiceKind::Deploy, transport.clone())
            .wait(PollTimeout::Once)
            .unwrap();
        assert_eq!(status, 503);
        assert_eq!(transport.requests()[0].url, "https://svc.example.com/status.html");
    }
}
