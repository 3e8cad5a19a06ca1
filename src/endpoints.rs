//! Endpoint discovery and resolution
//!
//! A deployment exposes one URL per container cluster. Discovery reads the
//! deployment description and keeps the zone-scoped endpoints; resolution
//! picks one of them by cluster name.

use std::collections::BTreeMap;

use hosted_api::DeploymentResponse;
use tracing::{debug, info};

use crate::auth::Authenticator;
use crate::error::{TargetError, TargetResult};
use crate::host::{HttpRequest, HttpResponse};
use crate::poll::{PollTask, Progress};

/// Cluster name to URL map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterEndpoints {
    urls: BTreeMap<String, String>,
}

impl ClusterEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn get(&self, cluster: &str) -> Option<&str> {
        self.urls.get(cluster).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.urls.iter().map(|(c, u)| (c.as_str(), u.as_str()))
    }

    /// Cluster names in sorted order
    pub fn cluster_names(&self) -> Vec<String> {
        self.urls.keys().cloned().collect()
    }

    /// URL of `cluster`; an empty name selects the only cluster there is
    pub fn resolve(&self, cluster: &str) -> TargetResult<&str> {
        if cluster.is_empty() {
            let mut urls = self.urls.values();
            return match (urls.next(), urls.next()) {
                (None, _) => Err(TargetError::NoEndpoints),
                (Some(url), None) => Ok(url.as_str()),
                (Some(_), Some(_)) => Err(TargetError::AmbiguousCluster {
                    known: self.cluster_names(),
                }),
            };
        }
        self.get(cluster).ok_or_else(|| TargetError::UnknownCluster {
            cluster: cluster.to_string(),
            known: self.cluster_names(),
        })
    }
}

impl FromIterator<(String, String)> for ClusterEndpoints {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for ClusterEndpoints {
    fn from(urls: BTreeMap<String, String>) -> Self {
        Self { urls }
    }
}

/// Poll task reading the zone-scoped endpoints of a deployment
pub struct EndpointDiscovery<'a> {
    url: String,
    key_id: String,
    authenticator: &'a Authenticator,
    discovered: ClusterEndpoints,
}

impl<'a> EndpointDiscovery<'a> {
    pub fn new(url: String, key_id: String, authenticator: &'a Authenticator) -> Self {
        Self {
            url,
            key_id,
            authenticator,
            discovered: ClusterEndpoints::new(),
        }
    }

    /// Endpoints of the last accepted response; empty until one is accepted
    pub fn into_endpoints(self) -> ClusterEndpoints {
        self.discovered
    }
}

impl PollTask for EndpointDiscovery<'_> {
    fn build_request(&mut self) -> TargetResult<HttpRequest> {
        let mut request = HttpRequest::get(self.url.clone());
        self.authenticator.sign(&mut request, &self.key_id)?;
        Ok(request)
    }

    fn evaluate(&mut self, response: &HttpResponse) -> TargetResult<Progress> {
        if !response.is_success() {
            debug!(status = response.status, "deployment not available");
            return Ok(Progress::Pending);
        }
        let deployment: DeploymentResponse = match serde_json::from_slice(&response.body) {
            Ok(deployment) => deployment,
            Err(e) => {
                debug!(error = %e, "ignoring malformed deployment response");
                return Ok(Progress::Pending);
            }
        };

        let endpoints: ClusterEndpoints = deployment
            .endpoints
            .into_iter()
            .filter(|endpoint| endpoint.is_zone_scoped())
            .map(|endpoint| (endpoint.cluster, endpoint.url))
            .collect();
        if endpoints.is_empty() {
            debug!("no zone endpoints yet");
            return Ok(Progress::Pending);
        }

        info!(clusters = ?endpoints.cluster_names(), "discovered endpoints");
        self.discovered = endpoints;
        Ok(Progress::Done)
    }
}
