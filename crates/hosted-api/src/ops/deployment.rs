//! Deployment description.

use serde::{Deserialize, Serialize};

use crate::SCOPE_ZONE;

/// One endpoint of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEndpoint {
    /// Container cluster serving the endpoint.
    pub cluster: String,
    /// Service URL.
    pub url: String,
    /// `zone` for endpoints of this deployment only, `global` and others
    /// for endpoints shared across zones.
    pub scope: String,
}

impl DeploymentEndpoint {
    pub fn is_zone_scoped(&self) -> bool {
        self.scope == SCOPE_ZONE
    }
}

/// Deployment description response. Only the endpoints are read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentResponse {
    #[serde(default)]
    pub endpoints: Vec<DeploymentEndpoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let body = r#"{
            "platform": "8.1.2",
            "endpoints": [
                {"cluster": "default", "url": "https://a.example", "scope": "zone", "routingMethod": "exclusive"},
                {"cluster": "default", "url": "https://g.example", "scope": "global"}
            ]
        }"#;
        let response: DeploymentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.endpoints.len(), 2);
        assert!(response.endpoints[0].is_zone_scoped());
        assert!(!response.endpoints[1].is_zone_scoped());
    }

    #[test]
    fn test_missing_endpoints_is_empty() {
        let response: DeploymentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.endpoints.is_empty());
    }
}
