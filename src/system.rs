//! Control plane systems
//!
//! A system is one control plane instance. Its trust mode decides how
//! requests are authenticated: managed (public) systems take API keys or
//! bearer tokens, privately operated systems require mutual TLS.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trust mode of a system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    /// Shared multi-tenant managed service
    Public,
    /// Privately operated instance
    Private,
}

/// Kind of target a system represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Cloud,
    Hosted,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Cloud => f.write_str("cloud"),
            TargetType::Hosted => f.write_str("hosted"),
        }
    }
}

/// A control plane instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    pub name: String,
    /// Base URL of the control plane API, without trailing slash
    pub url: String,
    pub trust: TrustMode,
    /// Organizational domain used for certificate-based authentication
    #[serde(default)]
    pub domain: String,
}

impl System {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        trust: TrustMode,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into().trim_end_matches('/').to_string(),
            trust,
            domain: domain.into(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.trust == TrustMode::Public
    }

    pub fn target_type(&self) -> TargetType {
        match self.trust {
            TrustMode::Public => TargetType::Cloud,
            TrustMode::Private => TargetType::Hosted,
        }
    }

    /// Absolute URL of an API path
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}
