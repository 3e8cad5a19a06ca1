//! Bearer token providers
//!
//! Acquiring and refreshing tokens is done by a separate login flow; these
//! providers only hand out a token that already exists.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::AuthError;

/// Source of bearer tokens
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Result<String, AuthError>;
}

/// A fixed token, e.g. from an environment variable
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct AuthConfig {
    #[serde(default)]
    systems: HashMap<String, SystemCredentials>,
}

#[derive(Debug, Deserialize)]
struct SystemCredentials {
    access_token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

/// Reads the token stored for a system in a JSON auth config file:
///
/// ```json
/// {"systems": {"public": {"access_token": "...", "expires_at": "2030-01-01T00:00:00Z"}}}
/// ```
///
/// The file is read on every call so a concurrent login is picked up.
#[derive(Debug, Clone)]
pub struct AuthConfigTokenProvider {
    path: PathBuf,
    system: String,
}

impl AuthConfigTokenProvider {
    pub fn new(path: impl Into<PathBuf>, system: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            system: system.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenProvider for AuthConfigTokenProvider {
    fn access_token(&self) -> Result<String, AuthError> {
        let content = fs::read_to_string(&self.path).map_err(|source| AuthError::Io {
            path: self.path.clone(),
            source,
        })?;
        let config: AuthConfig = serde_json::from_str(&content)?;

        let credentials = config
            .systems
            .get(&self.system)
            .filter(|c| !c.access_token.is_empty())
            .ok_or_else(|| AuthError::NoToken {
                system: self.system.clone(),
                path: self.path.clone(),
            })?;

        if let Some(expires_at) = credentials.expires_at {
            if expires_at <= Utc::now() {
                return Err(AuthError::TokenExpired {
                    system: self.system.clone(),
                    expired_at: expires_at.to_rfc3339(),
                });
            }
        }

        Ok(credentials.access_token.clone())
    }
}
