//! Request authentication
//!
//! Chooses how an outgoing control plane request is authenticated from the
//! system's trust mode and the configured credentials:
//!
//! - public systems: API key signature if a key is configured, otherwise a
//!   bearer token from the token provider
//! - private systems: the client certificate presented by the transport;
//!   nothing is added to the request
//!
//! The choice is a pure function of configuration, made again on every call.

pub mod signer;
pub mod token;

pub use signer::{generate_api_key, key_fingerprint, parse_signing_key, Ed25519RequestSigner, RequestSigner};
pub use token::{AuthConfigTokenProvider, StaticTokenProvider, TokenProvider};

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::host::{HttpRequest, TlsIdentity};
use crate::system::{System, TrustMode};

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid API key: {0}")]
    InvalidKey(String),

    #[error("invalid API key encoding: {0}")]
    KeyEncoding(#[from] base64::DecodeError),

    #[error("no credentials configured for system {0}: an API key or an access token is required")]
    MissingCredential(String),

    #[error("system {0} requires a certificate for authentication")]
    CertificateRequired(String),

    #[error("no access token for system {system} in {path}")]
    NoToken { system: String, path: PathBuf },

    #[error("access token for system {system} expired at {expired_at}")]
    TokenExpired { system: String, expired_at: String },

    #[error("failed to read auth config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid auth config: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuthError {
    /// Whether the error stems from missing configuration rather than
    /// rejected or unusable credentials
    pub fn is_configuration(&self) -> bool {
        matches!(self, AuthError::MissingCredential(_))
    }
}

/// Authentication strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Request signature made with an API key
    ApiKey,
    /// `Authorization: Bearer` header from a token provider
    BearerToken,
    /// Mutual TLS, handled by the transport
    ClientCertificate,
}

impl AuthStrategy {
    /// Strategies available under a trust mode, highest priority first
    pub fn candidates(trust: TrustMode) -> &'static [AuthStrategy] {
        match trust {
            TrustMode::Public => &[AuthStrategy::ApiKey, AuthStrategy::BearerToken],
            TrustMode::Private => &[AuthStrategy::ClientCertificate],
        }
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStrategy::ApiKey => f.write_str("api-key"),
            AuthStrategy::BearerToken => f.write_str("access-token"),
            AuthStrategy::ClientCertificate => f.write_str("client-certificate"),
        }
    }
}

/// Strategy together with the credential it uses
enum Selected<'a> {
    ApiKey(&'a [u8]),
    BearerToken(&'a dyn TokenProvider),
    ClientCertificate,
}

impl Selected<'_> {
    fn strategy(&self) -> AuthStrategy {
        match self {
            Selected::ApiKey(_) => AuthStrategy::ApiKey,
            Selected::BearerToken(_) => AuthStrategy::BearerToken,
            Selected::ClientCertificate => AuthStrategy::ClientCertificate,
        }
    }
}

/// Signs control plane requests for one system
#[derive(Clone)]
pub struct Authenticator {
    system: System,
    identity: TlsIdentity,
    api_key: Option<Vec<u8>>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    signer: Arc<dyn RequestSigner>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("system", &self.system.name)
            .field("certificate", &self.identity.has_certificate())
            .field("api_key", &self.api_key.is_some())
            .field("token_provider", &self.token_provider.is_some())
            .finish()
    }
}

impl Authenticator {
    /// Create an authenticator presenting `identity` to the control plane
    pub fn new(system: System, identity: TlsIdentity) -> Self {
        Self {
            system,
            identity,
            api_key: None,
            token_provider: None,
            signer: Arc::new(Ed25519RequestSigner),
        }
    }

    pub fn with_api_key(mut self, key: Vec<u8>) -> Self {
        self.api_key = Some(key);
        self
    }

    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = signer;
        self
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    /// Client TLS identity for control plane requests
    pub fn identity(&self) -> &TlsIdentity {
        &self.identity
    }

    fn select(&self) -> Result<Selected<'_>, AuthError> {
        for candidate in AuthStrategy::candidates(self.system.trust) {
            match candidate {
                AuthStrategy::ApiKey => {
                    if let Some(key) = &self.api_key {
                        return Ok(Selected::ApiKey(key));
                    }
                }
                AuthStrategy::BearerToken => {
                    if let Some(provider) = &self.token_provider {
                        return Ok(Selected::BearerToken(provider.as_ref()));
                    }
                }
                AuthStrategy::ClientCertificate => {
                    if self.identity.has_certificate() {
                        return Ok(Selected::ClientCertificate);
                    }
                }
            }
        }

        match self.system.trust {
            TrustMode::Public => Err(AuthError::MissingCredential(self.system.name.clone())),
            TrustMode::Private => Err(AuthError::CertificateRequired(self.system.name.clone())),
        }
    }

    /// The strategy `sign` would use, without signing anything
    pub fn strategy(&self) -> Result<AuthStrategy, AuthError> {
        self.select().map(|selected| selected.strategy())
    }

    /// Authenticate a request; `key_id` names the API key when one is used
    pub fn sign(&self, request: &mut HttpRequest, key_id: &str) -> Result<(), AuthError> {
        match self.select()? {
            Selected::ApiKey(key) => self.signer.sign_request(request, key_id, key),
            Selected::BearerToken(provider) => {
                let token = provider.access_token()?;
                request.set_header("Authorization", format!("Bearer {}", token));
                Ok(())
            }
            Selected::ClientCertificate => Ok(()),
        }
    }
}
