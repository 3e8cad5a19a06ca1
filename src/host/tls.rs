//! Client TLS identity
//!
//! Certificate and key material is loaded once and shared read-only by every
//! request. Validation beyond the PEM armour is left to the transport.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const PRIVATE_KEY_SUFFIX: &str = "PRIVATE KEY";

/// TLS material errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{what} is not PEM encoded (expected a '{label}' block)")]
    NotPem { what: String, label: String },
}

/// A client certificate with its private key, or nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsIdentity {
    certificate: Option<Vec<u8>>,
    private_key: Option<Vec<u8>>,
}

fn has_block(pem: &[u8], label_suffix: &str) -> bool {
    let text = String::from_utf8_lossy(pem);
    text.lines().any(|line| {
        line.starts_with("-----BEGIN ")
            && line.trim_end().trim_end_matches('-').ends_with(label_suffix)
    })
}

fn read(path: &Path) -> Result<Vec<u8>, TlsError> {
    fs::read(path).map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl TlsIdentity {
    /// No client certificate
    pub fn none() -> Self {
        Self::default()
    }

    /// Load a certificate and key pair from PEM files
    pub fn load(certificate: &Path, private_key: &Path) -> Result<Self, TlsError> {
        Self::from_pem(read(certificate)?, read(private_key)?)
    }

    /// Build from in-memory PEM material
    pub fn from_pem(certificate: Vec<u8>, private_key: Vec<u8>) -> Result<Self, TlsError> {
        if !has_block(&certificate, CERTIFICATE_LABEL) {
            return Err(TlsError::NotPem {
                what: "certificate".to_string(),
                label: CERTIFICATE_LABEL.to_string(),
            });
        }
        if !has_block(&private_key, PRIVATE_KEY_SUFFIX) {
            return Err(TlsError::NotPem {
                what: "private key".to_string(),
                label: PRIVATE_KEY_SUFFIX.to_string(),
            });
        }
        Ok(Self {
            certificate: Some(certificate),
            private_key: Some(private_key),
        })
    }

    pub fn has_certificate(&self) -> bool {
        self.certificate.is_some()
    }

    /// Certificate and key as one PEM bundle, as client TLS stacks expect
    pub fn pem_bundle(&self) -> Option<Vec<u8>> {
        match (&self.certificate, &self.private_key) {
            (Some(certificate), Some(key)) => {
                let mut bundle = certificate.clone();
                if !bundle.ends_with(b"\n") {
                    bundle.push(b'\n');
                }
                bundle.extend_from_slice(key);
                Some(bundle)
            }
            _ => None,
        }
    }

    /// SHA-256 of the certificate PEM, hex encoded
    pub fn fingerprint(&self) -> Option<String> {
        self.certificate
            .as_ref()
            .map(|c| hex::encode(Sha256::digest(c)))
    }
}
