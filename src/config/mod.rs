//! Target configuration
//!
//! Parses and validates the target file at `~/.config/hosted-target/target.toml`:
//!
//! ```toml
//! [system]
//! name = "public"
//! url = "https://api.example.com:4443"
//! trust = "public"
//!
//! [deployment]
//! tenant = "mytenant"
//! application = "myapp"
//! environment = "dev"
//! region = "us-north-1"
//!
//! [credentials]
//! api_key_file = "~/.config/hosted-target/mytenant.api-key.pem"
//! ```
//!
//! `[polling]`, `[logs]` and `[endpoints]` are optional.

mod defaults;

pub use defaults::BuiltinDefaults;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hosted_api::{ApplicationId, Deployment, ZoneId};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthConfigTokenProvider, AuthError, Authenticator, StaticTokenProvider};
use crate::endpoints::ClusterEndpoints;
use crate::error::TargetResult;
use crate::host::{TlsIdentity, Transport};
use crate::logs::{LogLevel, RunLogPrinter};
use crate::poll::PollConfig;
use crate::system::System;
use crate::target::{LogSink, Target};

/// Target configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub system: System,

    pub deployment: DeploymentSection,

    #[serde(default)]
    pub credentials: CredentialsSection,

    #[serde(default)]
    pub polling: PollingSection,

    #[serde(default)]
    pub logs: LogsSection,

    /// Known cluster endpoints; discovery is skipped when present
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

/// Deployed application and zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSection {
    pub tenant: String,
    pub application: String,
    #[serde(default = "defaults::instance")]
    pub instance: String,
    pub environment: String,
    pub region: String,
}

/// Credential files; relative paths and `~/` are resolved when loading
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsSection {
    /// Ed25519 API key (public systems)
    pub api_key_file: Option<PathBuf>,
    /// JSON auth config holding access tokens per system
    pub auth_config_file: Option<PathBuf>,
    /// Access token used as is; takes precedence over `auth_config_file`
    pub access_token: Option<String>,
    /// Client certificate for the control plane
    pub certificate_file: Option<PathBuf>,
    pub private_key_file: Option<PathBuf>,
    /// Client certificate for the deployment's endpoints
    pub data_plane_certificate_file: Option<PathBuf>,
    pub data_plane_private_key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingSection {
    #[serde(default = "defaults::retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "defaults::request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            retry_interval_ms: defaults::retry_interval_ms(),
            request_timeout_seconds: defaults::request_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsSection {
    #[serde(default = "defaults::log_level")]
    pub level: String,
    #[serde(default = "defaults::noisy_step")]
    pub noisy_step: String,
}

impl Default for LogsSection {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            noisy_step: defaults::noisy_step(),
        }
    }
}

/// Errors that can occur when loading or validating the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("[{section}]: missing required field '{field}'")]
    MissingField { section: String, field: String },

    #[error("[{section}]: invalid value for '{field}': {reason}")]
    InvalidValue {
        section: String,
        field: String,
        reason: String,
    },
}

fn invalid(section: &str, field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl TargetConfig {
    /// Load the configuration from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        Self::load(&path)
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME environment variable not set",
            ))
        })?;
        Ok(PathBuf::from(home).join(".config/hosted-target/target.toml"))
    }

    /// Load the configuration from a specific path
    ///
    /// Relative credential paths are taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        if let Some(dir) = path.parent() {
            config.credentials.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Parse the configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: TargetConfig = toml::from_str(content)?;
        config.system = System::new(
            config.system.name,
            config.system.url,
            config.system.trust,
            config.system.domain,
        );
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system.name.is_empty() {
            return Err(ConfigError::MissingField {
                section: "system".to_string(),
                field: "name".to_string(),
            });
        }
        if !(self.system.url.starts_with("https://") || self.system.url.starts_with("http://")) {
            return Err(invalid("system", "url", "must be an http(s) URL"));
        }

        self.deployment()?;

        let polling = &self.polling;
        if polling.retry_interval_ms == 0 || polling.retry_interval_ms > 60_000 {
            return Err(invalid(
                "polling",
                "retry_interval_ms",
                format!("must be in (0, 60000], got {}", polling.retry_interval_ms),
            ));
        }
        if polling.request_timeout_seconds == 0 || polling.request_timeout_seconds > 300 {
            return Err(invalid(
                "polling",
                "request_timeout_seconds",
                format!("must be in (0, 300], got {}", polling.request_timeout_seconds),
            ));
        }

        self.logs
            .level
            .parse::<LogLevel>()
            .map_err(|reason| invalid("logs", "level", reason))?;

        let credentials = &self.credentials;
        pair(
            "certificate_file",
            &credentials.certificate_file,
            "private_key_file",
            &credentials.private_key_file,
        )?;
        pair(
            "data_plane_certificate_file",
            &credentials.data_plane_certificate_file,
            "data_plane_private_key_file",
            &credentials.data_plane_private_key_file,
        )?;

        for (cluster, url) in &self.endpoints {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(invalid("endpoints", cluster, "must be an http(s) URL"));
            }
        }

        Ok(())
    }

    pub fn deployment(&self) -> Result<Deployment, ConfigError> {
        let section = &self.deployment;
        let application = ApplicationId::new(&section.tenant, &section.application, &section.instance)
            .map_err(|e| invalid("deployment", "application", e.to_string()))?;
        let zone = ZoneId::new(&section.environment, &section.region)
            .map_err(|e| invalid("deployment", "zone", e.to_string()))?;
        Ok(Deployment::new(application, zone))
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            retry_interval: Duration::from_millis(self.polling.retry_interval_ms),
            request_timeout: Duration::from_secs(self.polling.request_timeout_seconds),
        }
    }

    /// Configured log level (validated on parse)
    pub fn log_level(&self) -> LogLevel {
        self.logs.level.parse().unwrap_or_default()
    }

    pub fn cluster_endpoints(&self) -> ClusterEndpoints {
        ClusterEndpoints::from(self.endpoints.clone())
    }

    /// Build the control plane authenticator, reading credential files
    pub fn authenticator(&self) -> TargetResult<Authenticator> {
        let credentials = &self.credentials;
        let identity = load_identity(&credentials.certificate_file, &credentials.private_key_file)?;
        let mut authenticator = Authenticator::new(self.system.clone(), identity);

        if let Some(path) = &credentials.api_key_file {
            let key = fs::read(path).map_err(|source| AuthError::Io {
                path: path.clone(),
                source,
            })?;
            authenticator = authenticator.with_api_key(key);
        }
        if let Some(token) = &credentials.access_token {
            authenticator = authenticator.with_token_provider(Arc::new(StaticTokenProvider::new(token)));
        } else if let Some(path) = &credentials.auth_config_file {
            authenticator = authenticator.with_token_provider(Arc::new(AuthConfigTokenProvider::new(
                path,
                &self.system.name,
            )));
        }
        Ok(authenticator)
    }

    /// Client identity for the deployment's endpoints
    pub fn data_plane_identity(&self) -> TargetResult<TlsIdentity> {
        load_identity(
            &self.credentials.data_plane_certificate_file,
            &self.credentials.data_plane_private_key_file,
        )
    }

    /// Run-log printer writing to `sink` with the configured filtering
    pub fn run_log_printer(&self, sink: LogSink) -> RunLogPrinter<LogSink> {
        RunLogPrinter::new(sink, self.log_level()).with_noisy_step(&self.logs.noisy_step)
    }

    /// Build a target over `transport`
    pub fn build_target(&self, transport: Arc<dyn Transport>) -> TargetResult<Target> {
        Ok(Target::new(
            self.authenticator()?,
            self.deployment()?,
            transport,
            self.poll_config(),
        )
        .with_data_plane_identity(self.data_plane_identity()?)
        .with_endpoints(self.cluster_endpoints()))
    }
}

impl CredentialsSection {
    fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.api_key_file,
            &mut self.auth_config_file,
            &mut self.certificate_file,
            &mut self.private_key_file,
            &mut self.data_plane_certificate_file,
            &mut self.data_plane_private_key_file,
        ]
        .into_iter()
        .flatten()
        {
            *path = expand_path(path, base);
        }
    }
}

/// Expand `~/` to the home directory and join relative paths onto `base`
fn expand_path(path: &Path, base: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

fn pair(
    first_name: &str,
    first: &Option<PathBuf>,
    second_name: &str,
    second: &Option<PathBuf>,
) -> Result<(), ConfigError> {
    match (first, second) {
        (Some(_), None) => Err(ConfigError::MissingField {
            section: "credentials".to_string(),
            field: second_name.to_string(),
        }),
        (None, Some(_)) => Err(ConfigError::MissingField {
            section: "credentials".to_string(),
            field: first_name.to_string(),
        }),
        _ => Ok(()),
    }
}

fn load_identity(certificate: &Option<PathBuf>, private_key: &Option<PathBuf>) -> TargetResult<TlsIdentity> {
    match (certificate, private_key) {
        (Some(certificate), Some(private_key)) => Ok(TlsIdentity::load(certificate, private_key)?),
        _ => Ok(TlsIdentity::none()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthStrategy;
    use crate::system::TrustMode;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [system]
        name = "public"
        url = "https://api.example.com:4443/"
        trust = "public"

        [deployment]
        tenant = "t1"
        application = "a1"
        environment = "dev"
        region = "us-north-1"
    "#;

    #[test]
    fn test_parse_minimal() {
        let config = TargetConfig::parse(MINIMAL).unwrap();
        assert_eq!(config.system.url, "https://api.example.com:4443");
        assert_eq!(config.system.trust, TrustMode::Public);
        assert_eq!(config.deployment.instance, "default");
        assert_eq!(config.polling, PollingSection::default());
        assert_eq!(config.log_level(), LogLevel::Info);
        assert_eq!(config.logs.noisy_step, "copyVespaLogs");
        assert!(config.endpoints.is_empty());

        let deployment = config.deployment().unwrap();
        assert_eq!(deployment.application.serialized_form(), "t1.a1.default");
        assert_eq!(config.poll_config(), PollConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let content = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [polling]
            retry_interval_ms = 500
            request_timeout_seconds = 30

            [logs]
            level = "debug"
            noisy_step = "copyLogs"

            [endpoints]
            default = "https://default.t1.example.com"
            feed = "https://feed.t1.example.com"
            "#
        );
        let config = TargetConfig::parse(&content).unwrap();
        assert_eq!(config.poll_config().retry_interval, Duration::from_millis(500));
        assert_eq!(config.poll_config().request_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level(), LogLevel::Debug);
        assert_eq!(
            config.cluster_endpoints().resolve("feed").unwrap(),
            "https://feed.t1.example.com"
        );
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let err = TargetConfig::parse("[system]\nname = \"x\"\nurl = \"https://a\"\ntrust = \"public\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_values() {
        let bad_url = MINIMAL.replace("https://api.example.com:4443/", "ftp://api.example.com");
        assert!(matches!(
            TargetConfig::parse(&bad_url),
            Err(ConfigError::InvalidValue { field, .. }) if field == "url"
        ));

        let zero_retry = format!("{}\n[polling]\nretry_interval_ms = 0\n", MINIMAL);
        assert!(matches!(
            TargetConfig::parse(&zero_retry),
            Err(ConfigError::InvalidValue { field, .. }) if field == "retry_interval_ms"
        ));

        let bad_level = format!("{}\n[logs]\nlevel = \"loud\"\n", MINIMAL);
        assert!(matches!(
            TargetConfig::parse(&bad_level),
            Err(ConfigError::InvalidValue { field, .. }) if field == "level"
        ));

        let empty_tenant = MINIMAL.replace("tenant = \"t1\"", "tenant = \"\"");
        assert!(matches!(
            TargetConfig::parse(&empty_tenant),
            Err(ConfigError::InvalidValue { section, .. }) if section == "deployment"
        ));
    }

    #[test]
    fn test_certificate_requires_key() {
        let content = format!("{}\n[credentials]\ncertificate_file = \"cert.pem\"\n", MINIMAL);
        assert!(matches!(
            TargetConfig::parse(&content),
            Err(ConfigError::MissingField { field, .. }) if field == "private_key_file"
        ));
    }

    #[test]
    fn test_load_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = TargetConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_resolves_credentials_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut key = fs::File::create(dir.path().join("api-key.pem")).unwrap();
        key.write_all(crate::auth::generate_api_key().as_bytes()).unwrap();

        let path = dir.path().join("target.toml");
        fs::write(
            &path,
            format!("{}\n[credentials]\napi_key_file = \"api-key.pem\"\n", MINIMAL),
        )
        .unwrap();

        let config = TargetConfig::load(&path).unwrap();
        assert_eq!(
            config.credentials.api_key_file.as_deref(),
            Some(dir.path().join("api-key.pem").as_path())
        );
        let authenticator = config.authenticator().unwrap();
        assert_eq!(authenticator.strategy().unwrap(), AuthStrategy::ApiKey);
    }

    #[test]
    fn test_access_token_wins_over_auth_config() {
        let content = format!(
            "{}\n[credentials]\naccess_token = \"abc\"\nauth_config_file = \"/nonexistent/auth.json\"\n",
            MINIMAL
        );
        let config = TargetConfig::parse(&content).unwrap();
        let authenticator = config.authenticator().unwrap();
        let mut request = crate::host::HttpRequest::get("https://api.example.com");
        authenticator.sign(&mut request, "t1.a1.default").unwrap();
        assert_eq!(request.header("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn test_missing_api_key_file() {
        let content = format!(
            "{}\n[credentials]\napi_key_file = \"/nonexistent/key.pem\"\n",
            MINIMAL
        );
        let config = TargetConfig::parse(&content).unwrap();
        assert!(config.authenticator().is_err());
    }
}
