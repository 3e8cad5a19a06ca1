//! Application and zone identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("invalid {field} '{value}': must not contain '/', '.' or whitespace")]
    InvalidCharacter { field: &'static str, value: String },
}

fn check(field: &'static str, value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty { field });
    }
    if value.chars().any(|c| c == '/' || c == '.' || c.is_whitespace()) {
        return Err(IdError::InvalidCharacter {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Tenant, application and instance naming one deployable application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId {
    pub tenant: String,
    pub application: String,
    #[serde(default = "default_instance")]
    pub instance: String,
}

fn default_instance() -> String {
    "default".to_string()
}

impl ApplicationId {
    pub fn new(
        tenant: impl Into<String>,
        application: impl Into<String>,
        instance: impl Into<String>,
    ) -> Result<Self, IdError> {
        let id = Self {
            tenant: tenant.into(),
            application: application.into(),
            instance: instance.into(),
        };
        id.validate()?;
        Ok(id)
    }

    pub fn validate(&self) -> Result<(), IdError> {
        check("tenant", &self.tenant)?;
        check("application", &self.application)?;
        check("instance", &self.instance)
    }

    /// Dotted form `tenant.application.instance`, also used as API key id.
    pub fn serialized_form(&self) -> String {
        format!("{}.{}.{}", self.tenant, self.application, self.instance)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialized_form())
    }
}

/// Environment and region a deployment lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId {
    pub environment: String,
    pub region: String,
}

impl ZoneId {
    pub fn new(environment: impl Into<String>, region: impl Into<String>) -> Result<Self, IdError> {
        let zone = Self {
            environment: environment.into(),
            region: region.into(),
        };
        zone.validate()?;
        Ok(zone)
    }

    pub fn validate(&self) -> Result<(), IdError> {
        check("environment", &self.environment)?;
        check("region", &self.region)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.environment, self.region)
    }
}

/// An application deployed to one zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deployment {
    pub application: ApplicationId,
    pub zone: ZoneId,
}

impl Deployment {
    pub fn new(application: ApplicationId, zone: ZoneId) -> Self {
        Self { application, zone }
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.application, self.zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_form() {
        let id = ApplicationId::new("t1", "app", "default").unwrap();
        assert_eq!(id.serialized_form(), "t1.app.default");
        assert_eq!(id.to_string(), "t1.app.default");
    }

    #[test]
    fn test_rejects_empty_and_dotted_names() {
        assert_eq!(
            ApplicationId::new("", "app", "default"),
            Err(IdError::Empty { field: "tenant" })
        );
        assert!(matches!(
            ZoneId::new("dev", "us/east"),
            Err(IdError::InvalidCharacter { field: "region", .. })
        ));
        assert!(ApplicationId::new("t1", "a.b", "default").is_err());
    }

    #[test]
    fn test_instance_defaults_when_missing() {
        let id: ApplicationId =
            serde_json::from_str(r#"{"tenant": "t1", "application": "app"}"#).unwrap();
        assert_eq!(id.instance, "default");
    }
}
