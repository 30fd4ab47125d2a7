//! Explicit client configuration.
//!
//! Credentials and endpoint URLs are carried in a plain struct handed to the
//! transport constructor. Nothing here is process-global; two clients with
//! different credentials can coexist in one process.

use serde::{Deserialize, Serialize};

use crate::error::{EloquaError, Result};

/// One URL per logical endpoint family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointUrls {
    pub service: String,
    pub data: String,
    pub email: String,
}

impl Default for EndpointUrls {
    fn default() -> Self {
        Self {
            service: "https://secure.eloqua.com/API/1.2/Service.asmx".to_string(),
            data: "https://secure.eloqua.com/API/1.2/Data.asmx".to_string(),
            email: "https://secure.eloqua.com/API/1.2/Email.asmx".to_string(),
        }
    }
}

/// Configuration for an Eloqua client: WSSE credentials plus endpoint URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EloquaConfig {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub endpoints: EndpointUrls,
}

impl EloquaConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            endpoints: EndpointUrls::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: EndpointUrls) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Fail fast when credentials are unset. Called before every dispatch.
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(EloquaError::Configuration(
                "Eloqua username or password is not set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_missing_credentials() {
        assert!(EloquaConfig::new("", "secret").validate().is_err());
        assert!(EloquaConfig::new("user", "").validate().is_err());
        assert!(EloquaConfig::new("user", "secret").validate().is_ok());
    }

    #[test]
    fn test_deserializes_with_default_endpoints() {
        let config: EloquaConfig =
            serde_json::from_str(r#"{"username": "company\\user", "password": "secret"}"#)
                .unwrap();
        assert_eq!(config.username, "company\\user");
        assert!(config.endpoints.service.ends_with("Service.asmx"));
    }

    #[test]
    fn test_default_endpoints() {
        let config = EloquaConfig::new("user", "secret");
        assert!(config.endpoints.service.ends_with("Service.asmx"));
        assert!(config.endpoints.data.ends_with("Data.asmx"));
        assert!(config.endpoints.email.ends_with("Email.asmx"));
    }
}
