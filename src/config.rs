//! Provider configuration.
//!
//! The host passes the provider block as a JSON object. Each setting may also
//! come from the environment; an explicit, non-empty value always wins.
//!
//! | Attribute        | Environment fallback    |
//! |------------------|-------------------------|
//! | `address`        | `HUMIO_ADDRESS`         |
//! | `api_token`      | `HUMIO_API_TOKEN`       |
//! | `ca_certificate` | `HUMIO_CA_CERTIFICATE`  |

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::validate;

/// Environment variable holding the Humio base address.
pub const ADDRESS_ENV: &str = "HUMIO_ADDRESS";
/// Environment variable holding the API token.
pub const API_TOKEN_ENV: &str = "HUMIO_API_TOKEN";
/// Environment variable holding a PEM encoded CA certificate.
pub const CA_CERTIFICATE_ENV: &str = "HUMIO_CA_CERTIFICATE";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    api_token: Option<String>,
    #[serde(default)]
    ca_certificate: Option<String>,
}

/// Resolved connection settings for a Humio cluster.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Base address, e.g. `https://cloud.humio.com/`.
    pub address: Url,
    /// API token sent as a bearer credential.
    pub api_token: String,
    /// Extra CA certificate (PEM) trusted for the connection.
    pub ca_certificate: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("address", &self.address.as_str())
            .field("api_token", &"<redacted>")
            .field("ca_certificate", &self.ca_certificate.is_some())
            .finish()
    }
}

impl ProviderConfig {
    /// Create a configuration from explicit values.
    pub fn new(address: &str, api_token: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            address: parse_address(address)?,
            api_token: api_token.into(),
            ca_certificate: None,
        })
    }

    /// Trust an additional CA certificate (PEM).
    pub fn with_ca_certificate(mut self, pem: impl Into<String>) -> Self {
        self.ca_certificate = Some(pem.into());
        self
    }

    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Connection settings for the Humio cluster")
            .with_attribute(
                "address",
                Attribute::optional_string()
                    .with_description("Base URL of the Humio cluster (falls back to HUMIO_ADDRESS)"),
            )
            .with_attribute(
                "api_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("API token (falls back to HUMIO_API_TOKEN)"),
            )
            .with_attribute(
                "ca_certificate",
                Attribute::optional_string().with_description(
                    "PEM encoded CA certificate to trust (falls back to HUMIO_CA_CERTIFICATE)",
                ),
            )
    }

    /// Resolve the configuration from the host JSON and the process environment.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(config, |key| std::env::var(key).ok())
    }

    /// Resolve the configuration using `env` to look up fallbacks.
    pub fn from_value_with_env<F>(config: &Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = match config {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other.clone())?,
        };

        let resolve = |explicit: Option<String>, key: &str| {
            explicit
                .filter(|v| !v.is_empty())
                .or_else(|| env(key).filter(|v| !v.is_empty()))
        };

        let address = resolve(raw.address, ADDRESS_ENV).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "address is not set; configure it or set {}",
                ADDRESS_ENV
            ))
        })?;
        let api_token = resolve(raw.api_token, API_TOKEN_ENV).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "api_token is not set; configure it or set {}",
                API_TOKEN_ENV
            ))
        })?;

        Ok(Self {
            address: parse_address(&address)?,
            api_token,
            ca_certificate: resolve(raw.ca_certificate, CA_CERTIFICATE_ENV),
        })
    }

    /// Validate the host JSON, returning diagnostics instead of failing.
    pub fn diagnostics(config: &Value) -> Vec<Diagnostic> {
        Self::diagnostics_with_env(config, |key| std::env::var(key).ok())
    }

    fn diagnostics_with_env<F>(config: &Value, env: F) -> Vec<Diagnostic>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !config.is_null() {
            let diagnostics = validate(&Self::schema(), config);
            if !diagnostics.is_empty() {
                return diagnostics;
            }
        }
        match Self::from_value_with_env(config, env) {
            Ok(_) => Vec::new(),
            Err(e) => vec![e.into()],
        }
    }
}

fn parse_address(address: &str) -> Result<Url, ProviderError> {
    let url = Url::parse(address).map_err(|e| {
        ProviderError::Configuration(format!("invalid address '{}': {}", address, e))
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ProviderError::Configuration(format!(
            "invalid address '{}': expected an http(s) URL",
            address
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_values() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"address": "https://cloud.humio.com/", "api_token": "abc"}),
            env_of(&[]),
        )
        .unwrap();
        assert_eq!(config.address.as_str(), "https://cloud.humio.com/");
        assert_eq!(config.api_token, "abc");
        assert!(config.ca_certificate.is_none());
    }

    #[test]
    fn test_environment_fallback() {
        let config = ProviderConfig::from_value_with_env(
            &Value::Null,
            env_of(&[
                (ADDRESS_ENV, "http://localhost:8080"),
                (API_TOKEN_ENV, "from-env"),
                (CA_CERTIFICATE_ENV, "-----BEGIN CERTIFICATE-----"),
            ]),
        )
        .unwrap();
        assert_eq!(config.address.as_str(), "http://localhost:8080/");
        assert_eq!(config.api_token, "from-env");
        assert!(config.ca_certificate.is_some());
    }

    #[test]
    fn test_explicit_wins_and_empty_falls_back() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"address": "https://explicit.example.com", "api_token": ""}),
            env_of(&[
                (ADDRESS_ENV, "https://env.example.com"),
                (API_TOKEN_ENV, "env-token"),
            ]),
        )
        .unwrap();
        assert_eq!(config.address.host_str(), Some("explicit.example.com"));
        assert_eq!(config.api_token, "env-token");
    }

    #[test]
    fn test_missing_token() {
        let err = ProviderConfig::from_value_with_env(
            &json!({"address": "https://cloud.humio.com"}),
            env_of(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.to_string().contains(API_TOKEN_ENV));
    }

    #[test]
    fn test_invalid_address() {
        let err = ProviderConfig::new("not a url", "abc").unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err = ProviderConfig::new("ftp://files.example.com", "abc").unwrap_err();
        assert!(err.to_string().contains("expected an http(s) URL"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig::new("https://cloud.humio.com", "super-secret").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_diagnostics() {
        let diagnostics =
            ProviderConfig::diagnostics_with_env(&json!({"address": 42}), env_of(&[]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("address".to_string()));

        let diagnostics = ProviderConfig::diagnostics_with_env(
            &json!({"address": "https://cloud.humio.com"}),
            env_of(&[(API_TOKEN_ENV, "t")]),
        );
        assert!(diagnostics.is_empty());
    }
}
