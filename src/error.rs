//! Error types for the Humio provider.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::Diagnostic;

/// A single error entry from a GraphQL response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    /// The human-readable error message.
    pub message: String,
    /// The response path the error refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<serde_json::Value>>,
    /// Structured detail supplied by the server (validation failures etc).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

impl GraphQlError {
    /// Create an error entry with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }
}

impl std::fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if let Some(path) = self.path.as_ref().filter(|p| !p.is_empty()) {
            let joined = path
                .iter()
                .map(|segment| match segment {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(".");
            write!(f, " (at {})", joined)?;
        }
        Ok(())
    }
}

fn join_graphql_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur while reconciling Humio resources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The resource configuration did not pass schema validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is not configured, or its configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A polymorphic record carried a discriminant this provider does not handle.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request could not be sent or its body could not be read.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a status other than 200 OK.
    #[error("Unexpected status code {status}: {body}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// The raw response body.
        body: String,
    },

    /// The GraphQL envelope reported one or more errors.
    #[error("GraphQL error: {}", join_graphql_errors(.0))]
    GraphQl(Vec<GraphQlError>),
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Variants wrapping a foreign error return a fixed description; use the
    /// `Display` output for the full text.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::UnsupportedType(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::HttpStatus { body, .. } => body,
            Self::GraphQl(errors) => errors
                .first()
                .map(|e| e.message.as_str())
                .unwrap_or("graphql error"),
        }
    }

    /// Whether this error is a name lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn not_found(kind: &str, name: &str) -> Self {
        Self::NotFound(format!("{} not found: {}", kind, name))
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let diagnostic = Diagnostic::error(err.to_string());
        match err {
            ProviderError::GraphQl(errors) => {
                let details: Vec<String> = errors
                    .iter()
                    .filter_map(|e| e.extensions.as_ref())
                    .map(|ext| serde_json::Value::Object(ext.clone()).to_string())
                    .collect();
                if details.is_empty() {
                    diagnostic
                } else {
                    diagnostic.with_detail(details.join("\n"))
                }
            }
            _ => diagnostic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("alert not found: cpu-high".to_string());
        assert_eq!(
            format!("{}", err),
            "Resource not found: alert not found: cpu-high"
        );

        let err = ProviderError::UnsupportedType("CarrierPigeonAction".to_string());
        assert_eq!(format!("{}", err), "Unsupported type: CarrierPigeonAction");

        let err = ProviderError::UnknownResource("humio_dashboard".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: humio_dashboard");

        let err = ProviderError::HttpStatus {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Unexpected status code 401: unauthorized"
        );
    }

    #[test]
    fn test_graphql_errors_are_concatenated() {
        let err = ProviderError::GraphQl(vec![
            GraphQlError::new("repository already exists"),
            GraphQlError {
                message: "invalid retention".to_string(),
                path: Some(vec![json!("updateRetention"), json!(0)]),
                extensions: None,
            },
        ]);
        assert_eq!(
            format!("{}", err),
            "GraphQL error: repository already exists; invalid retention (at updateRetention.0)"
        );
        assert_eq!(err.message(), "repository already exists");
    }

    #[test]
    fn test_graphql_error_deserializes_with_optional_fields() {
        let err: GraphQlError = serde_json::from_value(json!({"message": "boom"})).unwrap();
        assert_eq!(err, GraphQlError::new("boom"));

        let err: GraphQlError = serde_json::from_value(json!({
            "message": "bad input",
            "extensions": {"code": "BAD_USER_INPUT"}
        }))
        .unwrap();
        assert_eq!(err.extensions.unwrap()["code"], "BAD_USER_INPUT");
    }

    #[test]
    fn test_not_found_helper() {
        let err = ProviderError::not_found("parser", "accesslog");
        assert!(err.is_not_found());
        assert_eq!(err.message(), "parser not found: accesslog");
        assert!(!ProviderError::Validation("x".to_string()).is_not_found());
    }

    #[test]
    fn test_error_to_diagnostic() {
        let diagnostic: Diagnostic = ProviderError::Configuration("missing address".to_string()).into();
        assert_eq!(diagnostic.severity, DiagnosticSeverity::Error);
        assert_eq!(diagnostic.summary, "Configuration error: missing address");
        assert!(diagnostic.detail.is_none());

        let diagnostic: Diagnostic = ProviderError::GraphQl(vec![GraphQlError {
            message: "invalid name".to_string(),
            path: None,
            extensions: Some(
                json!({"field": "name"})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            ),
        }])
        .into();
        assert_eq!(diagnostic.detail, Some(r#"{"field":"name"}"#.to_string()));
    }
}
