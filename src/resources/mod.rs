//! Resource mappers.
//!
//! Each mapper translates the flat attribute map the host keeps per resource
//! instance into a typed [`crate::api`] record and back. States are decoded
//! with serde; a state that does not decode is a validation error.
//!
//! Identifiers: a repository is identified by its name; everything inside a
//! repository by `<repository>+<name>`.

mod action;
mod alert;
mod ingest_token;
mod parser;
mod repository;
mod user;

pub use action::ActionResource;
pub use alert::AlertResource;
pub use ingest_token::IngestTokenResource;
pub use parser::ParserResource;
pub use repository::RepositoryResource;
pub use user::UserDataSource;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::Client;
use crate::error::ProviderError;
use crate::schema::Schema;

/// Maps one resource type onto the Humio API.
#[async_trait]
pub trait ResourceMapper: Send + Sync {
    /// The host-facing type name, e.g. `humio_alert`.
    fn type_name(&self) -> &'static str;

    /// The schema of the flat state.
    fn schema(&self) -> Schema;

    /// Create the remote entity and return the resulting state.
    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError>;

    /// Re-fetch the remote entity named by `current`.
    async fn read(&self, client: &Client, current: Value) -> Result<Value, ProviderError>;

    /// Bring the remote entity in line with `planned`.
    async fn update(
        &self,
        client: &Client,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote entity.
    async fn delete(&self, client: &Client, current: Value) -> Result<(), ProviderError>;

    /// Read the entity named by an import identifier.
    async fn import(&self, client: &Client, id: &str) -> Result<Value, ProviderError>;
}

/// Maps one data source type onto the Humio API.
#[async_trait]
pub trait DataSourceMapper: Send + Sync {
    /// The host-facing type name, e.g. `humio_user`.
    fn type_name(&self) -> &'static str;

    /// The schema of the data source result.
    fn schema(&self) -> Schema;

    /// Fetch the data.
    async fn read(&self, client: &Client, config: Value) -> Result<Value, ProviderError>;
}

/// All resource mappers this provider serves.
pub fn resources() -> Vec<Box<dyn ResourceMapper>> {
    vec![
        Box::new(RepositoryResource),
        Box::new(AlertResource),
        Box::new(ActionResource),
        Box::new(IngestTokenResource),
        Box::new(ParserResource),
    ]
}

/// All data source mappers this provider serves.
pub fn data_sources() -> Vec<Box<dyn DataSourceMapper>> {
    vec![Box::new(UserDataSource)]
}

/// Decode a flat state. Null attributes are treated as absent.
pub(crate) fn from_state<T: DeserializeOwned>(kind: &str, state: Value) -> Result<T, ProviderError> {
    let state = match state {
        Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            Value::Object(map)
        }
        other => other,
    };
    serde_json::from_value(state)
        .map_err(|e| ProviderError::Validation(format!("invalid {} state: {}", kind, e)))
}

pub(crate) fn to_state<T: Serialize>(record: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(record)?)
}

/// `<repository>+<name>`
pub(crate) fn scoped_id(repository: &str, name: &str) -> String {
    format!("{}+{}", repository, name)
}

/// Split a `<repository>+<name>` identifier.
pub(crate) fn split_scoped_id<'a>(
    kind: &str,
    id: &'a str,
) -> Result<(&'a str, &'a str), ProviderError> {
    match id.split_once('+') {
        Some((repository, name)) if !repository.is_empty() && !name.is_empty() => {
            Ok((repository, name))
        }
        _ => Err(ProviderError::Validation(format!(
            "invalid {} id '{}': expected <repository>+<name>",
            kind, id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        enabled: bool,
    }

    #[test]
    fn test_from_state_drops_nulls() {
        let sample: Sample = from_state("sample", json!({"name": "a", "enabled": null})).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "a".to_string(),
                enabled: false
            }
        );
    }

    #[test]
    fn test_from_state_reports_validation_error() {
        let err = from_state::<Sample>("sample", json!({"enabled": true})).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.to_string().contains("missing field `name`"));
    }

    #[test]
    fn test_scoped_ids() {
        assert_eq!(scoped_id("web", "cpu-high"), "web+cpu-high");
        assert_eq!(split_scoped_id("alert", "web+cpu-high").unwrap(), ("web", "cpu-high"));
        assert_eq!(split_scoped_id("alert", "web+a+b").unwrap(), ("web", "a+b"));
        assert!(split_scoped_id("alert", "web").is_err());
        assert!(split_scoped_id("alert", "+name").is_err());
        assert!(split_scoped_id("alert", "web+").is_err());
    }

    #[test]
    fn test_type_names_are_unique() {
        let mut names: Vec<_> = resources().iter().map(|r| r.type_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
        assert_eq!(data_sources()[0].type_name(), "humio_user");
    }
}
