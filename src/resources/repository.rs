use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{from_state, to_state, ResourceMapper};
use crate::api::{Client, DELETE_REASON};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

const KIND: &str = "humio_repository";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RepositoryState {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    retention_days: Option<f64>,
}

/// `humio_repository`: a repository, identified by its name.
pub struct RepositoryResource;

impl RepositoryResource {
    /// Fetch the repository; retention is only reported when `with_retention`.
    async fn fetch(
        &self,
        client: &Client,
        name: &str,
        with_retention: bool,
    ) -> Result<Value, ProviderError> {
        let repo = client.repositories().get(name).await?;
        to_state(&RepositoryState {
            id: repo.name.clone(),
            name: repo.name,
            description: repo.description,
            retention_days: repo.retention_days.filter(|_| with_retention),
        })
    }
}

#[async_trait]
impl ResourceMapper for RepositoryResource {
    fn type_name(&self) -> &'static str {
        KIND
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A Humio repository")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Repository name"),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_default(json!("")),
            )
            .with_attribute(
                "retention_days",
                Attribute::optional_float64()
                    .with_range(1.0, 365.0)
                    .with_description("Time-based retention in days; unset means unlimited"),
            )
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let state: RepositoryState = from_state(KIND, planned)?;
        let repos = client.repositories();

        repos.create(&state.name).await?;
        if !state.description.is_empty() {
            repos.update_description(&state.name, &state.description).await?;
        }
        if state.retention_days.is_some() {
            repos.update_retention(&state.name, state.retention_days).await?;
        }

        self.fetch(client, &state.name, state.retention_days.is_some())
            .await
    }

    async fn read(&self, client: &Client, current: Value) -> Result<Value, ProviderError> {
        let state: RepositoryState = from_state(KIND, current)?;
        self.fetch(client, &state.name, state.retention_days.is_some())
            .await
    }

    async fn update(
        &self,
        client: &Client,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: RepositoryState = from_state(KIND, planned)?;
        let repos = client.repositories();

        debug!(repository = %state.name, "Updating repository settings");
        repos.update_description(&state.name, &state.description).await?;
        repos.update_retention(&state.name, state.retention_days).await?;

        self.fetch(client, &state.name, state.retention_days.is_some())
            .await
    }

    async fn delete(&self, client: &Client, current: Value) -> Result<(), ProviderError> {
        let state: RepositoryState = from_state(KIND, current)?;
        client.repositories().delete(&state.name, DELETE_REASON).await
    }

    async fn import(&self, client: &Client, id: &str) -> Result<Value, ProviderError> {
        self.fetch(client, id, true).await
    }
}
