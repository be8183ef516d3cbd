use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{from_state, scoped_id, split_scoped_id, to_state, ResourceMapper};
use crate::api::{Alert, Client, QueryOwnershipType};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Schema};

const KIND: &str = "humio_alert";

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct AlertState {
    #[serde(default)]
    id: String,
    #[serde(default)]
    remote_id: String,
    repository: String,
    name: String,
    #[serde(default)]
    description: String,
    query_string: String,
    query_start: String,
    #[serde(default)]
    throttle_field: Option<String>,
    throttle_time_millis: i64,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    run_as_user_id: Option<String>,
    #[serde(default)]
    query_ownership_type: QueryOwnershipType,
}

impl AlertState {
    fn from_alert(repository: &str, alert: Alert) -> Self {
        Self {
            id: scoped_id(repository, &alert.name),
            remote_id: alert.id,
            repository: repository.to_string(),
            name: alert.name,
            description: alert.description,
            query_string: alert.query_string,
            query_start: alert.query_start,
            throttle_field: alert.throttle_field,
            throttle_time_millis: alert.throttle_time_millis,
            enabled: alert.enabled,
            actions: alert.actions,
            labels: alert.labels,
            run_as_user_id: alert.run_as_user_id,
            query_ownership_type: alert.query_ownership_type,
        }
    }

    fn to_alert(&self) -> Alert {
        Alert {
            id: self.remote_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            query_string: self.query_string.clone(),
            query_start: self.query_start.clone(),
            throttle_field: self.throttle_field.clone(),
            throttle_time_millis: self.throttle_time_millis,
            enabled: self.enabled,
            actions: self.actions.clone(),
            labels: self.labels.clone(),
            run_as_user_id: self.run_as_user_id.clone(),
            query_ownership_type: self.query_ownership_type,
        }
    }
}

/// `humio_alert`: a saved query that triggers actions.
pub struct AlertResource;

impl AlertResource {
    async fn fetch(&self, client: &Client, repository: &str, name: &str) -> Result<Value, ProviderError> {
        let alert = client.alerts().get(repository, name).await?;
        to_state(&AlertState::from_alert(repository, alert))
    }
}

#[async_trait]
impl ResourceMapper for AlertResource {
    fn type_name(&self) -> &'static str {
        KIND
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A Humio alert")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "remote_id",
                Attribute::computed_string()
                    .with_description("Server-assigned ID; changes on every update"),
            )
            .with_attribute(
                "repository",
                Attribute::required_string().with_force_new(),
            )
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute(
                "description",
                Attribute::optional_string().with_default(json!("")),
            )
            .with_attribute("query_string", Attribute::required_string())
            .with_attribute(
                "query_start",
                Attribute::required_string().with_description("Relative query start, e.g. 1h"),
            )
            .with_attribute("throttle_field", Attribute::optional_string())
            .with_attribute("throttle_time_millis", Attribute::required_int64())
            .with_attribute(
                "enabled",
                Attribute::optional_bool().with_default(json!(true)),
            )
            .with_attribute(
                "actions",
                Attribute::optional_list(AttributeType::String)
                    .with_default(json!([]))
                    .with_description("Names of the actions to trigger"),
            )
            .with_attribute(
                "labels",
                Attribute::optional_list(AttributeType::String).with_default(json!([])),
            )
            .with_attribute(
                "run_as_user_id",
                Attribute::optional_computed_string()
                    .with_description("Owning user; filled in by the server for User ownership"),
            )
            .with_attribute(
                "query_ownership_type",
                Attribute::optional_string()
                    .with_one_of(["User", "Organization"])
                    .with_default(json!("Organization")),
            )
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let state: AlertState = from_state(KIND, planned)?;
        let created = client
            .alerts()
            .create(&state.repository, &state.to_alert())
            .await?;
        to_state(&AlertState::from_alert(&state.repository, created))
    }

    async fn read(&self, client: &Client, current: Value) -> Result<Value, ProviderError> {
        let state: AlertState = from_state(KIND, current)?;
        self.fetch(client, &state.repository, &state.name).await
    }

    async fn update(
        &self,
        client: &Client,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: AlertState = from_state(KIND, planned)?;
        let updated = client
            .alerts()
            .update(&state.repository, &state.to_alert())
            .await?;
        to_state(&AlertState::from_alert(&state.repository, updated))
    }

    async fn delete(&self, client: &Client, current: Value) -> Result<(), ProviderError> {
        let state: AlertState = from_state(KIND, current)?;
        client
            .alerts()
            .delete_by_name(&state.repository, &state.name)
            .await
    }

    async fn import(&self, client: &Client, id: &str) -> Result<Value, ProviderError> {
        let (repository, name) = split_scoped_id(KIND, id)?;
        self.fetch(client, repository, name).await
    }
}
