use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_state, scoped_id, split_scoped_id, to_state, ResourceMapper};
use crate::api::{Action, ActionKind, Client, ACTION_TYPES};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Schema};

const KIND: &str = "humio_action";

/// Flat state: the common attributes plus the kind's own, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ActionState {
    #[serde(default)]
    id: String,
    #[serde(default)]
    remote_id: String,
    repository: String,
    name: String,
    #[serde(flatten)]
    kind: ActionKind,
}

impl ActionState {
    fn from_action(repository: &str, action: Action) -> Self {
        Self {
            id: scoped_id(repository, &action.name),
            remote_id: action.id,
            repository: repository.to_string(),
            name: action.name,
            kind: action.kind,
        }
    }

    fn to_action(&self) -> Action {
        Action {
            id: self.remote_id.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// `humio_action`: a notification action, one of several kinds.
pub struct ActionResource;

impl ActionResource {
    async fn fetch(&self, client: &Client, repository: &str, name: &str) -> Result<Value, ProviderError> {
        let action = client.actions().get(repository, name).await?;
        to_state(&ActionState::from_action(repository, action))
    }
}

fn string_object<const N: usize>(fields: [&str; N]) -> AttributeType {
    AttributeType::object(fields.map(|f| (f, AttributeType::String)))
}

#[async_trait]
impl ResourceMapper for ActionResource {
    fn type_name(&self) -> &'static str {
        KIND
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A Humio notification action")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "remote_id",
                Attribute::computed_string()
                    .with_description("Server-assigned ID; changes on every update"),
            )
            .with_attribute("repository", Attribute::required_string().with_force_new())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_one_of(ACTION_TYPES.iter().copied())
                    .with_description("Action kind; selects which other attributes apply"),
            )
            // email
            .with_attribute("recipients", Attribute::optional_list(AttributeType::String))
            .with_attribute("subject_template", Attribute::optional_string())
            .with_attribute(
                "body_template",
                Attribute::optional_computed_string()
                    .with_description("Email or webhook body template"),
            )
            // humio_repo
            .with_attribute("ingest_token", Attribute::optional_string().sensitive())
            // ops_genie
            .with_attribute("api_url", Attribute::optional_string())
            .with_attribute("genie_key", Attribute::optional_string().sensitive())
            // pager_duty
            .with_attribute("routing_key", Attribute::optional_string().sensitive())
            .with_attribute("severity", Attribute::optional_string())
            // slack, slack_post_message
            .with_attribute(
                "url",
                Attribute::optional_string().with_description("Slack or webhook URL"),
            )
            .with_attribute(
                "fields",
                Attribute::optional_computed_list(string_object(["field_name", "value"])),
            )
            .with_attribute("api_token", Attribute::optional_string().sensitive())
            .with_attribute("channels", Attribute::optional_list(AttributeType::String))
            // victor_ops
            .with_attribute("message_type", Attribute::optional_string())
            .with_attribute("notify_url", Attribute::optional_string())
            // webhook
            .with_attribute("method", Attribute::optional_string())
            .with_attribute(
                "headers",
                Attribute::optional_computed_list(string_object(["header", "value"])),
            )
            .with_attribute("ignore_ssl", Attribute::optional_computed_bool())
            .with_attribute("use_proxy", Attribute::optional_computed_bool())
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let state: ActionState = from_state(KIND, planned)?;
        let created = client
            .actions()
            .create(&state.repository, &state.to_action())
            .await?;
        to_state(&ActionState::from_action(&state.repository, created))
    }

    async fn read(&self, client: &Client, current: Value) -> Result<Value, ProviderError> {
        let state: ActionState = from_state(KIND, current)?;
        self.fetch(client, &state.repository, &state.name).await
    }

    async fn update(
        &self,
        client: &Client,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: ActionState = from_state(KIND, planned)?;
        let updated = client
            .actions()
            .update(&state.repository, &state.to_action())
            .await?;
        to_state(&ActionState::from_action(&state.repository, updated))
    }

    async fn delete(&self, client: &Client, current: Value) -> Result<(), ProviderError> {
        let state: ActionState = from_state(KIND, current)?;
        client
            .actions()
            .delete_by_name(&state.repository, &state.name)
            .await
    }

    async fn import(&self, client: &Client, id: &str) -> Result<Value, ProviderError> {
        let (repository, name) = split_scoped_id(KIND, id)?;
        self.fetch(client, repository, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHumio;
    use crate::validation::validate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_webhook_round_trip() {
        let fake = FakeHumio::new().with_repository("ops");
        let planned = json!({
            "repository": "ops",
            "name": "hook",
            "type": "webhook",
            "method": "POST",
            "url": "https://example.com/hook",
            "headers": [{"header": "X-Team", "value": "ops"}],
            "body_template": "{events}",
            "ignore_ssl": false,
            "use_proxy": true,
        });

        let created = ActionResource.create(&fake.client(), planned).await.unwrap();
        assert_eq!(created["id"], "ops+hook");
        assert_eq!(created["type"], "webhook");
        assert_eq!(created["headers"], json!([{"header": "X-Team", "value": "ops"}]));

        let read = ActionResource.read(&fake.client(), created.clone()).await.unwrap();
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_unknown_type_fails_to_decode() {
        let fake = FakeHumio::new().with_repository("ops");
        let err = ActionResource
            .create(
                &fake.client(),
                json!({"repository": "ops", "name": "x", "type": "carrier_pigeon"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_kind_field_fails_to_decode() {
        let fake = FakeHumio::new().with_repository("ops");
        let err = ActionResource
            .create(
                &fake.client(),
                json!({"repository": "ops", "name": "x", "type": "pager_duty", "severity": "critical"}),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("routing_key"));
    }

    #[test]
    fn test_schema_checks_type_and_nested_fields() {
        let schema = ActionResource.schema();
        let diagnostics = validate(
            &schema,
            &json!({
                "repository": "ops",
                "name": "x",
                "type": "slack",
                "url": "https://hooks.slack.com/x",
                "fields": [{"field_name": "Query"}],
            }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("fields.0.value"));

        let diagnostics = validate(
            &schema,
            &json!({"repository": "ops", "name": "x", "type": "fax"}),
        );
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("type"));
    }
}
