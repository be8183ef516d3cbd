use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{from_state, scoped_id, split_scoped_id, to_state, ResourceMapper};
use crate::api::{Client, IngestToken};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

const KIND: &str = "humio_ingest_token";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct IngestTokenState {
    #[serde(default)]
    id: String,
    repository: String,
    name: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    assigned_parser: Option<String>,
}

impl IngestTokenState {
    fn from_token(repository: &str, token: IngestToken) -> Self {
        Self {
            id: scoped_id(repository, &token.name),
            repository: repository.to_string(),
            name: token.name,
            token: token.token,
            assigned_parser: token.assigned_parser,
        }
    }
}

/// `humio_ingest_token`: a repository ingest token.
pub struct IngestTokenResource;

impl IngestTokenResource {
    async fn fetch(&self, client: &Client, repository: &str, name: &str) -> Result<Value, ProviderError> {
        let token = client.ingest_tokens().get(repository, name).await?;
        to_state(&IngestTokenState::from_token(repository, token))
    }
}

#[async_trait]
impl ResourceMapper for IngestTokenResource {
    fn type_name(&self) -> &'static str {
        KIND
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An ingest token of a Humio repository")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("repository", Attribute::required_string().with_force_new())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute(
                "token",
                Attribute::computed_string()
                    .sensitive()
                    .with_description("The generated token value"),
            )
            .with_attribute(
                "assigned_parser",
                Attribute::optional_string()
                    .with_description("Parser applied to events ingested with this token"),
            )
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let state: IngestTokenState = from_state(KIND, planned)?;
        let created = client
            .ingest_tokens()
            .create(
                &state.repository,
                &state.name,
                state.assigned_parser.as_deref(),
            )
            .await?;
        to_state(&IngestTokenState::from_token(&state.repository, created))
    }

    async fn read(&self, client: &Client, current: Value) -> Result<Value, ProviderError> {
        let state: IngestTokenState = from_state(KIND, current)?;
        self.fetch(client, &state.repository, &state.name).await
    }

    async fn update(
        &self,
        client: &Client,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: IngestTokenState = from_state(KIND, planned)?;
        let updated = client
            .ingest_tokens()
            .update(
                &state.repository,
                &state.name,
                state.assigned_parser.as_deref(),
            )
            .await?;
        to_state(&IngestTokenState::from_token(&state.repository, updated))
    }

    async fn delete(&self, client: &Client, current: Value) -> Result<(), ProviderError> {
        let state: IngestTokenState = from_state(KIND, current)?;
        client
            .ingest_tokens()
            .delete(&state.repository, &state.name)
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
    use serde_json::json;

    #[tokio::test]
    async fn test_update_keeps_token_value() {
        let fake = FakeHumio::new().with_repository("web");
        let client = fake.client();

        let created = IngestTokenResource
            .create(&client, json!({"repository": "web", "name": "shipper"}))
            .await
            .unwrap();
        assert_eq!(created["id"], "web+shipper");
        assert_eq!(created["assigned_parser"], Value::Null);

        let mut planned = created.clone();
        planned["assigned_parser"] = json!("accesslog");
        let updated = IngestTokenResource
            .update(&client, created.clone(), planned)
            .await
            .unwrap();

        assert_eq!(updated["token"], created["token"]);
        assert_eq!(updated["assigned_parser"], "accesslog");
    }
}
