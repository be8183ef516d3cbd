use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{from_state, scoped_id, split_scoped_id, to_state, ResourceMapper};
use crate::api::{Client, Parser};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Schema};

const KIND: &str = "humio_parser";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ParserState {
    #[serde(default)]
    id: String,
    #[serde(default)]
    remote_id: String,
    repository: String,
    name: String,
    script: String,
    #[serde(default)]
    fields_to_tag: Vec<String>,
    #[serde(default)]
    test_cases: Vec<String>,
}

impl ParserState {
    fn from_parser(repository: &str, parser: Parser) -> Self {
        Self {
            id: scoped_id(repository, &parser.name),
            remote_id: parser.id,
            repository: repository.to_string(),
            name: parser.name,
            script: parser.script,
            fields_to_tag: parser.fields_to_tag,
            test_cases: parser.test_cases,
        }
    }

    fn to_parser(&self) -> Parser {
        Parser {
            id: self.remote_id.clone(),
            name: self.name.clone(),
            script: self.script.clone(),
            fields_to_tag: self.fields_to_tag.clone(),
            test_cases: self.test_cases.clone(),
        }
    }
}

/// `humio_parser`: a parser script of a repository.
pub struct ParserResource;

impl ParserResource {
    async fn fetch(&self, client: &Client, repository: &str, name: &str) -> Result<Value, ProviderError> {
        let parser = client.parsers().get(repository, name).await?;
        to_state(&ParserState::from_parser(repository, parser))
    }
}

#[async_trait]
impl ResourceMapper for ParserResource {
    fn type_name(&self) -> &'static str {
        KIND
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A Humio parser")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "remote_id",
                Attribute::computed_string()
                    .with_description("Server-assigned ID; changes on every update"),
            )
            .with_attribute("repository", Attribute::required_string().with_force_new())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("script", Attribute::required_string())
            .with_attribute(
                "fields_to_tag",
                Attribute::optional_list(AttributeType::String).with_default(json!([])),
            )
            .with_attribute(
                "test_cases",
                Attribute::optional_list(AttributeType::String)
                    .with_default(json!([]))
                    .with_description("Raw sample events"),
            )
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let state: ParserState = from_state(KIND, planned)?;
        let created = client
            .parsers()
            .create(&state.repository, &state.to_parser())
            .await?;
        to_state(&ParserState::from_parser(&state.repository, created))
    }

    async fn read(&self, client: &Client, current: Value) -> Result<Value, ProviderError> {
        let state: ParserState = from_state(KIND, current)?;
        self.fetch(client, &state.repository, &state.name).await
    }

    async fn update(
        &self,
        client: &Client,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let state: ParserState = from_state(KIND, planned)?;
        let updated = client
            .parsers()
            .update(&state.repository, &state.to_parser())
            .await?;
        to_state(&ParserState::from_parser(&state.repository, updated))
    }

    async fn delete(&self, client: &Client, current: Value) -> Result<(), ProviderError> {
        let state: ParserState = from_state(KIND, current)?;
        client.parsers().delete(&state.repository, &state.name).await
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
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_create_then_read() {
        let fake = FakeHumio::new().with_repository("web");
        let client = fake.client();

        let created = ParserResource
            .create(
                &client,
                json!({
                    "repository": "web",
                    "name": "accesslog",
                    "script": "kvParse()",
                    "test_cases": ["a=1 b=2"],
                }),
            )
            .await
            .unwrap();
        assert_eq!(created["id"], "web+accesslog");
        assert_eq!(created["fields_to_tag"], json!([]));

        let read = ParserResource.read(&client, created.clone()).await.unwrap();
        assert_eq!(read, created);
    }
}
