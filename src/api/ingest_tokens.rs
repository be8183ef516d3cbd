use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{non_empty, null_as_default, Client, Variables};
use crate::error::ProviderError;

const LIST_INGEST_TOKENS_QUERY: &str = r#"
query ListIngestTokens($RepositoryName: String!) {
  repository(name: $RepositoryName) {
    ingestTokens {
      name
      token
      parser {
        name
      }
    }
  }
}
"#;

const ADD_INGEST_TOKEN_MUTATION: &str = r#"
mutation AddIngestToken($RepositoryName: String!, $Name: String!, $Parser: String) {
  addIngestTokenV3(input: {
    repositoryName: $RepositoryName
    name: $Name
    parser: $Parser
  }) {
    name
    token
    parser {
      name
    }
  }
}
"#;

const ASSIGN_PARSER_MUTATION: &str = r#"
mutation AssignParser($RepositoryName: String!, $TokenName: String!, $ParserName: String!) {
  assignParserToIngestToken(input: {
    repositoryName: $RepositoryName
    tokenName: $TokenName
    parserName: $ParserName
  }) {
    name
    token
    parser {
      name
    }
  }
}
"#;

const UNASSIGN_PARSER_MUTATION: &str = r#"
mutation UnassignParser($RepositoryName: String!, $TokenName: String!) {
  unassignParserFromIngestToken(input: {
    repositoryName: $RepositoryName
    tokenName: $TokenName
  }) {
    name
    token
    parser {
      name
    }
  }
}
"#;

const REMOVE_INGEST_TOKEN_MUTATION: &str = r#"
mutation RemoveIngestToken($RepositoryName: String!, $Name: String!) {
  removeIngestToken(repositoryName: $RepositoryName, name: $Name) {
    __typename
  }
}
"#;

/// A repository ingest token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestToken {
    /// Token name, unique within the repository.
    pub name: String,
    /// The secret token value, generated by the server.
    pub token: String,
    /// Parser applied to events ingested with this token.
    pub assigned_parser: Option<String>,
}

#[derive(Deserialize)]
struct ParserRef {
    name: String,
}

#[derive(Deserialize)]
struct RawIngestToken {
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    token: String,
    #[serde(default)]
    parser: Option<ParserRef>,
}

impl From<RawIngestToken> for IngestToken {
    fn from(raw: RawIngestToken) -> Self {
        Self {
            name: raw.name,
            token: raw.token,
            assigned_parser: non_empty(raw.parser.map(|p| p.name)),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokensOfRepository {
    #[serde(default, deserialize_with = "null_as_default")]
    ingest_tokens: Vec<RawIngestToken>,
}

#[derive(Deserialize)]
struct ListIngestTokensData {
    repository: TokensOfRepository,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddIngestTokenData {
    add_ingest_token_v3: RawIngestToken,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignParserData {
    assign_parser_to_ingest_token: Option<RawIngestToken>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnassignParserData {
    unassign_parser_from_ingest_token: Option<RawIngestToken>,
}

/// Ingest token operations, scoped by repository name.
pub struct IngestTokens<'a> {
    client: &'a Client,
}

impl<'a> IngestTokens<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all ingest tokens of a repository.
    pub async fn list(&self, repository: &str) -> Result<Vec<IngestToken>, ProviderError> {
        let data: ListIngestTokensData = self
            .client
            .query(
                LIST_INGEST_TOKENS_QUERY,
                Variables::new().with("RepositoryName", repository),
            )
            .await?;
        Ok(data
            .repository
            .ingest_tokens
            .into_iter()
            .map(IngestToken::from)
            .collect())
    }

    /// Fetch an ingest token by name.
    pub async fn get(&self, repository: &str, name: &str) -> Result<IngestToken, ProviderError> {
        self.list(repository)
            .await?
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ProviderError::not_found("ingest token", name))
    }

    /// Create a token, optionally bound to a parser.
    pub async fn create(
        &self,
        repository: &str,
        name: &str,
        parser: Option<&str>,
    ) -> Result<IngestToken, ProviderError> {
        debug!(repository, token = name, "Creating ingest token");
        let data: AddIngestTokenData = self
            .client
            .query(
                ADD_INGEST_TOKEN_MUTATION,
                Variables::new()
                    .with("RepositoryName", repository)
                    .with("Name", name)
                    .with_opt("Parser", parser.filter(|p| !p.is_empty())),
            )
            .await?;
        Ok(data.add_ingest_token_v3.into())
    }

    /// Assign `parser` to the token, or unassign when `None`.
    pub async fn update(
        &self,
        repository: &str,
        name: &str,
        parser: Option<&str>,
    ) -> Result<IngestToken, ProviderError> {
        let updated = match parser.filter(|p| !p.is_empty()) {
            Some(parser) => {
                let data: AssignParserData = self
                    .client
                    .query(
                        ASSIGN_PARSER_MUTATION,
                        Variables::new()
                            .with("RepositoryName", repository)
                            .with("TokenName", name)
                            .with("ParserName", parser),
                    )
                    .await?;
                data.assign_parser_to_ingest_token
            }
            None => {
                let data: UnassignParserData = self
                    .client
                    .query(
                        UNASSIGN_PARSER_MUTATION,
                        Variables::new()
                            .with("RepositoryName", repository)
                            .with("TokenName", name),
                    )
                    .await?;
                data.unassign_parser_from_ingest_token
            }
        };

        match updated {
            Some(token) => Ok(token.into()),
            None => self.get(repository, name).await,
        }
    }

    /// Remove a token by name.
    pub async fn delete(&self, repository: &str, name: &str) -> Result<(), ProviderError> {
        debug!(repository, token = name, "Removing ingest token");
        self.client
            .execute(
                REMOVE_INGEST_TOKEN_MUTATION,
                Variables::new()
                    .with("RepositoryName", repository)
                    .with("Name", name),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHumio;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_create_then_get() {
        let fake = FakeHumio::new().with_repository("web");
        let client = fake.client();

        let created = client
            .ingest_tokens()
            .create("web", "shipper", Some("accesslog"))
            .await
            .unwrap();
        assert!(!created.token.is_empty());
        assert_eq!(created.assigned_parser.as_deref(), Some("accesslog"));

        let fetched = client.ingest_tokens().get("web", "shipper").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_update_assigns_and_unassigns_in_place() {
        let fake = FakeHumio::new().with_repository("web");
        let client = fake.client();
        let tokens = client.ingest_tokens();

        let created = tokens.create("web", "shipper", None).await.unwrap();
        assert_eq!(created.assigned_parser, None);

        let assigned = tokens.update("web", "shipper", Some("json")).await.unwrap();
        assert_eq!(assigned.assigned_parser.as_deref(), Some("json"));
        assert_eq!(assigned.token, created.token);
        assert_eq!(fake.requests().last().unwrap().operation_name(), "AssignParser");

        let unassigned = tokens.update("web", "shipper", None).await.unwrap();
        assert_eq!(unassigned.assigned_parser, None);
        assert_eq!(fake.requests().last().unwrap().operation_name(), "UnassignParser");
    }

    #[tokio::test]
    async fn test_delete() {
        let fake = FakeHumio::new().with_repository("web");
        let client = fake.client();

        client.ingest_tokens().create("web", "shipper", None).await.unwrap();
        client.ingest_tokens().delete("web", "shipper").await.unwrap();

        let err = client.ingest_tokens().get("web", "shipper").await.unwrap_err();
        assert_eq!(err.to_string(), "ingest token not found: shipper");
    }
}
