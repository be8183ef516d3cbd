use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{null_as_default, Client, Variables};
use crate::error::ProviderError;

const LIST_PARSERS_QUERY: &str = r#"
query ListParsers($RepositoryName: String!) {
  repository(name: $RepositoryName) {
    parsers {
      id
      name
      isBuiltIn
    }
  }
}
"#;

const GET_PARSER_QUERY: &str = r#"
query GetParser($RepositoryName: String!, $ParserName: String!) {
  repository(name: $RepositoryName) {
    parser(name: $ParserName) {
      id
      name
      script
      testCases {
        event {
          rawString
        }
      }
      fieldsToTag
    }
  }
}
"#;

const CREATE_PARSER_MUTATION: &str = r#"
mutation CreateParser(
  $RepositoryName: RepoOrViewName!
  $Name: String!
  $Script: String!
  $TestCases: [ParserTestCaseInput!]!
  $FieldsToTag: [String!]!
  $FieldsToBeRemovedBeforeParsing: [String!]!
) {
  createParserV2(input: {
    repositoryName: $RepositoryName
    name: $Name
    script: $Script
    testCases: $TestCases
    fieldsToTag: $FieldsToTag
    fieldsToBeRemovedBeforeParsing: $FieldsToBeRemovedBeforeParsing
  }) {
    id
    name
  }
}
"#;

const DELETE_PARSER_MUTATION: &str = r#"
mutation DeleteParser($RepositoryName: RepoOrViewName!, $ParserID: String!) {
  deleteParser(input: {
    repositoryName: $RepositoryName
    id: $ParserID
  }) {
    __typename
  }
}
"#;

/// A repository parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parser {
    /// Server-assigned identifier; changes whenever the parser is updated.
    pub id: String,
    /// Parser name, unique within the repository.
    pub name: String,
    /// The parser script.
    pub script: String,
    /// Fields promoted to tags.
    pub fields_to_tag: Vec<String>,
    /// Raw sample events the parser is tested against.
    pub test_cases: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParserSummary {
    id: String,
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    is_built_in: bool,
}

#[derive(Deserialize)]
struct ParsersOfRepository {
    #[serde(default, deserialize_with = "null_as_default")]
    parsers: Vec<ParserSummary>,
}

#[derive(Deserialize)]
struct ListParsersData {
    repository: ParsersOfRepository,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestEvent {
    raw_string: String,
}

#[derive(Deserialize)]
struct TestCase {
    event: TestEvent,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParserDetail {
    id: String,
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    script: String,
    #[serde(default, deserialize_with = "null_as_default")]
    test_cases: Vec<TestCase>,
    #[serde(default, deserialize_with = "null_as_default")]
    fields_to_tag: Vec<String>,
}

#[derive(Deserialize)]
struct ParserOfRepository {
    parser: Option<ParserDetail>,
}

#[derive(Deserialize)]
struct GetParserData {
    repository: ParserOfRepository,
}

#[derive(Deserialize)]
struct CreatedEntity {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateParserData {
    create_parser_v2: CreatedEntity,
}

/// Parser operations, scoped by repository name.
pub struct Parsers<'a> {
    client: &'a Client,
}

impl<'a> Parsers<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List the user-defined parsers of a repository. Only `id` and `name`
    /// are populated; built-in parsers are skipped.
    pub async fn list(&self, repository: &str) -> Result<Vec<Parser>, ProviderError> {
        let data: ListParsersData = self
            .client
            .query(
                LIST_PARSERS_QUERY,
                Variables::new().with("RepositoryName", repository),
            )
            .await?;
        Ok(data
            .repository
            .parsers
            .into_iter()
            .filter(|p| !p.is_built_in)
            .map(|p| Parser {
                id: p.id,
                name: p.name,
                ..Default::default()
            })
            .collect())
    }

    /// Fetch a parser by name, with script, tags and test cases.
    pub async fn get(&self, repository: &str, name: &str) -> Result<Parser, ProviderError> {
        let exists = self.list(repository).await?.iter().any(|p| p.name == name);
        if !exists {
            return Err(ProviderError::not_found("parser", name));
        }

        let data: GetParserData = self
            .client
            .query(
                GET_PARSER_QUERY,
                Variables::new()
                    .with("RepositoryName", repository)
                    .with("ParserName", name),
            )
            .await?;
        let detail = data
            .repository
            .parser
            .ok_or_else(|| ProviderError::not_found("parser", name))?;

        Ok(Parser {
            id: detail.id,
            name: detail.name,
            script: detail.script,
            fields_to_tag: detail.fields_to_tag,
            test_cases: detail
                .test_cases
                .into_iter()
                .map(|tc| tc.event.raw_string)
                .collect(),
        })
    }

    /// Create a parser, returning it with its new ID.
    pub async fn create(&self, repository: &str, parser: &Parser) -> Result<Parser, ProviderError> {
        debug!(repository, parser = %parser.name, "Creating parser");
        let test_cases: Vec<_> = parser
            .test_cases
            .iter()
            .map(|raw| json!({"event": {"rawString": raw}}))
            .collect();

        let data: CreateParserData = self
            .client
            .query(
                CREATE_PARSER_MUTATION,
                Variables::new()
                    .with("RepositoryName", repository)
                    .with("Name", parser.name.as_str())
                    .with("Script", parser.script.as_str())
                    .with("TestCases", test_cases)
                    .with("FieldsToTag", parser.fields_to_tag.clone())
                    .with("FieldsToBeRemovedBeforeParsing", Vec::<String>::new()),
            )
            .await?;

        Ok(Parser {
            id: data.create_parser_v2.id,
            ..parser.clone()
        })
    }

    /// Replace a parser: resolve the current ID by name, delete, create.
    ///
    /// Not atomic. If the create fails the parser is gone.
    pub async fn update(&self, repository: &str, parser: &Parser) -> Result<Parser, ProviderError> {
        self.delete(repository, &parser.name).await?;
        self.create(repository, parser).await.inspect_err(|e| {
            warn!(
                repository,
                parser = %parser.name,
                error = %e,
                "Parser was deleted but could not be recreated"
            );
        })
    }

    /// Delete a parser by name.
    pub async fn delete(&self, repository: &str, name: &str) -> Result<(), ProviderError> {
        let existing = self.get(repository, name).await?;
        debug!(repository, parser = name, parser_id = %existing.id, "Deleting parser");
        self.client
            .execute(
                DELETE_PARSER_MUTATION,
                Variables::new()
                    .with("RepositoryName", repository)
                    .with("ParserID", existing.id),
            )
            .await
    }
}
