use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{null_as_default, Client, Variables};
use crate::error::ProviderError;

/// Reason recorded by the server when a repository is deleted.
pub const DELETE_REASON: &str = "Deleted by hemmer-provider-humio";

const LIST_REPOSITORIES_QUERY: &str = r#"
query ListRepositories {
  repositories {
    id
    name
  }
}
"#;

const GET_REPOSITORY_QUERY: &str = r#"
query GetRepository($RepositoryName: String!) {
  repository(name: $RepositoryName) {
    id
    name
    description
    timeBasedRetention
  }
}
"#;

const CREATE_REPOSITORY_MUTATION: &str = r#"
mutation CreateRepository($Name: String!) {
  createRepository(name: $Name) {
    __typename
  }
}
"#;

const UPDATE_DESCRIPTION_MUTATION: &str = r#"
mutation UpdateDescription($RepositoryName: String!, $Description: String!) {
  updateDescriptionForSearchDomain(name: $RepositoryName, newDescription: $Description) {
    __typename
  }
}
"#;

const UPDATE_RETENTION_MUTATION: &str = r#"
mutation UpdateTimeBasedRetention($RepositoryName: String!, $RetentionDays: Float) {
  updateRetention(repositoryName: $RepositoryName, timeBasedRetention: $RetentionDays) {
    repository {
      id
      name
      ... on Repository {
        timeBasedRetention
      }
    }
  }
}
"#;

const DELETE_REPOSITORY_MUTATION: &str = r#"
mutation DeleteRepository($RepositoryName: String!, $Reason: String) {
  deleteSearchDomain(name: $RepositoryName, deleteMessage: $Reason) {
    result
  }
}
"#;

/// A Humio repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// Server-assigned identifier.
    pub id: String,
    /// Repository name (its identity in configuration).
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Time-based retention in days; `None` means unlimited.
    pub retention_days: Option<f64>,
}

#[derive(Deserialize)]
struct RepositoryRef {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ListRepositoriesData {
    #[serde(deserialize_with = "null_as_default")]
    repositories: Vec<RepositoryRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryDetail {
    id: String,
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    #[serde(default)]
    time_based_retention: Option<f64>,
}

#[derive(Deserialize)]
struct GetRepositoryData {
    repository: Option<RepositoryDetail>,
}

/// Repository operations.
pub struct Repositories<'a> {
    client: &'a Client,
}

impl<'a> Repositories<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all repositories. Only `id` and `name` are populated.
    pub async fn list(&self) -> Result<Vec<Repository>, ProviderError> {
        let data: ListRepositoriesData = self
            .client
            .query(LIST_REPOSITORIES_QUERY, Variables::new())
            .await?;
        Ok(data
            .repositories
            .into_iter()
            .map(|r| Repository {
                id: r.id,
                name: r.name,
                ..Default::default()
            })
            .collect())
    }

    /// Fetch a repository by name.
    pub async fn get(&self, name: &str) -> Result<Repository, ProviderError> {
        let exists = self.list().await?.iter().any(|r| r.name == name);
        if !exists {
            return Err(ProviderError::not_found("repository", name));
        }

        let data: GetRepositoryData = self
            .client
            .query(
                GET_REPOSITORY_QUERY,
                Variables::new().with("RepositoryName", name),
            )
            .await?;
        let detail = data
            .repository
            .ok_or_else(|| ProviderError::not_found("repository", name))?;

        Ok(Repository {
            id: detail.id,
            name: detail.name,
            description: detail.description,
            retention_days: detail.time_based_retention,
        })
    }

    /// Create an empty repository.
    pub async fn create(&self, name: &str) -> Result<(), ProviderError> {
        debug!(repository = name, "Creating repository");
        self.client
            .execute(CREATE_REPOSITORY_MUTATION, Variables::new().with("Name", name))
            .await
    }

    /// Set the repository description.
    pub async fn update_description(
        &self,
        name: &str,
        description: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .execute(
                UPDATE_DESCRIPTION_MUTATION,
                Variables::new()
                    .with("RepositoryName", name)
                    .with("Description", description),
            )
            .await
    }

    /// Set the time-based retention. `None` or a non-positive value means unlimited.
    pub async fn update_retention(
        &self,
        name: &str,
        retention_days: Option<f64>,
    ) -> Result<(), ProviderError> {
        let retention = retention_days.filter(|days| *days > 0.0);
        self.client
            .execute(
                UPDATE_RETENTION_MUTATION,
                Variables::new()
                    .with("RepositoryName", name)
                    .with_opt("RetentionDays", retention),
            )
            .await
    }

    /// Delete a repository and all its data.
    pub async fn delete(&self, name: &str, reason: &str) -> Result<(), ProviderError> {
        debug!(repository = name, "Deleting repository");
        self.client
            .execute(
                DELETE_REPOSITORY_MUTATION,
                Variables::new()
                    .with("RepositoryName", name)
                    .with("Reason", reason),
            )
            .await
    }
}
