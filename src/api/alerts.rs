use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{non_empty, null_as_default, Client, Variables};
use crate::error::ProviderError;

const LIST_ALERTS_QUERY: &str = r#"
query ListAlerts($SearchDomainName: String!) {
  searchDomain(name: $SearchDomainName) {
    alerts {
      id
      name
      description
      queryString
      queryStart
      throttleField
      throttleTimeMillis
      enabled
      actions
      labels
      queryOwnership {
        id
        ... on QueryOwnershipTypeUser {
          user {
            id
          }
        }
        ... on QueryOwnershipTypeOrganization {
          id
        }
      }
    }
  }
}
"#;

const CREATE_ALERT_MUTATION: &str = r#"
mutation CreateAlert(
  $SearchDomainName: String!
  $Name: String!
  $Description: String
  $QueryString: String!
  $QueryStart: String!
  $ThrottleTimeMillis: Long!
  $ThrottleField: String
  $Enabled: Boolean!
  $Actions: [String!]!
  $Labels: [String!]
  $RunAsUserID: String
  $QueryOwnershipType: QueryOwnershipType
) {
  createAlert(input: {
    viewName: $SearchDomainName
    name: $Name
    description: $Description
    queryString: $QueryString
    queryStart: $QueryStart
    throttleTimeMillis: $ThrottleTimeMillis
    throttleField: $ThrottleField
    enabled: $Enabled
    actions: $Actions
    labels: $Labels
    runAsUserId: $RunAsUserID
    queryOwnershipType: $QueryOwnershipType
  }) {
    id
    name
  }
}
"#;

const DELETE_ALERT_MUTATION: &str = r#"
mutation DeleteAlert($SearchDomainName: String!, $AlertID: String!) {
  deleteAlert(input: {
    viewName: $SearchDomainName
    id: $AlertID
  })
}
"#;

/// Who the alert query runs as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOwnershipType {
    /// Runs with the permissions of a specific user.
    User,
    /// Runs with organization-wide permissions.
    #[default]
    Organization,
}

impl QueryOwnershipType {
    /// The GraphQL enum value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Organization => "Organization",
        }
    }
}

/// A Humio alert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Server-assigned identifier; changes whenever the alert is updated.
    pub id: String,
    /// Alert name, unique within the search domain.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// The query that triggers the alert.
    pub query_string: String,
    /// Relative start of the query window, e.g. `1h`.
    pub query_start: String,
    /// Field whose distinct values are throttled independently.
    pub throttle_field: Option<String>,
    /// Minimum time between notifications.
    pub throttle_time_millis: i64,
    /// Whether the alert is active.
    pub enabled: bool,
    /// Names of the actions to invoke.
    pub actions: Vec<String>,
    /// Free-form labels.
    pub labels: Vec<String>,
    /// User the query runs as, for user-owned alerts.
    pub run_as_user_id: Option<String>,
    /// Ownership of the alert query.
    pub query_ownership_type: QueryOwnershipType,
}

#[derive(Deserialize)]
struct OwnerUser {
    id: String,
}

#[derive(Deserialize)]
struct QueryOwnership {
    #[serde(default)]
    user: Option<OwnerUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAlert {
    id: String,
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    query_string: String,
    query_start: String,
    #[serde(default)]
    throttle_field: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    throttle_time_millis: i64,
    enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    actions: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    labels: Vec<String>,
    #[serde(default)]
    query_ownership: Option<QueryOwnership>,
}

impl From<RawAlert> for Alert {
    fn from(raw: RawAlert) -> Self {
        let owner = raw.query_ownership.and_then(|o| o.user);
        let (query_ownership_type, run_as_user_id) = match owner {
            Some(user) => (QueryOwnershipType::User, Some(user.id)),
            None => (QueryOwnershipType::Organization, None),
        };
        Self {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            query_string: raw.query_string,
            query_start: raw.query_start,
            throttle_field: non_empty(raw.throttle_field),
            throttle_time_millis: raw.throttle_time_millis,
            enabled: raw.enabled,
            actions: raw.actions,
            labels: raw.labels,
            run_as_user_id,
            query_ownership_type,
        }
    }
}

#[derive(Deserialize)]
struct AlertsOfDomain {
    #[serde(default, deserialize_with = "null_as_default")]
    alerts: Vec<RawAlert>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAlertsData {
    search_domain: AlertsOfDomain,
}

#[derive(Deserialize)]
struct CreatedEntity {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAlertData {
    create_alert: CreatedEntity,
}

/// Alert operations, scoped by search domain (repository or view) name.
pub struct Alerts<'a> {
    client: &'a Client,
}

impl<'a> Alerts<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all alerts in a search domain.
    pub async fn list(&self, repository: &str) -> Result<Vec<Alert>, ProviderError> {
        let data: ListAlertsData = self
            .client
            .query(
                LIST_ALERTS_QUERY,
                Variables::new().with("SearchDomainName", repository),
            )
            .await?;
        Ok(data.search_domain.alerts.into_iter().map(Alert::from).collect())
    }

    /// Fetch an alert by name.
    pub async fn get(&self, repository: &str, name: &str) -> Result<Alert, ProviderError> {
        self.list(repository)
            .await?
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ProviderError::not_found("alert", name))
    }

    /// Create an alert, returning it with its new ID.
    pub async fn create(&self, repository: &str, alert: &Alert) -> Result<Alert, ProviderError> {
        debug!(repository, alert = %alert.name, "Creating alert");
        let variables = Variables::new()
            .with("SearchDomainName", repository)
            .with("Name", alert.name.as_str())
            .with("Description", alert.description.as_str())
            .with("QueryString", alert.query_string.as_str())
            .with("QueryStart", alert.query_start.as_str())
            .with("ThrottleTimeMillis", alert.throttle_time_millis)
            .with_opt("ThrottleField", non_empty(alert.throttle_field.clone()))
            .with("Enabled", alert.enabled)
            .with("Actions", string_list(&alert.actions))
            .with("Labels", string_list(&alert.labels))
            .with_opt("RunAsUserID", non_empty(alert.run_as_user_id.clone()))
            .with("QueryOwnershipType", alert.query_ownership_type.as_str());

        let data: CreateAlertData = self.client.query(CREATE_ALERT_MUTATION, variables).await?;
        Ok(Alert {
            id: data.create_alert.id,
            ..alert.clone()
        })
    }

    /// Replace an alert: resolve the current ID by name, delete, create.
    ///
    /// Not atomic. If the create fails the alert is gone.
    pub async fn update(&self, repository: &str, alert: &Alert) -> Result<Alert, ProviderError> {
        let existing = self.get(repository, &alert.name).await?;
        self.delete(repository, &existing.id).await?;
        self.create(repository, alert).await.inspect_err(|e| {
            warn!(
                repository,
                alert = %alert.name,
                error = %e,
                "Alert was deleted but could not be recreated"
            );
        })
    }

    /// Delete an alert by ID.
    pub async fn delete(&self, repository: &str, id: &str) -> Result<(), ProviderError> {
        debug!(repository, alert_id = id, "Deleting alert");
        self.client
            .execute(
                DELETE_ALERT_MUTATION,
                Variables::new()
                    .with("SearchDomainName", repository)
                    .with("AlertID", id),
            )
            .await
    }

    /// Delete an alert by name.
    pub async fn delete_by_name(&self, repository: &str, name: &str) -> Result<(), ProviderError> {
        let existing = self.get(repository, name).await?;
        self.delete(repository, &existing.id).await
    }
}

fn string_list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}
