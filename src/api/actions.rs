use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{non_empty, null_as_default, Client, Variables};
use crate::error::ProviderError;

/// Local discriminants accepted in the `type` attribute.
pub const ACTION_TYPES: &[&str] = &[
    "email",
    "humio_repo",
    "ops_genie",
    "pager_duty",
    "slack",
    "slack_post_message",
    "victor_ops",
    "webhook",
];

const LIST_ACTIONS_QUERY: &str = r#"
query ListActions($SearchDomainName: String!) {
  searchDomain(name: $SearchDomainName) {
    actions {
      __typename
      id
      name
      ... on EmailAction {
        recipients
        subjectTemplate
        emailBodyTemplate: bodyTemplate
        emailUseProxy: useProxy
      }
      ... on HumioRepoAction {
        ingestToken
      }
      ... on OpsGenieAction {
        apiUrl
        genieKey
        opsGenieUseProxy: useProxy
      }
      ... on PagerDutyAction {
        routingKey
        severity
        pagerDutyUseProxy: useProxy
      }
      ... on SlackAction {
        url
        fields {
          fieldName
          value
        }
        slackUseProxy: useProxy
      }
      ... on SlackPostMessageAction {
        apiToken
        channels
        fields {
          fieldName
          value
        }
        useProxy
      }
      ... on VictorOpsAction {
        messageType
        notifyUrl
        victorOpsUseProxy: useProxy
      }
      ... on WebhookAction {
        method
        webhookUrl: url
        headers {
          header
          value
        }
        webhookBodyTemplate: bodyTemplate
        ignoreSSL
        webhookUseProxy: useProxy
      }
    }
  }
}
"#;

const DELETE_ACTION_MUTATION: &str = r#"
mutation DeleteAction($SearchDomainName: String!, $ActionID: String!) {
  deleteAction(input: {
    viewName: $SearchDomainName
    id: $ActionID
  })
}
"#;

const CREATE_EMAIL_ACTION_MUTATION: &str = r#"
mutation CreateEmailAction(
  $SearchDomainName: String!
  $Name: String!
  $Recipients: [String!]!
  $SubjectTemplate: String
  $BodyTemplate: String
  $UseProxy: Boolean!
) {
  createEmailAction(input: {
    viewName: $SearchDomainName
    name: $Name
    recipients: $Recipients
    subjectTemplate: $SubjectTemplate
    bodyTemplate: $BodyTemplate
    useProxy: $UseProxy
  }) {
    id
    name
  }
}
"#;

const CREATE_HUMIO_REPO_ACTION_MUTATION: &str = r#"
mutation CreateHumioRepoAction(
  $SearchDomainName: String!
  $Name: String!
  $IngestToken: String!
) {
  createHumioRepoAction(input: {
    viewName: $SearchDomainName
    name: $Name
    ingestToken: $IngestToken
  }) {
    id
    name
  }
}
"#;

const CREATE_OPS_GENIE_ACTION_MUTATION: &str = r#"
mutation CreateOpsGenieAction(
  $SearchDomainName: String!
  $Name: String!
  $ApiUrl: String!
  $GenieKey: String!
  $UseProxy: Boolean!
) {
  createOpsGenieAction(input: {
    viewName: $SearchDomainName
    name: $Name
    apiUrl: $ApiUrl
    genieKey: $GenieKey
    useProxy: $UseProxy
  }) {
    id
    name
  }
}
"#;

const CREATE_PAGER_DUTY_ACTION_MUTATION: &str = r#"
mutation CreatePagerDutyAction(
  $SearchDomainName: String!
  $Name: String!
  $RoutingKey: String!
  $Severity: String!
  $UseProxy: Boolean!
) {
  createPagerDutyAction(input: {
    viewName: $SearchDomainName
    name: $Name
    routingKey: $RoutingKey
    severity: $Severity
    useProxy: $UseProxy
  }) {
    id
    name
  }
}
"#;

const CREATE_SLACK_ACTION_MUTATION: &str = r#"
mutation CreateSlackAction(
  $SearchDomainName: String!
  $Name: String!
  $Url: String!
  $Fields: [SlackFieldEntryInput!]!
  $UseProxy: Boolean!
) {
  createSlackAction(input: {
    viewName: $SearchDomainName
    name: $Name
    url: $Url
    fields: $Fields
    useProxy: $UseProxy
  }) {
    id
    name
  }
}
"#;

const CREATE_SLACK_POST_MESSAGE_ACTION_MUTATION: &str = r#"
mutation CreateSlackPostMessageAction(
  $SearchDomainName: String!
  $Name: String!
  $ApiToken: String!
  $Channels: [String!]!
  $Fields: [SlackFieldEntryInput!]!
  $UseProxy: Boolean!
) {
  createSlackPostMessageAction(input: {
    viewName: $SearchDomainName
    name: $Name
    apiToken: $ApiToken
    channels: $Channels
    fields: $Fields
    useProxy: $UseProxy
  }) {
    id
    name
  }
}
"#;

const CREATE_VICTOR_OPS_ACTION_MUTATION: &str = r#"
mutation CreateVictorOpsAction(
  $SearchDomainName: String!
  $Name: String!
  $MessageType: String!
  $NotifyUrl: String!
  $UseProxy: Boolean!
) {
  createVictorOpsAction(input: {
    viewName: $SearchDomainName
    name: $Name
    messageType: $MessageType
    notifyUrl: $NotifyUrl
    useProxy: $UseProxy
  }) {
    id
    name
  }
}
"#;

const CREATE_WEBHOOK_ACTION_MUTATION: &str = r#"
mutation CreateWebhookAction(
  $SearchDomainName: String!
  $Name: String!
  $Url: String!
  $Method: String!
  $Headers: [HttpHeaderEntryInput!]!
  $BodyTemplate: String!
  $IgnoreSSL: Boolean!
  $UseProxy: Boolean!
) {
  createWebhookAction(input: {
    viewName: $SearchDomainName
    name: $Name
    url: $Url
    method: $Method
    headers: $Headers
    bodyTemplate: $BodyTemplate
    ignoreSSL: $IgnoreSSL
    useProxy: $UseProxy
  }) {
    id
    name
  }
}
"#;

/// Email notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailAction {
    /// Addresses to notify.
    pub recipients: Vec<String>,
    /// Subject line template; the server default when unset.
    #[serde(default)]
    pub subject_template: Option<String>,
    /// Body template; the server default when unset.
    #[serde(default)]
    pub body_template: Option<String>,
    /// Route through the cluster's HTTP proxy.
    #[serde(default)]
    pub use_proxy: bool,
}

/// Writes the triggering events into another repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HumioRepoAction {
    /// Ingest token of the target repository.
    pub ingest_token: String,
}

/// OpsGenie alert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpsGenieAction {
    /// OpsGenie API base URL.
    pub api_url: String,
    /// OpsGenie API key.
    pub genie_key: String,
    /// Route through the cluster's HTTP proxy.
    #[serde(default)]
    pub use_proxy: bool,
}

/// PagerDuty event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagerDutyAction {
    /// Integration routing key.
    pub routing_key: String,
    /// Event severity, e.g. `critical`.
    pub severity: String,
    /// Route through the cluster's HTTP proxy.
    #[serde(default)]
    pub use_proxy: bool,
}

/// A field attached to a Slack message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackField {
    /// Label shown in the message.
    pub field_name: String,
    /// Value template.
    pub value: String,
}

/// Slack incoming webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackAction {
    /// Incoming webhook URL.
    pub url: String,
    /// Message fields.
    #[serde(default)]
    pub fields: Vec<SlackField>,
    /// Route through the cluster's HTTP proxy.
    #[serde(default)]
    pub use_proxy: bool,
}

/// Slack `chat.postMessage` with a bot token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackPostMessageAction {
    /// Bot token.
    pub api_token: String,
    /// Channels to post to.
    pub channels: Vec<String>,
    /// Message fields.
    #[serde(default)]
    pub fields: Vec<SlackField>,
    /// Route through the cluster's HTTP proxy.
    #[serde(default)]
    pub use_proxy: bool,
}

/// VictorOps (Splunk On-Call) incident.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VictorOpsAction {
    /// Incident message type, e.g. `CRITICAL`.
    pub message_type: String,
    /// REST endpoint URL.
    pub notify_url: String,
    /// Route through the cluster's HTTP proxy.
    #[serde(default)]
    pub use_proxy: bool,
}

/// A header sent with a webhook request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeader {
    /// Header name.
    pub header: String,
    /// Header value.
    pub value: String,
}

/// Generic HTTP webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookAction {
    /// HTTP method.
    pub method: String,
    /// Target URL.
    pub url: String,
    /// Extra request headers.
    #[serde(default)]
    pub headers: Vec<HttpHeader>,
    /// Request body template.
    #[serde(default)]
    pub body_template: String,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub ignore_ssl: bool,
    /// Route through the cluster's HTTP proxy.
    #[serde(default)]
    pub use_proxy: bool,
}

/// The kind-specific part of an action.
///
/// Serialized with a `type` tag holding one of [`ACTION_TYPES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ActionKind {
    Email(EmailAction),
    HumioRepo(HumioRepoAction),
    OpsGenie(OpsGenieAction),
    PagerDuty(PagerDutyAction),
    Slack(SlackAction),
    SlackPostMessage(SlackPostMessageAction),
    VictorOps(VictorOpsAction),
    Webhook(WebhookAction),
}

impl ActionKind {
    /// The GraphQL `__typename` of this kind.
    pub fn typename(&self) -> &'static str {
        match self {
            Self::Email(_) => "EmailAction",
            Self::HumioRepo(_) => "HumioRepoAction",
            Self::OpsGenie(_) => "OpsGenieAction",
            Self::PagerDuty(_) => "PagerDutyAction",
            Self::Slack(_) => "SlackAction",
            Self::SlackPostMessage(_) => "SlackPostMessageAction",
            Self::VictorOps(_) => "VictorOpsAction",
            Self::Webhook(_) => "WebhookAction",
        }
    }

    /// The create mutation and its kind-specific variables.
    fn create_request(&self, variables: Variables) -> (&'static str, Variables) {
        match self {
            Self::Email(a) => (
                CREATE_EMAIL_ACTION_MUTATION,
                variables
                    .with("Recipients", a.recipients.clone())
                    .with_opt("SubjectTemplate", non_empty(a.subject_template.clone()))
                    .with_opt("BodyTemplate", non_empty(a.body_template.clone()))
                    .with("UseProxy", a.use_proxy),
            ),
            Self::HumioRepo(a) => (
                CREATE_HUMIO_REPO_ACTION_MUTATION,
                variables.with("IngestToken", a.ingest_token.as_str()),
            ),
            Self::OpsGenie(a) => (
                CREATE_OPS_GENIE_ACTION_MUTATION,
                variables
                    .with("ApiUrl", a.api_url.as_str())
                    .with("GenieKey", a.genie_key.as_str())
                    .with("UseProxy", a.use_proxy),
            ),
            Self::PagerDuty(a) => (
                CREATE_PAGER_DUTY_ACTION_MUTATION,
                variables
                    .with("RoutingKey", a.routing_key.as_str())
                    .with("Severity", a.severity.as_str())
                    .with("UseProxy", a.use_proxy),
            ),
            Self::Slack(a) => (
                CREATE_SLACK_ACTION_MUTATION,
                variables
                    .with("Url", a.url.as_str())
                    .with("Fields", slack_fields(&a.fields))
                    .with("UseProxy", a.use_proxy),
            ),
            Self::SlackPostMessage(a) => (
                CREATE_SLACK_POST_MESSAGE_ACTION_MUTATION,
                variables
                    .with("ApiToken", a.api_token.as_str())
                    .with("Channels", a.channels.clone())
                    .with("Fields", slack_fields(&a.fields))
                    .with("UseProxy", a.use_proxy),
            ),
            Self::VictorOps(a) => (
                CREATE_VICTOR_OPS_ACTION_MUTATION,
                variables
                    .with("MessageType", a.message_type.as_str())
                    .with("NotifyUrl", a.notify_url.as_str())
                    .with("UseProxy", a.use_proxy),
            ),
            Self::Webhook(a) => (
                CREATE_WEBHOOK_ACTION_MUTATION,
                variables
                    .with("Url", a.url.as_str())
                    .with("Method", a.method.as_str())
                    .with(
                        "Headers",
                        a.headers
                            .iter()
                            .map(|h| json!({"header": h.header, "value": h.value}))
                            .collect::<Vec<_>>(),
                    )
                    .with("BodyTemplate", a.body_template.as_str())
                    .with("IgnoreSSL", a.ignore_ssl)
                    .with("UseProxy", a.use_proxy),
            ),
        }
    }
}

fn slack_fields(fields: &[SlackField]) -> Vec<Value> {
    fields
        .iter()
        .map(|f| json!({"fieldName": f.field_name, "value": f.value}))
        .collect()
}

/// A notification action in a search domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Server-assigned identifier; changes whenever the action is updated.
    pub id: String,
    /// Action name, unique within the search domain.
    pub name: String,
    /// Kind and kind-specific settings.
    pub kind: ActionKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlackField {
    field_name: String,
    value: String,
}

/// One entry of the list query. Fields shared by several kinds are aliased.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    #[serde(rename = "__typename")]
    typename: String,
    id: String,
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    recipients: Vec<String>,
    subject_template: Option<String>,
    email_body_template: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    email_use_proxy: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    ingest_token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    api_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    genie_key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    ops_genie_use_proxy: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    routing_key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    severity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pager_duty_use_proxy: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    fields: Vec<RawSlackField>,
    #[serde(default, deserialize_with = "null_as_default")]
    slack_use_proxy: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    api_token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    channels: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    use_proxy: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    message_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    notify_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    victor_ops_use_proxy: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    webhook_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    headers: Vec<HttpHeader>,
    #[serde(default, deserialize_with = "null_as_default")]
    webhook_body_template: String,
    #[serde(default, rename = "ignoreSSL", deserialize_with = "null_as_default")]
    ignore_ssl: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    webhook_use_proxy: bool,
}

impl TryFrom<RawAction> for Action {
    type Error = ProviderError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        let fields = |raw: Vec<RawSlackField>| {
            raw.into_iter()
                .map(|f| SlackField {
                    field_name: f.field_name,
                    value: f.value,
                })
                .collect::<Vec<_>>()
        };

        let kind = match raw.typename.as_str() {
            "EmailAction" => ActionKind::Email(EmailAction {
                recipients: raw.recipients,
                subject_template: non_empty(raw.subject_template),
                body_template: non_empty(raw.email_body_template),
                use_proxy: raw.email_use_proxy,
            }),
            "HumioRepoAction" => ActionKind::HumioRepo(HumioRepoAction {
                ingest_token: raw.ingest_token,
            }),
            "OpsGenieAction" => ActionKind::OpsGenie(OpsGenieAction {
                api_url: raw.api_url,
                genie_key: raw.genie_key,
                use_proxy: raw.ops_genie_use_proxy,
            }),
            "PagerDutyAction" => ActionKind::PagerDuty(PagerDutyAction {
                routing_key: raw.routing_key,
                severity: raw.severity,
                use_proxy: raw.pager_duty_use_proxy,
            }),
            "SlackAction" => ActionKind::Slack(SlackAction {
                url: raw.url,
                fields: fields(raw.fields),
                use_proxy: raw.slack_use_proxy,
            }),
            "SlackPostMessageAction" => ActionKind::SlackPostMessage(SlackPostMessageAction {
                api_token: raw.api_token,
                channels: raw.channels,
                fields: fields(raw.fields),
                use_proxy: raw.use_proxy,
            }),
            "VictorOpsAction" => ActionKind::VictorOps(VictorOpsAction {
                message_type: raw.message_type,
                notify_url: raw.notify_url,
                use_proxy: raw.victor_ops_use_proxy,
            }),
            "WebhookAction" => ActionKind::Webhook(WebhookAction {
                method: raw.method,
                url: raw.webhook_url,
                headers: raw.headers,
                body_template: raw.webhook_body_template,
                ignore_ssl: raw.ignore_ssl,
                use_proxy: raw.webhook_use_proxy,
            }),
            other => {
                return Err(ProviderError::UnsupportedType(format!(
                    "action '{}' has type {}",
                    raw.name, other
                )))
            }
        };

        Ok(Self {
            id: raw.id,
            name: raw.name,
            kind,
        })
    }
}

#[derive(Deserialize)]
struct ActionsOfDomain {
    #[serde(default, deserialize_with = "null_as_default")]
    actions: Vec<RawAction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListActionsData {
    search_domain: ActionsOfDomain,
}

#[derive(Deserialize)]
struct CreatedEntity {
    id: String,
}

/// Action operations, scoped by search domain name.
pub struct Actions<'a> {
    client: &'a Client,
}

impl<'a> Actions<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all actions in a search domain.
    ///
    /// Fails with [`ProviderError::UnsupportedType`] if any entry has an
    /// unknown `__typename`.
    pub async fn list(&self, repository: &str) -> Result<Vec<Action>, ProviderError> {
        let data: ListActionsData = self
            .client
            .query(
                LIST_ACTIONS_QUERY,
                Variables::new().with("SearchDomainName", repository),
            )
            .await?;
        data.search_domain
            .actions
            .into_iter()
            .map(Action::try_from)
            .collect()
    }

    /// Fetch an action by name.
    pub async fn get(&self, repository: &str, name: &str) -> Result<Action, ProviderError> {
        self.list(repository)
            .await?
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ProviderError::not_found("action", name))
    }

    /// Create an action with the kind-specific mutation, returning its new ID.
    pub async fn create(&self, repository: &str, action: &Action) -> Result<Action, ProviderError> {
        debug!(
            repository,
            action = %action.name,
            kind = action.kind.typename(),
            "Creating action"
        );
        let base = Variables::new()
            .with("SearchDomainName", repository)
            .with("Name", action.name.as_str());
        let (mutation, variables) = action.kind.create_request(base);

        // The payload is keyed by the mutation field, e.g. `createSlackAction`.
        let data: HashMap<String, CreatedEntity> = self.client.query(mutation, variables).await?;
        let created = data.into_values().next().ok_or_else(|| {
            ProviderError::Serialization(serde::de::Error::custom(format!(
                "create {} returned no payload",
                action.kind.typename()
            )))
        })?;

        Ok(Action {
            id: created.id,
            ..action.clone()
        })
    }

    /// Replace an action: resolve the current ID by name, delete, create.
    ///
    /// Not atomic. If the create fails the action is gone.
    pub async fn update(&self, repository: &str, action: &Action) -> Result<Action, ProviderError> {
        let existing = self.get(repository, &action.name).await?;
        self.delete(repository, &existing.id).await?;
        self.create(repository, action).await.inspect_err(|e| {
            warn!(
                repository,
                action = %action.name,
                error = %e,
                "Action was deleted but could not be recreated"
            );
        })
    }

    /// Delete an action by ID.
    pub async fn delete(&self, repository: &str, id: &str) -> Result<(), ProviderError> {
        debug!(repository, action_id = id, "Deleting action");
        self.client
            .execute(
                DELETE_ACTION_MUTATION,
                Variables::new()
                    .with("SearchDomainName", repository)
                    .with("ActionID", id),
            )
            .await
    }

    /// Delete an action by name.
    pub async fn delete_by_name(&self, repository: &str, name: &str) -> Result<(), ProviderError> {
        let existing = self.get(repository, name).await?;
        self.delete(repository, &existing.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GraphQlRequest, HttpResponse, Transport};
    use crate::testing::FakeHumio;
    use pretty_assertions::assert_eq;

    fn action(name: &str, kind: ActionKind) -> Action {
        Action {
            id: String::new(),
            name: name.to_string(),
            kind,
        }
    }

    fn every_kind() -> Vec<Action> {
        vec![
            action(
                "mail",
                ActionKind::Email(EmailAction {
                    recipients: vec!["oncall@example.com".to_string()],
                    subject_template: Some("{alert_name}".to_string()),
                    body_template: None,
                    use_proxy: true,
                }),
            ),
            action(
                "copy",
                ActionKind::HumioRepo(HumioRepoAction {
                    ingest_token: "tok-123".to_string(),
                }),
            ),
            action(
                "genie",
                ActionKind::OpsGenie(OpsGenieAction {
                    api_url: "https://api.opsgenie.com".to_string(),
                    genie_key: "gk".to_string(),
                    use_proxy: false,
                }),
            ),
            action(
                "pager",
                ActionKind::PagerDuty(PagerDutyAction {
                    routing_key: "rk".to_string(),
                    severity: "critical".to_string(),
                    use_proxy: false,
                }),
            ),
            action(
                "slack",
                ActionKind::Slack(SlackAction {
                    url: "https://hooks.slack.com/services/x".to_string(),
                    fields: vec![SlackField {
                        field_name: "Query".to_string(),
                        value: "{query_string}".to_string(),
                    }],
                    use_proxy: true,
                }),
            ),
            action(
                "slack-bot",
                ActionKind::SlackPostMessage(SlackPostMessageAction {
                    api_token: "xoxb".to_string(),
                    channels: vec!["#alerts".to_string()],
                    fields: vec![],
                    use_proxy: false,
                }),
            ),
            action(
                "victor",
                ActionKind::VictorOps(VictorOpsAction {
                    message_type: "CRITICAL".to_string(),
                    notify_url: "https://alert.victorops.com/x".to_string(),
                    use_proxy: true,
                }),
            ),
            action(
                "hook",
                ActionKind::Webhook(WebhookAction {
                    method: "POST".to_string(),
                    url: "https://example.com/hook".to_string(),
                    headers: vec![HttpHeader {
                        header: "X-Team".to_string(),
                        value: "ops".to_string(),
                    }],
                    body_template: "{events}".to_string(),
                    ignore_ssl: true,
                    use_proxy: false,
                }),
            ),
        ]
    }

    #[tokio::test]
    async fn test_every_kind_reads_back_as_created() {
        let fake = FakeHumio::new().with_repository("ops");
        let client = fake.client();

        for wanted in every_kind() {
            let created = client.actions().create("ops", &wanted).await.unwrap();
            assert!(!created.id.is_empty());
            let fetched = client.actions().get("ops", &wanted.name).await.unwrap();
            assert_eq!(fetched, created);
        }
        assert_eq!(client.actions().list("ops").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_email_omits_empty_templates() {
        let fake = FakeHumio::new().with_repository("ops");
        let client = fake.client();

        let mail = action(
            "mail",
            ActionKind::Email(EmailAction {
                recipients: vec!["a@example.com".to_string()],
                subject_template: Some(String::new()),
                ..Default::default()
            }),
        );
        client.actions().create("ops", &mail).await.unwrap();

        let request = fake.requests().pop().unwrap();
        assert_eq!(request.operation_name(), "CreateEmailAction");
        assert!(request.variables.get("SubjectTemplate").is_none());
        assert!(request.variables.get("BodyTemplate").is_none());
        assert_eq!(request.variables.get("UseProxy"), Some(&Value::Bool(false)));
    }

    #[tokio::test]
    async fn test_unknown_typename_is_unsupported() {
        let fake = FakeHumio::new().with_repository("ops");
        fake.insert_raw_action(
            "ops",
            json!({"__typename": "UploadFileAction", "id": "a-1", "name": "upload"}),
        );

        let err = fake.client().actions().list("ops").await.unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedType(_)));
    }

    #[tokio::test]
    async fn test_update_recreates_with_new_id() {
        let fake = FakeHumio::new().with_repository("ops");
        let client = fake.client();

        let original = action(
            "pager",
            ActionKind::PagerDuty(PagerDutyAction {
                routing_key: "rk".to_string(),
                severity: "warning".to_string(),
                use_proxy: false,
            }),
        );
        let created = client.actions().create("ops", &original).await.unwrap();

        let changed = action(
            "pager",
            ActionKind::PagerDuty(PagerDutyAction {
                routing_key: "rk".to_string(),
                severity: "critical".to_string(),
                use_proxy: false,
            }),
        );
        let updated = client.actions().update("ops", &changed).await.unwrap();
        assert_ne!(updated.id, created.id);

        let fetched = client.actions().get("ops", "pager").await.unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn test_failed_recreate_leaves_no_action() {
        let fake = FakeHumio::new().with_repository("ops");
        let client = fake.client();

        let hook = every_kind().pop().unwrap();
        client.actions().create("ops", &hook).await.unwrap();
        fake.fail_operation("CreateWebhookAction", "url is not allowed");

        assert!(client.actions().update("ops", &hook).await.is_err());
        assert!(client
            .actions()
            .get("ops", "hook")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_kind_serializes_with_type_tag() {
        let kind = ActionKind::HumioRepo(HumioRepoAction {
            ingest_token: "t".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&kind).unwrap(),
            json!({"type": "humio_repo", "ingest_token": "t"})
        );
        assert_eq!(kind.typename(), "HumioRepoAction");
        assert!(ACTION_TYPES.contains(&"slack_post_message"));
    }

    struct EmptyPayload;

    #[async_trait::async_trait]
    impl Transport for EmptyPayload {
        async fn post(&self, _request: &GraphQlRequest) -> Result<HttpResponse, ProviderError> {
            Ok(HttpResponse::ok_json(&json!({"data": {}})))
        }
    }

    #[tokio::test]
    async fn test_create_without_payload_is_decode_error() {
        let client = Client::with_transport(EmptyPayload);
        let hook = every_kind().pop().unwrap();

        let err = client.actions().create("ops", &hook).await.unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
        assert!(err.to_string().contains("returned no payload"));
    }
}
