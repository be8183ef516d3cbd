//! Testing utilities.
//!
//! [`FakeHumio`] is an in-memory Humio backend that answers the GraphQL
//! operations this crate sends, so mappers and the provider can be exercised
//! without a cluster. [`ProviderTester`] drives any [`ProviderService`]
//! through its lifecycle.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_humio::testing::{FakeHumio, ProviderTester};
//! use hemmer_provider_humio::HumioProvider;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let fake = FakeHumio::new();
//! let tester = ProviderTester::new(HumioProvider::with_client(fake.client()));
//!
//! let state = tester
//!     .lifecycle_create("humio_repository", json!({"name": "web", "retention_days": 30}))
//!     .await
//!     .unwrap();
//! assert_eq!(state["id"], "web");
//! # });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::{Client, GraphQlRequest, HttpResponse, Transport, User, Variables};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

// =========================================================================
// In-memory backend
// =========================================================================

/// Variable-to-field mapping of each action kind, keyed by `__typename`.
const ACTION_FIELDS: &[(&str, &[(&str, &str)])] = &[
    (
        "EmailAction",
        &[
            ("Recipients", "recipients"),
            ("SubjectTemplate", "subjectTemplate"),
            ("BodyTemplate", "emailBodyTemplate"),
            ("UseProxy", "emailUseProxy"),
        ],
    ),
    ("HumioRepoAction", &[("IngestToken", "ingestToken")]),
    (
        "OpsGenieAction",
        &[
            ("ApiUrl", "apiUrl"),
            ("GenieKey", "genieKey"),
            ("UseProxy", "opsGenieUseProxy"),
        ],
    ),
    (
        "PagerDutyAction",
        &[
            ("RoutingKey", "routingKey"),
            ("Severity", "severity"),
            ("UseProxy", "pagerDutyUseProxy"),
        ],
    ),
    (
        "SlackAction",
        &[
            ("Url", "url"),
            ("Fields", "fields"),
            ("UseProxy", "slackUseProxy"),
        ],
    ),
    (
        "SlackPostMessageAction",
        &[
            ("ApiToken", "apiToken"),
            ("Channels", "channels"),
            ("Fields", "fields"),
            ("UseProxy", "useProxy"),
        ],
    ),
    (
        "VictorOpsAction",
        &[
            ("MessageType", "messageType"),
            ("NotifyUrl", "notifyUrl"),
            ("UseProxy", "victorOpsUseProxy"),
        ],
    ),
    (
        "WebhookAction",
        &[
            ("Method", "method"),
            ("Url", "webhookUrl"),
            ("Headers", "headers"),
            ("BodyTemplate", "webhookBodyTemplate"),
            ("IgnoreSSL", "ignoreSSL"),
            ("UseProxy", "webhookUseProxy"),
        ],
    ),
];

#[derive(Debug, Default)]
struct FakeRepository {
    id: String,
    description: String,
    retention_days: Option<f64>,
    alerts: Vec<Value>,
    actions: Vec<Value>,
    tokens: Vec<FakeToken>,
    parsers: Vec<FakeParser>,
}

#[derive(Debug)]
struct FakeToken {
    name: String,
    token: String,
    parser: Option<String>,
}

impl FakeToken {
    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "token": self.token,
            "parser": self.parser.as_ref().map(|name| json!({"name": name})),
        })
    }
}

#[derive(Debug)]
struct FakeParser {
    id: String,
    name: String,
    script: String,
    test_cases: Value,
    fields_to_tag: Value,
    built_in: bool,
}

#[derive(Debug)]
struct FakeState {
    next_id: u64,
    repositories: BTreeMap<String, FakeRepository>,
    current_user: User,
    failures: HashMap<String, String>,
    requests: Vec<GraphQlRequest>,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn repository(&mut self, name: &str) -> Result<&mut FakeRepository, String> {
        self.repositories
            .get_mut(name)
            .ok_or_else(|| format!("Could not find search domain '{}'", name))
    }
}

/// In-memory Humio GraphQL backend.
///
/// Clones share state, so a test can keep one handle for inspection while a
/// [`Client`] built from [`FakeHumio::client`] drives it.
#[derive(Debug, Clone)]
pub struct FakeHumio {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeHumio {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHumio {
    /// An empty cluster whose API token belongs to a root user.
    pub fn new() -> Self {
        let current_user = User {
            id: "user-1".to_string(),
            username: "admin".to_string(),
            full_name: "Humio Admin".to_string(),
            email: "admin@example.com".to_string(),
            is_root: true,
        };
        Self {
            state: Arc::new(Mutex::new(FakeState {
                next_id: 100,
                repositories: BTreeMap::new(),
                current_user,
                failures: HashMap::new(),
                requests: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an empty repository.
    pub fn with_repository(self, name: &str) -> Self {
        {
            let mut state = self.lock();
            let id = state.next_id("repo");
            state.repositories.insert(
                name.to_string(),
                FakeRepository {
                    id,
                    ..Default::default()
                },
            );
        }
        self
    }

    /// Seed a built-in parser, which listings report but mappers skip.
    pub fn with_built_in_parser(self, repository: &str, name: &str) -> Self {
        {
            let mut state = self.lock();
            let id = state.next_id("parser");
            if let Some(repo) = state.repositories.get_mut(repository) {
                repo.parsers.push(FakeParser {
                    id,
                    name: name.to_string(),
                    script: String::new(),
                    test_cases: json!([]),
                    fields_to_tag: json!([]),
                    built_in: true,
                });
            }
        }
        self
    }

    /// Replace the user the API token belongs to.
    pub fn with_current_user(self, user: User) -> Self {
        self.lock().current_user = user;
        self
    }

    /// The user the API token belongs to.
    pub fn current_user(&self) -> User {
        self.lock().current_user.clone()
    }

    /// Insert a list entry verbatim into a search domain's actions.
    pub fn insert_raw_action(&self, repository: &str, action: Value) {
        if let Some(repo) = self.lock().repositories.get_mut(repository) {
            repo.actions.push(action);
        }
    }

    /// Make every later request for `operation` fail with a GraphQL error.
    pub fn fail_operation(&self, operation: &str, message: &str) {
        self.lock()
            .failures
            .insert(operation.to_string(), message.to_string());
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<GraphQlRequest> {
        self.lock().requests.clone()
    }

    /// Names of the operations received so far, oldest first.
    pub fn operations(&self) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .map(|r| r.operation_name().to_string())
            .collect()
    }

    /// A client backed by this fake.
    pub fn client(&self) -> Client {
        Client::with_transport(self.clone())
    }
}

#[async_trait]
impl Transport for FakeHumio {
    async fn post(&self, request: &GraphQlRequest) -> Result<HttpResponse, ProviderError> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        let operation = request.operation_name();
        let result = match state.failures.get(operation).cloned() {
            Some(message) => Err(message),
            None => handle(&mut state, operation, &request.variables),
        };

        Ok(match result {
            Ok(data) => HttpResponse::ok_json(&json!({ "data": data })),
            Err(message) => HttpResponse::ok_json(&json!({
                "data": null,
                "errors": [{"message": message, "path": [lower_first(operation)]}],
            })),
        })
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn string_var(vars: &Variables, name: &str) -> Result<String, String> {
    vars.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("Variable '{}' of type String! was not provided", name))
}

fn var_or_null(vars: &Variables, name: &str) -> Value {
    vars.get(name).cloned().unwrap_or(Value::Null)
}

fn ensure_unique(entries: &[Value], name: &str, kind: &str) -> Result<(), String> {
    if entries.iter().any(|e| e["name"] == name) {
        return Err(format!("An {} with the name '{}' already exists", kind, name));
    }
    Ok(())
}

fn remove_by_id(entries: &mut Vec<Value>, id: &str, kind: &str) -> Result<(), String> {
    let before = entries.len();
    entries.retain(|e| e["id"] != id);
    if entries.len() == before {
        return Err(format!("Could not find {} with id '{}'", kind, id));
    }
    Ok(())
}

fn handle(state: &mut FakeState, operation: &str, vars: &Variables) -> Result<Value, String> {
    match operation {
        "ListRepositories" => {
            let repositories: Vec<Value> = state
                .repositories
                .iter()
                .map(|(name, repo)| json!({"id": repo.id, "name": name}))
                .collect();
            Ok(json!({ "repositories": repositories }))
        }
        "GetRepository" => {
            let name = string_var(vars, "RepositoryName")?;
            let repo = state.repository(&name)?;
            Ok(json!({
                "repository": {
                    "id": repo.id,
                    "name": name,
                    "description": repo.description,
                    "timeBasedRetention": repo.retention_days,
                }
            }))
        }
        "CreateRepository" => {
            let name = string_var(vars, "Name")?;
            if state.repositories.contains_key(&name) {
                return Err(format!("A repository with the name '{}' already exists", name));
            }
            let id = state.next_id("repo");
            state.repositories.insert(
                name,
                FakeRepository {
                    id,
                    ..Default::default()
                },
            );
            Ok(json!({"createRepository": {"__typename": "CreateRepositoryMutation"}}))
        }
        "UpdateDescription" => {
            let name = string_var(vars, "RepositoryName")?;
            let description = string_var(vars, "Description")?;
            state.repository(&name)?.description = description;
            Ok(json!({"updateDescriptionForSearchDomain": {"__typename": "UpdateDescriptionMutation"}}))
        }
        "UpdateTimeBasedRetention" => {
            let name = string_var(vars, "RepositoryName")?;
            let repo = state.repository(&name)?;
            repo.retention_days = vars.get("RetentionDays").and_then(Value::as_f64);
            Ok(json!({
                "updateRetention": {
                    "repository": {
                        "id": repo.id,
                        "name": name,
                        "timeBasedRetention": repo.retention_days,
                    }
                }
            }))
        }
        "DeleteRepository" => {
            let name = string_var(vars, "RepositoryName")?;
            string_var(vars, "Reason")?;
            state
                .repositories
                .remove(&name)
                .ok_or_else(|| format!("Could not find search domain '{}'", name))?;
            Ok(json!({"deleteSearchDomain": {"result": true}}))
        }
        "ListAlerts" => {
            let domain = string_var(vars, "SearchDomainName")?;
            let alerts = state.repository(&domain)?.alerts.clone();
            Ok(json!({"searchDomain": {"alerts": alerts}}))
        }
        "CreateAlert" => {
            let domain = string_var(vars, "SearchDomainName")?;
            let name = string_var(vars, "Name")?;
            let id = state.next_id("alert");
            let ownership_id = state.next_id("ownership");
            let current_user = state.current_user.id.clone();

            let ownership = match vars.get("QueryOwnershipType").and_then(Value::as_str) {
                Some("User") => {
                    let user = vars
                        .get("RunAsUserID")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or(current_user);
                    json!({"id": ownership_id, "user": {"id": user}})
                }
                _ => json!({"id": ownership_id}),
            };
            let entry = json!({
                "id": id,
                "name": name,
                "description": var_or_null(vars, "Description"),
                "queryString": string_var(vars, "QueryString")?,
                "queryStart": string_var(vars, "QueryStart")?,
                "throttleField": var_or_null(vars, "ThrottleField"),
                "throttleTimeMillis": var_or_null(vars, "ThrottleTimeMillis"),
                "enabled": var_or_null(vars, "Enabled"),
                "actions": var_or_null(vars, "Actions"),
                "labels": var_or_null(vars, "Labels"),
                "queryOwnership": ownership,
            });

            let repo = state.repository(&domain)?;
            ensure_unique(&repo.alerts, &name, "alert")?;
            repo.alerts.push(entry);
            Ok(json!({"createAlert": {"id": id, "name": name}}))
        }
        "DeleteAlert" => {
            let domain = string_var(vars, "SearchDomainName")?;
            let id = string_var(vars, "AlertID")?;
            remove_by_id(&mut state.repository(&domain)?.alerts, &id, "alert")?;
            Ok(json!({"deleteAlert": true}))
        }
        "ListActions" => {
            let domain = string_var(vars, "SearchDomainName")?;
            let actions = state.repository(&domain)?.actions.clone();
            Ok(json!({"searchDomain": {"actions": actions}}))
        }
        "DeleteAction" => {
            let domain = string_var(vars, "SearchDomainName")?;
            let id = string_var(vars, "ActionID")?;
            remove_by_id(&mut state.repository(&domain)?.actions, &id, "action")?;
            Ok(json!({"deleteAction": true}))
        }
        op if op.starts_with("Create") && op.ends_with("Action") => {
            let typename = &op["Create".len()..];
            let fields = ACTION_FIELDS
                .iter()
                .find(|(t, _)| *t == typename)
                .map(|(_, fields)| *fields)
                .ok_or_else(|| format!("Unknown action type {}", typename))?;

            let domain = string_var(vars, "SearchDomainName")?;
            let name = string_var(vars, "Name")?;
            let id = state.next_id("action");

            let mut entry = Map::new();
            entry.insert("__typename".to_string(), json!(typename));
            entry.insert("id".to_string(), json!(id));
            entry.insert("name".to_string(), json!(name));
            for (var, field) in fields {
                entry.insert(field.to_string(), var_or_null(vars, var));
            }

            let repo = state.repository(&domain)?;
            ensure_unique(&repo.actions, &name, "action")?;
            repo.actions.push(Value::Object(entry));

            let mut data = Map::new();
            data.insert(lower_first(op), json!({"id": id, "name": name}));
            Ok(Value::Object(data))
        }
        "ListIngestTokens" => {
            let name = string_var(vars, "RepositoryName")?;
            let tokens: Vec<Value> = state
                .repository(&name)?
                .tokens
                .iter()
                .map(FakeToken::to_json)
                .collect();
            Ok(json!({"repository": {"ingestTokens": tokens}}))
        }
        "AddIngestToken" => {
            let repository = string_var(vars, "RepositoryName")?;
            let name = string_var(vars, "Name")?;
            let token = FakeToken {
                token: state.next_id("token"),
                name,
                parser: vars.get("Parser").and_then(Value::as_str).map(str::to_string),
            };
            let repo = state.repository(&repository)?;
            if repo.tokens.iter().any(|t| t.name == token.name) {
                return Err(format!("An ingest token named '{}' already exists", token.name));
            }
            let created = token.to_json();
            repo.tokens.push(token);
            Ok(json!({"addIngestTokenV3": created}))
        }
        "AssignParser" | "UnassignParser" => {
            let repository = string_var(vars, "RepositoryName")?;
            let name = string_var(vars, "TokenName")?;
            let parser = match operation {
                "AssignParser" => Some(string_var(vars, "ParserName")?),
                _ => None,
            };
            let token = state
                .repository(&repository)?
                .tokens
                .iter_mut()
                .find(|t| t.name == name)
                .ok_or_else(|| format!("Could not find ingest token '{}'", name))?;
            token.parser = parser;

            let field = match operation {
                "AssignParser" => "assignParserToIngestToken",
                _ => "unassignParserFromIngestToken",
            };
            let mut data = Map::new();
            data.insert(field.to_string(), token.to_json());
            Ok(Value::Object(data))
        }
        "RemoveIngestToken" => {
            let repository = string_var(vars, "RepositoryName")?;
            let name = string_var(vars, "Name")?;
            let repo = state.repository(&repository)?;
            let before = repo.tokens.len();
            repo.tokens.retain(|t| t.name != name);
            if repo.tokens.len() == before {
                return Err(format!("Could not find ingest token '{}'", name));
            }
            Ok(json!({"removeIngestToken": {"__typename": "BooleanResultType"}}))
        }
        "ListParsers" => {
            let repository = string_var(vars, "RepositoryName")?;
            let parsers: Vec<Value> = state
                .repository(&repository)?
                .parsers
                .iter()
                .map(|p| json!({"id": p.id, "name": p.name, "isBuiltIn": p.built_in}))
                .collect();
            Ok(json!({"repository": {"parsers": parsers}}))
        }
        "GetParser" => {
            let repository = string_var(vars, "RepositoryName")?;
            let name = string_var(vars, "ParserName")?;
            let parser = state
                .repository(&repository)?
                .parsers
                .iter()
                .find(|p| p.name == name)
                .map(|p| {
                    json!({
                        "id": p.id,
                        "name": p.name,
                        "script": p.script,
                        "testCases": p.test_cases,
                        "fieldsToTag": p.fields_to_tag,
                    })
                });
            Ok(json!({"repository": {"parser": parser}}))
        }
        "CreateParser" => {
            let repository = string_var(vars, "RepositoryName")?;
            let name = string_var(vars, "Name")?;
            let script = string_var(vars, "Script")?;
            if !vars
                .get("FieldsToBeRemovedBeforeParsing")
                .is_some_and(Value::is_array)
            {
                return Err("Variable 'FieldsToBeRemovedBeforeParsing' was not provided".to_string());
            }
            let id = state.next_id("parser");
            let repo = state.repository(&repository)?;
            if repo.parsers.iter().any(|p| p.name == name) {
                return Err(format!("A parser named '{}' already exists", name));
            }
            repo.parsers.push(FakeParser {
                id: id.clone(),
                name: name.clone(),
                script,
                test_cases: var_or_null(vars, "TestCases"),
                fields_to_tag: var_or_null(vars, "FieldsToTag"),
                built_in: false,
            });
            Ok(json!({"createParserV2": {"id": id, "name": name}}))
        }
        "DeleteParser" => {
            let repository = string_var(vars, "RepositoryName")?;
            let id = string_var(vars, "ParserID")?;
            let repo = state.repository(&repository)?;
            let before = repo.parsers.len();
            repo.parsers.retain(|p| p.id != id);
            if repo.parsers.len() == before {
                return Err(format!("Could not find parser with id '{}'", id));
            }
            Ok(json!({"deleteParser": {"__typename": "BooleanResultType"}}))
        }
        "CurrentUser" => {
            let user = serde_json::to_value(&state.current_user).map_err(|e| e.to_string())?;
            Ok(json!({ "currentUser": user }))
        }
        other => Err(format!("Unknown operation '{}'", other)),
    }
}

// =========================================================================
// Provider harness
// =========================================================================

/// A test harness for [`ProviderService`] implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Validate provider configuration.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider.plan(resource_type, None, proposed_state).await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), proposed_state)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read data from a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// Run a full create lifecycle: plan, create, read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan, update, read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read(resource_type, updated_state).await
    }

    /// Run a full CRUD lifecycle: create, read, update, read, delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;
        let updated_state = self
            .lifecycle_update(resource_type, created_state, updated_config)
            .await?;
        self.delete(resource_type, updated_state.clone()).await?;
        Ok(updated_state)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HumioProvider;
    use pretty_assertions::assert_eq;

    fn tester(fake: &FakeHumio) -> ProviderTester<HumioProvider> {
        ProviderTester::new(HumioProvider::with_client(fake.client()))
    }

    #[tokio::test]
    async fn test_fake_reports_failures_as_graphql_errors() {
        let fake = FakeHumio::new();
        fake.fail_operation("ListRepositories", "boom");

        let err = fake.client().repositories().list().await.unwrap_err();
        match err {
            ProviderError::GraphQl(errors) => {
                assert_eq!(errors[0].message, "boom");
                assert_eq!(
                    errors[0].path,
                    Some(vec![Value::String("listRepositories".to_string())])
                );
            }
            other => panic!("expected GraphQL error, got {:?}", other),
        }

        fake.clear_failures();
        assert!(fake.client().repositories().list().await.unwrap().is_empty());
        assert_eq!(fake.operations(), vec!["ListRepositories", "ListRepositories"]);
    }

    #[tokio::test]
    async fn test_fake_rejects_unknown_search_domain() {
        let fake = FakeHumio::new();
        let err = fake.client().alerts().list("missing").await.unwrap_err();
        assert!(err.to_string().contains("Could not find search domain 'missing'"));
    }

    #[tokio::test]
    async fn test_tester_types() {
        let fake = FakeHumio::new();
        let tester = tester(&fake);
        assert!(tester
            .resource_types()
            .contains(&"humio_repository".to_string()));
        assert_eq!(tester.data_source_types(), vec!["humio_user".to_string()]);
        assert!(tester.schema().resources.contains_key("humio_parser"));
    }

    #[tokio::test]
    async fn test_tester_lifecycle_crud() {
        let fake = FakeHumio::new();
        let tester = tester(&fake);

        let final_state = tester
            .lifecycle_crud(
                "humio_repository",
                json!({"name": "web", "description": "initial"}),
                json!({"name": "web", "description": "updated"}),
            )
            .await
            .unwrap();

        assert_eq!(final_state["description"], "updated");
        assert!(fake.client().repositories().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tester_validate_resource_config() {
        let fake = FakeHumio::new();
        let tester = tester(&fake);

        tester
            .validate_resource_config("humio_repository", json!({"name": "web"}))
            .await
            .unwrap();

        match tester
            .validate_resource_config("humio_repository", json!({"name": "web", "retention_days": 0}))
            .await
        {
            Err(TestError::Diagnostics(diags)) => {
                assert_error_contains(&diags, "retention_days");
            }
            other => panic!("expected diagnostics, got {:?}", other),
        }
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Invalid configuration value")];
        assert_error_contains(&diagnostics, "Invalid");
        assert_error_contains(&diagnostics, "configuration");
    }

    #[test]
    #[should_panic(expected = "Expected plan to require replacement")]
    fn test_assert_plan_replaces_fails() {
        assert_plan_replaces(&PlanResult::no_change(json!({})));
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("field1"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("field1"));
        assert!(display.contains("More info"));
    }
}
