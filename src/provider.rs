//! The Humio provider.
//!
//! [`HumioProvider`] routes each host call to the [`ResourceMapper`] or
//! [`DataSourceMapper`] registered for the type name, holding the GraphQL
//! [`Client`] that `configure` builds.

use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::api::Client;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::{self, DataSourceMapper, ResourceMapper};
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation::{validate, validate_result};

/// Provider for Humio repositories, alerts, actions, ingest tokens and parsers.
pub struct HumioProvider {
    client: RwLock<Option<Client>>,
    resources: Vec<Box<dyn ResourceMapper>>,
    data_sources: Vec<Box<dyn DataSourceMapper>>,
}

impl HumioProvider {
    /// An unconfigured provider; call `configure` before any resource operation.
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            resources: resources::resources(),
            data_sources: resources::data_sources(),
        }
    }

    /// A provider already bound to `client`.
    pub fn with_client(client: Client) -> Self {
        let provider = Self::new();
        provider.set_client(Some(client));
        provider
    }

    fn set_client(&self, client: Option<Client>) {
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = client;
    }

    fn client(&self) -> Result<Client, ProviderError> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                ProviderError::Configuration(
                    "provider is not configured; call configure first".to_string(),
                )
            })
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn ResourceMapper, ProviderError> {
        self.resources
            .iter()
            .find(|r| r.type_name() == resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSourceMapper, ProviderError> {
        self.data_sources
            .iter()
            .find(|d| d.type_name() == data_source_type)
            .map(|d| d.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

impl Default for HumioProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill defaults and check `state` against `schema`, failing on the first
/// invalid planned state before anything goes over the wire.
fn validated(schema: &Schema, mut state: Value) -> Result<Value, ProviderError> {
    schema.apply_defaults(&mut state);
    validate_result(schema, &state).map_err(|diagnostics| {
        let summaries: Vec<&str> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        ProviderError::Validation(summaries.join("; "))
    })?;
    Ok(state)
}

fn plan_against(schema: &Schema, prior: Option<Value>, proposed: Value) -> PlanResult {
    let mut planned = proposed;
    schema.apply_defaults(&mut planned);

    let Some(prior) = prior else {
        let changes = planned
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| AttributeChange::added(k.as_str(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(planned, changes, false);
    };

    if let (Some(planned_obj), Some(prior_obj)) = (planned.as_object_mut(), prior.as_object()) {
        for (name, attr) in &schema.attributes {
            let unset = planned_obj.get(name).map_or(true, Value::is_null);
            if attr.flags.computed && unset {
                if let Some(value) = prior_obj.get(name) {
                    planned_obj.insert(name.clone(), value.clone());
                }
            }
        }
    }

    let changes: Vec<AttributeChange> = schema
        .attributes
        .iter()
        .filter(|(_, attr)| !attr.is_computed_only())
        .filter_map(|(name, _)| AttributeChange::between(name, prior.get(name), planned.get(name)))
        .collect();

    let requires_replace = schema
        .force_new_attributes()
        .any(|name| changes.iter().any(|change| change.path == name));

    // A replacement gets fresh server-assigned values.
    if requires_replace {
        if let Some(obj) = planned.as_object_mut() {
            for (name, attr) in &schema.attributes {
                if attr.is_computed_only() {
                    obj.remove(name);
                }
            }
        }
    }

    PlanResult::with_changes(planned, changes, requires_replace)
}

#[async_trait::async_trait]
impl ProviderService for HumioProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        let schema = self
            .resources
            .iter()
            .fold(schema, |s, r| s.with_resource(r.type_name(), r.schema()));
        self.data_sources
            .iter()
            .fold(schema, |s, d| s.with_data_source(d.type_name(), d.schema()))
    }

    #[instrument(skip(self, config), name = "provider.validate_provider_config")]
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(ProviderConfig::diagnostics(&config))
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!("Configure called");
        if !config.is_null() {
            let diagnostics = validate(&ProviderConfig::schema(), &config);
            if !diagnostics.is_empty() {
                warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                return Ok(diagnostics);
            }
        }

        match ProviderConfig::from_value(&config).and_then(|c| Client::new(&c)) {
            Ok(client) => {
                self.set_client(Some(client));
                info!("Configure completed successfully");
                Ok(Vec::new())
            }
            Err(e) => {
                error!(error = %e, "Configure failed");
                Ok(vec![e.into()])
            }
        }
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        info!("Stop called");
        self.set_client(None);
        Ok(())
    }

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let mapper = self.resource(resource_type)?;
        let diagnostics = validate(&mapper.schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(resource_type, diagnostics = diagnostics.len(), "ValidateResourceConfig completed with errors");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, prior_state, proposed_state), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        let mapper = self.resource(resource_type)?;
        let plan = plan_against(&mapper.schema(), prior_state, proposed_state);
        info!(
            resource_type,
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Plan completed"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let mapper = self.resource(resource_type)?;
        let client = self.client()?;
        let planned = validated(&mapper.schema(), planned_state)?;
        match mapper.create(&client, planned).await {
            Ok(state) => {
                info!(resource_type, id = ?state.get("id"), "Create completed");
                Ok(state)
            }
            Err(e) => {
                error!(resource_type, error = %e, "Create failed");
                Err(e)
            }
        }
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let mapper = self.resource(resource_type)?;
        let client = self.client()?;
        match mapper.read(&client, current_state).await {
            Ok(state) => {
                debug!(resource_type, "Read completed");
                Ok(state)
            }
            Err(e) if e.is_not_found() => {
                info!(resource_type, error = %e, "Read found no resource");
                Err(e)
            }
            Err(e) => {
                error!(resource_type, error = %e, "Read failed");
                Err(e)
            }
        }
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let mapper = self.resource(resource_type)?;
        let client = self.client()?;
        let planned = validated(&mapper.schema(), planned_state)?;
        match mapper.update(&client, prior_state, planned).await {
            Ok(state) => {
                info!(resource_type, id = ?state.get("id"), "Update completed");
                Ok(state)
            }
            Err(e) => {
                error!(resource_type, error = %e, "Update failed");
                Err(e)
            }
        }
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let mapper = self.resource(resource_type)?;
        let client = self.client()?;
        match mapper.delete(&client, current_state).await {
            Ok(()) => {
                info!(resource_type, "Delete completed");
                Ok(())
            }
            Err(e) => {
                error!(resource_type, error = %e, "Delete failed");
                Err(e)
            }
        }
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let mapper = self.resource(resource_type)?;
        let client = self.client()?;
        let state = mapper.import(&client, id).await.inspect_err(|e| {
            error!(resource_type, id, error = %e, "Import failed");
        })?;
        info!(resource_type, id, "Import completed");
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    #[instrument(skip(self, config), name = "provider.read_data_source")]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let mapper = self.data_source(data_source_type)?;
        let client = self.client()?;
        let state = mapper.read(&client, config).await.inspect_err(|e| {
            error!(data_source_type, error = %e, "ReadDataSource failed");
        })?;
        debug!(data_source_type, "ReadDataSource completed");
        Ok(state)
    }
}
