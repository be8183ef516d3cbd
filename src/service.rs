//! The host-facing provider trait.
//!
//! The infrastructure host drives a provider through [`ProviderService`]:
//! schema discovery, configuration, validation, planning and the CRUD calls
//! for each resource instance. States travel as flat JSON objects.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::validate;

/// Trait that provider implementations must implement.
///
/// # Example
///
/// ```
/// use hemmer_provider_humio::{async_trait, PlanResult, ProviderError, ProviderService};
/// use hemmer_provider_humio::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
/// use serde_json::Value;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ProviderService for Echo {
///     fn schema(&self) -> ProviderSchema {
///         ProviderSchema::new().with_resource(
///             "echo",
///             Schema::v0().with_attribute("name", Attribute::required_string()),
///         )
///     }
///
///     async fn configure(&self, _config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
///         Ok(vec![])
///     }
///
///     async fn plan(
///         &self,
///         _resource_type: &str,
///         _prior_state: Option<Value>,
///         proposed_state: Value,
///     ) -> Result<PlanResult, ProviderError> {
///         Ok(PlanResult::no_change(proposed_state))
///     }
///
///     async fn create(&self, _: &str, planned_state: Value) -> Result<Value, ProviderError> {
///         Ok(planned_state)
///     }
///
///     async fn read(&self, _: &str, current_state: Value) -> Result<Value, ProviderError> {
///         Ok(current_state)
///     }
///
///     async fn update(&self, _: &str, _: Value, planned: Value) -> Result<Value, ProviderError> {
///         Ok(planned)
///     }
///
///     async fn delete(&self, _: &str, _: Value) -> Result<(), ProviderError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Return the resource and data source type names.
    /// By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    /// By default, checks it against the provider config schema.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    /// By default, checks it against the resource schema.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let resource = schema.resources.get(resource_type).ok_or_else(|| {
            ProviderError::UnknownResource(resource_type.to_string())
        })?;
        Ok(validate(resource, &config))
    }

    /// Plan changes for a resource.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::UnknownResource(format!(
            "import not supported for {}",
            resource_type
        )))
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Read data from an external source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: Value,
    ) -> Result<Value, ProviderError> {
        Err(ProviderError::UnknownResource(data_source_type.to_string()))
    }
}
