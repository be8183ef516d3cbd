//! Hemmer Provider for Humio
//!
//! Manages Humio (LogScale) configuration through its GraphQL API:
//! repositories, alerts, notification actions, ingest tokens and parsers,
//! plus a data source for the user owning the API token.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **GraphQL client**: [`api::Client`] with typed operations per entity, over a
//!   pluggable [`api::Transport`] (HTTPS via `reqwest` by default)
//! - **Resource mappers**: flat host state to and from the typed records
//! - **ProviderService trait**: the host-facing entry points, implemented by
//!   [`HumioProvider`]
//! - **Schema types**: attribute schemas and validation with pointed diagnostics
//! - **Error types**: one [`ProviderError`] for transport, GraphQL and provider failures
//! - **Logging**: Integration with `tracing` for structured logging
//! - **Testing**: an in-memory Humio backend and a provider test harness
//!
//! # Quick Start
//!
//! ```no_run
//! use hemmer_provider_humio::{HumioProvider, ProviderService};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), hemmer_provider_humio::ProviderError> {
//! let provider = HumioProvider::new();
//! provider
//!     .configure(json!({
//!         "address": "https://cloud.humio.com",
//!         "api_token": "my-token",
//!     }))
//!     .await?;
//!
//! let plan = provider
//!     .plan("humio_repository", None, json!({"name": "web", "retention_days": 30}))
//!     .await?;
//! let state = provider.create("humio_repository", plan.planned_state).await?;
//! assert_eq!(state["id"], "web");
//! # Ok(())
//! # }
//! ```
//!
//! # Resource Types
//!
//! | Type                 | Identifier            | Update                 |
//! |----------------------|-----------------------|------------------------|
//! | `humio_repository`   | `<name>`              | in place               |
//! | `humio_alert`        | `<repository>+<name>` | delete, then recreate  |
//! | `humio_action`       | `<repository>+<name>` | delete, then recreate  |
//! | `humio_ingest_token` | `<repository>+<name>` | in place               |
//! | `humio_parser`       | `<repository>+<name>` | delete, then recreate  |
//!
//! Delete-then-recreate updates are not atomic: if the create fails, the
//! resource is gone and a warning is logged.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use api::Client;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::HumioProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
