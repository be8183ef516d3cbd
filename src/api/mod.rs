//! Typed client for the Humio GraphQL API.
//!
//! [`Client`] owns the transport; the per-entity handles
//! ([`Repositories`], [`Alerts`], [`Actions`], [`IngestTokens`], [`Parsers`],
//! [`Users`]) borrow it and translate between typed records and the nested
//! GraphQL shapes.
//!
//! Lookups by name list every entity in scope and scan linearly. Alerts,
//! actions and parsers have no usable in-place update, so their `update`
//! deletes the existing entity and creates a new one: a failure between the two
//! calls leaves nothing behind, and the recreated entity has a new ID.

mod actions;
mod alerts;
mod client;
mod ingest_tokens;
mod parsers;
mod repositories;
mod users;

pub use actions::{
    Action, ActionKind, Actions, EmailAction, HttpHeader, HumioRepoAction, OpsGenieAction,
    PagerDutyAction, SlackAction, SlackField, SlackPostMessageAction, VictorOpsAction,
    WebhookAction, ACTION_TYPES,
};
pub use alerts::{Alert, Alerts, QueryOwnershipType};
pub use client::{
    graphql_endpoint, operation_name, Client, GraphQlRequest, HttpResponse, HttpTransport,
    Transport, Variables,
};
pub use ingest_tokens::{IngestToken, IngestTokens};
pub use parsers::{Parser, Parsers};
pub use repositories::{Repositories, Repository, DELETE_REASON};
pub use users::{User, Users};

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Treat an empty string as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
