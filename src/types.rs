//! Plan and import result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The attribute that changed.
    pub path: String,
    /// The value before the change (None if added).
    pub before: Option<Value>,
    /// The value after the change (None if removed).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }

    /// Classify the transition between two optional values; `None` if equal.
    ///
    /// `null` and absent are the same thing.
    pub fn between(path: &str, before: Option<&Value>, after: Option<&Value>) -> Option<Self> {
        let before = before.filter(|v| !v.is_null());
        let after = after.filter(|v| !v.is_null());
        match (before, after) {
            (None, None) => None,
            (None, Some(a)) => Some(Self::added(path, a.clone())),
            (Some(b), None) => Some(Self::removed(path, b.clone())),
            (Some(b), Some(a)) if same_value(b, a) => None,
            (Some(b), Some(a)) => Some(Self::modified(path, b.clone(), a.clone())),
        }
    }
}

/// Structural equality where numbers compare by value, so `7` equals `7.0`.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| same_value(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| same_value(v, w)))
        }
        _ => a == b,
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Resource and data source type names served by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("test"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("test")));

        let removed = AttributeChange::removed("name", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("retention_days", json!(7), json!(30));
        assert_eq!(modified.before, Some(json!(7)));
        assert_eq!(modified.after, Some(json!(30)));
    }

    #[test]
    fn test_between_treats_null_as_absent() {
        let null = Value::Null;
        assert_eq!(AttributeChange::between("x", Some(&null), None), None);
        assert_eq!(AttributeChange::between("x", Some(&json!(1)), Some(&json!(1))), None);
        assert_eq!(
            AttributeChange::between("x", Some(&null), Some(&json!("a"))),
            Some(AttributeChange::added("x", json!("a")))
        );
        assert_eq!(
            AttributeChange::between("x", Some(&json!("a")), Some(&null)),
            Some(AttributeChange::removed("x", json!("a")))
        );
    }

    #[test]
    fn test_between_compares_numbers_by_value() {
        assert_eq!(AttributeChange::between("days", Some(&json!(7.0)), Some(&json!(7))), None);
        assert_eq!(
            AttributeChange::between("xs", Some(&json!([{"n": 1.0}])), Some(&json!([{"n": 1}]))),
            None
        );
        assert_eq!(
            AttributeChange::between("days", Some(&json!(7.0)), Some(&json!(8))),
            Some(AttributeChange::modified("days", json!(7.0), json!(8)))
        );
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "web"}));
        assert!(no_change.changes.is_empty());
        assert!(!no_change.requires_replace);

        let with_changes = PlanResult::with_changes(
            json!({"id": "web", "description": "new"}),
            vec![AttributeChange::modified("description", json!("old"), json!("new"))],
            false,
        );
        assert_eq!(with_changes.changes.len(), 1);
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("humio_repository", json!({"id": "web"}));
        assert_eq!(imported.resource_type, "humio_repository");
        assert_eq!(imported.state["id"], "web");
    }
}
