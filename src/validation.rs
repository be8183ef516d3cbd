//! Schema validation helpers.
//!
//! Validates a flat `serde_json::Value` state against a [`Schema`] before it is
//! turned into GraphQL variables, so malformed configuration fails with a
//! pointed diagnostic instead of a server round trip.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_humio::schema::{Schema, Attribute};
//! use hemmer_provider_humio::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("retention_days", Attribute::optional_float64().with_range(1.0, 365.0));
//!
//! assert!(validate(&schema, &json!({"name": "web", "retention_days": 30})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "web", "retention_days": 400}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("retention_days".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Constraint, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema, recursively through lists and objects
/// - Range and one-of constraints apply to present values
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object").with_detail(format!(
                    "Got {}",
                    value_type_name(other)
                )),
            );
            return diagnostics;
        }
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            // Constraints only make sense on a well-typed value.
            if diagnostics.len() == before {
                if let Some(constraint) = &attr.constraint {
                    validate_constraint(constraint, v, path, diagnostics);
                }
            }
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => match value.as_array() {
            Some(arr) => {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Object(fields) => match value.as_object() {
            Some(obj) => {
                for (name, field_type) in fields {
                    let field_path = format!("{}.{}", path, name);
                    match obj.get(name) {
                        Some(Value::Null) | None => diagnostics.push(
                            Diagnostic::error(format!("Missing object field '{}'", field_path))
                                .with_attribute(field_path),
                        ),
                        Some(v) => validate_attribute_type(field_type, v, &field_path, diagnostics),
                    }
                }
            }
            None => diagnostics.push(type_error(path, "object", value)),
        },
    }
}

fn validate_constraint(
    constraint: &Constraint,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match constraint {
        Constraint::Range { min, max } => {
            if let Some(n) = value.as_f64() {
                if n < *min || n > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Value out of range for '{}'", path))
                            .with_detail(format!("Expected {} to {}, got {}", min, max, n))
                            .with_attribute(path),
                    );
                }
            }
        }
        Constraint::OneOf(allowed) => {
            if let Some(s) = value.as_str() {
                if !allowed.iter().any(|a| a == s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Unsupported value for '{}'", path))
                            .with_detail(format!(
                                "Expected one of [{}], got \"{}\"",
                                allowed.join(", "),
                                s
                            ))
                            .with_attribute(path),
                    );
                }
            }
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        // is_i64 also holds for non-negative integers up to i64::MAX
        Value::Number(n) => n.is_i64(),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, value: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(value)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn webhook_schema() -> Schema {
        Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("throttle_time_millis", Attribute::required_int64())
            .with_attribute(
                "headers",
                Attribute::optional_list(AttributeType::object([
                    ("header", AttributeType::String),
                    ("value", AttributeType::String),
                ])),
            )
            .with_attribute(
                "method",
                Attribute::optional_string().with_one_of(["GET", "POST", "PUT"]),
            )
    }

    #[test]
    fn test_valid_state() {
        let state = json!({
            "name": "pager",
            "throttle_time_millis": 60000,
            "headers": [{"header": "X-Team", "value": "ops"}],
            "method": "POST"
        });
        assert!(is_valid(&webhook_schema(), &state));
        assert!(validate_result(&webhook_schema(), &state).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let diagnostics = validate(&webhook_schema(), &json!({"name": "pager"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].summary,
            "Missing required attribute 'throttle_time_millis'"
        );
    }

    #[test]
    fn test_computed_attribute_is_skipped() {
        let state = json!({"name": "pager", "throttle_time_millis": 1, "id": 42});
        assert!(is_valid(&webhook_schema(), &state));
    }

    #[test]
    fn test_wrong_types() {
        let state = json!({
            "name": 7,
            "throttle_time_millis": 1.5,
            "headers": [{"header": "X-Team"}]
        });
        let diagnostics = validate(&webhook_schema(), &state);
        let attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect();
        assert!(attributes.contains(&"name".to_string()));
        assert!(attributes.contains(&"throttle_time_millis".to_string()));
        assert!(attributes.contains(&"headers.0.value".to_string()));
    }

    #[test]
    fn test_one_of_constraint() {
        let state = json!({"name": "pager", "throttle_time_millis": 1, "method": "PATCH"});
        let diagnostics = validate(&webhook_schema(), &state);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("GET, POST, PUT")));
    }

    #[test]
    fn test_range_constraint_skipped_on_type_error() {
        let schema = Schema::v0().with_attribute(
            "retention_days",
            Attribute::optional_float64().with_range(1.0, 365.0),
        );
        let diagnostics = validate(&schema, &json!({"retention_days": "forever"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid type for 'retention_days'");

        assert!(is_valid(&schema, &json!({"retention_days": 365})));
        assert!(!is_valid(&schema, &json!({"retention_days": 0.5})));
    }

    #[test]
    fn test_non_object_state() {
        let diagnostics = validate(&webhook_schema(), &json!(["not", "an", "object"]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].detail, Some("Got array".to_string()));
    }
}
