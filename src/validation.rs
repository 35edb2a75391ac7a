//! Required-property validation
//!
//! [`validate`] is the lenient check the editor runs inline: it only reports
//! required properties that are missing, where "missing" follows form
//! semantics (an empty string or a `false` toggle counts as unset).
//! [`validate_strict`] runs full JSON Schema validation on the exported
//! schema instead.

use std::collections::BTreeMap;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use tracing::warn;

use crate::catalog::{ordered_properties, PropertyDef};
use crate::path::join_path;
use crate::schema::NodeSchema;

/// Names of missing required properties, dot-joined for nested objects, in
/// schema property order
pub fn validate(schema: &NodeSchema, value: Option<&Value>) -> Vec<String> {
    let mut missing = Vec::new();
    collect_missing(&schema.properties, value, "", &mut missing);
    missing
}

fn collect_missing(properties: &BTreeMap<String, PropertyDef>, value: Option<&Value>, prefix: &str, missing: &mut Vec<String>) {
    for (name, property) in ordered_properties(properties) {
        let field = value.and_then(|v| v.get(name));
        let path = join_path(prefix, name);

        if let Some(nested) = property.properties.as_ref().filter(|_| property.is_object()) {
            if property.required && matches!(field, None | Some(Value::Null)) {
                missing.push(path);
            } else {
                collect_missing(nested, field, &path, missing);
            }
            continue;
        }

        if !property.required {
            continue;
        }

        let is_missing = if property.is_array() {
            match field {
                None | Some(Value::Null) => true,
                Some(Value::Array(items)) => items.is_empty(),
                Some(_) => false,
            }
        } else {
            property.default.is_none() && is_falsy(field)
        };

        if is_missing {
            missing.push(path);
        }
    }
}

fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}

/// Human readable summary of [`validate`] output
pub fn format_missing(missing: &[String]) -> String {
    match missing {
        [] => String::new(),
        [one] => format!("Missing required property: {}", one),
        many => format!("Missing required properties: {}", many.join(", ")),
    }
}

/// Validate against the node schema as JSON Schema (Draft 7).
///
/// Returns one `<instance path>: <message>` line per violation. A schema that
/// does not compile yields no messages.
pub fn validate_strict(schema: &NodeSchema, value: &Value) -> Vec<String> {
    let json_schema = schema.to_json_schema();
    let compiled = match JSONSchema::options().with_draft(Draft::Draft7).compile(&json_schema) {
        Ok(compiled) => compiled,
        Err(err) => {
            warn!(%err, title = ?schema.title, "node schema does not compile, skipping strict validation");
            return Vec::new();
        }
    };

    // bound so the error iterator's borrow of `compiled` ends before it drops
    let messages = match compiled.validate(value) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.map(|e| format!("{}: {}", e.instance_path, e)).collect(),
    };
    messages
}
