//! Path Resolver
//!
//! Paths are `.`-joined segments, each a field name or an array index:
//! `route.from.steps.0.choice.when.1`. The empty path addresses the
//! document root.
//!
//! Grouped node types use compound names (`camel-jbang-run`) whose `-`
//! separators stand in for nested real fields. [`to_real_path`] applies the
//! fixed conversion before a path is used to read or write the document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::VIRTUAL_NAMESPACE;
use crate::error::{FlowError, Result};

/// Node type that consumes from an endpoint URI
pub const CONSUMER_NODE: &str = "from";
/// Node type that produces to an endpoint URI
pub const PRODUCER_NODE: &str = "to";

/// One segment of a parsed path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSegment {
    pub is_index: bool,
    pub value: String,
}

impl PathSegment {
    pub fn new(value: &str) -> Self {
        Self {
            is_index: is_index(value),
            value: value.to_string(),
        }
    }

    pub fn index(&self) -> Option<usize> {
        if self.is_index {
            self.value.parse().ok()
        } else {
            None
        }
    }
}

/// Type name of a node and, for endpoint nodes, the component it targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAndComponent {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Split a path into segments, dropping empty ones
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(PathSegment::new)
        .collect()
}

/// Join segments back into a path string
pub fn join_segments(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(|s| s.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

/// Append a segment to a path; the empty path is the root
pub fn join_path(parent: &str, segment: impl std::fmt::Display) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}

/// Convert compound type names into the nested fields they stand for
pub fn to_real_path(path: &str) -> String {
    path.replace('-', ".")
}

/// Resolve the type name of the node at `path`, plus the component name for
/// endpoint nodes.
///
/// A trailing index climbs to the nearest named ancestor (`choice.when.0`
/// is a `when`). Two trailing indices cannot be resolved without guessing,
/// so they are reported as [`FlowError::UnresolvableType`].
pub fn resolve_type_and_component(path: &str, value: Option<&Value>) -> Result<TypeAndComponent> {
    let segments = parse_path(path);
    let unresolvable = || FlowError::UnresolvableType {
        path: path.to_string(),
    };

    if let [.., a, b] = segments.as_slice() {
        if a.is_index && b.is_index {
            return Err(unresolvable());
        }
    }

    let type_name = segments
        .iter()
        .rev()
        .find(|s| !s.is_index)
        .map(|s| s.value.clone())
        .ok_or_else(unresolvable)?;

    let component_name = if type_name == CONSUMER_NODE || type_name == PRODUCER_NODE {
        value.and_then(endpoint_uri).and_then(component_name_from_uri)
    } else {
        None
    };

    Ok(TypeAndComponent {
        type_name,
        component_name,
    })
}

fn endpoint_uri(value: &Value) -> Option<&str> {
    match value {
        Value::String(uri) => Some(uri),
        Value::Object(map) => map.get("uri").and_then(Value::as_str),
        _ => None,
    }
}

/// Extract the component name from a connection string.
///
/// `timer:tick?period=1000` yields `timer`; the virtual namespace keeps its
/// target, so `kamelet:beer-source?period=5` yields `kamelet:beer-source`.
pub fn component_name_from_uri(uri: &str) -> Option<String> {
    let prefix = format!("{}:", VIRTUAL_NAMESPACE);
    if let Some(rest) = uri.strip_prefix(&prefix) {
        let target = rest.split('?').next().unwrap_or_default();
        if target.is_empty() {
            return Some(VIRTUAL_NAMESPACE.to_string());
        }
        return Some(format!("{}{}", prefix, target));
    }

    uri.split(':')
        .next()
        .map(|name| name.split('?').next().unwrap_or(name))
        .filter(|name| !name.is_empty())
        .map(String::from)
}

/// Read the value at a real path
pub fn value_at<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    parse_path(path)
        .iter()
        .try_fold(document, |current, segment| match current {
            Value::Array(items) => segment.index().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(&segment.value),
            _ => None,
        })
}

/// Mutable variant of [`value_at`]
pub fn value_at_mut<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = document;
    for segment in parse_path(path) {
        current = match current {
            Value::Array(items) => items.get_mut(segment.index()?)?,
            Value::Object(map) => map.get_mut(&segment.value)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Get the array stored under `key` of the object at `parent`, creating it
/// when the key is missing or null. `None` when the parent is not an object
/// or the key holds something else.
pub fn ensure_array_at<'a>(document: &'a mut Value, parent: &str, key: &str) -> Option<&'a mut Vec<Value>> {
    let object = value_at_mut(document, parent)?.as_object_mut()?;
    let slot = object.entry(key.to_string()).or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
}

/// Remove a key while keeping the order of the remaining keys
pub fn remove_key_ordered(object: &mut Map<String, Value>, key: &str) -> Option<Value> {
    let mut removed = None;
    let rebuilt: Map<String, Value> = std::mem::take(object)
        .into_iter()
        .filter_map(|(k, v)| {
            if k == key {
                removed = Some(v);
                None
            } else {
                Some((k, v))
            }
        })
        .collect();
    *object = rebuilt;
    removed
}
