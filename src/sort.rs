//! Canonical Sorter
//!
//! Reorders object keys so that serialized documents are deterministic and
//! read the way the catalog declares them:
//!
//! - an object under a known type key follows that type's property `index`,
//!   unknown keys last, ties by name;
//! - `parameters` follows the endpoint component named by the sibling `uri`;
//! - anything else is sorted by name.
//!
//! Array element order is content and is never touched.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::catalog::{CatalogEntry, CatalogRegistry};
use crate::path::component_name_from_uri;
use crate::schema::PARAMETERS_PROPERTY;

/// Array property → type of its (unwrapped) elements
pub const ARRAY_ELEMENT_TYPES: &[(&str, &str)] = &[
    ("when", "when"),
    ("doCatch", "doCatch"),
    ("beans", "bean"),
    ("variables", "variable"),
];

fn array_element_type(property: &str) -> Option<&'static str> {
    ARRAY_ELEMENT_TYPES
        .iter()
        .find(|(name, _)| *name == property)
        .map(|(_, element)| *element)
}

pub struct CanonicalSorter<'a> {
    catalog: &'a CatalogRegistry,
}

impl<'a> CanonicalSorter<'a> {
    pub fn new(catalog: &'a CatalogRegistry) -> Self {
        Self { catalog }
    }

    /// Sort a document whose root carries no type of its own
    pub fn sort(&self, document: &Value) -> Value {
        self.sort_value(document, None)
    }

    /// Sort a value known to be of `type_name`
    pub fn sort_as(&self, value: &Value, type_name: &str) -> Value {
        self.sort_value(value, Some(type_name))
    }

    fn sort_value(&self, value: &Value, type_name: Option<&str>) -> Value {
        match value {
            Value::Object(map) => {
                let entry = type_name
                    .and_then(|name| self.catalog.find_entry(name))
                    .map(|(_, entry)| entry);
                self.sort_object(map, type_name, entry)
            }
            Value::Array(items) => Value::Array(items.iter().map(|item| self.sort_value(item, type_name)).collect()),
            other => other.clone(),
        }
    }

    fn sort_object(&self, map: &Map<String, Value>, type_name: Option<&str>, entry: Option<&CatalogEntry>) -> Value {
        let rank = |key: &str| entry.and_then(|e| e.property_index(key)).unwrap_or(u32::MAX);
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort_by(|a, b| match rank(a.as_str()).cmp(&rank(b.as_str())) {
            Ordering::Equal => a.cmp(b),
            other => other,
        });

        let mut sorted = Map::new();
        for key in keys {
            let value = &map[key.as_str()];
            let child = match (key.as_str(), value) {
                (PARAMETERS_PROPERTY, Value::Object(parameters)) => {
                    self.sort_object(parameters, None, self.endpoint_component(map))
                }
                (_, Value::Array(_)) => self.sort_value(value, array_element_type(key)),
                _ => match self.grouped_type(type_name, key) {
                    Some(compound) => self.sort_value(value, Some(compound.as_str())),
                    None => self.sort_value(value, Some(key.as_str())),
                },
            };
            sorted.insert(key.clone(), child);
        }
        Value::Object(sorted)
    }

    /// `camel` + `jbang` → `camel-jbang` when the compound name is a catalog entry
    fn grouped_type(&self, type_name: Option<&str>, key: &str) -> Option<String> {
        let group = type_name.filter(|name| self.catalog.is_group(name))?;
        let candidate = format!("{}-{}", group, key);
        self.catalog.find_entry(&candidate).map(|_| candidate)
    }

    /// Component entry targeted by the object's `uri`
    fn endpoint_component(&self, map: &Map<String, Value>) -> Option<&'a CatalogEntry> {
        let uri = map.get("uri").and_then(Value::as_str)?;
        let component = component_name_from_uri(uri)?;
        self.catalog.get_catalog_lookup(&component).entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogKind, CatalogMap};
    use serde_json::json;

    fn keys(value: &Value) -> Vec<&str> {
        value.as_object().unwrap().keys().map(String::as_str).collect()
    }

    fn registry() -> CatalogRegistry {
        let components: CatalogMap = serde_json::from_value(json!({
            "x": { "properties": { "a": { "index": 0 }, "b": { "index": 1 } } }
        }))
        .unwrap();
        let processors: CatalogMap = serde_json::from_value(json!({
            "log": {
                "properties": {
                    "message": { "index": 1 },
                    "id": { "index": 0 },
                    "logName": { "index": 2 }
                }
            },
            "when": {
                "properties": {
                    "expression": { "index": 0 },
                    "steps": { "index": 1 }
                }
            }
        }))
        .unwrap();
        CatalogRegistry::new()
            .with_catalog(CatalogKind::Component, components)
            .with_catalog(CatalogKind::Processor, processors)
    }

    #[test]
    fn test_parameters_follow_component_index() {
        let registry = registry();
        let sorted = CanonicalSorter::new(&registry).sort(&json!({ "to": { "parameters": { "b": 1, "a": 2 }, "uri": "x" } }));
        assert_eq!(keys(&sorted["to"]["parameters"]), vec!["a", "b"]);
        assert_eq!(keys(&sorted["to"]), vec!["parameters", "uri"]);
    }

    #[test]
    fn test_known_type_follows_index_unknown_keys_last() {
        let registry = registry();
        let doc = json!({ "log": { "zeta": 1, "message": "m", "alpha": 2, "id": "l1" } });
        let sorted = CanonicalSorter::new(&registry).sort(&doc);
        assert_eq!(keys(&sorted["log"]), vec!["id", "message", "alpha", "zeta"]);
    }

    #[test]
    fn test_arrays_keep_order_and_clauses_are_typed() {
        let registry = registry();
        let doc = json!({
            "choice": {
                "when": [ { "steps": [], "expression": "b" }, { "steps": [], "expression": "a" } ]
            }
        });
        let sorted = CanonicalSorter::new(&registry).sort(&doc);
        let when = sorted["choice"]["when"].as_array().unwrap();
        assert_eq!(when[0]["expression"], "b");
        assert_eq!(keys(&when[0]), vec!["expression", "steps"]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let registry = registry();
        let sorter = CanonicalSorter::new(&registry);
        let doc = json!({
            "z": { "log": { "message": "m", "id": "x" } },
            "a": [ { "to": { "uri": "x", "parameters": { "b": 1, "a": 2 } } } ]
        });
        let once = sorter.sort(&doc);
        let twice = sorter.sort(&once);
        assert_eq!(serde_json::to_string(&once).unwrap(), serde_json::to_string(&twice).unwrap());
        assert_eq!(keys(&once), vec!["a", "z"]);
    }

    #[test]
    fn test_grouped_type_follows_compound_index() {
        let actions: CatalogMap = serde_json::from_value(json!({
            "camel": {},
            "camel-jbang": { "group": "camel" },
            "camel-jbang-run": {
                "group": "camel-jbang",
                "properties": { "integration": { "index": 0 }, "autoRemove": { "index": 1 } }
            }
        }))
        .unwrap();
        let registry = CatalogRegistry::new().with_catalog(CatalogKind::TestAction, actions);
        let doc = json!({
            "actions": [ { "camel": { "jbang": { "run": { "autoRemove": true, "integration": { "file": "a.yaml" } } } } } ]
        });

        let sorted = CanonicalSorter::new(&registry).sort(&doc);
        let run = &sorted["actions"][0]["camel"]["jbang"]["run"];
        assert_eq!(keys(run), vec!["integration", "autoRemove"]);
    }

    #[test]
    fn test_sort_as_root_type() {
        let registry = registry();
        let sorted = CanonicalSorter::new(&registry).sort_as(&json!({ "message": "m", "id": "x" }), "log");
        assert_eq!(keys(&sorted), vec!["id", "message"]);
    }
}
