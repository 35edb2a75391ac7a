//! Node schemas
//!
//! A node schema is assembled from catalog entries:
//!
//! 1. the type's own entry, merged with its group ancestors root to leaf so
//!    that closer groups overwrite same-named properties of farther ones;
//! 2. for endpoint nodes, the resolved component's properties nested under
//!    the reserved `parameters` property, filtered by direction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::catalog::{ordered_properties, CatalogEntry, CatalogRegistry, PropertyDef};
use crate::path::{CONSUMER_NODE, PRODUCER_NODE};

/// Reserved property that carries endpoint component options
pub const PARAMETERS_PROPERTY: &str = "parameters";

/// JSON Schema `type` keywords; catalog types outside this set are dropped
/// when exporting
const JSON_SCHEMA_TYPES: &[&str] = &["string", "number", "integer", "boolean", "object", "array", "null"];

/// Resolved schema of one node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
}

impl NodeSchema {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Overlay an entry onto this schema; the entry's properties win
    pub fn merge_entry(&mut self, entry: &CatalogEntry) {
        if entry.title.is_some() {
            self.title = entry.title.clone();
        }
        if entry.description.is_some() {
            self.description = entry.description.clone();
        }
        for (name, property) in &entry.properties {
            self.properties.insert(name.clone(), property.clone());
        }
    }

    /// Required property names in canonical order
    pub fn required(&self) -> Vec<&str> {
        ordered_properties(&self.properties)
            .into_iter()
            .filter(|(_, p)| p.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Export as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut schema = object_schema(&self.properties);
        if let (Some(title), Value::Object(map)) = (&self.title, &mut schema) {
            map.insert("title".to_string(), Value::String(title.clone()));
        }
        schema
    }
}

fn object_schema(properties: &BTreeMap<String, PropertyDef>) -> Value {
    let mut props = Map::new();
    let mut required = Vec::new();

    for (name, property) in ordered_properties(properties) {
        props.insert(name.clone(), property_schema(property));
        if property.required {
            required.push(Value::String(name.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": props,
        "required": required,
    })
}

fn property_schema(property: &PropertyDef) -> Value {
    let mut schema = match &property.properties {
        Some(nested) => object_schema(nested),
        None => Value::Object(Map::new()),
    };
    let Value::Object(map) = &mut schema else {
        return schema;
    };

    if let Some(kind) = property.property_type.as_deref() {
        if JSON_SCHEMA_TYPES.contains(&kind) {
            map.insert("type".to_string(), Value::String(kind.to_string()));
        }
    }
    if let Some(values) = &property.enum_values {
        map.insert("enum".to_string(), Value::Array(values.clone()));
    }
    if let Some(default) = &property.default {
        map.insert("default".to_string(), default.clone());
    }
    if let Some(description) = &property.description {
        map.insert("description".to_string(), Value::String(description.clone()));
    }
    schema
}

/// Builds node schemas from a catalog snapshot
pub struct SchemaResolver<'a> {
    catalog: &'a CatalogRegistry,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(catalog: &'a CatalogRegistry) -> Self {
        Self { catalog }
    }

    /// Schema for a node type, optionally bound to an endpoint component
    pub fn get_schema(&self, type_name: &str, component_name: Option<&str>) -> NodeSchema {
        let mut schema = self.grouped_schema(type_name);

        if let Some(component) = component_name {
            if let Some(parameters) = self.component_parameters(type_name, component) {
                let mut property = schema
                    .properties
                    .remove(PARAMETERS_PROPERTY)
                    .unwrap_or_else(|| PropertyDef {
                        index: next_index(&schema.properties),
                        ..Default::default()
                    });
                property.property_type = Some("object".to_string());
                property.properties = Some(parameters);
                schema.properties.insert(PARAMETERS_PROPERTY.to_string(), property);
            }
        }

        schema
    }

    /// Merge the type's group chain, farthest ancestor first
    fn grouped_schema(&self, type_name: &str) -> NodeSchema {
        let Some((kind, _)) = self.catalog.find_entry(type_name) else {
            return NodeSchema::default();
        };

        let mut schema = NodeSchema::default();
        for (_, entry) in self.catalog.group_chain(kind, type_name).iter().rev() {
            schema.merge_entry(entry);
        }
        schema
    }

    /// Component properties usable from this side of the endpoint
    fn component_parameters(&self, type_name: &str, component: &str) -> Option<BTreeMap<String, PropertyDef>> {
        let entry = self.catalog.get_catalog_lookup(component).entry?;
        Some(
            entry
                .properties
                .iter()
                .filter(|(_, p)| !(type_name == CONSUMER_NODE && p.is_producer_only()))
                .filter(|(_, p)| !(type_name == PRODUCER_NODE && p.is_consumer_only()))
                .map(|(name, p)| (name.clone(), p.clone()))
                .collect(),
        )
    }
}

fn next_index(properties: &BTreeMap<String, PropertyDef>) -> u32 {
    properties.values().map(|p| p.index + 1).max().unwrap_or(0)
}
