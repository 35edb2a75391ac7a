//! Document dialects
//!
//! One engine serves every dialect; what differs per dialect is captured by a
//! [`DialectStrategy`]: where the root node lives, which types contain which
//! slots, how nodes are named on the canvas and how schemas are resolved.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::{CatalogKind, CatalogRegistry, PropertyDef};
use crate::container::ContainerTable;
use crate::error::FlowError;
use crate::path::{component_name_from_uri, TypeAndComponent, CONSUMER_NODE, PRODUCER_NODE};
use crate::schema::{NodeSchema, SchemaResolver};

/// Document dialect, also used as the clipboard tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// Integration route
    Route,
    /// Reusable route configuration fragment
    Fragment,
    /// Declarative source → steps → sink pipe
    Pipeline,
    /// Test case
    Test,
}

impl Dialect {
    pub fn tag(&self) -> &'static str {
        match self {
            Dialect::Route => "route",
            Dialect::Fragment => "fragment",
            Dialect::Pipeline => "pipeline",
            Dialect::Test => "test",
        }
    }

    /// Whether content copied from `other` can be pasted into this dialect
    pub fn is_compatible_with(&self, other: Dialect) -> bool {
        match (self, other) {
            (Dialect::Route | Dialect::Fragment, Dialect::Route | Dialect::Fragment) => true,
            (a, b) => *a == b,
        }
    }

    pub fn strategy(&self) -> Box<dyn DialectStrategy> {
        match self {
            Dialect::Route => Box::new(RouteDialect),
            Dialect::Fragment => Box::new(FragmentDialect),
            Dialect::Pipeline => Box::new(PipelineDialect),
            Dialect::Test => Box::new(TestDialect),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Dialect {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "route" => Ok(Dialect::Route),
            "fragment" | "routeConfiguration" => Ok(Dialect::Fragment),
            "pipeline" | "pipe" => Ok(Dialect::Pipeline),
            "test" => Ok(Dialect::Test),
            other => Err(FlowError::UnknownDialect(other.to_string())),
        }
    }
}

/// Per-dialect behaviour plugged into the engine
pub trait DialectStrategy: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Real path of the root node; empty when the document itself is the root
    fn root_path(&self) -> &str;

    fn root_type(&self) -> &str;

    /// Built-in containment table
    fn container_table(&self) -> ContainerTable;

    /// Scaffold for a new document
    fn default_document(&self) -> Value;

    fn resolve_display_name(&self, type_name: &str, value: Option<&Value>, catalog: &CatalogRegistry) -> String {
        default_display_name(type_name, value, catalog)
    }

    fn resolve_schema(&self, catalog: &CatalogRegistry, resolved: &TypeAndComponent, _value: Option<&Value>) -> NodeSchema {
        SchemaResolver::new(catalog).get_schema(&resolved.type_name, resolved.component_name.as_deref())
    }
}

impl DialectStrategy for Box<dyn DialectStrategy> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn root_path(&self) -> &str {
        (**self).root_path()
    }

    fn root_type(&self) -> &str {
        (**self).root_type()
    }

    fn container_table(&self) -> ContainerTable {
        (**self).container_table()
    }

    fn default_document(&self) -> Value {
        (**self).default_document()
    }

    fn resolve_display_name(&self, type_name: &str, value: Option<&Value>, catalog: &CatalogRegistry) -> String {
        (**self).resolve_display_name(type_name, value, catalog)
    }

    fn resolve_schema(&self, catalog: &CatalogRegistry, resolved: &TypeAndComponent, value: Option<&Value>) -> NodeSchema {
        (**self).resolve_schema(catalog, resolved, value)
    }
}

fn str_field<'a>(value: Option<&'a Value>, field: &str) -> Option<&'a str> {
    value
        .and_then(|v| v.get(field))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Description if set, else the catalog title, else the type name
pub fn default_display_name(type_name: &str, value: Option<&Value>, catalog: &CatalogRegistry) -> String {
    str_field(value, "description")
        .or_else(|| catalog.find_entry(type_name).and_then(|(_, e)| e.title.as_deref()))
        .unwrap_or(type_name)
        .to_string()
}

fn endpoint_display_name(type_name: &str, value: Option<&Value>, catalog: &CatalogRegistry) -> String {
    if type_name != CONSUMER_NODE && type_name != PRODUCER_NODE {
        return default_display_name(type_name, value, catalog);
    }
    if let Some(description) = str_field(value, "description") {
        return description.to_string();
    }
    let uri = value.and_then(|v| v.as_str().or_else(|| str_field(Some(v), "uri")));
    match uri.and_then(component_name_from_uri) {
        Some(component) => {
            let lookup = catalog.get_catalog_lookup(&component);
            lookup
                .entry
                .and_then(|e| e.title.clone())
                .unwrap_or(component)
        }
        None => default_display_name(type_name, value, catalog),
    }
}

// =============================================================================
// Route
// =============================================================================

/// `{route: {id, from: {uri, parameters, steps: [...]}}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteDialect;

impl DialectStrategy for RouteDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Route
    }

    fn root_path(&self) -> &str {
        "route"
    }

    fn root_type(&self) -> &str {
        "route"
    }

    fn container_table(&self) -> ContainerTable {
        ContainerTable::camel()
    }

    fn default_document(&self) -> Value {
        json!({
            "route": {
                "id": "route-1",
                "from": {
                    "uri": "timer:template",
                    "parameters": { "period": "1000" },
                    "steps": [
                        { "log": { "message": "${body}" } }
                    ]
                }
            }
        })
    }

    fn resolve_display_name(&self, type_name: &str, value: Option<&Value>, catalog: &CatalogRegistry) -> String {
        if type_name == self.root_type() {
            if let Some(id) = str_field(value, "id") {
                return id.to_string();
            }
        }
        endpoint_display_name(type_name, value, catalog)
    }
}

// =============================================================================
// Route fragment
// =============================================================================

/// `{routeConfiguration: {id, onException: [...], intercept: [...], ...}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentDialect;

impl DialectStrategy for FragmentDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Fragment
    }

    fn root_path(&self) -> &str {
        "routeConfiguration"
    }

    fn root_type(&self) -> &str {
        "routeConfiguration"
    }

    fn container_table(&self) -> ContainerTable {
        ContainerTable::camel()
    }

    fn default_document(&self) -> Value {
        json!({
            "routeConfiguration": {
                "id": "routeConfiguration-1"
            }
        })
    }

    fn resolve_display_name(&self, type_name: &str, value: Option<&Value>, catalog: &CatalogRegistry) -> String {
        if type_name == self.root_type() {
            if let Some(id) = str_field(value, "id") {
                return id.to_string();
            }
        }
        endpoint_display_name(type_name, value, catalog)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// `{apiVersion, kind: Pipe, metadata, spec: {source, steps: [...], sink}}`
///
/// Source, step and sink nodes reference kamelets by `ref.name`; their
/// schema is the kamelet's properties nested under `properties`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineDialect;

impl PipelineDialect {
    fn kamelet_name(value: Option<&Value>) -> Option<&str> {
        value
            .and_then(|v| v.get("ref"))
            .and_then(|r| r.get("name"))
            .and_then(Value::as_str)
    }
}

impl DialectStrategy for PipelineDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Pipeline
    }

    fn root_path(&self) -> &str {
        "spec"
    }

    fn root_type(&self) -> &str {
        "pipe"
    }

    fn container_table(&self) -> ContainerTable {
        ContainerTable::pipe()
    }

    fn default_document(&self) -> Value {
        json!({
            "apiVersion": "camel.apache.org/v1",
            "kind": "Pipe",
            "metadata": { "name": "new-pipe" },
            "spec": {
                "source": {
                    "ref": { "kind": "Kamelet", "apiVersion": "camel.apache.org/v1", "name": "timer-source" },
                    "properties": { "message": "hello" }
                },
                "steps": [],
                "sink": {
                    "ref": { "kind": "Kamelet", "apiVersion": "camel.apache.org/v1", "name": "log-sink" }
                }
            }
        })
    }

    fn resolve_display_name(&self, type_name: &str, value: Option<&Value>, catalog: &CatalogRegistry) -> String {
        match Self::kamelet_name(value) {
            Some(name) => catalog
                .get_component(CatalogKind::Kamelet, name)
                .and_then(|e| e.title.clone())
                .unwrap_or_else(|| name.to_string()),
            None => default_display_name(type_name, value, catalog),
        }
    }

    fn resolve_schema(&self, catalog: &CatalogRegistry, resolved: &TypeAndComponent, value: Option<&Value>) -> NodeSchema {
        let Some(entry) = Self::kamelet_name(value).and_then(|name| catalog.get_component(CatalogKind::Kamelet, name)) else {
            return SchemaResolver::new(catalog).get_schema(&resolved.type_name, None);
        };

        let mut schema = NodeSchema {
            title: entry.title.clone(),
            description: entry.description.clone(),
            ..Default::default()
        };
        schema.properties.insert(
            "properties".to_string(),
            PropertyDef {
                property_type: Some("object".to_string()),
                properties: Some(entry.properties.clone()),
                ..Default::default()
            },
        );
        schema
    }
}

// =============================================================================
// Test
// =============================================================================

/// `{name, variables?, actions: [...], finally?: [...]}`
#[derive(Debug, Clone, Copy, Default)]
pub struct TestDialect;

impl DialectStrategy for TestDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Test
    }

    fn root_path(&self) -> &str {
        ""
    }

    fn root_type(&self) -> &str {
        "test"
    }

    fn container_table(&self) -> ContainerTable {
        ContainerTable::test()
    }

    fn default_document(&self) -> Value {
        json!({
            "name": "new-test",
            "actions": []
        })
    }

    fn resolve_display_name(&self, type_name: &str, value: Option<&Value>, catalog: &CatalogRegistry) -> String {
        if type_name == self.root_type() {
            if let Some(name) = str_field(value, "name") {
                return name.to_string();
            }
        }
        default_display_name(type_name, value, catalog)
    }
}
