//! Editing session
//!
//! [`FlowSession`] owns one document together with the catalog snapshot and
//! dialect it is edited under, and routes every read and edit through the
//! graph builder, mutation engine, schema resolver and sorter.
//!
//! ```no_run
//! use std::sync::Arc;
//! use flowdoc::{AddMode, CatalogRegistry, FlowSession, TestDialect};
//! use serde_json::json;
//!
//! let catalog = Arc::new(CatalogRegistry::new());
//! let mut session = FlowSession::scaffold(TestDialect, catalog);
//! session.add("actions.0.placeholder", AddMode::Replace, json!({ "print": { "message": "Hi" } }));
//! println!("{}", session.graph().render_tree());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::catalog::CatalogRegistry;
use crate::checksum::Checksum;
use crate::config::EngineConfig;
use crate::container::ContainerTable;
use crate::dialect::{Dialect, DialectStrategy};
use crate::error::Result;
use crate::mutation::{AddMode, ClipboardCopy, MutationEngine};
use crate::path::{resolve_type_and_component, to_real_path, value_at, TypeAndComponent};
use crate::schema::NodeSchema;
use crate::sort::CanonicalSorter;
use crate::validation::{format_missing, validate, validate_strict};
use crate::visual::{GraphBuilder, VisualGraph};

/// One document being edited under one dialect
pub struct FlowSession<D: DialectStrategy = Box<dyn DialectStrategy>> {
    strategy: D,
    catalog: Arc<CatalogRegistry>,
    table: ContainerTable,
    config: EngineConfig,
    document: Value,
    saved: Checksum,
}

impl FlowSession {
    /// Session for a dialect chosen at runtime
    pub fn for_dialect(dialect: Dialect, catalog: Arc<CatalogRegistry>, document: Value) -> Self {
        FlowSession::new(dialect.strategy(), catalog, document)
    }
}

impl<D: DialectStrategy> FlowSession<D> {
    pub fn new(strategy: D, catalog: Arc<CatalogRegistry>, document: Value) -> Self {
        Self::with_config(strategy, catalog, document, EngineConfig::default())
    }

    pub fn with_config(strategy: D, catalog: Arc<CatalogRegistry>, document: Value, config: EngineConfig) -> Self {
        let table = strategy.container_table().with_catalog(&catalog);
        let mut session = Self {
            strategy,
            catalog,
            table,
            config,
            document,
            saved: Checksum::from_bytes(&[]),
        };
        session.mark_saved();
        session
    }

    /// Session over the dialect's default document
    pub fn scaffold(strategy: D, catalog: Arc<CatalogRegistry>) -> Self {
        let document = strategy.default_document();
        Self::new(strategy, catalog, document)
    }

    pub fn from_json_str(strategy: D, catalog: Arc<CatalogRegistry>, json: &str) -> Result<Self> {
        let document = serde_json::from_str(json)?;
        Ok(Self::new(strategy, catalog, document))
    }

    pub fn dialect(&self) -> Dialect {
        self.strategy.dialect()
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }

    pub fn catalog(&self) -> &Arc<CatalogRegistry> {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn container_table(&self) -> &ContainerTable {
        &self.table
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fresh visual graph of the current document
    pub fn graph(&self) -> VisualGraph {
        GraphBuilder::new(&self.catalog, &self.table, &self.strategy)
            .with_options(self.config.build_options())
            .build(&self.document)
    }

    /// Schema of the node at `path`
    pub fn schema_for(&self, path: &str) -> Result<NodeSchema> {
        let value = value_at(&self.document, &to_real_path(path));
        let resolved = if path == self.strategy.root_path() {
            TypeAndComponent {
                type_name: self.strategy.root_type().to_string(),
                component_name: None,
            }
        } else {
            resolve_type_and_component(path, value)?
        };
        Ok(self.strategy.resolve_schema(&self.catalog, &resolved, value))
    }

    /// Validation messages for the node at `path`; empty when valid
    pub fn validate_node(&self, path: &str) -> Result<Vec<String>> {
        let schema = self.schema_for(path)?;
        if schema.is_empty() {
            return Ok(Vec::new());
        }
        let value = value_at(&self.document, &to_real_path(path));
        if self.config.validation.strict {
            Ok(validate_strict(&schema, value.unwrap_or(&Value::Null)))
        } else {
            Ok(validate(&schema, value))
        }
    }

    /// Node path → message for every invalid node of the current graph
    pub fn validation_report(&self) -> BTreeMap<String, String> {
        let graph = self.graph();
        let mut report = BTreeMap::new();

        for (_, node) in graph.iter().filter(|(_, n)| !n.is_placeholder) {
            let Ok(messages) = self.validate_node(&node.path) else {
                continue;
            };
            if messages.is_empty() {
                continue;
            }
            let message = if self.config.validation.strict {
                messages.join("; ")
            } else {
                format_missing(&messages)
            };
            report.insert(node.path.clone(), message);
        }

        report
    }

    /// Document with canonically ordered keys
    pub fn sorted_document(&self) -> Value {
        let sorter = CanonicalSorter::new(&self.catalog);
        if self.strategy.root_path().is_empty() {
            sorter.sort_as(&self.document, self.strategy.root_type())
        } else {
            sorter.sort(&self.document)
        }
    }

    /// Canonical document rendered in the configured output format
    pub fn to_json_string(&self) -> Result<String> {
        self.config.output.format.render(&self.sorted_document())
    }

    pub fn fingerprint(&self) -> Checksum {
        Checksum::from_json(&self.sorted_document())
    }

    /// Whether the document changed since creation or the last save
    pub fn is_dirty(&self) -> bool {
        self.fingerprint() != self.saved
    }

    pub fn mark_saved(&mut self) {
        self.saved = self.fingerprint();
    }

    // =========================================================================
    // Edits
    // =========================================================================

    pub fn add(&mut self, target: &str, mode: AddMode, value: Value) -> bool {
        MutationEngine::new(&self.table, &self.strategy).add(&mut self.document, target, mode, value)
    }

    pub fn remove(&mut self, path: &str) -> bool {
        MutationEngine::new(&self.table, &self.strategy).remove(&mut self.document, path)
    }

    pub fn copy(&self, path: &str) -> Option<ClipboardCopy> {
        MutationEngine::new(&self.table, &self.strategy).copy(&self.document, path)
    }

    pub fn paste(&mut self, target: &str, mode: AddMode, clip: &ClipboardCopy) -> bool {
        MutationEngine::new(&self.table, &self.strategy).paste(&mut self.document, target, mode, clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{RouteDialect, TestDialect};
    use serde_json::json;

    #[test]
    fn test_dirty_tracking() {
        let mut session = FlowSession::scaffold(TestDialect, Arc::new(CatalogRegistry::new()));
        assert!(!session.is_dirty());

        assert!(session.add("actions.0.placeholder", AddMode::Replace, json!({ "print": {} })));
        assert!(session.is_dirty());

        session.mark_saved();
        assert!(!session.is_dirty());

        assert!(session.remove("actions.0.print"));
        assert!(session.is_dirty());
    }

    #[test]
    fn test_runtime_dialect_session() {
        let catalog = Arc::new(CatalogRegistry::new());
        let session = FlowSession::for_dialect(Dialect::Pipeline, catalog, Dialect::Pipeline.strategy().default_document());
        assert_eq!(session.dialect(), Dialect::Pipeline);

        let graph = session.graph();
        let paths: Vec<&str> = graph
            .children(graph.root())
            .into_iter()
            .map(|id| graph.node(id).path.as_str())
            .collect();
        assert_eq!(paths, vec!["spec.source", "spec.steps.0.placeholder", "spec.sink"]);
    }

    #[test]
    fn test_schema_for_root_and_unresolvable() {
        let session = FlowSession::scaffold(RouteDialect, Arc::new(CatalogRegistry::new()));
        assert!(session.schema_for("route").unwrap().is_empty());
        assert!(session.schema_for("route.from.steps.0.1").is_err());
        assert!(session.validate_node("route.from.steps.0.1").is_err());
    }

    #[test]
    fn test_placeholders_follow_config() {
        let mut config = EngineConfig::default();
        config.graph.placeholders = false;
        let session = FlowSession::with_config(
            TestDialect,
            Arc::new(CatalogRegistry::new()),
            json!({ "name": "t", "actions": [] }),
            config,
        );
        let graph = session.graph();
        assert_eq!(graph.len(), 1);
        assert!(!graph.node(graph.root()).is_group);
    }
}
