//! Visualization Node Graph
//!
//! Derives a transient node tree from a document. Nodes live in a petgraph
//! arena; `Child` edges carry containment and `Next` edges chain siblings of
//! one list, so parent, previous and next are all id lookups.
//!
//! Every list slot ends with exactly one placeholder node, which is also the
//! only node of an empty list:
//!
//! ```text
//! actions: [{print: ...}]   →  actions.0.print, actions.1.placeholder
//! actions: []               →  actions.0.placeholder
//! ```
//!
//! The graph is rebuilt on every read and never written back.

use std::collections::HashMap;
use std::fmt::Write as _;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::CatalogRegistry;
use crate::container::{ContainerKind, ContainerSettings, ContainerTable};
use crate::dialect::DialectStrategy;
use crate::path::{join_path, value_at};

/// Type name carried by placeholder nodes
pub const PLACEHOLDER_TYPE: &str = "placeholder";

/// Arena index of a visual node
pub type NodeId = NodeIndex;

/// Relation between two visual nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualEdge {
    /// Parent → child
    Child,
    /// Sibling → following sibling in the same list
    Next,
}

/// One node of the visual graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualNode {
    pub path: String,
    pub type_name: String,
    pub display_name: String,
    pub is_group: bool,
    pub is_placeholder: bool,
    /// Slot of the parent this node sits in; `None` for the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<ContainerSettings>,
}

/// Options for graph building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Emit placeholder nodes for insertable slots
    pub placeholders: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { placeholders: true }
    }
}

/// Node tree derived from one document read
#[derive(Debug, Clone)]
pub struct VisualGraph {
    graph: DiGraph<VisualNode, VisualEdge>,
    root: NodeId,
    /// Index: path -> node (first node wins)
    by_path: HashMap<String, NodeId>,
}

impl VisualGraph {
    fn new(root: VisualNode) -> Self {
        let mut graph = DiGraph::new();
        let path = root.path.clone();
        let root = graph.add_node(root);
        let by_path = HashMap::from([(path, root)]);
        Self { graph, root, by_path }
    }

    fn add_child(&mut self, parent: NodeId, node: VisualNode) -> NodeId {
        let path = node.path.clone();
        let id = self.graph.add_node(node);
        self.graph.add_edge(parent, id, VisualEdge::Child);
        self.by_path.entry(path).or_insert(id);
        id
    }

    fn link(&mut self, previous: Option<NodeId>, next: NodeId) {
        if let Some(previous) = previous {
            self.graph.add_edge(previous, next, VisualEdge::Next);
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, id: NodeId) -> &VisualNode {
        &self.graph[id]
    }

    /// Children in document order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self
            .graph
            .edges_directed(id, Direction::Outgoing)
            .filter(|e| *e.weight() == VisualEdge::Child)
            .map(|e| e.target())
            .collect();
        children.sort();
        children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.graph
            .edges_directed(id, Direction::Incoming)
            .find(|e| *e.weight() == VisualEdge::Child)
            .map(|e| e.source())
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.graph
            .edges_directed(id, Direction::Outgoing)
            .find(|e| *e.weight() == VisualEdge::Next)
            .map(|e| e.target())
    }

    pub fn previous(&self, id: NodeId) -> Option<NodeId> {
        self.graph
            .edges_directed(id, Direction::Incoming)
            .find(|e| *e.weight() == VisualEdge::Next)
            .map(|e| e.source())
    }

    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    /// All nodes in build order (root first)
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &VisualNode)> + '_ {
        self.graph.node_indices().map(move |id| (id, &self.graph[id]))
    }

    /// Indented outline, one node per line
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root, 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let marker = if node.is_placeholder { "+" } else if node.is_group { "▾" } else { "•" };
        let _ = writeln!(
            out,
            "{}{} {} [{}] {}",
            "  ".repeat(depth),
            marker,
            node.display_name,
            node.type_name,
            node.path
        );
        for child in self.children(id) {
            self.render_node(child, depth + 1, out);
        }
    }
}

/// Builds [`VisualGraph`]s for one dialect and catalog
pub struct GraphBuilder<'a> {
    catalog: &'a CatalogRegistry,
    table: &'a ContainerTable,
    strategy: &'a dyn DialectStrategy,
    options: BuildOptions,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(catalog: &'a CatalogRegistry, table: &'a ContainerTable, strategy: &'a dyn DialectStrategy) -> Self {
        Self {
            catalog,
            table,
            strategy,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(&self, document: &Value) -> VisualGraph {
        let root_path = self.strategy.root_path();
        let root_type = self.strategy.root_type();
        let root_value = value_at(document, root_path);

        let mut graph = VisualGraph::new(VisualNode {
            path: root_path.to_string(),
            type_name: root_type.to_string(),
            display_name: self.strategy.resolve_display_name(root_type, root_value, self.catalog),
            is_group: false,
            is_placeholder: false,
            slot: None,
        });
        let root = graph.root();
        self.build_children(&mut graph, root, root_path, root_type, root_value);
        graph
    }

    fn build_children(&self, graph: &mut VisualGraph, parent: NodeId, path: &str, type_name: &str, value: Option<&Value>) {
        let slots = self.table.get_all_container_settings(type_name);
        if slots.is_empty() {
            return;
        }

        for slot in slots {
            let slot_path = join_path(path, &slot.child_property);
            let slot_value = value.and_then(|v| v.get(&slot.child_property));
            if slot.optional && slot_value.is_none() {
                continue;
            }

            match slot.kind {
                ContainerKind::SingleNode => match slot_value.filter(|v| !v.is_null()) {
                    Some(child) => {
                        self.add_node(graph, parent, &slot_path, &slot.child_property, child, slot);
                    }
                    None => {
                        if self.options.placeholders {
                            self.add_placeholder(graph, parent, slot_path, slot);
                        }
                    }
                },
                ContainerKind::Branch | ContainerKind::ArrayNode => {
                    let items = slot_value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
                    let mut previous = None;

                    for (index, item) in items.iter().enumerate() {
                        let item_path = join_path(&slot_path, index);
                        let wrapped = match slot.kind {
                            ContainerKind::Branch => self.unwrap_step(item),
                            _ => None,
                        };
                        let child = match wrapped {
                            Some((step_type, body)) => {
                                let step_path = join_path(&item_path, &step_type);
                                self.add_node(graph, parent, &step_path, &step_type, body, slot)
                            }
                            None => self.add_node(graph, parent, &item_path, &slot.child_property, item, slot),
                        };
                        graph.link(previous, child);
                        previous = Some(child);
                    }

                    if self.options.placeholders {
                        let placeholder_path = join_path(&join_path(&slot_path, items.len()), PLACEHOLDER_TYPE);
                        let placeholder = self.add_placeholder(graph, parent, placeholder_path, slot);
                        graph.link(previous, placeholder);
                    }
                }
            }
        }

        // a container that produced nothing on this read is not a group
        let has_children = !graph.children(parent).is_empty();
        graph.graph[parent].is_group = has_children;
    }

    fn add_node(
        &self,
        graph: &mut VisualGraph,
        parent: NodeId,
        path: &str,
        type_name: &str,
        value: &Value,
        slot: &ContainerSettings,
    ) -> NodeId {
        let id = graph.add_child(
            parent,
            VisualNode {
                path: path.to_string(),
                type_name: type_name.to_string(),
                display_name: self.strategy.resolve_display_name(type_name, Some(value), self.catalog),
                is_group: false,
                is_placeholder: false,
                slot: Some(slot.clone()),
            },
        );
        self.build_children(graph, id, path, type_name, Some(value));
        id
    }

    fn add_placeholder(&self, graph: &mut VisualGraph, parent: NodeId, path: String, slot: &ContainerSettings) -> NodeId {
        graph.add_child(
            parent,
            VisualNode {
                path,
                type_name: PLACEHOLDER_TYPE.to_string(),
                display_name: PLACEHOLDER_TYPE.to_string(),
                is_group: false,
                is_placeholder: true,
                slot: Some(slot.clone()),
            },
        )
    }

    /// Split a `{type: body}` step, collapsing grouped types into their
    /// compound name (`{camel: {jbang: {run: ..}}}` → `camel-jbang-run`)
    fn unwrap_step<'v>(&self, item: &'v Value) -> Option<(String, &'v Value)> {
        let object = item.as_object()?;
        if object.len() != 1 {
            return None;
        }
        let (key, body) = object.iter().next()?;

        let mut name = key.clone();
        let mut current = body;
        while self.catalog.is_group(&name) {
            let Some(fields) = current.as_object() else {
                break;
            };
            let nested = fields.iter().find_map(|(field, value)| {
                let candidate = format!("{}-{}", name, field);
                self.catalog.find_entry(&candidate).map(|_| (candidate, value))
            });
            match nested {
                Some((candidate, value)) => {
                    name = candidate;
                    current = value;
                }
                None => break,
            }
        }

        Some((name, current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogKind, CatalogMap};
    use crate::dialect::{RouteDialect, TestDialect};
    use serde_json::json;

    fn types(graph: &VisualGraph, id: NodeId) -> Vec<String> {
        graph
            .children(id)
            .into_iter()
            .map(|c| graph.node(c).path.clone())
            .collect()
    }

    #[test]
    fn test_route_with_choice() {
        let doc = json!({
            "route": {
                "id": "r1",
                "from": {
                    "uri": "timer:x",
                    "steps": [
                        {
                            "choice": {
                                "when": [ { "simple": "${header.a}", "steps": [ { "log": { "message": "a" } } ] } ],
                                "otherwise": { "steps": [] }
                            }
                        }
                    ]
                }
            }
        });
        let catalog = CatalogRegistry::new();
        let table = ContainerTable::camel();
        let graph = GraphBuilder::new(&catalog, &table, &RouteDialect).build(&doc);

        assert_eq!(graph.len(), 10);
        let root = graph.root();
        assert_eq!(graph.node(root).display_name, "r1");
        assert_eq!(types(&graph, root), vec!["route.from"]);

        let from = graph.find_by_path("route.from").unwrap();
        assert_eq!(types(&graph, from), vec!["route.from.steps.0.choice", "route.from.steps.1.placeholder"]);

        let choice = graph.find_by_path("route.from.steps.0.choice").unwrap();
        assert!(graph.node(choice).is_group);
        assert_eq!(
            types(&graph, choice),
            vec![
                "route.from.steps.0.choice.when.0",
                "route.from.steps.0.choice.when.1.placeholder",
                "route.from.steps.0.choice.otherwise",
            ]
        );

        let when = graph.find_by_path("route.from.steps.0.choice.when.0").unwrap();
        assert_eq!(graph.node(when).type_name, "when");
        assert_eq!(graph.parent(when), Some(choice));

        let otherwise = graph.find_by_path("route.from.steps.0.choice.otherwise").unwrap();
        assert_eq!(types(&graph, otherwise), vec!["route.from.steps.0.choice.otherwise.steps.0.placeholder"]);
        // the otherwise slot is not chained to the when list
        assert_eq!(graph.previous(otherwise), None);
    }

    #[test]
    fn test_missing_single_slot_gets_placeholder() {
        let doc = json!({ "route": { "id": "r1" } });
        let catalog = CatalogRegistry::new();
        let table = ContainerTable::camel();
        let graph = GraphBuilder::new(&catalog, &table, &RouteDialect).build(&doc);

        let children = graph.children(graph.root());
        assert_eq!(children.len(), 1);
        let placeholder = graph.node(children[0]);
        assert!(placeholder.is_placeholder);
        assert_eq!(placeholder.path, "route.from");
        assert_eq!(placeholder.slot, Some(ContainerSettings::single("from")));
    }

    #[test]
    fn test_optional_slot_appears_only_when_present() {
        let catalog = CatalogRegistry::new();
        let table = ContainerTable::test();
        let builder = GraphBuilder::new(&catalog, &table, &TestDialect);
        let paths = |graph: &VisualGraph| -> Vec<String> {
            graph
                .children(graph.root())
                .into_iter()
                .map(|id| graph.node(id).path.clone())
                .collect()
        };

        let without = builder.build(&json!({ "name": "t", "actions": [] }));
        assert_eq!(paths(&without), vec!["actions.0.placeholder"]);

        let with = builder.build(&json!({ "name": "t", "actions": [], "finally": [ { "print": {} } ] }));
        assert_eq!(
            paths(&with),
            vec!["actions.0.placeholder", "finally.0.print", "finally.1.placeholder"]
        );
    }

    #[test]
    fn test_childless_container_is_not_a_group() {
        let doc = json!({ "name": "t", "actions": [ { "sequential": { "actions": [] } } ] });
        let catalog = CatalogRegistry::new();
        let table = ContainerTable::test();
        let options = BuildOptions { placeholders: false };
        let graph = GraphBuilder::new(&catalog, &table, &TestDialect).with_options(options).build(&doc);

        let sequential = graph.find_by_path("actions.0.sequential").unwrap();
        assert!(graph.children(sequential).is_empty());
        assert!(!graph.node(sequential).is_group);
        assert!(graph.node(graph.root()).is_group);
    }

    #[test]
    fn test_grouped_step_collapses_to_compound_name() {
        let actions: CatalogMap = serde_json::from_value(json!({
            "camel": {},
            "camel-jbang": { "group": "camel" },
            "camel-jbang-run": { "group": "camel-jbang", "title": "Run integration" }
        }))
        .unwrap();
        let catalog = CatalogRegistry::new().with_catalog(CatalogKind::TestAction, actions);
        let table = ContainerTable::test();
        let doc = json!({
            "name": "t",
            "actions": [ { "camel": { "jbang": { "run": { "integration": { "file": "route.yaml" } } } } } ]
        });

        let graph = GraphBuilder::new(&catalog, &table, &TestDialect).build(&doc);
        let id = graph.find_by_path("actions.0.camel-jbang-run").unwrap();
        assert_eq!(graph.node(id).type_name, "camel-jbang-run");
        assert_eq!(graph.node(id).display_name, "Run integration");
    }

    #[test]
    fn test_render_tree_outline() {
        let doc = json!({ "name": "demo", "actions": [ { "print": { "message": "Hi" } } ] });
        let catalog = CatalogRegistry::new();
        let table = ContainerTable::test();
        let graph = GraphBuilder::new(&catalog, &table, &TestDialect).build(&doc);

        let outline = graph.render_tree();
        let lines: Vec<&str> = outline.lines().collect();
        assert_eq!(lines[0], "▾ demo [test] ");
        assert_eq!(lines[1], "  • print [print] actions.0.print");
        assert!(lines.iter().any(|l| l.ends_with("actions.1.placeholder")));
    }
}
