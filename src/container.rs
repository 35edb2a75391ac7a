//! Container Settings Resolver
//!
//! Maps a node type name to the child slots it contains. The table is a pure
//! lookup: unknown names contain nothing.
//!
//! | kind          | slot value                       | element shape            |
//! |---------------|----------------------------------|--------------------------|
//! | `single-node` | one optional object              | clause body              |
//! | `branch`      | ordered list                     | wrapped `{type: body}`   |
//! | `array-node`  | ordered list                     | clause body              |
//!
//! Branch and array-node lists are traversed identically; they only differ
//! in the element shape the mutation engine writes into them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogKind, CatalogRegistry};

/// Containment shape of a child slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerKind {
    SingleNode,
    Branch,
    ArrayNode,
}

impl ContainerKind {
    pub fn is_list(self) -> bool {
        matches!(self, ContainerKind::Branch | ContainerKind::ArrayNode)
    }
}

/// A child slot of a container node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSettings {
    pub child_property: String,
    pub kind: ContainerKind,
    /// Secondary slot that only shows up when the document carries its key
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl ContainerSettings {
    pub fn new(child_property: impl Into<String>, kind: ContainerKind) -> Self {
        Self {
            child_property: child_property.into(),
            kind,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn single(child_property: impl Into<String>) -> Self {
        Self::new(child_property, ContainerKind::SingleNode)
    }

    pub fn branch(child_property: impl Into<String>) -> Self {
        Self::new(child_property, ContainerKind::Branch)
    }

    pub fn array_node(child_property: impl Into<String>) -> Self {
        Self::new(child_property, ContainerKind::ArrayNode)
    }
}

/// Camel processors whose only slot is a `steps` branch
const CAMEL_STEP_CONTAINERS: &[&str] = &[
    "from",
    "when",
    "otherwise",
    "doCatch",
    "doFinally",
    "onFallback",
    "aggregate",
    "filter",
    "idempotentConsumer",
    "intercept",
    "interceptFrom",
    "interceptSendToEndpoint",
    "loadBalance",
    "loop",
    "multicast",
    "onCompletion",
    "onException",
    "pipeline",
    "resequence",
    "saga",
    "split",
    "step",
    "threads",
];

/// Test containers whose only slot is an `actions` branch
const TEST_ACTION_CONTAINERS: &[&str] = &[
    "sequential",
    "iterate",
    "repeat",
    "repeatOnError",
    "parallel",
    "conditional",
    "async",
    "timer",
];

/// Type name → ordered child slots
#[derive(Debug, Clone, Default)]
pub struct ContainerTable {
    entries: HashMap<String, Vec<ContainerSettings>>,
}

impl ContainerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the slots of a type, replacing any previous declaration
    pub fn insert(&mut self, type_name: impl Into<String>, slots: Vec<ContainerSettings>) {
        self.entries.insert(type_name.into(), slots);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, type_name: impl Into<String>, slots: Vec<ContainerSettings>) -> Self {
        self.insert(type_name, slots);
        self
    }

    /// Table for route and route fragment documents
    pub fn camel() -> Self {
        let mut table = Self::new();
        for name in CAMEL_STEP_CONTAINERS {
            table.insert(*name, vec![ContainerSettings::branch("steps")]);
        }
        table
            .with("route", vec![ContainerSettings::single("from")])
            .with(
                "choice",
                vec![
                    ContainerSettings::array_node("when"),
                    ContainerSettings::single("otherwise"),
                ],
            )
            .with(
                "doTry",
                vec![
                    ContainerSettings::branch("steps"),
                    ContainerSettings::array_node("doCatch"),
                    ContainerSettings::single("doFinally"),
                ],
            )
            .with(
                "circuitBreaker",
                vec![
                    ContainerSettings::branch("steps"),
                    ContainerSettings::single("onFallback"),
                ],
            )
            .with(
                "routeConfiguration",
                vec![
                    ContainerSettings::branch("intercept"),
                    ContainerSettings::branch("interceptFrom"),
                    ContainerSettings::branch("interceptSendToEndpoint"),
                    ContainerSettings::branch("onException"),
                    ContainerSettings::branch("onCompletion"),
                ],
            )
    }

    /// Table for pipe documents
    pub fn pipe() -> Self {
        Self::new().with(
            "pipe",
            vec![
                ContainerSettings::single("source"),
                ContainerSettings::array_node("steps"),
                ContainerSettings::single("sink"),
            ],
        )
    }

    /// Table for test case documents
    pub fn test() -> Self {
        let mut table = Self::new().with(
            "test",
            vec![ContainerSettings::branch("actions"), ContainerSettings::branch("finally").optional()],
        );
        for name in TEST_ACTION_CONTAINERS {
            table.insert(*name, vec![ContainerSettings::branch("actions")]);
        }
        table
            .with("catch", vec![ContainerSettings::branch("when")])
            .with("assert", vec![ContainerSettings::branch("when")])
    }

    /// Add slots declared by catalog properties (`"container": "branch"`) for
    /// node types the table does not know yet
    pub fn with_catalog(mut self, catalog: &CatalogRegistry) -> Self {
        for kind in CatalogKind::NODE_KINDS {
            let Some(entries) = catalog.get_catalog_by_key(kind) else {
                continue;
            };
            for (name, entry) in entries {
                if self.entries.contains_key(name) {
                    continue;
                }
                let slots: Vec<ContainerSettings> = entry
                    .ordered_properties()
                    .into_iter()
                    .filter_map(|(property, def)| def.container.map(|kind| ContainerSettings::new(property.clone(), kind)))
                    .collect();
                if !slots.is_empty() {
                    self.entries.insert(name.clone(), slots);
                }
            }
        }
        self
    }

    /// Primary slot of a type
    pub fn get_container_settings(&self, type_name: &str) -> Option<&ContainerSettings> {
        self.get_all_container_settings(type_name).first()
    }

    /// All slots of a type, in declaration order.
    ///
    /// Compound names are walked segment by segment: an explicitly declared
    /// prefix takes its own slots, a segment naming a slot of the previous
    /// prefix (`choice-when`) takes the slots of that clause type, anything
    /// else contains nothing.
    pub fn get_all_container_settings(&self, type_name: &str) -> &[ContainerSettings] {
        let mut segments = type_name.split('-');
        let first = segments.next().unwrap_or_default();
        let mut current = self.entries.get(first);
        let mut prefix = first.to_string();

        for segment in segments {
            prefix.push('-');
            prefix.push_str(segment);

            current = if let Some(declared) = self.entries.get(&prefix) {
                Some(declared)
            } else if current.is_some_and(|slots| slots.iter().any(|s| s.child_property == segment)) {
                self.entries.get(segment)
            } else {
                None
            };
        }

        current.map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_container(&self, type_name: &str) -> bool {
        !self.get_all_container_settings(type_name).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogMap;
    use serde_json::json;

    #[test]
    fn test_unknown_names_contain_nothing() {
        let table = ContainerTable::camel();
        assert_eq!(table.get_container_settings("log"), None);
        assert!(table.get_all_container_settings("").is_empty());
        assert!(!table.is_container("to"));
    }

    #[test]
    fn test_primary_and_all_slots() {
        let table = ContainerTable::camel();
        assert_eq!(table.get_container_settings("split"), Some(&ContainerSettings::branch("steps")));

        let choice = table.get_all_container_settings("choice");
        assert_eq!(choice.len(), 2);
        assert_eq!(choice[0], ContainerSettings::array_node("when"));
        assert_eq!(choice[1].kind, ContainerKind::SingleNode);
    }

    #[test]
    fn test_compound_clause_names() {
        let table = ContainerTable::camel();
        assert_eq!(
            table.get_container_settings("choice-when"),
            Some(&ContainerSettings::branch("steps"))
        );
        assert_eq!(
            table.get_container_settings("doTry-doFinally"),
            Some(&ContainerSettings::branch("steps"))
        );
        // `filter` is not a slot of `choice`
        assert_eq!(table.get_container_settings("choice-filter"), None);
        assert_eq!(table.get_container_settings("camel-jbang-run"), None);
    }

    #[test]
    fn test_declared_compound_wins() {
        let table = ContainerTable::test().with("camel-jbang", vec![ContainerSettings::branch("steps")]);
        assert_eq!(
            table.get_container_settings("camel-jbang"),
            Some(&ContainerSettings::branch("steps"))
        );
    }

    #[test]
    fn test_slots_from_catalog() {
        let actions: CatalogMap = serde_json::from_value(json!({
            "sequential": { "properties": { "actions": { "index": 0, "container": "branch" } } },
            "waitFor": {
                "properties": {
                    "onTimeout": { "index": 1, "container": "single-node" },
                    "then": { "index": 0, "container": "branch" },
                    "seconds": { "index": 2 }
                }
            }
        }))
        .unwrap();
        let catalog = CatalogRegistry::new().with_catalog(CatalogKind::TestAction, actions);
        let table = ContainerTable::test().with_catalog(&catalog);

        let slots = table.get_all_container_settings("waitFor");
        assert_eq!(slots, &[ContainerSettings::branch("then"), ContainerSettings::single("onTimeout")]);
        // built-in declarations are kept
        assert_eq!(table.get_all_container_settings("sequential"), &[ContainerSettings::branch("actions")]);
    }
}
