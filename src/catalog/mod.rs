//! Catalog Registry
//!
//! Read-mostly store of type descriptors keyed by (kind, name). A registry is
//! populated once by a loader, then frozen into an `Arc` snapshot that editing
//! sessions share. Lookups never fail: absence is a normal result.
//!
//! ## Catalog feed
//!
//! ```text
//! {
//!   "to": {
//!     "title": "To",
//!     "group": null,
//!     "properties": {
//!       "uri":        { "index": 0, "required": true, "type": "string" },
//!       "parameters": { "index": 1, "type": "object" }
//!     }
//!   }
//! }
//! ```

pub mod loader;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::container::ContainerKind;

pub use loader::{load_from_directory, LoadConfig};

/// Namespace prefix that marks a virtual component (`kamelet:my-source`)
pub const VIRTUAL_NAMESPACE: &str = "kamelet";

/// Kinds of catalogs the registry can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogKind {
    Component,
    Processor,
    Entity,
    Kamelet,
    TestAction,
    TestContainer,
    TestEndpoint,
    Function,
    Language,
    Dataformat,
    Loadbalancer,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 11] = [
        CatalogKind::Component,
        CatalogKind::Processor,
        CatalogKind::Entity,
        CatalogKind::Kamelet,
        CatalogKind::TestAction,
        CatalogKind::TestContainer,
        CatalogKind::TestEndpoint,
        CatalogKind::Function,
        CatalogKind::Language,
        CatalogKind::Dataformat,
        CatalogKind::Loadbalancer,
    ];

    /// Kinds that describe node types (as opposed to components or helpers),
    /// in lookup precedence order
    pub const NODE_KINDS: [CatalogKind; 4] = [
        CatalogKind::Processor,
        CatalogKind::Entity,
        CatalogKind::TestAction,
        CatalogKind::TestContainer,
    ];

    /// File stem used by the on-disk catalog layout (`testAction.json`)
    pub fn file_stem(&self) -> &'static str {
        match self {
            CatalogKind::Component => "component",
            CatalogKind::Processor => "processor",
            CatalogKind::Entity => "entity",
            CatalogKind::Kamelet => "kamelet",
            CatalogKind::TestAction => "testAction",
            CatalogKind::TestContainer => "testContainer",
            CatalogKind::TestEndpoint => "testEndpoint",
            CatalogKind::Function => "function",
            CatalogKind::Language => "language",
            CatalogKind::Dataformat => "dataformat",
            CatalogKind::Loadbalancer => "loadbalancer",
        }
    }

    pub fn from_file_stem(stem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.file_stem() == stem)
    }
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// A declared property of a catalog entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
    /// Canonical ordering index
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub required: bool,
    /// Declared type: "string", "object", "array", "boolean", "integer", ...
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Comma separated labels; carries the consumer/producer direction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Marks the property as a child slot of the given container kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerKind>,
    /// Nested properties of an object-typed property
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertyDef>>,
}

impl PropertyDef {
    pub fn is_object(&self) -> bool {
        self.property_type.as_deref() == Some("object")
    }

    pub fn is_array(&self) -> bool {
        self.property_type.as_deref() == Some("array")
    }

    fn has_label(&self, wanted: &str) -> bool {
        self.label
            .as_deref()
            .map(|label| label.split(',').any(|l| l.trim() == wanted))
            .unwrap_or(false)
    }

    /// Only meaningful on the producer side of an endpoint
    pub fn is_producer_only(&self) -> bool {
        self.has_label("producer") && !self.has_label("consumer")
    }

    /// Only meaningful on the consumer side of an endpoint
    pub fn is_consumer_only(&self) -> bool {
        self.has_label("consumer") && !self.has_label("producer")
    }
}

/// Type descriptor for a (kind, name) pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parent group this entry's fields are nested under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
}

impl CatalogEntry {
    pub fn property_index(&self, name: &str) -> Option<u32> {
        self.properties.get(name).map(|p| p.index)
    }

    /// Properties ordered by (index, name)
    pub fn ordered_properties(&self) -> Vec<(&String, &PropertyDef)> {
        ordered_properties(&self.properties)
    }
}

/// Order a property map by declared index, breaking ties by name
pub fn ordered_properties(properties: &BTreeMap<String, PropertyDef>) -> Vec<(&String, &PropertyDef)> {
    let mut ordered: Vec<_> = properties.iter().collect();
    ordered.sort_by(|(a_name, a), (b_name, b)| a.index.cmp(&b.index).then_with(|| a_name.cmp(b_name)));
    ordered
}

/// All entries of one kind, keyed by name
pub type CatalogMap = BTreeMap<String, CatalogEntry>;

/// Outcome of resolving a component name that may carry a virtual namespace
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogLookup<'a> {
    /// Catalog the name was resolved against
    pub kind: CatalogKind,
    /// Name as looked up in that catalog
    pub name: String,
    pub entry: Option<&'a CatalogEntry>,
}

impl CatalogLookup<'_> {
    pub fn is_resolved(&self) -> bool {
        self.entry.is_some()
    }
}

/// Fuzzy search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSearchResult {
    pub kind: CatalogKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub score: i64,
}

/// Store of catalogs keyed by kind
#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    catalogs: HashMap<CatalogKind, CatalogMap>,
    /// Names referenced as a `group` by some entry
    groups: HashSet<String>,
    /// Hash of the catalog sources this registry was loaded from
    pub bundle_hash: String,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the catalog for a kind
    pub fn set_catalog(&mut self, kind: CatalogKind, catalog: CatalogMap) {
        self.catalogs.insert(kind, catalog);
        self.rebuild_groups();
    }

    /// Builder form of [`set_catalog`](Self::set_catalog)
    pub fn with_catalog(mut self, kind: CatalogKind, catalog: CatalogMap) -> Self {
        self.set_catalog(kind, catalog);
        self
    }

    pub fn get_catalog_by_key(&self, kind: CatalogKind) -> Option<&CatalogMap> {
        self.catalogs.get(&kind)
    }

    pub fn get_component(&self, kind: CatalogKind, name: &str) -> Option<&CatalogEntry> {
        self.catalogs.get(&kind).and_then(|catalog| catalog.get(name))
    }

    /// Resolve a component name, honouring the virtual namespace.
    ///
    /// `kamelet:target` is looked up as `target` in the kamelet catalog; when
    /// that target is unknown the generic `kamelet` component stands in.
    pub fn get_catalog_lookup(&self, name: &str) -> CatalogLookup<'_> {
        let prefix = format!("{}:", VIRTUAL_NAMESPACE);
        if let Some(target) = name.strip_prefix(&prefix) {
            if let Some(entry) = self.get_component(CatalogKind::Kamelet, target) {
                return CatalogLookup {
                    kind: CatalogKind::Kamelet,
                    name: target.to_string(),
                    entry: Some(entry),
                };
            }
            return CatalogLookup {
                kind: CatalogKind::Component,
                name: VIRTUAL_NAMESPACE.to_string(),
                entry: self.get_component(CatalogKind::Component, VIRTUAL_NAMESPACE),
            };
        }

        CatalogLookup {
            kind: CatalogKind::Component,
            name: name.to_string(),
            entry: self.get_component(CatalogKind::Component, name),
        }
    }

    pub fn clear_catalogs(&mut self) {
        self.catalogs.clear();
        self.groups.clear();
        self.bundle_hash.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.values().all(|c| c.is_empty())
    }

    /// Find a node type in the node kinds, first match wins
    pub fn find_entry(&self, name: &str) -> Option<(CatalogKind, &CatalogEntry)> {
        CatalogKind::NODE_KINDS
            .into_iter()
            .find_map(|kind| self.get_component(kind, name).map(|entry| (kind, entry)))
    }

    /// Whether some entry declares `name` as its group
    pub fn is_group(&self, name: &str) -> bool {
        self.groups.contains(name)
    }

    /// Walk the group chain from `name` up to its root ancestor (leaf first)
    pub fn group_chain(&self, kind: CatalogKind, name: &str) -> Vec<(String, &CatalogEntry)> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(name.to_string());

        while let Some(current_name) = current.take() {
            if !visited.insert(current_name.clone()) {
                break;
            }
            let Some(entry) = self.get_component(kind, &current_name) else {
                break;
            };
            current = entry.group.clone();
            chain.push((current_name, entry));
        }

        chain
    }

    /// Fuzzy search entry names and titles of one kind
    pub fn search(&self, kind: CatalogKind, query: &str, limit: usize) -> Vec<CatalogSearchResult> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let Some(catalog) = self.catalogs.get(&kind) else {
            return Vec::new();
        };

        let matcher = SkimMatcherV2::default();
        let mut results: Vec<CatalogSearchResult> = catalog
            .iter()
            .filter_map(|(name, entry)| {
                let by_name = matcher.fuzzy_match(name, query);
                let by_title = entry
                    .title
                    .as_deref()
                    .and_then(|title| matcher.fuzzy_match(title, query));
                let score = by_name.max(by_title)?;
                Some(CatalogSearchResult {
                    kind,
                    name: name.clone(),
                    title: entry.title.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        results.truncate(limit);
        results
    }

    fn rebuild_groups(&mut self) {
        self.groups = self
            .catalogs
            .values()
            .flat_map(|catalog| catalog.values())
            .filter_map(|entry| entry.group.clone())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(value: Value) -> CatalogMap {
        serde_json::from_value(value).unwrap()
    }

    fn registry() -> CatalogRegistry {
        CatalogRegistry::new()
            .with_catalog(
                CatalogKind::Component,
                catalog(json!({
                    "timer": { "title": "Timer", "properties": { "timerName": { "index": 0, "required": true } } },
                    "kamelet": { "title": "Kamelet", "properties": { "templateId": { "index": 0 } } }
                })),
            )
            .with_catalog(
                CatalogKind::Kamelet,
                catalog(json!({
                    "beer-source": { "title": "Beer Source", "properties": { "period": { "index": 0 } } }
                })),
            )
            .with_catalog(
                CatalogKind::TestAction,
                catalog(json!({
                    "camel": { "title": "Camel" },
                    "camel-jbang": { "group": "camel" },
                    "camel-jbang-run": { "group": "camel-jbang", "title": "Run integration" },
                    "loop-a": { "group": "loop-b" },
                    "loop-b": { "group": "loop-a" }
                })),
            )
    }

    #[test]
    fn test_get_component() {
        let registry = registry();
        assert!(registry.get_component(CatalogKind::Component, "timer").is_some());
        assert!(registry.get_component(CatalogKind::Component, "missing").is_none());
        assert!(registry.get_component(CatalogKind::Processor, "timer").is_none());
    }

    #[test]
    fn test_lookup_virtual_namespace() {
        let registry = registry();

        let lookup = registry.get_catalog_lookup("kamelet:beer-source");
        assert_eq!(lookup.kind, CatalogKind::Kamelet);
        assert_eq!(lookup.name, "beer-source");
        assert!(lookup.is_resolved());

        let fallback = registry.get_catalog_lookup("kamelet:unknown-source");
        assert_eq!(fallback.kind, CatalogKind::Component);
        assert_eq!(fallback.name, "kamelet");
        assert_eq!(fallback.entry.and_then(|e| e.title.as_deref()), Some("Kamelet"));
    }

    #[test]
    fn test_lookup_plain_name() {
        let registry = registry();
        assert!(registry.get_catalog_lookup("timer").is_resolved());
        assert!(!registry.get_catalog_lookup("nope").is_resolved());
    }

    #[test]
    fn test_group_chain_leaf_to_root() {
        let registry = registry();
        let chain: Vec<String> = registry
            .group_chain(CatalogKind::TestAction, "camel-jbang-run")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(chain, vec!["camel-jbang-run", "camel-jbang", "camel"]);
        assert!(registry.is_group("camel"));
        assert!(!registry.is_group("camel-jbang-run"));
    }

    #[test]
    fn test_group_chain_stops_on_cycle() {
        let registry = registry();
        assert_eq!(registry.group_chain(CatalogKind::TestAction, "loop-a").len(), 2);
    }

    #[test]
    fn test_clear_catalogs() {
        let mut registry = registry();
        assert!(!registry.is_empty());
        registry.clear_catalogs();
        assert!(registry.is_empty());
        assert!(registry.get_catalog_by_key(CatalogKind::Component).is_none());
        assert!(!registry.is_group("camel"));
    }

    #[test]
    fn test_search_ranks_title_matches() {
        let registry = registry();
        let results = registry.search(CatalogKind::TestAction, "run", 5);
        assert_eq!(results.first().map(|r| r.name.as_str()), Some("camel-jbang-run"));
        assert!(registry.search(CatalogKind::Function, "run", 5).is_empty());
    }

    #[test]
    fn test_property_direction() {
        let producer = PropertyDef { label: Some("producer,advanced".into()), ..Default::default() };
        let both = PropertyDef { label: Some("consumer,producer".into()), ..Default::default() };
        assert!(producer.is_producer_only());
        assert!(!producer.is_consumer_only());
        assert!(!both.is_producer_only());
        assert!(!both.is_consumer_only());
    }

    #[test]
    fn test_kind_file_stems() {
        for kind in CatalogKind::ALL {
            assert_eq!(CatalogKind::from_file_stem(kind.file_stem()), Some(kind));
        }
    }
}
