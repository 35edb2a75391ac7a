//! Catalog Loading
//!
//! Loads catalogs from a directory holding one JSON file per kind
//! (`component.json`, `processor.json`, `testAction.json`, ...). Files may
//! carry a common prefix (`camel-catalog-aggregate-component.json`).

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use super::{CatalogKind, CatalogMap, CatalogRegistry};

/// Configuration for catalog loading
#[derive(Debug, Clone, Default)]
pub struct LoadConfig {
    /// Prefix stripped from file stems before matching a kind
    pub file_prefix: Option<String>,
    /// Skip files whose relative path starts with one of these
    pub skip_prefixes: Vec<String>,
}

/// Load every recognised catalog file below `catalog_dir`
pub fn load_from_directory(catalog_dir: &Path, config: &LoadConfig) -> anyhow::Result<CatalogRegistry> {
    let mut registry = CatalogRegistry::new();
    let mut hasher = Sha256::new();

    for entry in WalkDir::new(catalog_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let relative_path = path.strip_prefix(catalog_dir)?;
        let relative_str = relative_path.to_string_lossy();
        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p.as_str())) {
            continue;
        }

        let Some(kind) = kind_for_file(path, config) else {
            debug!(file = %relative_str, "skipping file that names no catalog kind");
            continue;
        };

        let content = fs::read_to_string(path)?;
        hasher.update(content.as_bytes());

        let catalog: CatalogMap = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse catalog {}: {}", path.display(), e))?;

        debug!(%kind, entries = catalog.len(), file = %relative_str, "loaded catalog");
        registry.set_catalog(kind, catalog);
    }

    registry.bundle_hash = format!("{:x}", hasher.finalize());
    Ok(registry)
}

fn kind_for_file(path: &Path, config: &LoadConfig) -> Option<CatalogKind> {
    let stem = path.file_stem()?.to_str()?;
    let stem = match &config.file_prefix {
        Some(prefix) => stem.strip_prefix(prefix.as_str()).unwrap_or(stem),
        None => stem,
    };
    CatalogKind::from_file_stem(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_known_kinds() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("processor.json"),
            r#"{ "log": { "title": "Log", "properties": { "message": { "index": 0, "required": true } } } }"#,
        )
        .unwrap();
        fs::write(dir.path().join("README.json"), "{}").unwrap();

        let registry = load_from_directory(dir.path(), &LoadConfig::default()).unwrap();
        assert!(registry.get_component(CatalogKind::Processor, "log").is_some());
        assert_eq!(registry.bundle_hash.len(), 64);
    }

    #[test]
    fn test_load_with_prefix() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("camel-catalog-aggregate-component.json"),
            r#"{ "timer": { "title": "Timer" } }"#,
        )
        .unwrap();

        let config = LoadConfig {
            file_prefix: Some("camel-catalog-aggregate-".to_string()),
            ..Default::default()
        };
        let registry = load_from_directory(dir.path(), &config).unwrap();
        assert!(registry.get_component(CatalogKind::Component, "timer").is_some());
    }

    #[test]
    fn test_malformed_catalog_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("component.json"), "{ not json").unwrap();

        let err = load_from_directory(dir.path(), &LoadConfig::default()).unwrap_err();
        assert!(err.to_string().contains("component.json"));
    }
}
