//! Configuration management for the flow document engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (flowdoc.toml)
//! - Environment variables (FLOWDOC__*)
//!
//! ## Example config file (flowdoc.toml):
//! ```toml
//! [catalog]
//! path = "./catalog"
//! file_prefix = "camel-catalog-aggregate-"
//!
//! [graph]
//! placeholders = true
//!
//! [validation]
//! strict = false
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::LoadConfig;
use crate::error::Result;
use crate::visual::BuildOptions;

/// Main configuration for the engine and the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where catalogs are loaded from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding one JSON file per catalog kind
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,

    /// Prefix shared by the catalog file names
    #[serde(default)]
    pub file_prefix: Option<String>,
}

/// Visual graph settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Emit placeholder nodes for insertable slots
    #[serde(default = "default_true")]
    pub placeholders: bool,
}

/// Validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Run full JSON Schema validation instead of the required-property check
    #[serde(default)]
    pub strict: bool,
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn render(&self, value: &serde_json::Value) -> Result<String> {
        let rendered = match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
            OutputFormat::Compact => serde_json::to_string(value)?,
        };
        Ok(rendered)
    }
}

// Default value functions
fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog")
}

fn default_true() -> bool {
    true
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            file_prefix: None,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { placeholders: true }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["flowdoc.toml", ".flowdoc.toml", "config/flowdoc.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "flowdoc") {
            let xdg_config = config_dir.config_dir().join("flowdoc.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // FLOWDOC__GRAPH__PLACEHOLDERS=false
        builder = builder.add_source(
            Environment::with_prefix("FLOWDOC")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the catalog path (resolves relative paths)
    pub fn catalog_path(&self) -> PathBuf {
        if self.catalog.path.is_absolute() {
            self.catalog.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.catalog.path)
        }
    }

    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            file_prefix: self.catalog.file_prefix.clone(),
            ..Default::default()
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            placeholders: self.graph.placeholders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.graph.placeholders);
        assert!(!config.validation.strict);
        assert_eq!(config.output.format, OutputFormat::Pretty);
        assert!(config.build_options().placeholders);
    }

    #[test]
    fn test_serialize_config() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[catalog]"));
        assert!(toml_str.contains("[graph]"));
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let path_str = path.to_str().unwrap();

        let mut config = EngineConfig::default();
        config.catalog.file_prefix = Some("camel-catalog-aggregate-".to_string());
        config.graph.placeholders = false;
        config.output.format = OutputFormat::Compact;
        config.save(path_str).unwrap();

        let loaded = EngineConfig::load_from(Some(path_str)).unwrap();
        assert!(!loaded.graph.placeholders);
        assert_eq!(loaded.output.format, OutputFormat::Compact);
        assert_eq!(loaded.load_config().file_prefix.as_deref(), Some("camel-catalog-aggregate-"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(EngineConfig::load_from(path.to_str()).is_err());
    }

    #[test]
    fn test_output_format_render() {
        let value = serde_json::json!({ "a": 1 });
        assert_eq!(OutputFormat::Compact.render(&value).unwrap(), r#"{"a":1}"#);
        assert!(OutputFormat::Pretty.render(&value).unwrap().contains('\n'));
    }
}
