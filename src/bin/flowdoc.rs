//! Flow Document CLI
//!
//! Renders, sorts and validates flow documents against a catalog directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use flowdoc::{load_from_directory, CatalogKind, CatalogRegistry, Dialect, EngineConfig, FlowSession};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowdoc")]
#[command(about = "Inspect, sort and validate flow documents")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    /// Catalog directory (overrides the configured path)
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the visual node tree of a document
    Tree {
        /// Document (JSON)
        document: PathBuf,
        /// route, fragment, pipeline or test
        #[arg(short, long, default_value = "route")]
        dialect: Dialect,
        /// Leave out placeholder nodes
        #[arg(long)]
        no_placeholders: bool,
        /// Print the nodes as JSON instead of an outline
        #[arg(long)]
        json: bool,
    },

    /// Print the document with canonically ordered keys
    Sort {
        /// Document (JSON)
        document: PathBuf,
        #[arg(short, long, default_value = "route")]
        dialect: Dialect,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report invalid nodes
    Validate {
        /// Document (JSON)
        document: PathBuf,
        #[arg(short, long, default_value = "route")]
        dialect: Dialect,
        /// Full JSON Schema validation
        #[arg(long)]
        strict: bool,
    },

    /// Fuzzy search catalog entries
    Search {
        query: String,
        /// Catalog kind (component, processor, testAction, ...)
        #[arg(short, long, default_value = "processor")]
        kind: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = EngineConfig::load_from(cli.config.as_deref())?;
    if let Some(path) = cli.catalog {
        config.catalog.path = path;
    }
    let catalog = Arc::new(load_catalog(&config)?);

    match cli.command {
        Commands::Tree {
            document,
            dialect,
            no_placeholders,
            json,
        } => {
            if no_placeholders {
                config.graph.placeholders = false;
            }
            let session = open(&document, dialect, catalog, config)?;
            let graph = session.graph();

            if json {
                let nodes: Vec<_> = graph.iter().map(|(_, node)| node).collect();
                let value = serde_json::to_value(&nodes)?;
                println!("{}", session.config().output.format.render(&value)?);
            } else {
                print!("{}", graph.render_tree());
            }
        }

        Commands::Sort {
            document,
            dialect,
            output,
        } => {
            let session = open(&document, dialect, catalog, config)?;
            let rendered = session.to_json_string()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("✅ Sorted document written to {}", path.display());
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Validate {
            document,
            dialect,
            strict,
        } => {
            if strict {
                config.validation.strict = true;
            }
            let session = open(&document, dialect, catalog, config)?;
            let report = session.validation_report();

            if report.is_empty() {
                println!("✅ {} is valid", document.display());
                return Ok(());
            }
            for (path, message) in &report {
                let path = if path.is_empty() { "<root>" } else { path.as_str() };
                println!("❌ {}: {}", path, message);
            }
            bail!("{} invalid node(s)", report.len());
        }

        Commands::Search { query, kind, limit } => {
            let Some(kind) = CatalogKind::from_file_stem(&kind) else {
                bail!("Unknown catalog kind: {}", kind);
            };
            let results = catalog.search(kind, &query, limit);
            if results.is_empty() {
                println!("No {} entries match '{}'", kind, query);
            }
            for result in results {
                match result.title {
                    Some(title) => println!("{:>5}  {}  ({})", result.score, result.name, title),
                    None => println!("{:>5}  {}", result.score, result.name),
                }
            }
        }
    }

    Ok(())
}

fn load_catalog(config: &EngineConfig) -> anyhow::Result<CatalogRegistry> {
    let path = config.catalog_path();
    if !path.is_dir() {
        warn!(path = %path.display(), "catalog directory not found, continuing with an empty catalog");
        return Ok(CatalogRegistry::new());
    }
    load_from_directory(&path, &config.load_config())
        .with_context(|| format!("Failed to load catalog from {}", path.display()))
}

fn open(
    document: &Path,
    dialect: Dialect,
    catalog: Arc<CatalogRegistry>,
    config: EngineConfig,
) -> anyhow::Result<FlowSession> {
    let content =
        std::fs::read_to_string(document).with_context(|| format!("Failed to read {}", document.display()))?;
    let value = serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", document.display()))?;
    Ok(FlowSession::with_config(dialect.strategy(), catalog, value, config))
}
