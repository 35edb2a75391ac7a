//! Flow Document Engine
//!
//! A path-addressed tree model for editing nested, step-oriented flow
//! documents: integration routes, route configuration fragments, pipes and
//! test cases.
//!
//! ## Features
//!
//! - **Visual Graph**: Documents become a navigable node tree with sibling
//!   links and placeholder slots
//! - **Structural Editing**: Insert, replace, remove, copy and paste by node path
//! - **Catalog Driven**: Containment, schemas and display names come from a
//!   pluggable type catalog
//! - **Validation**: Required-property checks or full JSON Schema validation
//! - **Canonical Order**: Deterministic key order for serialization and fingerprints
//!
//! ## Architecture
//!
//! ```text
//! catalog ──► container ──► visual ──► engine (FlowSession)
//!    │            │            ▲          │
//!    │            └──► mutation ◄─────────┤
//!    └──► schema ──► validation ◄─────────┤
//!    └──► sort ──► checksum ◄─────────────┘
//! ```

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod container;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod mutation;
pub mod path;
pub mod schema;
pub mod sort;
pub mod validation;
pub mod visual;

pub use catalog::{load_from_directory, CatalogEntry, CatalogKind, CatalogLookup, CatalogRegistry, LoadConfig, PropertyDef};
pub use checksum::Checksum;
pub use config::{EngineConfig, OutputFormat};
pub use container::{ContainerKind, ContainerSettings, ContainerTable};
pub use dialect::{Dialect, DialectStrategy, FragmentDialect, PipelineDialect, RouteDialect, TestDialect};
pub use engine::FlowSession;
pub use error::{FlowError, Result};
pub use mutation::{AddMode, ClipboardCopy, MutationEngine};
pub use path::{parse_path, resolve_type_and_component, to_real_path, PathSegment, TypeAndComponent};
pub use schema::{NodeSchema, SchemaResolver};
pub use sort::CanonicalSorter;
pub use validation::{format_missing, validate, validate_strict};
pub use visual::{BuildOptions, GraphBuilder, NodeId, VisualEdge, VisualGraph, VisualNode};
