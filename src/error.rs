//! Error types for the flow document engine
//!
//! Most engine operations degrade to neutral results instead of failing.
//! The variants below cover the few places where a caller has to be told.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Flow document engine errors
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Cannot resolve type name for path '{path}': it ends in two indices")]
    UnresolvableType { path: String },

    #[error("Incompatible dialect: cannot paste {from} content into a {to} document")]
    IncompatibleDialect { from: String, to: String },

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
