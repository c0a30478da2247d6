//! Error taxonomy for the configuration engine.
//!
//! Each component publishes its own `thiserror::Error` enum rather than a single
//! catch-all, so callers that need to match on a specific failure (tests, mostly)
//! can `downcast_ref` through an `eyre::Report` without losing the variant.

use thiserror::Error;

/// Errors raised while parsing and evaluating configuration: §7 "Configuration errors".
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("parse error in {file}: {message}")]
    Parse { file: String, message: String },
    #[error("unknown block kind: {0}")]
    UnknownBlockKind(String),
    #[error("missing required attribute `{attribute}` on {block}")]
    MissingAttribute { block: String, attribute: String },
    #[error("type constraint violation for `{name}`: expected {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),
    #[error("malformed variable assignment `{0}`, expected NAME=VALUE")]
    MalformedVariable(String),
    #[error("invalid checksum format `{0}`, expected `<algo>:<hex>`")]
    InvalidChecksumFormat(String),
    #[error("invalid type expression: {0}")]
    InvalidTypeExpression(String),
    #[error("evaluation error: {0}")]
    Eval(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("no HCL files found in {0}")]
    NoHclFiles(String),
    #[error("role source is not a directory: {0}")]
    RoleSourceNotDirectory(String),
    #[error("{0}")]
    Io(String),
}

/// Errors raised building or validating the dependency graph: §7 "Graph errors".
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("resource {0} depends on unknown resource: {1}")]
    UnknownDependency(String, String),
    #[error("dependency cycle detected: {0}")]
    Cycle(String),
}

/// Errors raised by a resource's Read/Apply operations: §7 "Read errors"/"Apply errors".
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("failed to read {id}: {message}")]
    Read { id: String, message: String },
    #[error("failed to apply {id}: {message}")]
    Apply { id: String, message: String },
    #[error("{id}: operation cancelled")]
    Cancelled { id: String },
    #[error("{id}: {message}")]
    Invalid { id: String, message: String },
}

/// Errors raised loading a role directory: §4.9.
#[derive(Error, Debug)]
pub enum RoleError {
    #[error("role {name}: {source}")]
    Config {
        name: String,
        #[source]
        source: ConfigError,
    },
    #[error("role {name}: {message}")]
    Invalid { name: String, message: String },
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}
