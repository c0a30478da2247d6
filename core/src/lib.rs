//! `hostcfg-core`: the configuration model, resource graph, and resource
//! handles for the `hostcfg` host configuration engine.
//!
//! This crate owns components C1–C9 and C14–C15: the value/type universe,
//! the expression evaluator (built on `hcl-rs`), the standard function
//! library, the schema decoder, the variable system, the resource registry
//! and handles, the dependency graph, the role loader, the default printer,
//! and the reference package/service backends plus the local facts
//! gatherer. Orchestration (C10, the Executor) and the CLI surface (C11)
//! live in the `hostcfg` binary crate, which depends on this one — mirroring
//! the host project's split between its config-model crates and its
//! `acutectl` binary crate.

pub mod error;
pub mod expr;
pub mod facts;
pub mod functions;
pub mod graph;
pub mod printer;
pub mod registry;
pub mod resources;
pub mod role;
pub mod schema;
pub mod types;
pub mod value;
pub mod variables;

pub use error::{ConfigError, GraphError, ResourceError, RoleError};
pub use expr::EvalContext;
pub use facts::Facts;
pub use graph::Graph;
pub use types::Type;
pub use value::Value;
