//! `stat` resource (§4.7): `path`, `follow?` (default true). Read-only probe,
//! never produces a change — useful as a reference source for other
//! resources (e.g. `stat.config_dir.isdir`).

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::MetadataExt;

use super::{Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

#[derive(Debug)]
pub struct StatResource {
    name: String,
    path: String,
    follow: bool,
    dependencies: Vec<String>,
}

impl StatResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let id = format!("stat.{name}");
        Ok(StatResource {
            path: super::require_str(attrs, "path", &id)?,
            follow: attrs.get("follow").and_then(Value::as_bool).unwrap_or(true),
            name,
            dependencies,
        })
    }
}

impl Resource for StatResource {
    fn type_(&self) -> &str {
        "stat"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn read(&self, _ctx: &EvalContext) -> Result<State, ResourceError> {
        let meta = if self.follow {
            fs::metadata(&self.path)
        } else {
            fs::symlink_metadata(&self.path)
        };

        let meta = match meta {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut attrs = BTreeMap::new();
                attrs.insert("exists".to_string(), Value::Bool(false));
                return Ok(State::present(attrs));
            }
            Err(e) => {
                return Err(ResourceError::Read {
                    id: self.id(),
                    message: e.to_string(),
                })
            }
        };

        let mut attrs = BTreeMap::new();
        attrs.insert("exists".to_string(), Value::Bool(true));
        attrs.insert("isfile".to_string(), Value::Bool(meta.is_file()));
        attrs.insert("isdir".to_string(), Value::Bool(meta.is_dir()));
        attrs.insert("islink".to_string(), Value::Bool(meta.file_type().is_symlink()));
        attrs.insert("size".to_string(), Value::from(meta.len() as i64));
        attrs.insert(
            "mode".to_string(),
            Value::String(format!("{:o}", meta.mode() & 0o7777)),
        );
        attrs.insert("uid".to_string(), Value::from(meta.uid() as i64));
        attrs.insert("gid".to_string(), Value::from(meta.gid() as i64));
        attrs.insert("mtime".to_string(), Value::from(meta.mtime()));
        attrs.insert("atime".to_string(), Value::from(meta.atime()));
        Ok(State::present(attrs))
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        Ok(Plan::noop(current.clone()))
    }

    fn apply(&self, _ctx: &EvalContext, _plan: &Plan, _really_apply: bool) -> Result<(), ResourceError> {
        Ok(())
    }
}
