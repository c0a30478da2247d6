//! `link` resource (§4.7): `path`, `target` (req unless absent), `force?`,
//! `ensure?`.

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::symlink;

use super::{Action, Change, Ensure, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

#[derive(Debug)]
pub struct LinkResource {
    name: String,
    path: String,
    target: Option<String>,
    force: bool,
    ensure: Ensure,
    dependencies: Vec<String>,
}

impl LinkResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let id = format!("link.{name}");
        let path = super::require_str(attrs, "path", &id)?;
        let target = super::attr_str(attrs, "target");
        let ensure = Ensure::from_attr(attrs.get("ensure"));
        if ensure == Ensure::Present && target.is_none() {
            return Err(ResourceError::Invalid {
                id,
                message: "`link` requires `target` unless `ensure = \"absent\"`".to_string(),
            });
        }
        Ok(LinkResource {
            name,
            path,
            target,
            force: attrs.get("force").and_then(Value::as_bool).unwrap_or(false),
            ensure,
            dependencies,
        })
    }
}

impl Resource for LinkResource {
    fn type_(&self) -> &str {
        "link"
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
        let meta = match fs::symlink_metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(State::absent()),
            Err(e) => {
                return Err(ResourceError::Read {
                    id: self.id(),
                    message: e.to_string(),
                })
            }
        };

        let is_symlink = meta.file_type().is_symlink();
        let mut attrs = BTreeMap::new();
        attrs.insert("is_symlink".to_string(), Value::Bool(is_symlink));
        if is_symlink {
            if let Ok(target) = fs::read_link(&self.path) {
                attrs.insert(
                    "target".to_string(),
                    Value::String(target.to_string_lossy().to_string()),
                );
            }
        }
        Ok(State::present(attrs))
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        let is_symlink = current
            .get("is_symlink")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if current.exists && !is_symlink && !self.force {
            return Err(ResourceError::Invalid {
                id: self.id(),
                message: format!(
                    "{} exists and is not a symlink; set force = true to replace it",
                    self.path
                ),
            });
        }

        match self.ensure {
            Ensure::Absent => {
                if !current.exists {
                    return Ok(Plan::noop(current.clone()));
                }
                Ok(Plan {
                    action: Action::Delete,
                    changes: vec![Change {
                        attribute: "target".to_string(),
                        old: current.get("target").cloned(),
                        new: None,
                    }],
                    before: current.clone(),
                    after: State::absent(),
                    skip_reason: None,
                })
            }
            Ensure::Present => {
                let target = self.target.clone().unwrap_or_default();
                let current_target = current.get("target").and_then(Value::as_str);
                if current.exists && is_symlink && current_target == Some(target.as_str()) {
                    return Ok(Plan::noop(current.clone()));
                }
                let action = if current.exists {
                    Action::Update
                } else {
                    Action::Create
                };
                let mut after_attrs = BTreeMap::new();
                after_attrs.insert("is_symlink".to_string(), Value::Bool(true));
                after_attrs.insert("target".to_string(), Value::String(target.clone()));
                Ok(Plan {
                    action,
                    changes: vec![Change {
                        attribute: "target".to_string(),
                        old: current.get("target").cloned(),
                        new: Some(Value::String(target)),
                    }],
                    before: current.clone(),
                    after: State::present(after_attrs),
                    skip_reason: None,
                })
            }
        }
    }

    fn apply(&self, _ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError> {
        if !really_apply || !plan.has_changes() {
            return Ok(());
        }

        match self.ensure {
            Ensure::Absent => {
                if let Err(e) = fs::remove_file(&self.path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(ResourceError::Apply {
                            id: self.id(),
                            message: e.to_string(),
                        });
                    }
                }
                Ok(())
            }
            Ensure::Present => {
                if plan.before.exists {
                    remove_existing(&self.path).map_err(|e| ResourceError::Apply {
                        id: self.id(),
                        message: e,
                    })?;
                }
                let target = self.target.clone().unwrap_or_default();
                symlink(&target, &self.path).map_err(|e| ResourceError::Apply {
                    id: self.id(),
                    message: e.to_string(),
                })
            }
        }
    }
}

fn remove_existing(path: &str) -> Result<(), String> {
    let meta = fs::symlink_metadata(path).map_err(|e| e.to_string())?;
    if meta.is_dir() && !meta.file_type().is_symlink() {
        fs::remove_dir_all(path).map_err(|e| e.to_string())
    } else {
        fs::remove_file(path).map_err(|e| e.to_string())
    }
}
