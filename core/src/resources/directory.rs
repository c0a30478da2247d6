//! `directory` resource (§4.7): `path`, `owner?`, `group?`, `mode?` (default
//! `0755`), `recursive?`, `ensure?`.

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;

use super::{diff_attributes, universal_diff, Ensure, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

const DEFAULT_MODE: u32 = 0o755;

#[derive(Debug)]
pub struct DirectoryResource {
    name: String,
    path: String,
    owner: Option<String>,
    group: Option<String>,
    mode: u32,
    recursive: bool,
    ensure: Ensure,
    dependencies: Vec<String>,
}

impl DirectoryResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let id = format!("directory.{name}");
        let path = super::require_str(attrs, "path", &id)?;
        let mode = match super::attr_str(attrs, "mode") {
            Some(m) => u32::from_str_radix(&m, 8).map_err(|_| ResourceError::Invalid {
                id: id.clone(),
                message: format!("invalid octal mode `{m}`"),
            })?,
            None => DEFAULT_MODE,
        };
        let recursive = attrs
            .get("recursive")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(DirectoryResource {
            name,
            path,
            owner: super::attr_str(attrs, "owner"),
            group: super::attr_str(attrs, "group"),
            mode,
            recursive,
            ensure: Ensure::from_attr(attrs.get("ensure")),
            dependencies,
        })
    }
}

impl Resource for DirectoryResource {
    fn type_(&self) -> &str {
        "directory"
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
        let meta = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(State::absent()),
            Err(e) => {
                return Err(ResourceError::Read {
                    id: self.id(),
                    message: e.to_string(),
                })
            }
        };
        if !meta.is_dir() {
            return Err(ResourceError::Read {
                id: self.id(),
                message: format!("{} exists and is not a directory", self.path),
            });
        }
        let mut attrs = BTreeMap::new();
        attrs.insert(
            "mode".to_string(),
            Value::String(format!("{:o}", meta.permissions().mode() & 0o7777)),
        );
        Ok(State::present(attrs))
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        let mut desired = BTreeMap::new();
        desired.insert(
            "mode".to_string(),
            Value::String(format!("{:o}", self.mode)),
        );
        let changes = diff_attributes(&desired, current);
        Ok(universal_diff(self.ensure, current, changes))
    }

    fn apply(&self, _ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError> {
        if !really_apply || !plan.has_changes() {
            return Ok(());
        }

        match self.ensure {
            Ensure::Absent => {
                let result = if self.recursive {
                    fs::remove_dir_all(&self.path)
                } else {
                    fs::remove_dir(&self.path)
                };
                if let Err(e) = result {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(ResourceError::Apply {
                            id: self.id(),
                            message: e.to_string(),
                        });
                    }
                }
                return Ok(());
            }
            Ensure::Present => {}
        }

        let result = if self.recursive {
            fs::create_dir_all(&self.path)
        } else {
            fs::create_dir(&self.path)
        };
        if let Err(e) = result {
            if e.kind() != std::io::ErrorKind::AlreadyExists {
                return Err(ResourceError::Apply {
                    id: self.id(),
                    message: e.to_string(),
                });
            }
        }

        super::file::set_mode(&self.path, self.mode).map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e,
        })?;

        if self.recursive {
            apply_recursive_ownership(&self.path, self.owner.as_deref(), self.group.as_deref())
                .map_err(|e| ResourceError::Apply {
                    id: self.id(),
                    message: e,
                })?;
        } else {
            super::file::set_ownership(&self.path, self.owner.as_deref(), self.group.as_deref())
                .map_err(|e| ResourceError::Apply {
                    id: self.id(),
                    message: e,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn default_mode_is_0755() {
        let a = attrs(&[("path", "/tmp/x")]);
        let r = DirectoryResource::new("x".into(), &a, vec![]).unwrap();
        assert_eq!(r.mode, 0o755);
    }

    #[test]
    fn parses_explicit_octal_mode() {
        let a = attrs(&[("path", "/tmp/x"), ("mode", "700")]);
        let r = DirectoryResource::new("x".into(), &a, vec![]).unwrap();
        assert_eq!(r.mode, 0o700);
    }

    #[test]
    fn rejects_malformed_mode() {
        let a = attrs(&[("path", "/tmp/x"), ("mode", "not-octal")]);
        assert!(DirectoryResource::new("x".into(), &a, vec![]).is_err());
    }

    #[test]
    fn read_reports_absent_for_missing_path() {
        let a = attrs(&[("path", "/nonexistent/hostcfg-test-dir")]);
        let r = DirectoryResource::new("x".into(), &a, vec![]).unwrap();
        let state = r.read(&EvalContext::empty()).unwrap();
        assert!(!state.exists);
    }

    #[test]
    fn diff_against_absent_is_create() {
        let a = attrs(&[("path", "/tmp/hostcfg-test-dir")]);
        let r = DirectoryResource::new("x".into(), &a, vec![]).unwrap();
        let plan = r.diff(&EvalContext::empty(), &State::absent()).unwrap();
        assert_eq!(plan.action, crate::resources::Action::Create);
    }
}

fn apply_recursive_ownership(path: &str, owner: Option<&str>, group: Option<&str>) -> Result<(), String> {
    super::file::set_ownership(path, owner, group)?;
    let entries = fs::read_dir(path).map_err(|e| e.to_string())?;
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let p = entry.path();
        let p_str = p.to_string_lossy().to_string();
        if p.is_dir() {
            apply_recursive_ownership(&p_str, owner, group)?;
        } else {
            super::file::set_ownership(&p_str, owner, group)?;
        }
    }
    Ok(())
}
