//! `file` resource (§4.7): `path`, `content` XOR `source`, `owner?`, `group?`,
//! `mode?` (default `0644`), `ensure?`.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};

use sha2::{Digest, Sha256};

use super::{diff_attributes, universal_diff, Ensure, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

const DEFAULT_MODE: u32 = 0o644;

#[derive(Debug)]
pub struct FileResource {
    name: String,
    path: String,
    content: Option<String>,
    source: Option<String>,
    owner: Option<String>,
    group: Option<String>,
    mode: u32,
    ensure: Ensure,
    dependencies: Vec<String>,
}

impl FileResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let id = format!("file.{name}");
        let path = super::require_str(attrs, "path", &id)?;
        let content = super::attr_str(attrs, "content");
        let source = super::attr_str(attrs, "source");
        let ensure = Ensure::from_attr(attrs.get("ensure"));

        if ensure == Ensure::Present && content.is_none() && source.is_none() {
            return Err(ResourceError::Invalid {
                id,
                message: "`file` requires exactly one of `content` or `source`".to_string(),
            });
        }
        if content.is_some() && source.is_some() {
            return Err(ResourceError::Invalid {
                id,
                message: "`file` accepts only one of `content` or `source`, not both".to_string(),
            });
        }

        let mode = match super::attr_str(attrs, "mode") {
            Some(m) => u32::from_str_radix(m.trim_start_matches('0'), 8)
                .map_err(|_| ResourceError::Invalid {
                    id: id.clone(),
                    message: format!("invalid octal mode `{m}`"),
                })?,
            None => DEFAULT_MODE,
        };

        Ok(FileResource {
            name,
            path,
            content,
            source,
            owner: super::attr_str(attrs, "owner"),
            group: super::attr_str(attrs, "group"),
            mode,
            ensure,
            dependencies,
        })
    }

    fn desired_content(&self) -> Result<String, ResourceError> {
        if let Some(c) = &self.content {
            return Ok(c.clone());
        }
        if let Some(src) = &self.source {
            return fs::read_to_string(src).map_err(|e| ResourceError::Read {
                id: self.id(),
                message: format!("reading source `{src}`: {e}"),
            });
        }
        Ok(String::new())
    }
}

impl Resource for FileResource {
    fn type_(&self) -> &str {
        "file"
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

        let bytes = fs::read(&self.path).map_err(|e| ResourceError::Read {
            id: self.id(),
            message: e.to_string(),
        })?;
        let hash = format!("{:x}", Sha256::digest(&bytes));

        let mut attrs = BTreeMap::new();
        attrs.insert("content_hash".to_string(), Value::String(hash));
        attrs.insert(
            "mode".to_string(),
            Value::String(format!("{:o}", meta.permissions().mode() & 0o7777)),
        );
        if self.owner.is_some() {
            let passwd = super::passwd::read_passwd();
            if let Some(owner) = super::passwd::name_for_uid(&passwd, meta.uid()) {
                attrs.insert("owner".to_string(), Value::String(owner));
            }
        }
        if self.group.is_some() {
            let groups = super::passwd::read_group();
            if let Some(group) = super::passwd::name_for_gid(&groups, meta.gid()) {
                attrs.insert("group".to_string(), Value::String(group));
            }
        }
        Ok(State::present(attrs))
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        let content = self.desired_content()?;
        let hash = format!("{:x}", Sha256::digest(content.as_bytes()));

        let mut desired = BTreeMap::new();
        desired.insert("content_hash".to_string(), Value::String(hash));
        desired.insert(
            "mode".to_string(),
            Value::String(format!("{:o}", self.mode)),
        );
        if let Some(owner) = &self.owner {
            desired.insert("owner".to_string(), Value::String(owner.clone()));
        }
        if let Some(group) = &self.group {
            desired.insert("group".to_string(), Value::String(group.clone()));
        }

        let changes = diff_attributes(&desired, current);
        Ok(universal_diff(self.ensure, current, changes))
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
                return Ok(());
            }
            Ensure::Present => {}
        }

        let content = self.desired_content()?;
        let mut f = fs::File::create(&self.path).map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e.to_string(),
        })?;
        f.write_all(content.as_bytes())
            .map_err(|e| ResourceError::Apply {
                id: self.id(),
                message: e.to_string(),
            })?;
        drop(f);

        set_ownership(&self.path, self.owner.as_deref(), self.group.as_deref())
            .map_err(|e| ResourceError::Apply {
                id: self.id(),
                message: e,
            })?;

        // Set mode before and after ownership is a wash; what matters is
        // setting it again here, since a just-created file's mode can be
        // narrowed by the process umask regardless of what was requested.
        set_mode(&self.path, self.mode).map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e,
        })?;
        set_mode(&self.path, self.mode).map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e,
        })?;

        Ok(())
    }
}

pub(super) fn set_mode(path: &str, mode: u32) -> Result<(), String> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| e.to_string())
}

pub(super) fn set_ownership(path: &str, owner: Option<&str>, group: Option<&str>) -> Result<(), String> {
    if owner.is_none() && group.is_none() {
        return Ok(());
    }
    let passwd = super::passwd::read_passwd();
    let groups = super::passwd::read_group();

    let uid = owner.and_then(|o| passwd.get(o)).map(|e| e.uid);
    let gid = group
        .and_then(|g| groups.get(g))
        .map(|e| e.gid)
        .or_else(|| owner.and_then(|o| passwd.get(o)).map(|e| e.gid));

    let c_path = std::ffi::CString::new(path).map_err(|e| e.to_string())?;
    let rc = unsafe {
        libc::chown(
            c_path.as_ptr(),
            uid.map(|v| v as libc::uid_t).unwrap_or(u32::MAX as libc::uid_t),
            gid.map(|v| v as libc::gid_t).unwrap_or(u32::MAX as libc::gid_t),
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().to_string());
    }
    Ok(())
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
    fn requires_content_or_source() {
        let a = attrs(&[("path", "/tmp/x")]);
        let err = FileResource::new("x".into(), &a, vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_both_content_and_source() {
        let a = attrs(&[("path", "/tmp/x"), ("content", "hi"), ("source", "/tmp/y")]);
        let err = FileResource::new("x".into(), &a, vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn default_mode_is_0644() {
        let a = attrs(&[("path", "/tmp/x"), ("content", "hi")]);
        let r = FileResource::new("x".into(), &a, vec![]).unwrap();
        assert_eq!(r.mode, 0o644);
    }

    #[test]
    fn read_reports_the_actual_owner_so_diff_detects_ownership_drift() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motd");
        fs::write(&path, "hi").unwrap();

        let a = attrs(&[
            ("path", path.to_str().unwrap()),
            ("content", "hi"),
            ("owner", "definitely-not-the-real-owner"),
        ]);
        let r = FileResource::new("x".into(), &a, vec![]).unwrap();
        let ctx = EvalContext::empty();
        let current = r.read(&ctx).unwrap();
        let plan = r.diff(&ctx, &current).unwrap();
        assert!(plan.has_changes());
    }
}
