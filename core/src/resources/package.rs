//! `package` resource (§4.7): `name`, `version?`, `ensure?` ∈ {present,
//! absent, specific-version}. Delegates to a `PackageManager` backend.

use std::collections::BTreeMap;

use super::backend::PackageManager;
use super::{Action, Change, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

#[derive(Debug)]
pub struct PackageResource {
    name: String,
    pkg_name: String,
    version: Option<String>,
    ensure_absent: bool,
    dependencies: Vec<String>,
    manager: Box<dyn PackageManager>,
}

impl PackageResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
        manager: Box<dyn PackageManager>,
    ) -> Result<Self, ResourceError> {
        let id = format!("package.{name}");
        let pkg_name = super::require_str(attrs, "name", &id)?;
        let ensure_absent = matches!(super::attr_str(attrs, "ensure").as_deref(), Some("absent"));
        Ok(PackageResource {
            name,
            pkg_name,
            version: super::attr_str(attrs, "version"),
            ensure_absent,
            dependencies,
            manager,
        })
    }
}

impl Resource for PackageResource {
    fn type_(&self) -> &str {
        "package"
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
        let (installed, version) = self
            .manager
            .is_installed(&self.pkg_name)
            .map_err(|e| ResourceError::Read {
                id: self.id(),
                message: e,
            })?;
        if !installed {
            return Ok(State::absent());
        }
        let mut attrs = BTreeMap::new();
        if let Some(v) = version {
            attrs.insert("version".to_string(), Value::String(v));
        }
        Ok(State::present(attrs))
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        if self.ensure_absent {
            return Ok(if current.exists {
                Plan {
                    action: Action::Delete,
                    changes: vec![Change {
                        attribute: "version".to_string(),
                        old: current.get("version").cloned(),
                        new: None,
                    }],
                    before: current.clone(),
                    after: State::absent(),
                    skip_reason: None,
                }
            } else {
                Plan::noop(current.clone())
            });
        }

        let version_matches = match &self.version {
            Some(want) => current.get("version").and_then(Value::as_str) == Some(want.as_str()),
            None => true,
        };

        if current.exists && version_matches {
            return Ok(Plan::noop(current.clone()));
        }

        let action = if current.exists {
            Action::Update
        } else {
            Action::Create
        };
        let mut after = BTreeMap::new();
        if let Some(v) = &self.version {
            after.insert("version".to_string(), Value::String(v.clone()));
        }
        Ok(Plan {
            action,
            changes: vec![Change {
                attribute: "version".to_string(),
                old: current.get("version").cloned(),
                new: self.version.clone().map(Value::String),
            }],
            before: current.clone(),
            after: State::present(after),
            skip_reason: None,
        })
    }

    fn apply(&self, _ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError> {
        if !really_apply || !plan.has_changes() {
            return Ok(());
        }
        if self.ensure_absent {
            self.manager
                .remove(&self.pkg_name)
                .map_err(|e| ResourceError::Apply {
                    id: self.id(),
                    message: e,
                })
        } else {
            self.manager
                .install(&self.pkg_name, self.version.as_deref())
                .map_err(|e| ResourceError::Apply {
                    id: self.id(),
                    message: e,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug)]
    struct FakeManager {
        installed: RefCell<Option<String>>,
    }

    impl PackageManager for FakeManager {
        fn name(&self) -> &str {
            "fake"
        }

        fn is_installed(&self, _pkg: &str) -> Result<(bool, Option<String>), String> {
            match self.installed.borrow().clone() {
                Some(v) => Ok((true, Some(v))),
                None => Ok((false, None)),
            }
        }

        fn install(&self, _pkg: &str, version: Option<&str>) -> Result<(), String> {
            *self.installed.borrow_mut() = Some(version.unwrap_or("installed").to_string());
            Ok(())
        }

        fn remove(&self, _pkg: &str) -> Result<(), String> {
            *self.installed.borrow_mut() = None;
            Ok(())
        }
    }

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn requires_name() {
        let a = BTreeMap::new();
        let manager = Box::new(FakeManager { installed: RefCell::new(None) });
        assert!(PackageResource::new("x".into(), &a, vec![], manager).is_err());
    }

    #[test]
    fn diff_absent_package_with_default_ensure_is_create() {
        let a = attrs(&[("name", "curl")]);
        let manager = Box::new(FakeManager { installed: RefCell::new(None) });
        let r = PackageResource::new("x".into(), &a, vec![], manager).unwrap();
        let plan = r.diff(&EvalContext::empty(), &State::absent()).unwrap();
        assert_eq!(plan.action, Action::Create);
    }

    #[test]
    fn diff_noop_when_installed_with_no_version_pin() {
        let a = attrs(&[("name", "curl")]);
        let manager = Box::new(FakeManager { installed: RefCell::new(None) });
        let r = PackageResource::new("x".into(), &a, vec![], manager).unwrap();
        let mut current = BTreeMap::new();
        current.insert("version".to_string(), Value::String("7.68.0".to_string()));
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, Action::Noop);
    }

    #[test]
    fn diff_update_when_installed_version_does_not_match_pin() {
        let a = attrs(&[("name", "curl"), ("version", "7.80.0")]);
        let manager = Box::new(FakeManager { installed: RefCell::new(None) });
        let r = PackageResource::new("x".into(), &a, vec![], manager).unwrap();
        let mut current = BTreeMap::new();
        current.insert("version".to_string(), Value::String("7.68.0".to_string()));
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, Action::Update);
    }

    #[test]
    fn diff_ensure_absent_when_present_is_delete() {
        let a = attrs(&[("name", "curl"), ("ensure", "absent")]);
        let manager = Box::new(FakeManager { installed: RefCell::new(None) });
        let r = PackageResource::new("x".into(), &a, vec![], manager).unwrap();
        let mut current = BTreeMap::new();
        current.insert("version".to_string(), Value::String("7.68.0".to_string()));
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, Action::Delete);
    }

    #[test]
    fn diff_ensure_absent_when_already_absent_is_noop() {
        let a = attrs(&[("name", "curl"), ("ensure", "absent")]);
        let manager = Box::new(FakeManager { installed: RefCell::new(None) });
        let r = PackageResource::new("x".into(), &a, vec![], manager).unwrap();
        let plan = r.diff(&EvalContext::empty(), &State::absent()).unwrap();
        assert_eq!(plan.action, Action::Noop);
    }

    #[test]
    fn apply_install_delegates_to_manager() {
        let a = attrs(&[("name", "curl")]);
        let manager = Box::new(FakeManager { installed: RefCell::new(None) });
        let r = PackageResource::new("x".into(), &a, vec![], manager).unwrap();
        let plan = r.diff(&EvalContext::empty(), &State::absent()).unwrap();
        r.apply(&EvalContext::empty(), &plan, true).unwrap();
        assert_eq!(r.manager.is_installed("curl").unwrap().0, true);
    }
}
