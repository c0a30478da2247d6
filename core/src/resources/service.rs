//! `service` resource (§4.7): `name`, `ensure?` ∈ {running, stopped},
//! `enabled?`. Delegates to a `ServiceManager` backend.

use std::collections::BTreeMap;

use super::backend::ServiceManager;
use super::{Action, Change, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

#[derive(Debug)]
pub struct ServiceResource {
    name: String,
    svc_name: String,
    want_running: bool,
    want_enabled: Option<bool>,
    dependencies: Vec<String>,
    manager: Box<dyn ServiceManager>,
}

impl ServiceResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
        manager: Box<dyn ServiceManager>,
    ) -> Result<Self, ResourceError> {
        let id = format!("service.{name}");
        let svc_name = super::require_str(attrs, "name", &id)?;
        let want_running = match super::attr_str(attrs, "ensure").as_deref() {
            Some("stopped") => false,
            _ => true,
        };
        Ok(ServiceResource {
            name,
            svc_name,
            want_running,
            want_enabled: attrs.get("enabled").and_then(Value::as_bool),
            dependencies,
            manager,
        })
    }
}

impl Resource for ServiceResource {
    fn type_(&self) -> &str {
        "service"
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
        let exists = self
            .manager
            .exists(&self.svc_name)
            .map_err(|e| ResourceError::Read {
                id: self.id(),
                message: e,
            })?;
        if !exists {
            return Ok(State::absent());
        }
        let running = self
            .manager
            .is_running(&self.svc_name)
            .map_err(|e| ResourceError::Read {
                id: self.id(),
                message: e,
            })?;
        let enabled = self
            .manager
            .is_enabled(&self.svc_name)
            .map_err(|e| ResourceError::Read {
                id: self.id(),
                message: e,
            })?;

        let mut attrs = BTreeMap::new();
        attrs.insert("running".to_string(), Value::Bool(running));
        attrs.insert("enabled".to_string(), Value::Bool(enabled));
        Ok(State::present(attrs))
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        // The service may not exist yet at plan time (its package may be
        // installed by a dependency between plan and apply). Record the
        // intent now; `apply` re-queries the backend before acting.
        let current_running = current.get("running").and_then(Value::as_bool);
        let current_enabled = current.get("enabled").and_then(Value::as_bool);

        let mut changes = Vec::new();
        if current_running != Some(self.want_running) {
            changes.push(Change {
                attribute: "running".to_string(),
                old: current_running.map(Value::Bool),
                new: Some(Value::Bool(self.want_running)),
            });
        }
        if let Some(want_enabled) = self.want_enabled {
            if current_enabled != Some(want_enabled) {
                changes.push(Change {
                    attribute: "enabled".to_string(),
                    old: current_enabled.map(Value::Bool),
                    new: Some(Value::Bool(want_enabled)),
                });
            }
        }

        if changes.is_empty() {
            return Ok(Plan::noop(current.clone()));
        }

        let action = if current.exists {
            Action::Update
        } else {
            Action::Create
        };
        let mut after = BTreeMap::new();
        after.insert("running".to_string(), Value::Bool(self.want_running));
        if let Some(e) = self.want_enabled {
            after.insert("enabled".to_string(), Value::Bool(e));
        }
        Ok(Plan {
            action,
            changes,
            before: current.clone(),
            after: State::present(after),
            skip_reason: None,
        })
    }

    fn apply(&self, _ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError> {
        if !really_apply || !plan.has_changes() {
            return Ok(());
        }

        if self.want_running {
            self.manager
                .start(&self.svc_name)
                .map_err(|e| ResourceError::Apply {
                    id: self.id(),
                    message: e,
                })?;
        } else {
            self.manager
                .stop(&self.svc_name)
                .map_err(|e| ResourceError::Apply {
                    id: self.id(),
                    message: e,
                })?;
        }

        match self.want_enabled {
            Some(true) => self
                .manager
                .enable(&self.svc_name)
                .map_err(|e| ResourceError::Apply {
                    id: self.id(),
                    message: e,
                }),
            Some(false) => self
                .manager
                .disable(&self.svc_name)
                .map_err(|e| ResourceError::Apply {
                    id: self.id(),
                    message: e,
                }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug)]
    struct FakeManager {
        exists: bool,
        running: RefCell<bool>,
        enabled: RefCell<bool>,
    }

    impl ServiceManager for FakeManager {
        fn name(&self) -> &str {
            "fake"
        }
        fn exists(&self, _svc: &str) -> Result<bool, String> {
            Ok(self.exists)
        }
        fn is_running(&self, _svc: &str) -> Result<bool, String> {
            Ok(*self.running.borrow())
        }
        fn is_enabled(&self, _svc: &str) -> Result<bool, String> {
            Ok(*self.enabled.borrow())
        }
        fn start(&self, _svc: &str) -> Result<(), String> {
            *self.running.borrow_mut() = true;
            Ok(())
        }
        fn stop(&self, _svc: &str) -> Result<(), String> {
            *self.running.borrow_mut() = false;
            Ok(())
        }
        fn enable(&self, _svc: &str) -> Result<(), String> {
            *self.enabled.borrow_mut() = true;
            Ok(())
        }
        fn disable(&self, _svc: &str) -> Result<(), String> {
            *self.enabled.borrow_mut() = false;
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
        let manager = Box::new(FakeManager {
            exists: false,
            running: RefCell::new(false),
            enabled: RefCell::new(false),
        });
        assert!(ServiceResource::new("x".into(), &a, vec![], manager).is_err());
    }

    #[test]
    fn ensure_defaults_to_running() {
        let a = attrs(&[("name", "nginx")]);
        let manager = Box::new(FakeManager {
            exists: false,
            running: RefCell::new(false),
            enabled: RefCell::new(false),
        });
        let r = ServiceResource::new("x".into(), &a, vec![], manager).unwrap();
        assert!(r.want_running);
    }

    #[test]
    fn diff_update_when_stopped_but_should_be_running() {
        let a = attrs(&[("name", "nginx")]);
        let manager = Box::new(FakeManager {
            exists: true,
            running: RefCell::new(false),
            enabled: RefCell::new(false),
        });
        let r = ServiceResource::new("x".into(), &a, vec![], manager).unwrap();
        let mut current = BTreeMap::new();
        current.insert("running".to_string(), Value::Bool(false));
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, Action::Update);
    }

    #[test]
    fn diff_noop_when_already_in_desired_state() {
        let a = attrs(&[("name", "nginx")]);
        let manager = Box::new(FakeManager {
            exists: true,
            running: RefCell::new(true),
            enabled: RefCell::new(false),
        });
        let r = ServiceResource::new("x".into(), &a, vec![], manager).unwrap();
        let mut current = BTreeMap::new();
        current.insert("running".to_string(), Value::Bool(true));
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, Action::Noop);
    }

    #[test]
    fn diff_checks_enabled_when_declared() {
        let mut a = attrs(&[("name", "nginx")]);
        a.insert("enabled".to_string(), Value::Bool(true));
        let manager = Box::new(FakeManager {
            exists: true,
            running: RefCell::new(true),
            enabled: RefCell::new(false),
        });
        let r = ServiceResource::new("x".into(), &a, vec![], manager).unwrap();
        let mut current = BTreeMap::new();
        current.insert("running".to_string(), Value::Bool(true));
        current.insert("enabled".to_string(), Value::Bool(false));
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, Action::Update);
    }

    #[test]
    fn apply_start_delegates_to_manager() {
        let a = attrs(&[("name", "nginx")]);
        let manager = Box::new(FakeManager {
            exists: true,
            running: RefCell::new(false),
            enabled: RefCell::new(false),
        });
        let r = ServiceResource::new("x".into(), &a, vec![], manager).unwrap();
        let mut current = BTreeMap::new();
        current.insert("running".to_string(), Value::Bool(false));
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        r.apply(&EvalContext::empty(), &plan, true).unwrap();
        assert_eq!(r.manager.is_running("nginx").unwrap(), true);
    }
}
