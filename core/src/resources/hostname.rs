//! `hostname` resource (§4.7): `name` (req). Persists via `/etc/hostname`,
//! applies live via the OS hostname command.

use std::collections::BTreeMap;
use std::fs;
use std::process::Command;

use super::{diff_attributes, universal_diff, Ensure, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

#[derive(Debug)]
pub struct HostnameResource {
    name: String,
    desired: String,
    dependencies: Vec<String>,
}

impl HostnameResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let id = format!("hostname.{name}");
        Ok(HostnameResource {
            desired: super::require_str(attrs, "name", &id)?,
            name,
            dependencies,
        })
    }
}

impl Resource for HostnameResource {
    fn type_(&self) -> &str {
        "hostname"
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
        let current = fs::read_to_string("/etc/hostname")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let mut attrs = BTreeMap::new();
        attrs.insert("name".to_string(), Value::String(current));
        Ok(State::present(attrs))
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        let mut desired = BTreeMap::new();
        desired.insert("name".to_string(), Value::String(self.desired.clone()));
        let changes = diff_attributes(&desired, current);
        Ok(universal_diff(Ensure::Present, current, changes))
    }

    fn apply(&self, _ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError> {
        if !really_apply || !plan.has_changes() {
            return Ok(());
        }
        fs::write("/etc/hostname", format!("{}\n", self.desired)).map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e.to_string(),
        })?;

        let status = Command::new("hostnamectl")
            .args(["set-hostname", &self.desired])
            .status()
            .map_err(|e| ResourceError::Apply {
                id: self.id(),
                message: e.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ResourceError::Apply {
                id: self.id(),
                message: format!("hostnamectl exited with {status}"),
            })
        }
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
    fn requires_name() {
        let a = BTreeMap::new();
        assert!(HostnameResource::new("x".into(), &a, vec![]).is_err());
    }

    #[test]
    fn diff_update_when_name_differs() {
        let a = attrs(&[("name", "newhost")]);
        let r = HostnameResource::new("x".into(), &a, vec![]).unwrap();
        let mut current = BTreeMap::new();
        current.insert("name".to_string(), Value::String("oldhost".to_string()));
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, crate::resources::Action::Update);
    }

    #[test]
    fn diff_noop_when_name_already_matches() {
        let a = attrs(&[("name", "samehost")]);
        let r = HostnameResource::new("x".into(), &a, vec![]).unwrap();
        let mut current = BTreeMap::new();
        current.insert("name".to_string(), Value::String("samehost".to_string()));
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, crate::resources::Action::Noop);
    }
}
