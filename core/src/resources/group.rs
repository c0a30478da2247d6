//! `group` resource (§4.7): shells out to `groupadd`/`groupdel`/`gpasswd`;
//! state read from `/etc/group`. GID changes on existing entries are not
//! supported — only membership.

use std::collections::BTreeMap;
use std::process::Command;

use super::passwd::read_group;
use super::{diff_attributes, universal_diff, Ensure, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

#[derive(Debug)]
pub struct GroupResource {
    name: String,
    group_name: String,
    members: Vec<String>,
    ensure: Ensure,
    dependencies: Vec<String>,
}

impl GroupResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let group_name = attrs
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| name.clone());
        let members = attrs
            .get("members")
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        Ok(GroupResource {
            name,
            group_name,
            members,
            ensure: Ensure::from_attr(attrs.get("ensure")),
            dependencies,
        })
    }
}

impl Resource for GroupResource {
    fn type_(&self) -> &str {
        "group"
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
        let groups = read_group();
        match groups.get(&self.group_name) {
            None => Ok(State::absent()),
            Some(entry) => {
                let mut attrs = BTreeMap::new();
                let mut members = entry.members.clone();
                members.sort();
                attrs.insert(
                    "members".to_string(),
                    Value::List(members.into_iter().map(Value::String).collect()),
                );
                Ok(State::present(attrs))
            }
        }
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        let mut wanted = self.members.clone();
        wanted.sort();
        let mut desired = BTreeMap::new();
        desired.insert(
            "members".to_string(),
            Value::List(wanted.into_iter().map(Value::String).collect()),
        );
        let changes = diff_attributes(&desired, current);
        Ok(universal_diff(self.ensure, current, changes))
    }

    fn apply(&self, _ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError> {
        if !really_apply || !plan.has_changes() {
            return Ok(());
        }

        match self.ensure {
            Ensure::Absent => run(Command::new("groupdel").arg(&self.group_name), &self.id()),
            Ensure::Present => {
                if !plan.before.exists {
                    run(Command::new("groupadd").arg(&self.group_name), &self.id())?;
                }
                for member in &self.members {
                    run(
                        Command::new("gpasswd").args(["-a", member, &self.group_name]),
                        &self.id(),
                    )?;
                }
                Ok(())
            }
        }
    }
}

fn run(cmd: &mut Command, id: &str) -> Result<(), ResourceError> {
    let status = cmd.status().map_err(|e| ResourceError::Apply {
        id: id.to_string(),
        message: e.to_string(),
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(ResourceError::Apply {
            id: id.to_string(),
            message: format!("command exited with {status}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_name_defaults_to_resource_name() {
        let a = BTreeMap::new();
        let r = GroupResource::new("sudo".into(), &a, vec![]).unwrap();
        assert_eq!(r.group_name, "sudo");
    }

    #[test]
    fn group_name_can_be_overridden_by_name_attribute() {
        let mut a = BTreeMap::new();
        a.insert("name".to_string(), Value::String("wheel".to_string()));
        let r = GroupResource::new("sudo".into(), &a, vec![]).unwrap();
        assert_eq!(r.group_name, "wheel");
    }

    #[test]
    fn members_attribute_is_collected_as_strings() {
        let mut a = BTreeMap::new();
        a.insert(
            "members".to_string(),
            Value::List(vec![Value::String("bob".to_string()), Value::String("alice".to_string())]),
        );
        let r = GroupResource::new("sudo".into(), &a, vec![]).unwrap();
        assert_eq!(r.members, vec!["bob".to_string(), "alice".to_string()]);
    }

    #[test]
    fn diff_absent_group_with_ensure_present_is_create() {
        let mut a = BTreeMap::new();
        a.insert(
            "members".to_string(),
            Value::List(vec![Value::String("alice".to_string())]),
        );
        let r = GroupResource::new("sudo".into(), &a, vec![]).unwrap();
        let plan = r.diff(&EvalContext::empty(), &State::absent()).unwrap();
        assert_eq!(plan.action, crate::resources::Action::Create);
    }

    #[test]
    fn diff_noop_when_members_already_match_regardless_of_order() {
        let mut a = BTreeMap::new();
        a.insert(
            "members".to_string(),
            Value::List(vec![Value::String("bob".to_string()), Value::String("alice".to_string())]),
        );
        let r = GroupResource::new("sudo".into(), &a, vec![]).unwrap();
        let mut current = BTreeMap::new();
        current.insert(
            "members".to_string(),
            Value::List(vec![Value::String("alice".to_string()), Value::String("bob".to_string())]),
        );
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, crate::resources::Action::Noop);
    }

    #[test]
    fn diff_update_when_members_differ() {
        let mut a = BTreeMap::new();
        a.insert(
            "members".to_string(),
            Value::List(vec![Value::String("alice".to_string())]),
        );
        let r = GroupResource::new("sudo".into(), &a, vec![]).unwrap();
        let mut current = BTreeMap::new();
        current.insert(
            "members".to_string(),
            Value::List(vec![Value::String("bob".to_string())]),
        );
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert_eq!(plan.action, crate::resources::Action::Update);
    }
}
