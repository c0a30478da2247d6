//! `user` resource (§4.7): shells out to `useradd`/`usermod`/`userdel`; state
//! read from `/etc/passwd`. UID changes on existing entries are not
//! supported — only shell, home, comment, and supplementary groups.

use std::collections::BTreeMap;
use std::process::Command;

use super::passwd::{read_group, read_passwd};
use super::{diff_attributes, universal_diff, Ensure, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

#[derive(Debug)]
pub struct UserResource {
    name: String,
    username: String,
    shell: Option<String>,
    home: Option<String>,
    comment: Option<String>,
    groups: Vec<String>,
    ensure: Ensure,
    dependencies: Vec<String>,
}

impl UserResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let username = attrs
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| name.clone());
        let groups = attrs
            .get("groups")
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        Ok(UserResource {
            name,
            username,
            shell: super::attr_str(attrs, "shell"),
            home: super::attr_str(attrs, "home"),
            comment: super::attr_str(attrs, "comment"),
            groups,
            ensure: Ensure::from_attr(attrs.get("ensure")),
            dependencies,
        })
    }
}

impl Resource for UserResource {
    fn type_(&self) -> &str {
        "user"
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
        let passwd = read_passwd();
        match passwd.get(&self.username) {
            None => Ok(State::absent()),
            Some(entry) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("shell".to_string(), Value::String(entry.shell.clone()));
                attrs.insert("home".to_string(), Value::String(entry.home.clone()));
                attrs.insert("comment".to_string(), Value::String(entry.comment.clone()));

                let mut groups: Vec<String> = read_group()
                    .values()
                    .filter(|g| g.members.contains(&self.username))
                    .map(|g| g.name.clone())
                    .collect();
                groups.sort();
                attrs.insert(
                    "groups".to_string(),
                    Value::List(groups.into_iter().map(Value::String).collect()),
                );

                Ok(State::present(attrs))
            }
        }
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        let mut desired = BTreeMap::new();
        if let Some(s) = &self.shell {
            desired.insert("shell".to_string(), Value::String(s.clone()));
        }
        if let Some(h) = &self.home {
            desired.insert("home".to_string(), Value::String(h.clone()));
        }
        if let Some(c) = &self.comment {
            desired.insert("comment".to_string(), Value::String(c.clone()));
        }
        if !self.groups.is_empty() {
            let mut wanted = self.groups.clone();
            wanted.sort();
            desired.insert(
                "groups".to_string(),
                Value::List(wanted.into_iter().map(Value::String).collect()),
            );
        }
        let changes = diff_attributes(&desired, current);
        Ok(universal_diff(self.ensure, current, changes))
    }

    fn apply(&self, _ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError> {
        if !really_apply || !plan.has_changes() {
            return Ok(());
        }

        match self.ensure {
            Ensure::Absent => run(
                Command::new("userdel").arg(&self.username),
                &self.id(),
            ),
            Ensure::Present => {
                let exists = plan.before.exists;
                let mut cmd = Command::new(if exists { "usermod" } else { "useradd" });
                if let Some(shell) = &self.shell {
                    cmd.args(["-s", shell]);
                }
                if let Some(home) = &self.home {
                    cmd.args(["-d", home]);
                    if !exists {
                        cmd.arg("-m");
                    }
                }
                if let Some(comment) = &self.comment {
                    cmd.args(["-c", comment]);
                }
                if !self.groups.is_empty() {
                    cmd.args(["-G", &self.groups.join(",")]);
                }
                cmd.arg(&self.username);
                run(&mut cmd, &self.id())
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
