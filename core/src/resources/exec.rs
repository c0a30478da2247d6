//! `exec` resource (§4.7): `command`, `creates?`, `only_if?`, `unless?`,
//! `dir?`, `user?`. Read evaluates the gate; apply runs the command through
//! the system shell.

use std::collections::BTreeMap;
use std::process::Command;

use super::{Action, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

#[derive(Debug)]
pub struct ExecResource {
    name: String,
    command: String,
    creates: Option<String>,
    only_if: Option<String>,
    unless: Option<String>,
    dir: Option<String>,
    user: Option<String>,
    dependencies: Vec<String>,
}

impl ExecResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let id = format!("exec.{name}");
        Ok(ExecResource {
            command: super::require_str(attrs, "command", &id)?,
            creates: super::attr_str(attrs, "creates"),
            only_if: super::attr_str(attrs, "only_if"),
            unless: super::attr_str(attrs, "unless"),
            dir: super::attr_str(attrs, "dir"),
            user: super::attr_str(attrs, "user"),
            dependencies,
            name,
        })
    }

    fn shell(&self, command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn gate_says_noop(&self) -> bool {
        if let Some(creates) = &self.creates {
            if std::path::Path::new(creates).exists() {
                return true;
            }
        }
        if let Some(only_if) = &self.only_if {
            if !self.shell(only_if).status().map(|s| s.success()).unwrap_or(false) {
                return true;
            }
        }
        if let Some(unless) = &self.unless {
            if self.shell(unless).status().map(|s| s.success()).unwrap_or(false) {
                return true;
            }
        }
        false
    }
}

impl Resource for ExecResource {
    fn type_(&self) -> &str {
        "exec"
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
        Ok(State::absent())
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        if self.gate_says_noop() {
            return Ok(Plan::noop(current.clone()));
        }
        let mut after = BTreeMap::new();
        after.insert("command".to_string(), Value::String(self.command.clone()));
        Ok(Plan {
            action: Action::Create,
            changes: vec![super::Change {
                attribute: "command".to_string(),
                old: None,
                new: Some(Value::String(self.command.clone())),
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

        let mut cmd = if let Some(user) = &self.user {
            let mut c = Command::new("su");
            c.args(["-", user, "-c", &self.command]);
            c
        } else {
            self.shell(&self.command)
        };
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e.to_string(),
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(ResourceError::Apply {
                id: self.id(),
                message: format!("command exited with {status}"),
            })
        }
    }
}
