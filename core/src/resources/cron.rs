//! `cron` resource (§4.7): `command`, `schedule`, `user?`, `ensure?`.
//! Identified by a trailing marker comment `# hostcfg: <name>`, making the
//! marker — not the schedule or command text — the stable identity across
//! edits.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

use super::{universal_diff, Ensure, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

#[derive(Debug)]
pub struct CronResource {
    name: String,
    command: String,
    schedule: String,
    user: Option<String>,
    ensure: Ensure,
    dependencies: Vec<String>,
}

impl CronResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let id = format!("cron.{name}");
        Ok(CronResource {
            command: super::require_str(attrs, "command", &id)?,
            schedule: super::require_str(attrs, "schedule", &id)?,
            user: super::attr_str(attrs, "user"),
            ensure: Ensure::from_attr(attrs.get("ensure")),
            dependencies,
            name,
        })
    }

    fn marker(&self) -> String {
        format!("# hostcfg: {}", self.name)
    }

    fn crontab_user_args(&self) -> Vec<String> {
        match &self.user {
            Some(u) => vec!["-u".to_string(), u.clone()],
            None => vec![],
        }
    }

    fn read_crontab(&self) -> Result<String, String> {
        let mut args = self.crontab_user_args();
        args.push("-l".to_string());
        let output = Command::new("crontab").args(&args).output().map_err(|e| e.to_string())?;
        if !output.status.success() {
            // No crontab for user yet: `crontab -l` exits non-zero.
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn write_crontab(&self, content: &str) -> Result<(), String> {
        let mut args = self.crontab_user_args();
        args.push("-".to_string());
        let mut child = Command::new("crontab")
            .args(&args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| e.to_string())?;
        child
            .stdin
            .as_mut()
            .ok_or("failed to open crontab stdin")?
            .write_all(content.as_bytes())
            .map_err(|e| e.to_string())?;
        let status = child.wait().map_err(|e| e.to_string())?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("crontab exited with {status}"))
        }
    }

    fn find_entry(&self, crontab: &str) -> Option<(String, String)> {
        let marker = self.marker();
        crontab.lines().find_map(|line| {
            let line = line.strip_suffix(marker.as_str())?.trim_end();
            let (schedule, command) = split_cron_line(line)?;
            Some((schedule, command))
        })
    }
}

fn split_cron_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.splitn(6, char::is_whitespace);
    let schedule: Vec<&str> = (0..5).filter_map(|_| parts.next()).collect();
    if schedule.len() != 5 {
        return None;
    }
    let command = parts.next()?.to_string();
    Some((schedule.join(" "), command))
}

impl Resource for CronResource {
    fn type_(&self) -> &str {
        "cron"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ResourceError> {
        if self.schedule.split_whitespace().count() != 5 {
            return Err(ResourceError::Invalid {
                id: self.id(),
                message: format!("schedule `{}` must have exactly 5 fields", self.schedule),
            });
        }
        Ok(())
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn read(&self, _ctx: &EvalContext) -> Result<State, ResourceError> {
        let crontab = self.read_crontab().map_err(|e| ResourceError::Read {
            id: self.id(),
            message: e,
        })?;
        match self.find_entry(&crontab) {
            None => Ok(State::absent()),
            Some((schedule, command)) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("schedule".to_string(), Value::String(schedule));
                attrs.insert("command".to_string(), Value::String(command));
                Ok(State::present(attrs))
            }
        }
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        let mut desired = BTreeMap::new();
        desired.insert("schedule".to_string(), Value::String(self.schedule.clone()));
        desired.insert("command".to_string(), Value::String(self.command.clone()));
        let changes = super::diff_attributes(&desired, current);
        Ok(universal_diff(self.ensure, current, changes))
    }

    fn apply(&self, _ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError> {
        if !really_apply || !plan.has_changes() {
            return Ok(());
        }
        let crontab = self.read_crontab().map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e,
        })?;
        let marker = self.marker();
        let mut lines: Vec<String> = crontab
            .lines()
            .filter(|l| !l.trim_end().ends_with(marker.as_str()))
            .map(str::to_string)
            .collect();

        if self.ensure == Ensure::Present {
            lines.push(format!("{} {} {}", self.schedule, self.command, marker));
        }

        let mut new_crontab = lines.join("\n");
        if !new_crontab.is_empty() {
            new_crontab.push('\n');
        }
        self.write_crontab(&new_crontab)
            .map_err(|e| ResourceError::Apply {
                id: self.id(),
                message: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_marked_entry() {
        let crontab = "0 3 * * * /usr/bin/backup.sh # hostcfg: nightly_backup\n";
        let res = CronResource {
            name: "nightly_backup".into(),
            command: String::new(),
            schedule: String::new(),
            user: None,
            ensure: Ensure::Present,
            dependencies: vec![],
        };
        let (schedule, command) = res.find_entry(crontab).unwrap();
        assert_eq!(schedule, "0 3 * * *");
        assert_eq!(command, "/usr/bin/backup.sh");
    }
}
