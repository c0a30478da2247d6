//! Local `Facts` gatherer (C15, §4.15): a conservative, local-only fact
//! collector — never aborts a run, degrading to empty/`"unknown"` fields it
//! cannot determine on non-Linux hosts.

use std::collections::BTreeMap;

use crate::resources::passwd::read_passwd;
use crate::value::Value;

#[derive(Clone, Debug, Default)]
pub struct OsFacts {
    pub name: String,
    pub family: String,
    pub distribution: String,
    pub distribution_version: String,
}

#[derive(Clone, Debug, Default)]
pub struct CpuFacts {
    pub physical: u32,
    pub cores: u32,
}

#[derive(Clone, Debug, Default)]
pub struct UserFacts {
    pub name: String,
    pub home: String,
    pub uid: u32,
    pub gid: u32,
}

/// `{os, arch, hostname, fqdn, machine_id, package_managers, cpu, user, env}`
/// per §3/§6, gathered once per process and frozen into the eval context
/// under `fact`.
#[derive(Clone, Debug, Default)]
pub struct Facts {
    pub os: OsFacts,
    pub arch: String,
    pub hostname: String,
    pub fqdn: String,
    pub machine_id: String,
    pub package_managers: Vec<String>,
    pub cpu: CpuFacts,
    pub user: UserFacts,
    pub env: BTreeMap<String, String>,
}

impl Facts {
    pub fn gather() -> Facts {
        Facts {
            os: gather_os(),
            arch: std::env::consts::ARCH.to_string(),
            hostname: gather_hostname(),
            fqdn: gather_fqdn(),
            machine_id: std::fs::read_to_string("/etc/machine-id")
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            package_managers: gather_package_managers(),
            cpu: gather_cpu(),
            user: gather_user(),
            env: std::env::vars().collect(),
        }
    }

    /// Projects facts into a `Value::Object` for installation under the
    /// `fact` eval-context namespace (§3 "Eval context"). `include_env`
    /// governs `--no-env` (§6, `facts` subcommand).
    pub fn to_value(&self, include_env: bool) -> Value {
        let mut os = BTreeMap::new();
        os.insert("name".to_string(), Value::String(self.os.name.clone()));
        os.insert("family".to_string(), Value::String(self.os.family.clone()));
        os.insert(
            "distribution".to_string(),
            Value::String(self.os.distribution.clone()),
        );
        os.insert(
            "distribution_version".to_string(),
            Value::String(self.os.distribution_version.clone()),
        );

        let mut cpu = BTreeMap::new();
        cpu.insert("physical".to_string(), Value::from(self.cpu.physical as i64));
        cpu.insert("cores".to_string(), Value::from(self.cpu.cores as i64));

        let mut user = BTreeMap::new();
        user.insert("name".to_string(), Value::String(self.user.name.clone()));
        user.insert("home".to_string(), Value::String(self.user.home.clone()));
        user.insert("uid".to_string(), Value::from(self.user.uid as i64));
        user.insert("gid".to_string(), Value::from(self.user.gid as i64));

        let mut out = BTreeMap::new();
        out.insert("os".to_string(), Value::Object(os));
        out.insert("arch".to_string(), Value::String(self.arch.clone()));
        out.insert("hostname".to_string(), Value::String(self.hostname.clone()));
        out.insert("fqdn".to_string(), Value::String(self.fqdn.clone()));
        out.insert("machine_id".to_string(), Value::String(self.machine_id.clone()));
        out.insert(
            "package_managers".to_string(),
            Value::List(
                self.package_managers
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        out.insert("cpu".to_string(), Value::Object(cpu));
        out.insert("user".to_string(), Value::Object(user));
        if include_env {
            out.insert(
                "env".to_string(),
                Value::Object(
                    self.env
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                ),
            );
        }
        Value::Object(out)
    }
}

#[cfg(target_os = "linux")]
fn gather_os() -> OsFacts {
    let release = std::fs::read_to_string("/etc/os-release").unwrap_or_default();
    let mut fields = BTreeMap::new();
    for line in release.lines() {
        if let Some((k, v)) = line.split_once('=') {
            fields.insert(k.to_string(), v.trim_matches('"').to_string());
        }
    }
    let distribution = fields.get("ID").cloned().unwrap_or_else(|| "unknown".to_string());
    let family = fields
        .get("ID_LIKE")
        .cloned()
        .unwrap_or_else(|| distribution.clone());
    OsFacts {
        name: "linux".to_string(),
        family,
        distribution,
        distribution_version: fields.get("VERSION_ID").cloned().unwrap_or_default(),
    }
}

#[cfg(not(target_os = "linux"))]
fn gather_os() -> OsFacts {
    OsFacts {
        name: std::env::consts::OS.to_string(),
        family: "unknown".to_string(),
        distribution: "unknown".to_string(),
        distribution_version: String::new(),
    }
}

fn gather_hostname() -> String {
    std::fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn gather_fqdn() -> String {
    // Best-effort: the core has no resolver dependency, so this degrades to
    // the bare hostname rather than performing a DNS lookup.
    gather_hostname()
}

fn gather_package_managers() -> Vec<String> {
    let mut out = Vec::new();
    for (bin, manager) in [("dpkg", "apt"), ("rpm", "dnf"), ("pacman", "pacman"), ("brew", "brew")] {
        if which(bin) {
            out.push(manager.to_string());
        }
    }
    out
}

fn which(bin: &str) -> bool {
    std::env::var_os("PATH")
        .into_iter()
        .flat_map(|p| std::env::split_paths(&p).collect::<Vec<_>>())
        .any(|dir| dir.join(bin).is_file())
}

fn gather_cpu() -> CpuFacts {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1);
    CpuFacts {
        physical: cores,
        cores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Facts {
        let mut env = BTreeMap::new();
        env.insert("SECRET".to_string(), "shh".to_string());
        Facts {
            os: OsFacts {
                name: "linux".to_string(),
                family: "debian".to_string(),
                distribution: "debian".to_string(),
                distribution_version: "12".to_string(),
            },
            arch: "x86_64".to_string(),
            hostname: "box".to_string(),
            fqdn: "box".to_string(),
            machine_id: "abc123".to_string(),
            package_managers: vec!["apt".to_string()],
            cpu: CpuFacts { physical: 4, cores: 8 },
            user: UserFacts {
                name: "alice".to_string(),
                home: "/home/alice".to_string(),
                uid: 1000,
                gid: 1000,
            },
            env,
        }
    }

    fn object(value: &Value) -> &BTreeMap<String, Value> {
        match value {
            Value::Object(o) => o,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn to_value_includes_env_by_default() {
        let value = sample().to_value(true);
        let top = object(&value);
        assert!(top.contains_key("env"));
        let env = object(top.get("env").unwrap());
        assert_eq!(env.get("SECRET").and_then(Value::as_str), Some("shh"));
    }

    #[test]
    fn to_value_omits_env_when_requested() {
        let value = sample().to_value(false);
        let top = object(&value);
        assert!(!top.contains_key("env"));
    }

    #[test]
    fn to_value_projects_os_and_user_and_cpu() {
        let value = sample().to_value(false);
        let top = object(&value);

        let os = object(top.get("os").unwrap());
        assert_eq!(os.get("distribution").and_then(Value::as_str), Some("debian"));

        let user = object(top.get("user").unwrap());
        assert_eq!(user.get("name").and_then(Value::as_str), Some("alice"));
        assert_eq!(user.get("uid").and_then(Value::as_number).map(|n| n.as_i64()), Some(Some(1000)));

        let cpu = object(top.get("cpu").unwrap());
        assert_eq!(cpu.get("cores").and_then(Value::as_number).map(|n| n.as_i64()), Some(Some(8)));
    }

    #[test]
    fn which_finds_a_binary_known_to_exist_on_path() {
        assert!(which("ls") || which("sh"));
    }
}

fn gather_user() -> UserFacts {
    let name = std::env::var("USER").unwrap_or_default();
    let home = std::env::var("HOME").unwrap_or_default();
    let passwd = read_passwd();
    match passwd.get(&name) {
        Some(entry) => UserFacts {
            name,
            home,
            uid: entry.uid,
            gid: entry.gid,
        },
        None => UserFacts {
            name,
            home,
            uid: 0,
            gid: 0,
        },
    }
}
