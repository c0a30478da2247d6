//! Abstract collaborator interfaces for `package` and `service` (§6), plus
//! one reference implementation of each (§4.15, C15) to prove the interface
//! is implementable. Full cross-distro/cross-init coverage is explicitly out
//! of scope (§1 Non-goals); callers targeting other platforms supply their
//! own `PackageManager`/`ServiceManager`.

use std::process::Command;

/// `{name, is_installed, install, remove}` per §6.
pub trait PackageManager: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn is_installed(&self, pkg: &str) -> Result<(bool, Option<String>), String>;
    fn install(&self, pkg: &str, version: Option<&str>) -> Result<(), String>;
    fn remove(&self, pkg: &str) -> Result<(), String>;
}

/// `{name, exists, is_running, is_enabled, start, stop, enable, disable}` per §6.
pub trait ServiceManager: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn exists(&self, svc: &str) -> Result<bool, String>;
    fn is_running(&self, svc: &str) -> Result<bool, String>;
    fn is_enabled(&self, svc: &str) -> Result<bool, String>;
    fn start(&self, svc: &str) -> Result<(), String>;
    fn stop(&self, svc: &str) -> Result<(), String>;
    fn enable(&self, svc: &str) -> Result<(), String>;
    fn disable(&self, svc: &str) -> Result<(), String>;
}

/// Linux reference `PackageManager`, backed by `dpkg-query`/`apt-get` (§4.15).
#[derive(Debug, Default)]
pub struct AptPackageManager;

impl PackageManager for AptPackageManager {
    fn name(&self) -> &str {
        "apt"
    }

    fn is_installed(&self, pkg: &str) -> Result<(bool, Option<String>), String> {
        let output = Command::new("dpkg-query")
            .args(["-W", "-f=${Status} ${Version}", pkg])
            .output()
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Ok((false, None));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.contains("install ok installed") {
            return Ok((false, None));
        }
        let version = stdout.split_whitespace().last().map(str::to_string);
        Ok((true, version))
    }

    fn install(&self, pkg: &str, version: Option<&str>) -> Result<(), String> {
        let target = match version {
            Some(v) => format!("{pkg}={v}"),
            None => pkg.to_string(),
        };
        run_status(
            Command::new("apt-get")
                .args(["install", "-y", &target])
                .env("DEBIAN_FRONTEND", "noninteractive"),
        )
    }

    fn remove(&self, pkg: &str) -> Result<(), String> {
        run_status(Command::new("apt-get").args(["remove", "-y", pkg]))
    }
}

/// Linux reference `ServiceManager`, backed by `systemctl` (§4.15).
#[derive(Debug, Default)]
pub struct SystemdServiceManager;

impl ServiceManager for SystemdServiceManager {
    fn name(&self) -> &str {
        "systemd"
    }

    fn exists(&self, svc: &str) -> Result<bool, String> {
        let output = Command::new("systemctl")
            .args(["status", svc])
            .output()
            .map_err(|e| e.to_string())?;
        // exit code 4 = unit not found, per systemctl(1).
        Ok(output.status.code() != Some(4))
    }

    fn is_running(&self, svc: &str) -> Result<bool, String> {
        Ok(Command::new("systemctl")
            .args(["is-active", "--quiet", svc])
            .status()
            .map_err(|e| e.to_string())?
            .success())
    }

    fn is_enabled(&self, svc: &str) -> Result<bool, String> {
        Ok(Command::new("systemctl")
            .args(["is-enabled", "--quiet", svc])
            .status()
            .map_err(|e| e.to_string())?
            .success())
    }

    fn start(&self, svc: &str) -> Result<(), String> {
        run_status(Command::new("systemctl").args(["start", svc]))
    }

    fn stop(&self, svc: &str) -> Result<(), String> {
        run_status(Command::new("systemctl").args(["stop", svc]))
    }

    fn enable(&self, svc: &str) -> Result<(), String> {
        run_status(Command::new("systemctl").args(["enable", svc]))
    }

    fn disable(&self, svc: &str) -> Result<(), String> {
        run_status(Command::new("systemctl").args(["disable", svc]))
    }
}

fn run_status(cmd: &mut Command) -> Result<(), String> {
    let status = cmd.status().map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("command exited with {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apt_package_manager_name_is_apt() {
        assert_eq!(AptPackageManager.name(), "apt");
    }

    #[test]
    fn systemd_service_manager_name_is_systemd() {
        assert_eq!(SystemdServiceManager.name(), "systemd");
    }

    #[test]
    fn run_status_ok_on_success_exit() {
        assert!(run_status(Command::new("true")).is_ok());
    }

    #[test]
    fn run_status_err_on_failure_exit() {
        assert!(run_status(Command::new("false")).is_err());
    }
}
