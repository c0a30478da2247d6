//! End-to-end coverage of the `hostcfg` binary surface: `plan`, `apply`,
//! `validate`, and `facts` against small generated configurations.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

fn hostcfg() -> Command {
    Command::cargo_bin("hostcfg").unwrap()
}

#[test]
fn validate_accepts_a_well_formed_configuration() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = dir.child("hostcfg.hcl");
    config
        .write_str(
            r#"
resource "stat" "tmp" {
  path = "/tmp"
}
"#,
        )
        .unwrap();

    hostcfg()
        .args(["--config", config.path().to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid."));
}

#[test]
fn validate_rejects_an_unknown_resource_type() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = dir.child("hostcfg.hcl");
    config
        .write_str(
            r#"
resource "not_a_real_type" "x" {
  path = "/tmp"
}
"#,
        )
        .unwrap();

    hostcfg()
        .args(["--config", config.path().to_str().unwrap(), "validate"])
        .assert()
        .failure();
}

#[test]
fn validate_rejects_a_dependency_cycle() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = dir.child("hostcfg.hcl");
    config
        .write_str(
            r#"
resource "stat" "a" {
  path       = "/tmp"
  depends_on = ["stat.b"]
}

resource "stat" "b" {
  path       = "/tmp"
  depends_on = ["stat.a"]
}
"#,
        )
        .unwrap();

    hostcfg()
        .args(["--config", config.path().to_str().unwrap(), "validate"])
        .assert()
        .failure();
}

#[test]
fn plan_never_mutates_the_host_and_reports_no_changes_for_a_readonly_resource() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = dir.child("hostcfg.hcl");
    config
        .write_str(
            r#"
resource "stat" "tmp" {
  path = "/tmp"
}
"#,
        )
        .unwrap();

    hostcfg()
        .args(["--config", config.path().to_str().unwrap(), "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes"));
}

#[test]
fn plan_reports_a_pending_create_for_a_missing_exec_gate() {
    let dir = assert_fs::TempDir::new().unwrap();
    let marker = dir.child("marker");
    let config = dir.child("hostcfg.hcl");
    config
        .write_str(&format!(
            r#"
resource "exec" "touch_marker" {{
  command = "touch {marker}"
  creates = "{marker}"
}}
"#,
            marker = marker.path().to_str().unwrap()
        ))
        .unwrap();

    hostcfg()
        .args(["--config", config.path().to_str().unwrap(), "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 to add").or(predicate::str::contains("to add")));
}

#[test]
fn apply_with_dry_run_does_not_execute_the_command() {
    let dir = assert_fs::TempDir::new().unwrap();
    let marker = dir.child("marker");
    let config = dir.child("hostcfg.hcl");
    config
        .write_str(&format!(
            r#"
resource "exec" "touch_marker" {{
  command = "touch {marker}"
  creates = "{marker}"
}}
"#,
            marker = marker.path().to_str().unwrap()
        ))
        .unwrap();

    hostcfg()
        .args(["--config", config.path().to_str().unwrap(), "apply", "--dry-run"])
        .assert()
        .success();

    marker.assert(predicate::path::missing());
}

#[test]
fn apply_with_auto_approve_runs_the_command_and_converges_to_noop() {
    let dir = assert_fs::TempDir::new().unwrap();
    let marker = dir.child("marker");
    let config = dir.child("hostcfg.hcl");
    config
        .write_str(&format!(
            r#"
resource "exec" "touch_marker" {{
  command = "touch {marker}"
  creates = "{marker}"
}}
"#,
            marker = marker.path().to_str().unwrap()
        ))
        .unwrap();

    hostcfg()
        .args(["--config", config.path().to_str().unwrap(), "apply", "--yes"])
        .assert()
        .success();

    marker.assert(predicate::path::exists());

    // Re-running now converges: the creates-gate is satisfied, so the plan
    // should report no pending changes.
    hostcfg()
        .args(["--config", config.path().to_str().unwrap(), "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes"));
}

#[test]
fn variables_flow_from_cli_override_into_resource_attributes() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = dir.child("hostcfg.hcl");
    config
        .write_str(
            r#"
variable "target_path" {
  type    = string
  default = "/tmp"
}

resource "stat" "configured" {
  path = var.target_path
}
"#,
        )
        .unwrap();

    hostcfg()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "--var",
            "target_path=/var",
            "validate",
        ])
        .assert()
        .success();
}

#[test]
fn facts_emits_hcl_by_default() {
    hostcfg()
        .args(["facts", "--no-env"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn facts_emits_json_when_requested() {
    hostcfg()
        .args(["facts", "--format", "json", "--no-env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("{"));
}

#[test]
fn version_prints_the_binary_name() {
    hostcfg().arg("version").assert().success().stdout(predicate::str::contains("hostcfg"));
}

#[test]
fn missing_config_path_is_a_clean_error_not_a_panic() {
    hostcfg()
        .args(["--config", "/nonexistent/hostcfg-integration-test", "validate"])
        .assert()
        .failure();
}
