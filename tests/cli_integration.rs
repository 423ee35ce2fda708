//! CLI integration tests for pkgsync
//!
//! Only the directory-backed backends (apps, extensions) are exercised so
//! nothing here touches a real package manager.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the pkgsync binary
fn pkgsync_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("pkgsync"));
    cmd.env_remove("PKGSYNC_DIR")
        .env_remove("PKGSYNC_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// A sandbox with a list dir, an apps dir, an extensions dir and a config
struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["lists", "Applications", "Extensions"] {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        let sandbox = Self { root };
        sandbox.write_config("");
        sandbox
    }

    fn path(&self, rel: &str) -> std::path::PathBuf {
        self.root.path().join(rel)
    }

    fn config(&self) -> std::path::PathBuf {
        self.path("config.toml")
    }

    fn write_config(&self, extra: &str) {
        let content = format!(
            "list_dir = '{}'\napps_dir = '{}'\nextensions_dir = '{}'\n{}",
            self.path("lists").display(),
            self.path("Applications").display(),
            self.path("Extensions").display(),
            extra
        );
        fs::write(self.config(), content).unwrap();
    }

    fn want(&self, file: &str, content: &str) {
        fs::write(self.path("lists").join(file), content).unwrap();
    }

    fn install_app(&self, name: &str) {
        fs::create_dir(self.path("Applications").join(format!("{}.app", name))).unwrap();
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = pkgsync_cmd();
        cmd.arg("--config").arg(self.config());
        cmd
    }
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// backends
// =============================================================================

#[test]
fn test_backends_lists_every_kind() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .arg("backends")
        .assert()
        .success()
        .stdout(predicate::str::contains("formulae.txt"))
        .stdout(predicate::str::contains("appstore.txt"))
        .stdout(predicate::str::contains("recreate_explicit"));
}

#[test]
fn test_backends_json() {
    let sandbox = Sandbox::new();
    sandbox.write_config("disabled = ['yarn']\n");

    let output = sandbox
        .cmd()
        .args(["--format", "json", "backends"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows = json_stdout(&output);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 10);

    let apps = rows.iter().find(|r| r["kind"] == "apps").unwrap();
    assert_eq!(apps["available"], true);
    assert_eq!(apps["list_file"], "apps.txt");

    let yarn = rows.iter().find(|r| r["kind"] == "yarn").unwrap();
    assert_eq!(yarn["enabled"], false);
}

// =============================================================================
// plan / sync
// =============================================================================

#[test]
fn test_plan_reports_missing_apps() {
    let sandbox = Sandbox::new();
    sandbox.want("apps.txt", "# desktop apps\nSlack\nZoom\n\nSlack\n");
    sandbox.install_app("Slack");
    sandbox.install_app("Notes");

    sandbox
        .cmd()
        .args(["plan", "--types", "apps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Zoom"))
        .stdout(predicate::str::contains("skipped (report-only backend)"))
        .stdout(predicate::str::contains("Slack").not())
        .stdout(predicate::str::contains("Dry run: nothing was changed."));
}

#[test]
fn test_plan_json_matches_reconciliation() {
    let sandbox = Sandbox::new();
    sandbox.want("apps.txt", "Zoom\nSlack\n");
    sandbox.install_app("Slack");

    let output = sandbox
        .cmd()
        .args(["--format", "json", "plan", "--types", "apps"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = json_stdout(&output);
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["backends"][0]["kind"], "apps");
    assert_eq!(report["backends"][0]["plan"]["install"], serde_json::json!(["Zoom"]));
    assert_eq!(report["backends"][0]["plan"]["uninstall"], serde_json::json!([]));
    assert_eq!(report["totals"]["skipped"], 1);
}

#[test]
fn test_sync_report_only_needs_no_confirmation() {
    let sandbox = Sandbox::new();
    sandbox.want("apps.txt", "Zoom\n");

    // No stdin and no --force: report-only backends never prompt
    sandbox
        .cmd()
        .args(["sync", "--types", "apps"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Zoom"))
        .stderr(predicate::str::contains("[y/N]").not());
}

#[test]
fn test_prune_falls_back_on_report_only_backend() {
    let sandbox = Sandbox::new();
    sandbox.want("apps.txt", "Zoom\n");
    sandbox.install_app("Notes");

    sandbox
        .cmd()
        .args(["plan", "--prune", "--types", "apps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("install_missing"))
        .stdout(predicate::str::contains("prune_extras not supported"))
        .stdout(predicate::str::contains("Notes").not());
}

#[test]
fn test_missing_want_list_is_skipped() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["plan", "--types", "extensions,apps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extensions skipped (no want list)"))
        .stdout(predicate::str::contains("apps       skipped (no want list)"));
}

#[test]
fn test_extension_lines_are_validated() {
    let sandbox = Sandbox::new();
    sandbox.want(
        "extensions.txt",
        "cjpalhdlnbpafiamejdnhcphjbkeiagm # uBlock Origin\nnot-an-id\nabc\n",
    );
    fs::create_dir(sandbox.path("Extensions").join("cjpalhdlnbpafiamejdnhcphjbkeiagm")).unwrap();

    sandbox
        .cmd()
        .args(["plan", "--types", "extensions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extensions up to date"));
}

#[test]
fn test_dir_flag_overrides_config() {
    let sandbox = Sandbox::new();
    let other = TempDir::new().unwrap();
    fs::write(other.path().join("apps.txt"), "Figma\n").unwrap();

    sandbox
        .cmd()
        .args(["plan", "--types", "apps", "--dir"])
        .arg(other.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Figma"));
}

#[test]
fn test_dir_env_var() {
    let sandbox = Sandbox::new();
    let other = TempDir::new().unwrap();
    fs::write(other.path().join("apps.txt"), "Figma\n").unwrap();

    sandbox
        .cmd()
        .env("PKGSYNC_DIR", other.path())
        .args(["plan", "--types", "apps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Figma"));
}

// =============================================================================
// Structural errors
// =============================================================================

#[test]
fn test_missing_list_dir_fails() {
    let sandbox = Sandbox::new();
    let missing = sandbox.path("nope");

    sandbox
        .cmd()
        .args(["plan", "--dir"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Want-list directory does not exist"));
}

#[test]
fn test_conflicting_config_fails() {
    let sandbox = Sandbox::new();
    sandbox.write_config("enabled = ['npm']\ndisabled = ['npm']\n");

    sandbox
        .cmd()
        .arg("backends")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conflicting configuration"));
}

#[test]
fn test_missing_config_file_fails() {
    pkgsync_cmd()
        .args(["--config", "/definitely/not/here.toml", "backends"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_unknown_backend_type_rejected() {
    let sandbox = Sandbox::new();
    let lists: &Path = &sandbox.path("lists");

    sandbox
        .cmd()
        .args(["plan", "--types", "cargo", "--dir"])
        .arg(lists)
        .assert()
        .failure();
}

#[test]
fn test_prune_and_recreate_conflict() {
    pkgsync_cmd()
        .args(["sync", "--prune", "--recreate"])
        .assert()
        .failure();
}
