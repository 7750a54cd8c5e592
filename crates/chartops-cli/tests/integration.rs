#![allow(deprecated)]
use assert_cmd::Command;
use chartops_core::catalog::{Catalog, FileCatalog};
use chartops_core::types::{AppResource, Cluster, TemplateVersion};
use predicates::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

const APP_ID: &str = "p-xyz:my-app";
const OLD_EXTERNAL_ID: &str = "catalog://?catalog=library&template=mysql&version=0.3.3";
const EXTERNAL_ID: &str = "catalog://?catalog=library&template=mysql&version=0.3.4";

fn chartops(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("chartops").unwrap();
    cmd.current_dir(dir.path())
        .env("CHARTOPS_ROOT", dir.path())
        .env_remove("CHARTOPS_TOKEN");
    cmd
}

/// Write `chartops.yaml` with stand-in tools. `true` and `false` ignore their
/// arguments, so they act as a helm that succeeds or fails.
fn write_config(dir: &TempDir, helm: &str) {
    let workspaces = dir.path().join("workspaces");
    std::fs::create_dir_all(&workspaces).unwrap();
    let yaml = format!(
        "tools:\n  helm: \"{helm}\"\n  tiller: \"true\"\nbackend:\n  wait_for_ready: false\nworkspace:\n  parent: {}\n",
        workspaces.display()
    );
    std::fs::write(dir.path().join("chartops.yaml"), yaml).unwrap();
}

fn seed_catalog(dir: &TempDir) -> FileCatalog {
    let catalog = FileCatalog::new(dir.path());
    catalog
        .put_app(&AppResource {
            id: APP_ID.into(),
            project_id: "c-abc:p-xyz".into(),
            install_namespace: "databases".into(),
            name: "my-app".into(),
            external_id: OLD_EXTERNAL_ID.into(),
            updated_at: chrono::Utc::now(),
        })
        .unwrap();
    catalog
        .put_cluster(&Cluster {
            id: "c-abc".into(),
            name: "prod".into(),
            api_endpoint: "https://10.0.0.1:6443".into(),
            ca_cert: None,
        })
        .unwrap();
    catalog
        .put_template_version(&TemplateVersion {
            id: "library-mysql-0.3.4".into(),
            // base64("name: mysql\n")
            files: BTreeMap::from([("mysql/Chart.yaml".to_string(), "bmFtZTogbXlzcWwK".to_string())]),
        })
        .unwrap();
    catalog
}

fn workspaces_left(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path().join("workspaces")).unwrap().count()
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

#[test]
fn list_on_empty_catalog() {
    let dir = TempDir::new().unwrap();
    chartops(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No apps."));
}

#[test]
fn list_shows_seeded_app() {
    let dir = TempDir::new().unwrap();
    seed_catalog(&dir);
    chartops(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(APP_ID))
        .stdout(predicate::str::contains("databases"));
}

#[test]
fn show_json_outputs_resource() {
    let dir = TempDir::new().unwrap();
    seed_catalog(&dir);
    let output = chartops(&dir)
        .args(["show", APP_ID, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["name"], "my-app");
    assert_eq!(value["externalId"], OLD_EXTERNAL_ID);
}

#[test]
fn show_unknown_app_fails() {
    let dir = TempDir::new().unwrap();
    chartops(&dir)
        .args(["show", "p-xyz:ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("app not found: p-xyz:ghost"));
}

// ---------------------------------------------------------------------------
// upgrade / rollback
// ---------------------------------------------------------------------------

#[test]
fn rollback_without_token_fails() {
    let dir = TempDir::new().unwrap();
    seed_catalog(&dir);
    write_config(&dir, "true");
    chartops(&dir)
        .args(["rollback", APP_ID, "--revision", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CHARTOPS_TOKEN"));
}

#[test]
fn rollback_succeeds_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    seed_catalog(&dir);
    write_config(&dir, "true");
    chartops(&dir)
        .args(["rollback", APP_ID, "--revision", "3"])
        .env("CHARTOPS_TOKEN", "token-abc:secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("rollback of 'p-xyz:my-app' succeeded"));
    assert_eq!(workspaces_left(&dir), 0);
}

#[test]
fn upgrade_records_external_id() {
    let dir = TempDir::new().unwrap();
    let catalog = seed_catalog(&dir);
    write_config(&dir, "true");
    let output = chartops(&dir)
        .args(["upgrade", APP_ID, "--external-id", EXTERNAL_ID, "--json"])
        .args(["--token", "token-abc:secret"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["externalId"], EXTERNAL_ID);
    assert_eq!(catalog.app(APP_ID).unwrap().unwrap().external_id, EXTERNAL_ID);
    assert_eq!(workspaces_left(&dir), 0);
}

#[test]
fn failed_upgrade_reports_exit_and_keeps_requested_external_id() {
    let dir = TempDir::new().unwrap();
    let catalog = seed_catalog(&dir);
    write_config(&dir, "false");
    chartops(&dir)
        .args(["upgrade", APP_ID, "--external-id", EXTERNAL_ID])
        .env("CHARTOPS_TOKEN", "token-abc:secret")
        .assert()
        .failure()
        .stderr(predicate::str::contains("exited with code 1"));

    assert_eq!(catalog.app(APP_ID).unwrap().unwrap().external_id, EXTERNAL_ID);
    assert_eq!(workspaces_left(&dir), 0);
}

#[test]
fn upgrade_to_unknown_version_fails_without_running_helm() {
    let dir = TempDir::new().unwrap();
    seed_catalog(&dir);
    // A helm that would fail proves it was never reached.
    write_config(&dir, "false");
    chartops(&dir)
        .args([
            "upgrade",
            APP_ID,
            "--external-id",
            "catalog://?catalog=library&template=mysql&version=9.9.9",
        ])
        .env("CHARTOPS_TOKEN", "token-abc:secret")
        .assert()
        .failure()
        .stderr(predicate::str::contains("template version not found: library-mysql-9.9.9"));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_show_prints_defaults() {
    let dir = TempDir::new().unwrap();
    chartops(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("helm: helm"))
        .stdout(predicate::str::contains("prefix: helm-"));
}

#[test]
fn config_validate_accepts_present_tools() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "true");
    chartops(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_rejects_empty_tool() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("chartops.yaml"), "tools:\n  helm: \"\"\n").unwrap();
    chartops(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config validation found errors"));
}
