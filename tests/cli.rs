use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SALES_CSV: &str = "\
Product,Price,SaleDate,Status
Leadpage,12500,12-05-2025,Approved
Leadpage,10000,13-05-2025,Approved
Domæne,2000,06-05-2025,Approved
Webshop,30000,14-05-2025,Offer
Hosting,5000,14-05-2025,Rejected
";

fn salestrack() -> Command {
    let mut cmd = Command::cargo_bin("salestrack").expect("bin");
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write_workspace(start_week: u32, end_week: u32) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("sales.csv");
    fs::write(&csv_path, SALES_CSV).expect("write csv");

    let settings = serde_json::json!({
        "title": "Spring campaign",
        "goal": 82465.0,
        "start_week": start_week,
        "end_week": end_week,
        "source": { "kind": "file", "path": csv_path.to_string_lossy() },
    });
    let settings_path = dir.path().join("settings.json");
    fs::write(&settings_path, settings.to_string()).expect("write settings");
    (dir, settings_path)
}

fn config_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn report_prints_tables() {
    let (_dir, settings) = write_workspace(18, 26);
    salestrack()
        .args(["--config", &config_arg(&settings), "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Spring campaign"))
        .stdout(predicate::str::contains("24.500 kr."))
        .stdout(predicate::str::contains("82.465 kr."))
        .stdout(predicate::str::contains("Leadpage"));
}

#[test]
fn report_json_emits_snapshot() {
    let (_dir, settings) = write_workspace(18, 26);
    let output = salestrack()
        .args(["--config", &config_arg(&settings), "report", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(snapshot["totalSold"], 24500.0);
    assert_eq!(snapshot["totalCount"], 3);
    assert_eq!(snapshot["offeredTotal"], 30000.0);
    assert_eq!(snapshot["topProducts"][0]["name"], "Leadpage");
    assert_eq!(snapshot["topProducts"].as_array().map(Vec::len), Some(3));
}

#[test]
fn report_rejects_inverted_week_range() {
    let (_dir, settings) = write_workspace(26, 18);
    salestrack()
        .args(["--config", &config_arg(&settings), "report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn report_fails_on_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings_path = dir.path().join("settings.json");
    let settings = serde_json::json!({
        "source": { "kind": "file", "path": dir.path().join("gone.csv").to_string_lossy() },
    });
    fs::write(&settings_path, settings.to_string()).expect("write settings");

    salestrack()
        .args(["--config", &config_arg(&settings_path), "report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source unavailable"));
}

#[test]
fn init_writes_settings_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("settings.json");

    salestrack()
        .args(["--config", &config_arg(&path), "init", "--danish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote settings"));

    let written = fs::read_to_string(&path).expect("settings written");
    assert!(written.contains("Produkt"));
    assert!(written.contains("Aflsag"));

    salestrack()
        .args(["--config", &config_arg(&path), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    salestrack()
        .args(["--config", &config_arg(&path), "init", "--force"])
        .assert()
        .success();
    let rewritten = fs::read_to_string(&path).expect("settings rewritten");
    assert!(rewritten.contains("\"product\": \"Product\""));
}

#[test]
fn status_describes_file_source() {
    let (_dir, settings) = write_workspace(18, 26);
    salestrack()
        .args(["--config", &config_arg(&settings), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Spring campaign"))
        .stdout(predicate::str::contains("Source:      file"))
        .stdout(predicate::str::contains("18-26"));
}

#[test]
fn status_warns_about_invalid_config() {
    let (_dir, settings) = write_workspace(26, 18);
    salestrack()
        .args(["--config", &config_arg(&settings), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Warning: Configuration error"));
}
