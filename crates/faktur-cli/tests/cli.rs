//! End-to-end tests for the `faktur` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A config file pointing the store into `dir` and the gateway at a closed port.
fn write_config(dir: &Path) -> PathBuf {
    let config = serde_json::json!({
        "gateway": {
            "base_url": "http://127.0.0.1:9",
            "api_key": "test-key",
            "timeout_secs": 5
        },
        "rates": { "base_url": "http://127.0.0.1:9", "timeout_secs": 1 },
        "store": { "path": dir.join("invoices.json"), "owner": "tester" }
    });
    let path = dir.join("config.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

fn faktur(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("faktur").unwrap();
    cmd.env_remove("FAKTUR_API_KEY")
        .env_remove("RUST_LOG")
        .arg("-c")
        .arg(config);
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("faktur")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("invoices"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");

    faktur(&path).args(["config", "init"]).assert().success();
    assert!(path.exists());

    faktur(&path)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    faktur(&path)
        .args(["config", "get", "pipeline.local_currency"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"IDR\""));

    faktur(&path)
        .args(["config", "set", "pipeline.local_currency", "EUR"])
        .assert()
        .success();

    faktur(&path)
        .args(["config", "get", "pipeline.local_currency"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"EUR\""));
}

#[test]
fn test_config_set_rejects_invalid_currency() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());

    faktur(&path)
        .args(["config", "set", "pipeline.local_currency", "euro"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value"));
}

#[test]
fn test_config_show_masks_api_key() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());

    faktur(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("test-key").not());
}

#[test]
fn test_missing_explicit_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    faktur(&path)
        .args(["invoices", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_invoices_list_empty() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());

    faktur(&path)
        .args(["invoices", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No invoices found"));

    faktur(&path)
        .args(["invoices", "list", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_show_unknown_invoice() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());

    faktur(&path)
        .args(["invoices", "show", "6f1c2a8e-4b1d-4c55-9a43-0d2f3b8e7c10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_edit_requires_assignment_syntax() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());

    faktur(&path)
        .args([
            "invoices",
            "edit",
            "6f1c2a8e-4b1d-4c55-9a43-0d2f3b8e7c10",
            "--set",
            "totalAmount",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn test_process_missing_input() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());

    faktur(&path)
        .args(["process", "does-not-exist.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_unsupported_format() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());
    let input = dir.path().join("invoice.txt");
    fs::write(&input, "Invoice 42").unwrap();

    faktur(&path)
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file format"));
}

#[test]
fn test_process_gateway_unreachable() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());
    let input = dir.path().join("scan.png");
    image::RgbImage::from_pixel(32, 24, image::Rgb([255, 255, 255]))
        .save(&input)
        .unwrap();

    faktur(&path)
        .arg("process")
        .arg(&input)
        .arg("--save")
        .assert()
        .failure()
        .stderr(predicate::str::contains("please retry the upload"));

    // Nothing is stored for a failed extraction
    faktur(&path)
        .args(["invoices", "list", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_batch_no_matches() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path());
    let pattern = dir.path().join("*.pdf");

    faktur(&path)
        .arg("batch")
        .arg(pattern.to_string_lossy().as_ref())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}
