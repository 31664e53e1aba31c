//! End-to-end tests for the qalib binary.

use assert_cmd::Command;
use predicates::prelude::*;

const OBSERVATION: &str = r#"{
    "vendor": {"name": "Acme Trading Co", "tax_number": "300111111111111"},
    "invoice": {"reference_number": "INV-2024/18", "date": "2024-03-15"},
    "totals": {"subtotal": "87.0", "tax_amount": "13.05", "total": "100.05"}
}"#;

fn qalib() -> Command {
    Command::cargo_bin("qalib").unwrap()
}

#[test]
fn learn_then_stats() {
    let dir = tempfile::tempdir().unwrap();
    let observation_path = dir.path().join("observation.json");
    std::fs::write(&observation_path, OBSERVATION).unwrap();
    let store_dir = dir.path().join("store");

    qalib()
        .arg("learn")
        .arg(&observation_path)
        .arg("--store-dir")
        .arg(&store_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("tpl_"));

    qalib()
        .args(["stats", "--format", "json"])
        .arg("--store-dir")
        .arg(&store_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 1"));
}

#[test]
fn match_learned_template() {
    let dir = tempfile::tempdir().unwrap();
    let observation_path = dir.path().join("observation.json");
    std::fs::write(&observation_path, OBSERVATION).unwrap();
    let store_dir = dir.path().join("store");

    qalib()
        .arg("learn")
        .arg(&observation_path)
        .arg("--store-dir")
        .arg(&store_dir)
        .assert()
        .success();

    qalib()
        .arg("match")
        .arg(&observation_path)
        .arg("--store-dir")
        .arg(&store_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("score:      1.000"));
}

#[test]
fn learn_without_tax_number() {
    let dir = tempfile::tempdir().unwrap();
    let observation_path = dir.path().join("observation.json");
    std::fs::write(&observation_path, r#"{"vendor": {"name": "Acme"}}"#).unwrap();
    let store_dir = dir.path().join("store");

    qalib()
        .arg("learn")
        .arg(&observation_path)
        .arg("--store-dir")
        .arg(&store_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing learned"));
}
