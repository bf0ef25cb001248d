// CLI integration tests for the file commands.
use std::io::Write;
use std::path::Path;
use std::process::Command;

use docdb_bson::{doc, encode};
use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_docdb-cli");
    let mut command = Command::new(exe);
    command.env("NO_COLOR", "1").env_remove("DOCDB_BATCH_SIZE");
    command
}

fn write_file(path: &Path, count: i32) {
    let mut file = std::fs::File::create(path).expect("create");
    for i in 0..count {
        let bytes = encode(&doc! { "i": i, "even": i % 2 == 0 }).expect("encode");
        file.write_all(&bytes).expect("write");
    }
}

#[test]
fn dump_prints_json_lines() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("docs.bin");
    write_file(&path, 4);

    let output = cmd()
        .args(["dump", path.to_str().unwrap(), "--batch-size", "3"])
        .output()
        .expect("dump");
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).expect("utf8");
    let docs: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json"))
        .collect();
    assert_eq!(docs.len(), 4);
    assert_eq!(docs[3]["i"], 3);
    assert_eq!(docs[3]["even"], false);
}

#[test]
fn dump_respects_limit_and_env_batch_size() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("docs.bin");
    write_file(&path, 10);

    let output = cmd()
        .env("DOCDB_BATCH_SIZE", "2")
        .args(["dump", path.to_str().unwrap(), "--limit", "3"])
        .output()
        .expect("dump");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 3);
}

#[test]
fn dump_missing_file_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd()
        .args(["dump", temp.path().join("nope.bin").to_str().unwrap()])
        .output()
        .expect("dump");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn count_reports_documents() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("docs.bin");
    write_file(&path, 7);

    let output = cmd()
        .args(["count", path.to_str().unwrap()])
        .output()
        .expect("count");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("7 document(s)"));
}

#[test]
fn version_compare_orders_versions() {
    let output = cmd()
        .args(["version-compare", "3.6.1", "3.7"])
        .output()
        .expect("version-compare");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "3.6.1 < 3.7.0");

    let output = cmd()
        .args(["version-compare", "3", "3.7"])
        .output()
        .expect("version-compare");
    assert!(!output.status.success());
}
