//! E2E CLI workflow tests: init -> units -> positions -> assignments.
//!
//! Each test runs the `rst` binary as a subprocess against a store in an
//! isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the rst binary, rooted in `dir`.
fn rst_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rst"));
    cmd.current_dir(dir);
    // Suppress tracing output that goes to stderr.
    cmd.env("ROSTER_LOG", "error");
    cmd
}

fn init_store(dir: &Path) {
    rst_cmd(dir).args(["init"]).assert().success();
}

/// Create a unit via CLI, return its id.
fn create_unit(dir: &Path, name: &str, scope: &str, parent: Option<i64>) -> i64 {
    let mut cmd = rst_cmd(dir);
    cmd.args(["unit", "add", name, "--scope", scope, "--json"]);
    if let Some(pid) = parent {
        cmd.args(["--parent", &pid.to_string()]);
    }
    let output = cmd.output().expect("unit add should not crash");
    assert!(
        output.status.success(),
        "unit add failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    json["id"].as_i64().expect("id field")
}

/// Create a position via CLI, return its id.
fn create_position(dir: &Path, unit_id: i64, title: &str) -> i64 {
    let output = rst_cmd(dir)
        .args([
            "pos",
            "add",
            &unit_id.to_string(),
            title,
            "--type",
            "staff",
            "--level",
            "lower",
            "--json",
        ])
        .output()
        .expect("pos add should not crash");
    assert!(
        output.status.success(),
        "pos add failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    json["id"].as_i64().expect("id field")
}

/// Assign a user via CLI, return the assignment id.
fn assign(dir: &Path, position_id: i64, user_id: i64) -> i64 {
    let output = rst_cmd(dir)
        .args([
            "assign",
            &position_id.to_string(),
            "--user",
            &user_id.to_string(),
            "--json",
        ])
        .output()
        .expect("assign should not crash");
    assert!(
        output.status.success(),
        "assign failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    json["id"].as_i64().expect("id field")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_store() {
    let dir = TempDir::new().expect("temp dir");
    rst_cmd(dir.path())
        .args(["init", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("schema_version"));
    assert!(dir.path().join("roster.toml").exists());
    assert!(dir.path().join("roster.sqlite3").exists());

    // Re-running without --force refuses to clobber the config.
    rst_cmd(dir.path()).args(["init"]).assert().failure();
}

#[test]
fn unit_tree_renders_nested_structure() {
    let dir = TempDir::new().expect("temp dir");
    init_store(dir.path());

    let hq = create_unit(dir.path(), "Head Office", "hq", None);
    create_unit(dir.path(), "West Region", "region", Some(hq));

    rst_cmd(dir.path())
        .args(["unit", "tree"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Head Office")
                .and(predicate::str::contains("  West Region")),
        );
}

#[test]
fn cyclic_reparent_fails_with_stable_code() {
    let dir = TempDir::new().expect("temp dir");
    init_store(dir.path());

    let u1 = create_unit(dir.path(), "U1", "hq", None);
    let u2 = create_unit(dir.path(), "U2", "region", Some(u1));

    rst_cmd(dir.path())
        .args([
            "unit",
            "move",
            &u1.to_string(),
            "--parent",
            &u2.to_string(),
            "--json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn assign_end_and_history_roundtrip() {
    let dir = TempDir::new().expect("temp dir");
    init_store(dir.path());

    let hq = create_unit(dir.path(), "HQ", "hq", None);
    let pos = create_position(dir.path(), hq, "Registrar");
    let a = assign(dir.path(), pos, 7);

    // Second occupant bounces: the seat has capacity 1.
    rst_cmd(dir.path())
        .args(["assign", &pos.to_string(), "--user", "8", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));

    rst_cmd(dir.path())
        .args([
            "end",
            &a.to_string(),
            "--reason",
            "resigned",
            "--date",
            "1735689600000000",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("terminated"));

    let output = rst_cmd(dir.path())
        .args(["history", "7", "--json"])
        .output()
        .expect("history");
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let rows = json.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "terminated");
    assert_eq!(rows[0]["termination_reason"], "resigned");
    assert_eq!(rows[0]["ended_at_us"], 1_735_689_600_000_000_i64);
}

#[test]
fn transfer_moves_user_between_positions() {
    let dir = TempDir::new().expect("temp dir");
    init_store(dir.path());

    let hq = create_unit(dir.path(), "HQ", "hq", None);
    let p1 = create_position(dir.path(), hq, "Registrar");
    let p2 = create_position(dir.path(), hq, "Archivist");
    let a = assign(dir.path(), p1, 7);

    let output = rst_cmd(dir.path())
        .args([
            "transfer",
            &a.to_string(),
            "--to",
            &p2.to_string(),
            "--json",
        ])
        .output()
        .expect("transfer");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["ended"]["status"], "completed");
    assert_eq!(json["created"]["status"], "active");
    assert_eq!(json["created"]["position_id"], p2);

    // The old seat shows as vacant again.
    rst_cmd(dir.path())
        .args(["pos", "show", &p1.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("vacant"));
}

#[test]
fn stats_reports_counts_in_json() {
    let dir = TempDir::new().expect("temp dir");
    init_store(dir.path());

    let hq = create_unit(dir.path(), "HQ", "hq", None);
    let pos = create_position(dir.path(), hq, "Registrar");
    assign(dir.path(), pos, 7);

    let output = rst_cmd(dir.path())
        .args(["stats", "--json"])
        .output()
        .expect("stats");
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["total_units"], 1);
    assert_eq!(json["total_positions"], 1);
    assert_eq!(json["active_assignments"], 1);
    assert_eq!(json["filled_positions"], 1);
    assert_eq!(json["vacant_positions"], 0);
}
