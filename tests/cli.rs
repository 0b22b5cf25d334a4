// Drives the compiled binary for the commands that never open the TUI.
// HOME and XDG_CONFIG_HOME point into a temp dir so no real history is touched.

use std::path::Path;
use std::process::Output;

use assert_cmd::Command;

fn monkeymath(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("monkeymath").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("MONKEYMATH_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn stats_on_empty_history() {
    let home = tempfile::tempdir().unwrap();
    let assert = monkeymath(home.path()).arg("--stats").assert().success();
    let text = stdout(assert.get_output());

    let report: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(report["overall"]["total_sessions"], 0);
    assert_eq!(report["overall"]["average_accuracy_percent"], 0.0);
    assert!(report["by_operator"].as_object().unwrap().is_empty());

    // the database and log land under the state dir
    let state = home.path().join(".local").join("state").join("monkeymath");
    assert!(state.join("results.db").exists());
    assert!(state.join("monkeymath.log").exists());
}

#[test]
fn export_writes_file() {
    let home = tempfile::tempdir().unwrap();
    let target = home.path().join("out.csv");

    let assert = monkeymath(home.path())
        .arg("--export")
        .arg(&target)
        .assert()
        .success();

    assert!(stdout(assert.get_output()).contains("exported 0 sessions"));
    assert!(target.exists());
}

#[test]
fn clear_history_reports_count() {
    let home = tempfile::tempdir().unwrap();
    let assert = monkeymath(home.path())
        .arg("--clear-history")
        .assert()
        .success();
    assert!(stdout(assert.get_output()).contains("cleared 0 sessions"));
}

#[test]
fn invalid_configuration_is_rejected_before_the_tui() {
    let home = tempfile::tempdir().unwrap();
    let assert = monkeymath(home.path())
        .args(["--duration", "0"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("duration must be between 1 and 3600"), "{stderr}");
}

#[test]
fn inverted_range_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let assert = monkeymath(home.path())
        .args(["--add-range", "50..10,1..5"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("min 50 greater than max 10"), "{stderr}");
}

#[test]
fn requires_a_tty_for_drills() {
    let home = tempfile::tempdir().unwrap();
    let assert = monkeymath(home.path())
        .args(["--duration", "30"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("stdin must be a tty"), "{stderr}");
}

#[test]
fn oversized_range_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let assert = monkeymath(home.path())
        .args(["--mul-range", "4294967294..4294967295,2..12"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("above the limit of 1000000"), "{stderr}");
}
