//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs. Each test
//! points FOCUSROOM_DATA_DIR at its own temp directory so state files never
//! touch the real data dir.

use std::path::Path;
use std::process::Command;

/// Run a CLI command against an isolated data dir and return output.
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "focusroom-cli", "--quiet", "--"])
        .args(args)
        .env("FOCUSROOM_DATA_DIR", data_dir)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn extract_room_id(create_stdout: &str) -> String {
    // "Room created: <id> (<name>)"
    create_stdout
        .trim()
        .strip_prefix("Room created: ")
        .and_then(|rest| rest.split_whitespace().next())
        .expect("create output should contain a room id")
        .to_string()
}

#[test]
fn test_timer_status() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["timer", "status"]);
    assert_eq!(code, 0, "Timer status failed");

    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["type"], "StateSnapshot");
    assert_eq!(snapshot["remaining_secs"], 1500);
}

#[test]
fn test_timer_start_tick_stop() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["timer", "start"]);
    assert_eq!(code, 0, "Timer start failed");
    assert!(stdout.contains("TimerStarted"));

    let (stdout, _, code) = run_cli(dir.path(), &["timer", "tick", "5"]);
    assert_eq!(code, 0, "Timer tick failed");
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["remaining_secs"], 1495);

    let (stdout, _, code) = run_cli(dir.path(), &["timer", "stop"]);
    assert_eq!(code, 0, "Timer stop failed");
    assert!(stdout.contains("TimerStopped"));
}

#[test]
fn test_timer_set_duration_rejects_zero() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["timer", "set-duration", "0"]);
    assert_ne!(code, 0, "Zero duration should be refused");
    assert!(stderr.contains("out of range"));
}

#[test]
fn test_room_create_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(
        dir.path(),
        &["room", "create", "Deep Work", "--subject", "Rust", "--capacity", "4"],
    );
    assert_eq!(code, 0, "Room create failed");
    let room_id = extract_room_id(&stdout);

    let (stdout, _, code) = run_cli(dir.path(), &["room", "list", "--json"]);
    assert_eq!(code, 0, "Room list failed");
    let rooms: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rooms[0]["id"], room_id.as_str());
    assert_eq!(rooms[0]["capacity"], 4);
}

#[test]
fn test_room_join_and_leave() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, _) = run_cli(dir.path(), &["room", "create", "Join Test"]);
    let room_id = extract_room_id(&stdout);

    let (_, _, code) = run_cli(dir.path(), &["room", "join", &room_id, "--user", "alice"]);
    assert_eq!(code, 0, "Room join failed");

    let (stdout, _, _) = run_cli(dir.path(), &["room", "status", &room_id, "--json"]);
    let room: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(room["participant_count"], 1);

    let (_, _, code) = run_cli(dir.path(), &["room", "leave", &room_id, "--user", "alice"]);
    assert_eq!(code, 0, "Room leave failed");

    let (stdout, _, _) = run_cli(dir.path(), &["room", "status", &room_id, "--json"]);
    let room: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(room["participant_count"], 0);
}

#[test]
fn test_room_focus_credits_stats() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, _) = run_cli(dir.path(), &["room", "create", "Focus Test"]);
    let room_id = extract_room_id(&stdout);

    let (stdout, _, code) = run_cli(
        dir.path(),
        &["room", "focus", &room_id, "--user", "alice", "--minutes", "25"],
    );
    assert_eq!(code, 0, "Room focus failed");
    assert!(stdout.contains("Focused for 25m"));

    let (stdout, _, code) = run_cli(dir.path(), &["stats", "show", "alice", "--json"]);
    assert_eq!(code, 0, "Stats show failed");
    let profile: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(profile["sessions_completed"], 1);
    assert_eq!(profile["experience"], 250);
}

#[test]
fn test_stats_show_fresh_user() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["stats", "show", "nobody"]);
    assert_eq!(code, 0, "Stats show failed");
    assert!(stdout.contains("level 1"));
}

#[test]
fn test_stats_achievements_listing() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["stats", "achievements", "nobody"]);
    assert_eq!(code, 0, "Stats achievements failed");
    assert!(stdout.contains("First Steps"));
    assert!(stdout.contains("[ ]"));
}

#[test]
fn test_room_sweep_runs() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["room", "sweep"]);
    assert_eq!(code, 0, "Room sweep failed");
    assert!(stdout.contains("Reaped 0"));
}
