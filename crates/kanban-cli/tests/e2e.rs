//! End-to-end CLI tests: `kb` runs as a subprocess in an isolated temp dir
//! against a remote that refuses connections, so every flow here exercises
//! the offline path.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const BOARD: &str = r#"{
  "id": "b1",
  "name": "Release",
  "workspaceId": "team-a",
  "columns": [
    {"id": "todo", "name": "Todo", "position": 0, "boardId": "b1", "tasks": [
      {"id": "t1", "title": "Draft", "columnId": "todo", "position": 0,
       "createdAt": "2024-02-15T15:50:00Z", "updatedAt": "2024-02-15T15:50:00Z"},
      {"id": "t2", "title": "Review", "columnId": "todo", "position": 1,
       "createdAt": "2024-02-15T15:50:00Z", "updatedAt": "2024-02-15T15:50:00Z"}
    ]},
    {"id": "done", "name": "Done", "position": 1, "boardId": "b1", "tasks": []}
  ]
}"#;

/// Build a Command targeting the kb binary, rooted in `dir`.
fn kb_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kb"));
    cmd.current_dir(dir);
    cmd.env("KANBAN_LOG", "error");
    // Loopback discard port: connections are refused immediately.
    cmd.env("KANBAN_REMOTE", "http://127.0.0.1:9");
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg"));
    cmd.env_remove("FORMAT");
    cmd
}

fn init_with_board(dir: &Path) {
    let board_path = dir.join("board.json");
    std::fs::write(&board_path, BOARD).expect("write board");
    kb_cmd(dir)
        .args(["init", "--board"])
        .arg(&board_path)
        .assert()
        .success();
}

fn json_of(dir: &Path, args: &[&str]) -> Value {
    let output = kb_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("kb should not crash");
    assert!(
        output.status.success(),
        "kb {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn task_ids(board: &Value, column: usize) -> Vec<String> {
    board["columns"][column]["tasks"]
        .as_array()
        .expect("tasks array")
        .iter()
        .map(|t| t["id"].as_str().expect("task id").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_seeds_cache() {
    let dir = TempDir::new().expect("tempdir");
    init_with_board(dir.path());

    assert!(dir.path().join(".kanban/config.toml").exists());
    assert!(dir.path().join(".kanban/.gitignore").exists());

    let board = json_of(dir.path(), &["show"]);
    assert_eq!(board["workspaceId"], "team-a");
    assert_eq!(task_ids(&board, 0), ["t1", "t2"]);
}

#[test]
fn move_applies_locally_and_queues_one_update() {
    let dir = TempDir::new().expect("tempdir");
    init_with_board(dir.path());

    let report = json_of(dir.path(), &["move", "t1", "--to", "done"]);
    assert_eq!(report["placement"]["taskId"], "t1");
    assert_eq!(report["placement"]["columnId"], "done");
    assert_eq!(report["placement"]["position"], 0);
    assert_eq!(report["pending"], 1);

    let board = json_of(dir.path(), &["show"]);
    assert_eq!(task_ids(&board, 0), ["t2"]);
    assert_eq!(board["columns"][0]["tasks"][0]["position"], 0);
    assert_eq!(task_ids(&board, 1), ["t1"]);

    // Moving the same task again replaces its queue entry.
    json_of(dir.path(), &["move", "t1", "--to", "todo", "--position", "0"]);
    let status = json_of(dir.path(), &["status"]);
    assert_eq!(status["pending"], 1);
    assert_eq!(status["queue"][0]["columnId"], "todo");
}

#[test]
fn failed_sync_reports_remote_code_and_keeps_queue() {
    let dir = TempDir::new().expect("tempdir");
    init_with_board(dir.path());
    json_of(dir.path(), &["move", "t2", "--to", "done"]);

    kb_cmd(dir.path())
        .args(["sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4001"));

    let status = json_of(dir.path(), &["status"]);
    assert_eq!(status["pending"], 1);
    assert_eq!(status["queue"][0]["taskId"], "t2");
}

#[test]
fn sync_with_empty_queue_succeeds_offline() {
    let dir = TempDir::new().expect("tempdir");
    init_with_board(dir.path());

    let report = json_of(dir.path(), &["sync"]);
    assert_eq!(report["result"], "empty");
    assert_eq!(report["pending"], 0);
}

#[test]
fn failed_create_leaves_board_unchanged() {
    let dir = TempDir::new().expect("tempdir");
    init_with_board(dir.path());

    kb_cmd(dir.path())
        .args(["create-task", "--column", "todo", "--title", "New"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4001"));

    let board = json_of(dir.path(), &["show"]);
    assert_eq!(task_ids(&board, 0), ["t1", "t2"]);
}

#[test]
fn unknown_task_and_column_are_coded() {
    let dir = TempDir::new().expect("tempdir");
    init_with_board(dir.path());

    kb_cmd(dir.path())
        .args(["move", "nope", "--to", "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));

    kb_cmd(dir.path())
        .args(["move", "t1", "--to", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"));

    let status = json_of(dir.path(), &["status"]);
    assert_eq!(status["pending"], 0);
}

#[test]
fn commands_outside_a_workspace_fail_with_not_initialized() {
    let dir = TempDir::new().expect("tempdir");
    kb_cmd(dir.path())
        .args(["show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn init_without_board_then_show_reports_no_board() {
    let dir = TempDir::new().expect("tempdir");
    kb_cmd(dir.path())
        .args(["init", "--workspace", "solo"])
        .assert()
        .success();

    kb_cmd(dir.path())
        .args(["show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn watch_exits_after_duration_and_reports() {
    let dir = TempDir::new().expect("tempdir");
    init_with_board(dir.path());
    json_of(dir.path(), &["move", "t1", "--to", "done"]);

    let report = json_of(
        dir.path(),
        &["watch", "--interval-secs", "1", "--duration", "2"],
    );
    assert_eq!(report["synced"], 0);
    assert_eq!(report["pending"], 1);
    assert_eq!(report["beaconSent"], true);
}

#[test]
fn completions_generate_for_bash() {
    let dir = TempDir::new().expect("tempdir");
    kb_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kb"));
}
