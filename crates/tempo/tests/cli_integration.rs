//! CLI integration tests for the Tempo command-line interface.
//!
//! Each test points the binary at a throwaway config directory and database,
//! so nothing outside the temp dir is read or written.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the tempo binary, isolated in `dir`.
fn tempo(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tempo").unwrap();
    cmd.current_dir(dir.path())
        .env("TEMPO_CONFIG_DIR", dir.path().join("config"))
        .env("TEMPO_DATABASE", dir.path().join("tempo.db"))
        .env_remove("RUST_LOG");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    tempo(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("settings"))
        .stdout(predicate::str::contains("reset"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    tempo(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tempo"));
}

#[test]
fn test_user_is_required() {
    let dir = TempDir::new().unwrap();
    tempo(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands Against a Database
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_status_for_unknown_user_fails() {
    let dir = TempDir::new().unwrap();
    tempo(&dir)
        .args(["status", "--user", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No timer session for user 5"));
}

#[test]
fn test_settings_create_then_status() {
    let dir = TempDir::new().unwrap();

    tempo(&dir)
        .args(["--json", "settings", "--user", "5", "--pomodoro", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pomodoro\": 50"))
        .stdout(predicate::str::contains("\"shortBreak\": 5"));

    tempo(&dir)
        .args(["--json", "settings", "--user", "5", "--auto-transition", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"autoTransition\": true"))
        .stdout(predicate::str::contains("\"pomodoro\": 50"));

    tempo(&dir)
        .args(["--json", "status", "--user", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"isRunning\": false"))
        .stdout(predicate::str::contains("\"currentPhase\": \"pomodoro\""));

    tempo(&dir)
        .args(["--json", "reset", "--user", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"completedPomodoros\": 0"));
}

#[test]
fn test_settings_rejects_out_of_range() {
    let dir = TempDir::new().unwrap();
    tempo(&dir)
        .args(["settings", "--user", "5", "--long-break", "61"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 60"));
}

#[test]
fn test_run_rejects_unknown_phase() {
    let dir = TempDir::new().unwrap();
    tempo(&dir)
        .args(["run", "--user", "5", "--phase", "nap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown phase"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("tempo.toml"),
        "[engine]\nflush_every_ticks = 0\n",
    )
    .unwrap();
    tempo(&dir)
        .args(["status", "--user", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("flush_every_ticks"));
}
