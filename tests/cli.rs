use assert_cmd::Command;
use predicates::prelude::*;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{self, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn airscriber_cmd() -> Command {
    Command::cargo_bin("airscriber").expect("binary exists")
}

/// Writes a config keeping sessions under `temp/sessions` and all hardware off.
fn write_config(temp: &TempDir) -> PathBuf {
    let sessions = temp.path().join("sessions");
    let config = format!(
        r#"
[session]
storage = "custom"
custom_directory = "{}"

[recognition]
enabled = false

[speech]
enabled = false

[device]
enabled = false

[runtime]
frame_rate = 0.0
shutdown_grace_secs = 2
preview_every_n_frames = 1
"#,
        sessions.display()
    );
    let path = temp.path().join("config.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn write_frames(dir: &Path, count: usize) -> PathBuf {
    let mut lines = String::from("# recorded without a hand in view\n");
    for i in 0..count {
        lines.push_str(&format!("{{\"timestamp_ms\": {}, \"landmarks\": []}}\n", i * 33));
    }
    let path = dir.join("frames.jsonl");
    std::fs::write(&path, lines).unwrap();
    path
}

#[test]
fn airscriber_help_prints_usage() {
    airscriber_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--replay"))
        .stdout(predicate::str::contains("--session-info"));
}

#[test]
fn version_includes_package_version() {
    airscriber_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn no_arguments_prints_quick_start() {
    let temp = TempDir::new().unwrap();
    airscriber_cmd()
        .env("XDG_CONFIG_HOME", temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("airscriber --replay"));
}

#[test]
fn missing_config_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    airscriber_cmd()
        .args(["--config"])
        .arg(temp.path().join("nope.toml"))
        .arg("--session-info")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn session_info_reports_empty_directory() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    airscriber_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--session-info")
        .assert()
        .success()
        .stdout(predicate::str::contains("No session files"));
}

#[test]
fn clear_sessions_removes_files_and_marker() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    let sessions = temp.path().join("sessions");
    std::fs::create_dir_all(&sessions).unwrap();
    std::fs::write(sessions.join("autosave-20260101T000000000Z-1.json"), "{}").unwrap();
    std::fs::write(sessions.join("running.marker"), "pid=1").unwrap();
    std::fs::write(sessions.join("notes.txt"), "keep").unwrap();

    airscriber_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--clear-sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 session file(s)"))
        .stdout(predicate::str::contains("Removed crash marker"));

    assert!(!sessions.join("running.marker").exists());
    assert!(sessions.join("notes.txt").exists());
}

#[test]
fn replay_processes_frames_and_shuts_down_cleanly() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    let frames = write_frames(temp.path(), 4);
    let preview = temp.path().join("preview.png");

    airscriber_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--replay")
        .arg(&frames)
        .arg("--preview")
        .arg(&preview)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 4 frames"))
        .stdout(predicate::str::contains("landmark source ended"));

    assert!(preview.exists());
    // Clean shutdown removes the crash marker
    assert!(!temp.path().join("sessions").join("running.marker").exists());
}

#[test]
fn replay_reads_stdin_and_skips_malformed_lines() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    airscriber_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--replay", "-"])
        .write_stdin("{\"timestamp_ms\": 0, \"landmarks\": []}\nnot json\n{\"timestamp_ms\": 33, \"landmarks\": []}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 2 frames"));
}

#[test]
fn replay_of_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    airscriber_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--replay")
        .arg(temp.path().join("missing.jsonl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open landmark source"));
}

/// Polls `done` every 20ms until it holds or `timeout` passes.
fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < timeout {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    done()
}

#[test]
fn sigterm_stops_replay_waiting_on_silent_stdin() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    let marker = temp.path().join("sessions").join("running.marker");

    let mut child = process::Command::new(env!("CARGO_BIN_EXE_airscriber"))
        .arg("--config")
        .arg(&config)
        .args(["--replay", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Keep the pipe open after one frame so the reader blocks
    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(b"{\"timestamp_ms\": 0, \"landmarks\": []}\n")
        .unwrap();
    stdin.flush().unwrap();

    // Signal handlers are installed before the marker is written
    assert!(wait_for(Duration::from_secs(10), || marker.exists()));
    thread::sleep(Duration::from_millis(200));
    let pid = child.id() as libc::pid_t;
    assert_eq!(unsafe { libc::kill(pid, libc::SIGTERM) }, 0);

    let mut status = None;
    let exited = wait_for(Duration::from_secs(10), || {
        status = child.try_wait().unwrap();
        status.is_some()
    });
    if !exited {
        let _ = child.kill();
        panic!("airscriber ignored SIGTERM while stdin was silent");
    }
    assert!(status.unwrap().success());

    let mut stdout = String::new();
    child.stdout.take().unwrap().read_to_string(&mut stdout).unwrap();
    assert!(stdout.contains("interrupted"), "{stdout}");
    assert!(!marker.exists());
    drop(stdin);
}
