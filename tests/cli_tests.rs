//! Command-line surface tests

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary under test, isolated from any ambient configuration
fn cli(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("video-processor").unwrap();
    cmd.current_dir(workdir.path())
        .env_remove("VIDEO_PROCESSOR_CONFIG")
        .env_remove("VIDEO_PROCESSOR_PROGRESS_STRATEGY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("trim"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_trim_rejects_inverted_window() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["trim", "--input", "clip.mp4", "--start", "5", "--end", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ARGUMENT_ERROR"));
}

#[test]
fn test_process_rejects_negative_start() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["process", "-i", "clip.mp4", "-s", "-1", "-e", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ARGUMENT_ERROR"));
}

#[test]
fn test_process_rejects_zero_height() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["process", "-i", "clip.mp4", "-s", "0", "-e", "2", "--height", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ARGUMENT_ERROR"));
}

#[test]
fn test_call_rejects_malformed_arguments() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["call", "trimVideo", "--args", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ARGUMENT_ERROR"));
}

#[test]
fn test_unknown_strategy_is_rejected() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["--strategy", "telepathy", "trim", "-i", "clip.mp4", "-s", "0", "-e", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid command-line configuration"));
}

#[test]
fn test_config_file_with_unknown_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[processor]\nturbo = true\n").unwrap();

    cli(&dir)
        .arg("--config")
        .arg(&config)
        .args(["trim", "-i", "clip.mp4", "-s", "0", "-e", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
