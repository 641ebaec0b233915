/// Smoke tests to verify the binary runs without panicking
use std::process::Command;

#[test]
fn binary_shows_help() {
    let output = Command::new("cargo")
        .args(["run", "--", "--help"])
        .output()
        .expect("Failed to execute cargo run");

    assert!(
        output.status.success(),
        "Binary failed to run --help: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fftvu"), "Help output should mention fftvu");
    assert!(stdout.contains("--list-devices"), "Help output should list --list-devices");
}

#[test]
fn binary_shows_version() {
    let output = Command::new("cargo")
        .args(["run", "--", "--version"])
        .output()
        .expect("Failed to execute cargo run");

    assert!(
        output.status.success(),
        "Binary failed to run --version: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("0.1.0"));
}

#[test]
fn invalid_flag_fails_gracefully() {
    let output = Command::new("cargo")
        .args(["run", "--", "--no-such-flag"])
        .output()
        .expect("Failed to execute cargo run");

    assert!(
        !output.status.success(),
        "Invalid flag should return error status"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        !stderr.contains("panicked at"),
        "Invalid flag should not cause panic"
    );
}

#[test]
fn invalid_block_size_is_rejected_before_audio_opens() {
    let output = Command::new("cargo")
        .args(["run", "--", "--block-size", "1000"])
        .output()
        .expect("Failed to execute cargo run");

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("power of two"), "unexpected stderr: {}", stderr);
    assert!(!stderr.contains("panicked at"));
}

#[test]
fn missing_config_file_is_reported() {
    let output = Command::new("cargo")
        .args(["run", "--", "--config", "/nonexistent/fftvu/config.toml"])
        .output()
        .expect("Failed to execute cargo run");

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot load settings"), "unexpected stderr: {}", stderr);
}
