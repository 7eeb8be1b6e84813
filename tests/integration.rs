//! Integration tests for the ipset-exec command-line front end.
//!
//! Tests that touch the kernel require root and the ipset binary and are
//! marked with #[ignore]. Run with: `sudo cargo test --release -- --ignored`

use std::process::{Command, Output};

/// Run ipset-exec command and return output
fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ipset-exec"))
        .args(args)
        .output()
        .expect("Failed to execute ipset-exec")
}

/// Check if running as root
fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[test]
fn test_help_command() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("refresh"));
    assert!(stdout.contains("create"));
}

#[test]
fn test_version_flag() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ipset-exec"));
}

#[test]
fn test_missing_binary_is_reported() {
    let output = run_cli(&[
        "--config",
        "/nonexistent/config.yaml",
        "--binary",
        "/nonexistent/sbin/ipset",
        "names",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_timeout_is_rejected() {
    let output = run_cli(&[
        "--config",
        "/nonexistent/config.yaml",
        "--timeout",
        "soon",
        "names",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid timeout"), "stderr: {}", stderr);
}

#[test]
#[ignore] // Requires root
fn test_cli_create_list_destroy() {
    if !is_root() {
        eprintln!("Skipping test_cli_create_list_destroy: requires root");
        return;
    }

    let name = "ipsetexec_cli";
    let _ = run_cli(&["destroy", name]);

    let output = run_cli(&["create", name, "hash:ip", "timeout", "0"]);
    assert!(output.status.success(), "{:?}", output);

    let output = run_cli(&["add", name, "192.0.2.1"]);
    assert!(output.status.success(), "{:?}", output);

    let output = run_cli(&["entries", name]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l == "192.0.2.1"));

    let output = run_cli(&["test", name, "192.0.2.2"]);
    assert!(!output.status.success());

    let output = run_cli(&["destroy", name]);
    assert!(output.status.success(), "{:?}", output);
}
