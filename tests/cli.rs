// Binary-level checks: configuration problems must fail before any remote
// call, with a non-zero exit status and a usable message.

use assert_cmd::Command;

fn cloudpipe() -> Command {
    Command::cargo_bin("cloudpipe").expect("binary not built")
}

#[test]
fn test_no_command_fails_with_usage() {
    let output = cloudpipe().output().expect("failed to run binary");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"));
}

#[test]
fn test_missing_bucket_flag_fails() {
    let output = cloudpipe()
        .args(["ls"])
        .output()
        .expect("failed to run binary");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--bucket"));
}

#[test]
fn test_conflicting_credential_flags_fail() {
    let output = cloudpipe()
        .args([
            "ls",
            "--bucket",
            "some-bucket",
            "--credentials-file",
            "/tmp/key.json",
            "--credentials-json",
            "{}",
        ])
        .output()
        .expect("failed to run binary");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used with"));
}

#[test]
fn test_unknown_command_fails() {
    let output = cloudpipe()
        .args(["frobnicate"])
        .output()
        .expect("failed to run binary");
    assert!(!output.status.success());
}

#[test]
fn test_help_lists_every_command() {
    let output = cloudpipe()
        .args(["--help"])
        .output()
        .expect("failed to run binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in [
        "ls",
        "download",
        "upload",
        "read",
        "write",
        "rm",
        "publish",
        "subscribe",
    ] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_download_requires_at_least_one_object() {
    let output = cloudpipe()
        .args(["download", "--bucket", "some-bucket"])
        .output()
        .expect("failed to run binary");
    assert!(!output.status.success());
}
