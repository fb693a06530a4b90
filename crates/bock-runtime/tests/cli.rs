//! End-to-end tests of the `bock-runtime` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn bock_runtime(root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("bock-runtime").unwrap();
    cmd.env("BOCK_ROOT", root)
        .env_remove("BOCK_MOUNT_RETRIES")
        .env_remove("BOCK_MOUNT_BACKOFF_MS");
    cmd
}

#[test]
fn device_prints_json() {
    let root = tempfile::tempdir().unwrap();
    bock_runtime(root.path())
        .args(["device", "nvidia.com/gpu=all,required"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name": "nvidia.com/gpu=all""#))
        .stdout(predicate::str::contains(r#""required": true"#));
}

#[test]
fn invalid_device_fails() {
    let root = tempfile::tempdir().unwrap();
    bock_runtime(root.path())
        .args(["device", "gpu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid device name gpu"));
}

#[test]
fn run_flags_are_parsed() {
    let root = tempfile::tempdir().unwrap();
    bock_runtime(root.path())
        .args(["run", "--device=vendor.com/fpga=0", "make", "test"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""vendor.com/fpga=0""#))
        .stdout(predicate::str::contains(r#""make""#));
}

#[test]
fn config_reads_file_and_environment() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(
        root.path().join("mounter.toml"),
        "temp_prefix = \"step\"\nretries = 5\n",
    )
    .unwrap();

    bock_runtime(root.path())
        .env("BOCK_MOUNT_BACKOFF_MS", "75")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"temp_prefix = "step""#))
        .stdout(predicate::str::contains("retries = 5"))
        .stdout(predicate::str::contains("backoff_ms = 75"));
}

#[test]
fn invalid_override_is_reported() {
    let root = tempfile::tempdir().unwrap();
    bock_runtime(root.path())
        .env("BOCK_MOUNT_RETRIES", "many")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BOCK_MOUNT_RETRIES"));
}

#[test]
fn writable_bind_runs_command_in_source() {
    let root = tempfile::tempdir().unwrap();
    let source = tempfile::tempdir().unwrap();
    std::fs::write(source.path().join("marker"), "x").unwrap();

    bock_runtime(root.path())
        .arg("mount")
        .arg("--source")
        .arg(source.path())
        .args(["-o", "rw", "--", "sh", "-c", "test -f marker && test -f \"$BOCK_MOUNT_PATH/marker\""])
        .assert()
        .success();
}

#[test]
fn failing_command_fails_after_unmount() {
    let root = tempfile::tempdir().unwrap();
    let source = tempfile::tempdir().unwrap();

    bock_runtime(root.path())
        .arg("mount")
        .arg("--source")
        .arg(source.path())
        .args(["--", "false"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("`false` exited with"));
    assert!(source.path().is_dir());
}
