use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DEVFS_VERSION: &str = env!("CARGO_PKG_VERSION");

fn config_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("null.ini"), "").unwrap();
    fs::write(root.join("zero.ini"), "[main]\nmajor = 2\n").unwrap();
    fs::create_dir(root.join("dmuart")).unwrap();
    fs::write(root.join("dmuart").join("0.ini"), "major = 0\nminor = 0\n").unwrap();
    fs::write(root.join("dmuart").join("1.toml"), "[main]\nmajor = 0\nminor = 1\n").unwrap();
    temp
}

fn devfs(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("devfs").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(config)
        .arg("--module")
        .arg("dmuart=memory");
    cmd
}

#[test]
fn version_string() {
    Command::cargo_bin("devfs")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("devfs {DEVFS_VERSION}")));
}

#[test]
fn ls_root() {
    let temp = config_dir();
    devfs(temp.path())
        .arg("ls")
        .assert()
        .success()
        .stdout("dmuart0/\nnull\nzero2\n");
}

#[test]
fn ls_group_long() {
    let temp = config_dir();
    devfs(temp.path())
        .args(["ls", "-l", "/dmuart0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("c 0666        0 0"))
        .stdout(predicate::str::contains("c 0666        0 1"));
}

#[test]
fn ls_missing_directory() {
    let temp = config_dir();
    devfs(temp.path())
        .args(["ls", "/dmspi0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry not found"));
}

#[test]
fn tree() {
    let temp = config_dir();
    devfs(temp.path())
        .arg("tree")
        .assert()
        .success()
        .stdout("/\n  dmuart0/\n    0\n    1\n  null\n  zero2\n");
}

#[test]
fn stat_device_and_directory() {
    let temp = config_dir();
    devfs(temp.path())
        .args(["stat", "/zero2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("type: device"))
        .stdout(predicate::str::contains("mode: 0444"));

    devfs(temp.path())
        .args(["stat", "dmuart0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("type: directory"));
}

#[test]
fn cat_reads_the_device() {
    let temp = config_dir();
    devfs(temp.path())
        .args(["cat", "--bytes", "4", "/zero2"])
        .assert()
        .success()
        .stdout(predicate::eq(&[0u8, 0, 0, 0][..]));

    devfs(temp.path())
        .args(["cat", "/null"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn write_reports_accepted_bytes() {
    let temp = config_dir();
    devfs(temp.path())
        .args(["write", "/dmuart0/1", "hello"])
        .assert()
        .success()
        .stderr(predicate::str::contains("5 of 5 bytes written"));

    devfs(temp.path())
        .args(["write", "/zero2", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to open"));
}

#[test]
fn write_then_cat_reads_back_in_the_same_mount() {
    let temp = config_dir();
    devfs(temp.path())
        .args(["write", "--then-cat", "/dmuart0/0", "hello"])
        .assert()
        .success()
        .stdout("hello");

    // A new run mounts fresh instances.
    devfs(temp.path())
        .args(["cat", "/dmuart0/0"])
        .assert()
        .success()
        .stdout("");

    devfs(temp.path())
        .args(["write", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--then-cat"));
}

#[test]
fn config_from_environment() {
    let temp = config_dir();
    Command::cargo_bin("devfs")
        .unwrap()
        .env("DEVFS_CONFIG", temp.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}

#[test]
fn missing_config() {
    Command::cargo_bin("devfs")
        .unwrap()
        .env_remove("DEVFS_CONFIG")
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no configuration directory"));
}
