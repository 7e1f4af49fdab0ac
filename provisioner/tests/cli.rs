//! Integration tests for the provisioner binary.
//!
//! Every test runs against a throwaway HOME so nothing leaks into the
//! developer's real `~/.local/bin` or `~/.config/provisioner`.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

fn provisioner(home: &assert_fs::TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("provisioner");
    cmd.env("HOME", home.path())
        .env("PROVISIONER_CONFIG_PATH", home.child("missing-config.yaml").path())
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG")
        .env_remove("PROVISIONER_PRE_RUN_DEBUG");
    for (var, _) in std::env::vars().filter(|(var, _)| var.starts_with("PROV_")) {
        cmd.env_remove(var);
    }
    cmd
}

// ============================================================================
// Help and completions
// ============================================================================

#[test]
fn test_help() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("single-board"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_install_cli_help_lists_flags() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args(["install", "cli", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--uninstall"))
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_completions_bash() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("provisioner"));
}

#[test]
fn test_invalid_os_arch_is_rejected() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args(["--os-arch", "linux", "install", "cli", "anchor"])
        .assert()
        .failure();
}

// ============================================================================
// Installer
// ============================================================================

#[test]
fn test_unknown_utility_is_rejected_before_any_side_effect() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args(["-y", "--environment", "Local", "install", "cli", "unknown-tool"])
        .assert()
        .success()
        .stderr(predicate::str::contains("validate_requested_utilities"))
        .stderr(predicate::str::contains("InstallerUtilityNotSupported"))
        .stderr(predicate::str::contains("unknown-tool"));

    home.child(".config/provisioner/binaries").assert(predicate::path::missing());
    home.child(".local/bin").assert(predicate::path::missing());
}

#[test]
fn test_unknown_utility_verbose_exits_non_zero() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args(["-vy", "--environment", "Local", "install", "cli", "unknown-tool"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InstallerUtilityNotSupported"));
}

#[test]
fn test_uninstall_removes_published_binary() {
    let home = assert_fs::TempDir::new().unwrap();
    let binary = home.child(".config/provisioner/binaries/anchor/v0.10.0/anchor");
    binary.write_str("#!/bin/sh\n").unwrap();
    let bin_dir = home.child(".local/bin");
    bin_dir.create_dir_all().unwrap();
    std::os::unix::fs::symlink(binary.path(), bin_dir.child("anchor").path()).unwrap();

    provisioner(&home)
        .args(["-vy", "--environment", "Local", "install", "cli", "anchor", "--uninstall"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalling utility: anchor"))
        .stdout(predicate::str::contains("Removing symlink at"));

    assert!(std::fs::symlink_metadata(bin_dir.child("anchor").path()).is_err());
    home.child(".config/provisioner/binaries/anchor")
        .assert(predicate::path::missing());
}

#[test]
fn test_dry_run_remote_install_prints_wrapper_command() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args(["--dry-run", "install", "cli", "anchor@v0.10.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("command:"))
        .stdout(predicate::str::contains("ansible-playbook"))
        .stdout(predicate::str::contains("anchor@v0.10.0"));

    home.child(".config/provisioner/binaries").assert(predicate::path::missing());
    home.child(".local/bin").assert(predicate::path::missing());
}

// ============================================================================
// Dry run
// ============================================================================

fn assert_home_untouched(home: &assert_fs::TempDir) {
    home.child(".config").assert(predicate::path::missing());
    home.child(".local").assert(predicate::path::missing());
}

#[test]
fn test_dry_run_local_install_writes_nothing() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args([
            "--dry-run",
            "--os-arch",
            "linux_amd64",
            "--environment",
            "Local",
            "install",
            "cli",
            "anchor@v0.10.0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("anchor-v0.10.0-linux"));

    assert_home_untouched(&home);
}

#[test]
fn test_dry_run_node_configure_prints_playbook() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args(["--dry-run", "single-board", "raspberry-pi", "node", "configure"])
        .assert()
        .success()
        .stdout(predicate::str::contains("command:"))
        .stdout(predicate::str::contains("ansible-playbook"));

    assert_home_untouched(&home);
}

#[test]
fn test_dry_run_node_network_prints_playbook() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args([
            "--dry-run",
            "single-board",
            "raspberry-pi",
            "node",
            "network",
            "--static-ip-address",
            "192.168.1.210",
            "--gw-ip-address",
            "192.168.1.1",
            "--dns-ip-address",
            "192.168.1.1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ansible-playbook"));

    assert_home_untouched(&home);
}

#[cfg(target_os = "linux")]
#[test]
fn test_dry_run_burn_image_writes_nothing() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args([
            "--dry-run",
            "--os-arch",
            "linux_amd64",
            "single-board",
            "raspberry-pi",
            "os",
            "burn-image",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Downloading image"));

    assert_home_untouched(&home);
}

#[test]
fn test_dry_run_examples_hello_prints_playbook() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args([
            "--dry-run",
            "--environment",
            "Local",
            "examples",
            "ansible",
            "hello",
            "--username",
            "O'Brien",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ansible-playbook"))
        .stdout(predicate::str::contains("hello_world"));

    assert_home_untouched(&home);
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_view_masks_secrets() {
    let home = assert_fs::TempDir::new().unwrap();
    let config = home.child("config.yaml");
    config
        .write_str(
            "remote:\n  hosts:\n    - name: kmaster\n      address: 192.168.1.200\n      auth:\n        username: pi\n        password: s3cr3t-pass\n",
        )
        .unwrap();

    provisioner(&home)
        .env("PROVISIONER_CONFIG_PATH", config.path())
        .args(["config", "view"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kmaster"))
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("s3cr3t-pass").not());
}

#[test]
fn test_config_view_verbose_shows_secrets() {
    let home = assert_fs::TempDir::new().unwrap();
    let config = home.child("config.yaml");
    config
        .write_str(
            "remote:\n  hosts:\n    - name: kmaster\n      address: 192.168.1.200\n      auth:\n        username: pi\n        password: s3cr3t-pass\n",
        )
        .unwrap();

    provisioner(&home)
        .env("PROVISIONER_CONFIG_PATH", config.path())
        .args(["-v", "config", "view"])
        .assert()
        .success()
        .stdout(predicate::str::contains("s3cr3t-pass"));
}

#[test]
fn test_config_view_without_user_file_uses_defaults() {
    let home = assert_fs::TempDir::new().unwrap();
    provisioner(&home)
        .args(["config", "view"])
        .assert()
        .success()
        .stdout(predicate::str::contains("remote"));
}
