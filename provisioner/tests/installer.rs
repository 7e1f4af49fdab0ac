//! End-to-end installer runs against a temporary home with faked network access.

use provisioner::collaborators::Collaborators;
use provisioner::context::{Context, OsArch};
use provisioner::error::error_kind;
use provisioner::installer::{
    ActiveInstallSource, GithubSource, InstallerArgs, InstallerEnv, NameVersionArgs, Utility, run,
};
use provisioner::remote::{RemoteOpts, RunEnvironment};
use provisioner::testing::{FakeChecks, FakeCommandRunner, FakePrinter, FakePrompter, FakeReleaseApi};
use provisioner::utilities::cli::cli_utilities;
use provisioner::utilities::k8s::k8s_utilities;
use provisioner_common::checksum::sha256_hex;
use provisioner_release::{BlockingHttpClient, GithubReleaseApi};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

struct Harness {
    env: InstallerEnv,
    printer: FakePrinter,
    release_api: FakeReleaseApi,
}

fn local_args(request: &str) -> InstallerArgs {
    InstallerArgs {
        utilities: vec![NameVersionArgs::parse(request)],
        sub_command_name: "cli".into(),
        remote_opts: RemoteOpts {
            environment: Some(RunEnvironment::Local),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn collaborators(home: &Path, os_arch: OsArch, printer: &FakePrinter) -> Collaborators {
    let ctx = Context::builder()
        .home_dir(home)
        .os_arch(os_arch)
        .auto_prompt(true)
        .build()
        .unwrap();
    Collaborators::new(ctx)
        .with_printer(Arc::new(printer.clone()))
        .with_prompter(Arc::new(FakePrompter::new()))
        .with_checks(Arc::new(FakeChecks::new()))
        .with_command_runner(Arc::new(FakeCommandRunner::new()))
}

fn harness(home: &Path, os_arch: OsArch, request: &str) -> Harness {
    let printer = FakePrinter::new();
    let release_api = FakeReleaseApi::new().with_latest("v0.29.0");
    let collaborators =
        collaborators(home, os_arch, &printer).with_release_api(Arc::new(release_api.clone()));
    Harness {
        env: InstallerEnv::new(collaborators, local_args(request), cli_utilities()),
        printer,
        release_api,
    }
}

// ============================================================================
// GitHub releases
// ============================================================================

#[test]
fn test_install_anchor_from_github_release() {
    let home = tempdir().unwrap();
    let h = harness(home.path(), OsArch::new("darwin", "arm64", ""), "anchor@v0.10.0");

    assert!(run(&h.env).unwrap());

    let downloads = h.release_api.downloads();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].owner, "coral-xyz");
    assert_eq!(downloads[0].repo, "anchor");
    assert_eq!(downloads[0].version, "v0.10.0");
    assert_eq!(downloads[0].filename, "anchor-v0.10.0-macos");
    assert!(h.release_api.lookups().is_empty());

    assert!(h.printer.contains("Successfully installed utility"));
    assert!(h.printer.contains("name:    anchor"));
    assert!(h.printer.contains("version: v0.10.0"));
    assert!(h.printer.contains("binary:  ~/.local/bin/anchor"));

    let link = home.path().join(".local/bin/anchor");
    let target = std::fs::read_link(&link).unwrap();
    assert_eq!(
        target,
        home.path().join(".config/provisioner/binaries/anchor/v0.10.0/anchor")
    );
    assert!(target.is_file());
}

#[test]
fn test_latest_version_is_resolved_from_releases() {
    let home = tempdir().unwrap();
    let printer = FakePrinter::new();
    let release_api = FakeReleaseApi::new().with_latest("v0.31.1");
    let mut registry = cli_utilities();
    if let Some(anchor) = registry.get_mut("anchor") {
        anchor.version = None;
    }
    let env = InstallerEnv::new(
        collaborators(home.path(), OsArch::new("linux", "amd64", ""), &printer)
            .with_release_api(Arc::new(release_api.clone())),
        local_args("anchor"),
        registry,
    );

    assert!(run(&env).unwrap());
    assert_eq!(
        release_api.lookups(),
        vec![("coral-xyz".to_string(), "anchor".to_string())]
    );
    assert_eq!(release_api.downloads()[0].filename, "anchor-v0.31.1-linux");
    assert!(printer.contains("version: v0.31.1"));
}

#[test]
fn test_second_install_is_a_no_op() {
    let home = tempdir().unwrap();
    let first = harness(home.path(), OsArch::new("linux", "amd64", ""), "anchor@v0.10.0");
    assert!(run(&first.env).unwrap());
    assert_eq!(first.release_api.downloads().len(), 1);

    let printer = FakePrinter::new();
    let release_api = FakeReleaseApi::new();
    let checks = FakeChecks::new().with_tool("anchor");
    let env = InstallerEnv::new(
        collaborators(home.path(), OsArch::new("linux", "amd64", ""), &printer)
            .with_checks(Arc::new(checks))
            .with_release_api(Arc::new(release_api.clone())),
        local_args("anchor@v0.10.0"),
        cli_utilities(),
    );

    run(&env).unwrap();
    assert!(release_api.downloads().is_empty());
    assert!(printer.contains("Utility already installed locally. name: anchor"));
    assert!(!printer.contains("Successfully installed utility"));
}

#[test]
fn test_unsupported_os_arch_fails_before_download() {
    let home = tempdir().unwrap();
    let h = harness(home.path(), OsArch::new("linux", "arm64", ""), "anchor@v0.10.0");

    let err = run(&h.env).unwrap_err();
    assert_eq!(error_kind(&err), "OsArchNotSupported");
    assert!(h.release_api.downloads().is_empty());
    assert!(!home.path().join(".local/bin/anchor").exists());
}

#[test]
fn test_alternative_base_url_downloads_over_http() {
    let mut server = mockito::Server::new();
    let body = b"#!/bin/sh\necho mirrored\n";
    let mock = server
        .mock("GET", "/mirrored-v1.2.3-linux-amd64")
        .with_status(200)
        .with_body(body)
        .create();

    let release_name = |version: &str, os: &str, arch: &str| format!("mirrored-{version}-{os}-{arch}");
    let utility = Utility::new("mirrored", "mirrored", "Mirrored release", ActiveInstallSource::GitHub)
        .with_version("v1.2.3")
        .with_github(
            GithubSource::new("example", "mirrored", &["linux_amd64"], release_name)
                .with_nested_binary_path(release_name)
                .with_alternative_base_url(&server.url()),
        );

    let home = tempdir().unwrap();
    let printer = FakePrinter::new();
    let release_api = FakeReleaseApi::new();
    let env = InstallerEnv::new(
        collaborators(home.path(), OsArch::new("linux", "amd64", ""), &printer)
            .with_release_api(Arc::new(release_api.clone()))
            .with_http_client(Arc::new(BlockingHttpClient::new(false))),
        local_args("mirrored"),
        BTreeMap::from([("mirrored".to_string(), utility)]),
    );

    assert!(run(&env).unwrap());
    mock.assert();
    assert!(release_api.downloads().is_empty());

    let published = home
        .path()
        .join(".config/provisioner/binaries/mirrored/v1.2.3/mirrored");
    assert_eq!(std::fs::read(&published).unwrap(), body);
    assert_eq!(
        std::fs::read_link(home.path().join(".local/bin/mirrored")).unwrap(),
        published
    );
}

#[test]
fn test_checksum_mismatch_is_never_published() {
    let mut server = mockito::Server::new();
    let url = server.url();
    let _release = server
        .mock("GET", "/repos/coral-xyz/anchor/releases/tags/v0.10.0")
        .with_status(200)
        .with_body(format!(
            r#"{{"tag_name": "v0.10.0", "assets": [
                {{"name": "anchor-v0.10.0-linux", "browser_download_url": "{url}/download/anchor-v0.10.0-linux", "size": 8}},
                {{"name": "checksums.txt", "browser_download_url": "{url}/download/checksums.txt", "size": 90}}
            ]}}"#
        ))
        .expect(2)
        .create();
    let binary = server
        .mock("GET", "/download/anchor-v0.10.0-linux")
        .with_status(200)
        .with_body("tampered")
        .expect(2)
        .create();
    let _checksums = server
        .mock("GET", "/download/checksums.txt")
        .with_status(200)
        .with_body(format!("{}  anchor-v0.10.0-linux\n", sha256_hex(b"binary")))
        .create();

    let home = tempdir().unwrap();
    let attempt = || {
        let printer = FakePrinter::new();
        let env = InstallerEnv::new(
            collaborators(home.path(), OsArch::new("linux", "amd64", ""), &printer)
                .with_release_api(Arc::new(GithubReleaseApi::with_base_url(&url, None, false)))
                .with_http_client(Arc::new(BlockingHttpClient::new(false))),
            local_args("anchor@v0.10.0"),
            cli_utilities(),
        );
        run(&env)
    };

    let first = attempt().unwrap_err();
    assert!(format!("{first:#}").contains("checksum"));
    let version_dir = home.path().join(".config/provisioner/binaries/anchor/v0.10.0");
    assert!(!version_dir.join("anchor-v0.10.0-linux").exists());

    assert!(attempt().is_err());
    binary.assert();
    assert!(!version_dir.join("anchor").exists());
    assert!(std::fs::symlink_metadata(home.path().join(".local/bin/anchor")).is_err());
}

// ============================================================================
// Registry gating
// ============================================================================

#[test]
fn test_sub_command_registry_gates_utilities() {
    let home = tempdir().unwrap();
    let printer = FakePrinter::new();
    let release_api = FakeReleaseApi::new();
    let env = InstallerEnv::new(
        collaborators(home.path(), OsArch::new("linux", "amd64", ""), &printer)
            .with_release_api(Arc::new(release_api.clone())),
        local_args("k3s-server"),
        cli_utilities(),
    );

    let err = run(&env).unwrap_err();
    assert_eq!(error_kind(&err), "InstallerUtilityNotSupported");
    assert!(release_api.downloads().is_empty());
    assert!(printer.lines().is_empty());

    assert!(k8s_utilities().contains_key("k3s-server"));
    assert!(!k8s_utilities().contains_key("anchor"));
}
