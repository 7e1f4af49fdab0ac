//! `install cli <name>` utilities.

use super::registry;
use crate::installer::{ActiveInstallSource, GithubSource, Utility};
use std::collections::BTreeMap;

pub const RUSTUP_INSTALL_SCRIPT: &str =
    "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y";

fn arm_as_arm(os: &str, arch: &str) -> (String, String) {
    let arch = if arch == "armv7" { "arm" } else { arch };
    (os.to_string(), arch.to_string())
}

fn capitalized_os(os: &str, arch: &str) -> (String, String) {
    let os = match os {
        "darwin" => "Darwin",
        "linux" => "Linux",
        other => other,
    };
    (os.to_string(), arch.to_string())
}

fn anchor() -> Utility {
    let release_name = |version: &str, os: &str, _arch: &str| match os {
        "darwin" => format!("anchor-{version}-macos"),
        _ => format!("anchor-{version}-linux"),
    };
    Utility::new(
        "anchor",
        "anchor",
        "Solana Sealevel framework CLI",
        ActiveInstallSource::GitHub,
    )
    .with_version("v0.29.0")
    .with_version_command("--version")
    .with_github(
        GithubSource::new(
            "coral-xyz",
            "anchor",
            &["darwin_amd64", "darwin_arm64", "linux_amd64"],
            release_name,
        )
        .with_nested_binary_path(release_name),
    )
}

fn helm() -> Utility {
    Utility::new(
        "helm",
        "helm",
        "Package manager for Kubernetes",
        ActiveInstallSource::GitHub,
    )
    .with_version("v3.14.4")
    .with_version_command("version --short")
    .with_github(
        GithubSource::new(
            "helm",
            "helm",
            &[
                "darwin_amd64",
                "darwin_arm64",
                "linux_amd64",
                "linux_arm64",
                "linux_arm",
            ],
            |version, os, arch| format!("helm-{version}-{os}-{arch}.tar.gz"),
        )
        .with_nested_binary_path(|_, os, arch| format!("{os}-{arch}/helm"))
        .with_alternative_base_url("https://get.helm.sh")
        .with_os_arch_normaliser(arm_as_arm),
    )
}

fn k9s() -> Utility {
    Utility::new(
        "k9s",
        "k9s",
        "Terminal UI to interact with Kubernetes clusters",
        ActiveInstallSource::GitHub,
    )
    .with_version("v0.32.4")
    .with_version_command("version --short")
    .with_github(
        GithubSource::new(
            "derailed",
            "k9s",
            &[
                "Darwin_amd64",
                "Darwin_arm64",
                "Linux_amd64",
                "Linux_arm64",
                "Linux_armv7",
            ],
            |_, os, arch| format!("k9s_{os}_{arch}.tar.gz"),
        )
        .with_os_arch_normaliser(capitalized_os),
    )
}

fn yq() -> Utility {
    let release_name = |_: &str, os: &str, arch: &str| format!("yq_{os}_{arch}");
    Utility::new(
        "yq",
        "yq",
        "Portable command-line YAML processor",
        ActiveInstallSource::GitHub,
    )
    .with_version("v4.44.3")
    .with_version_command("--version")
    .with_github(
        GithubSource::new(
            "mikefarah",
            "yq",
            &[
                "darwin_amd64",
                "darwin_arm64",
                "linux_amd64",
                "linux_arm64",
                "linux_arm",
            ],
            release_name,
        )
        .with_nested_binary_path(release_name)
        .with_os_arch_normaliser(arm_as_arm),
    )
}

fn rustup() -> Utility {
    Utility::new(
        "rustup",
        "rustup",
        "Rust toolchain installer",
        ActiveInstallSource::Script,
    )
    .with_version_command("--version")
    .with_script(RUSTUP_INSTALL_SCRIPT)
}

pub fn cli_utilities() -> BTreeMap<String, Utility> {
    registry([anchor(), helm(), k9s(), yq(), rustup()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github(name: &str) -> GithubSource {
        cli_utilities()[name].github().unwrap().clone()
    }

    #[test]
    fn test_anchor_release_names() {
        let source = github("anchor");
        assert_eq!(
            (source.release_name_resolver)("v0.10.0", "darwin", "arm64"),
            "anchor-v0.10.0-macos"
        );
        assert_eq!(
            (source.release_name_resolver)("v0.10.0", "linux", "amd64"),
            "anchor-v0.10.0-linux"
        );
        assert!(!source.supports("linux", "arm64"));
    }

    #[test]
    fn test_helm_uses_alternative_base_url_and_nested_binary() {
        let source = github("helm");
        assert_eq!(source.alternative_base_url.as_deref(), Some("https://get.helm.sh"));
        let (os, arch) = source.normalise("linux", "armv7");
        assert_eq!((os.as_str(), arch.as_str()), ("linux", "arm"));
        assert!(source.supports(&os, &arch));
        assert_eq!(
            (source.release_name_resolver)("v3.14.4", &os, &arch),
            "helm-v3.14.4-linux-arm.tar.gz"
        );
        let nested = source.archive_nested_binary_path.unwrap();
        assert_eq!(nested("v3.14.4", &os, &arch), "linux-arm/helm");
    }

    #[test]
    fn test_k9s_capitalizes_os() {
        let source = github("k9s");
        let (os, arch) = source.normalise("darwin", "arm64");
        assert!(source.supports(&os, &arch));
        assert_eq!(
            (source.release_name_resolver)("v0.32.4", &os, &arch),
            "k9s_Darwin_arm64.tar.gz"
        );
    }

    #[test]
    fn test_rustup_is_a_script() {
        let rustup = &cli_utilities()["rustup"];
        assert_eq!(rustup.script().unwrap().install_script, RUSTUP_INSTALL_SCRIPT);
    }
}
