//! `install system <name>` utilities.

use super::registry;
use crate::collaborators::Collaborators;
use crate::command_runner::CommandOptions;
use crate::error::ProvisionerError;
use crate::installer::{ActiveInstallSource, DynamicArgs, Utility};
use anyhow::Result;
use std::collections::BTreeMap;

/// Install python with the platform package manager.
fn install_python(
    version: Option<&str>,
    collaborators: &Collaborators,
    _args: Option<&DynamicArgs>,
) -> Result<String> {
    let os_arch = &collaborators.context().os_arch;
    let runner = collaborators.command_runner();
    let version = version.filter(|v| !v.is_empty() && *v != "latest");

    if os_arch.is_darwin() {
        collaborators.checks().require_tool("brew")?;
        let formula = match version {
            Some(version) => format!("python@{version}"),
            None => "python".to_string(),
        };
        runner.run_checked("brew", &["install", &formula], &CommandOptions::default())
    } else if os_arch.is_linux() {
        collaborators.checks().require_tool("apt-get")?;
        let package = match version {
            Some(version) => format!("python{version}"),
            None => "python3".to_string(),
        };
        runner.run_checked(
            "sudo",
            &["apt-get", "install", "-y", &package],
            &CommandOptions::default(),
        )
    } else {
        Err(ProvisionerError::OsArchNotSupported {
            utility: "python".to_string(),
            os_arch: os_arch.pair(),
        }
        .into())
    }
}

pub fn system_utilities() -> BTreeMap<String, Utility> {
    registry([Utility::new(
        "python",
        "python3",
        "Python interpreter from the system package manager",
        ActiveInstallSource::Callback,
    )
    .with_version_command("--version")
    .with_callback(install_python)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, OsArch};
    use crate::error::error_kind;
    use crate::testing::{FakeChecks, FakeCommandRunner};
    use std::sync::Arc;

    fn collaborators(os: &str, checks: FakeChecks, runner: FakeCommandRunner) -> Collaborators {
        let ctx = Context::builder()
            .home_dir("/home/pi")
            .os_arch(OsArch::new(os, "arm64", ""))
            .build()
            .unwrap();
        Collaborators::new(ctx)
            .with_checks(Arc::new(checks))
            .with_command_runner(Arc::new(runner))
    }

    #[test]
    fn test_python_uses_apt_on_linux() {
        let runner = FakeCommandRunner::new();
        let collaborators = collaborators("linux", FakeChecks::new().with_tool("apt-get"), runner.clone());
        install_python(Some("3.11"), &collaborators, None).unwrap();
        assert_eq!(runner.calls()[0].command_line(), "sudo apt-get install -y python3.11");
    }

    #[test]
    fn test_python_uses_brew_on_darwin() {
        let runner = FakeCommandRunner::new();
        let collaborators = collaborators("darwin", FakeChecks::new().with_tool("brew"), runner.clone());
        install_python(None, &collaborators, None).unwrap();
        assert_eq!(runner.calls()[0].command_line(), "brew install python");
    }

    #[test]
    fn test_python_requires_package_manager() {
        let collaborators = collaborators("linux", FakeChecks::new(), FakeCommandRunner::new());
        let err = install_python(None, &collaborators, None).unwrap_err();
        assert_eq!(error_kind(&err), "MissingUtility");
    }
}
