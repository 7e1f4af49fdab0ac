//! `install` command: hand requested utilities to the installer pipeline.

use super::Session;
use crate::installer::{self, DynamicArgs, InstallerArgs, InstallerEnv, NameVersionArgs, Utility};
use crate::utilities::k8s::{K3S_ADDITIONAL_CLI_ARGS, K3S_TOKEN, K3S_URL};
use crate::utilities::{cli_utilities, k8s_utilities, system_utilities};
use anyhow::Result;
use clap::{Args, Subcommand};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Reinstall even when the utility is already present
    #[arg(long, global = true)]
    pub force: bool,

    /// Remove the utility instead of installing it
    #[arg(long, global = true)]
    pub uninstall: bool,

    #[command(subcommand)]
    pub command: InstallCommand,
}

#[derive(Debug, Subcommand)]
pub enum InstallCommand {
    /// Command line tools, e.g. `anchor@v0.29.0`
    Cli(UtilityRequests),

    /// Kubernetes distributions
    K8s(K8sArgs),

    /// Packages from the system package manager
    System(UtilityRequests),
}

#[derive(Debug, Args)]
pub struct UtilityRequests {
    /// Utilities as `name` or `name@version`
    #[arg(required = true)]
    pub utilities: Vec<String>,
}

#[derive(Debug, Args)]
pub struct K8sArgs {
    #[command(subcommand)]
    pub command: K8sCommand,
}

#[derive(Debug, Subcommand)]
pub enum K8sCommand {
    /// k3s-server or k3s-agent
    Distro(DistroArgs),
}

#[derive(Debug, Args)]
pub struct DistroArgs {
    /// `k3s-server` or `k3s-agent`, optionally `@version`
    pub utility: String,

    /// Cluster join token
    #[arg(long, env = "PROV_K3S_TOKEN", hide_env_values = true)]
    pub k3s_token: Option<String>,

    /// Server URL an agent joins, e.g. https://192.168.1.200:6443
    #[arg(long, env = "PROV_K3S_URL")]
    pub k3s_url: Option<String>,

    /// Extra arguments passed to the k3s installer
    #[arg(long, allow_hyphen_values = true)]
    pub k3s_additional_cli_args: Option<String>,
}

impl DistroArgs {
    fn dynamic_args(&self) -> DynamicArgs {
        DynamicArgs::new()
            .with_optional(K3S_TOKEN, self.k3s_token.as_deref())
            .with_optional(K3S_URL, self.k3s_url.as_deref())
            .with_optional(K3S_ADDITIONAL_CLI_ARGS, self.k3s_additional_cli_args.as_deref())
    }
}

fn parse_requests(utilities: &[String]) -> Vec<NameVersionArgs> {
    utilities.iter().map(|request| NameVersionArgs::parse(request)).collect()
}

/// Requests, the CLI path they came from, and the registry they resolve against.
fn plan(command: &InstallCommand) -> (Vec<NameVersionArgs>, &'static str, BTreeMap<String, Utility>) {
    match command {
        InstallCommand::Cli(requests) => (parse_requests(&requests.utilities), "cli", cli_utilities()),
        InstallCommand::System(requests) => {
            (parse_requests(&requests.utilities), "system", system_utilities())
        }
        InstallCommand::K8s(K8sArgs {
            command: K8sCommand::Distro(distro),
        }) => {
            let request = NameVersionArgs::parse(&distro.utility).with_dynamic_args(distro.dynamic_args());
            (vec![request], "k8s distro", k8s_utilities())
        }
    }
}

pub fn run(args: InstallArgs, session: &Session) -> Result<()> {
    let (utilities, sub_command_name, registry) = plan(&args.command);
    debug!(sub_command = sub_command_name, count = utilities.len(), "Install requested");

    let installer_args = InstallerArgs {
        utilities,
        sub_command_name: sub_command_name.to_string(),
        remote_opts: session.remote_opts.clone(),
        force: args.force,
        uninstall: args.uninstall,
    };
    let env = InstallerEnv::new(session.collaborators(), installer_args, registry);
    installer::run(&env)?;
    Ok(())
}
