//! Installing on remote hosts by re-invoking `provisioner` there.

use super::utility::Utility;
use super::{INSTALLERS_PLUGIN, InstallerEnv};
use crate::ansible::{AnsiblePlaybook, PlaybookRun, extra_var, playbooks, quote};
use crate::chain::Step;
use crate::remote::{AnsibleHost, RemoteMachineConnector, SshConnectionInfo};
use anyhow::Result;
use std::env;
use tracing::{info, warn};

pub const PROVISIONER_WRAPPER_PLAYBOOK: &str = "provisioner_wrapper";
pub const INSTALLER_PLUGIN_TEST_ENV: &str = "PROVISIONER_INSTALLER_PLUGIN_TEST";

pub fn install_utilities<'a>(env: &'a InstallerEnv, utilities: Vec<Utility>) -> Step<'a, Vec<Utility>> {
    Step::effect(move || collect_connection_info(env))
        .named("collect_ssh_connection_info")
        .flat_map(move |info| match info {
            Some(info) if !info.hosts.is_empty() => run_on_hosts(env, info, utilities),
            _ => {
                warn!("No remote hosts were selected, nothing to install");
                env.collaborators
                    .printer()
                    .warning("No remote hosts were selected, nothing to install");
                Step::of(utilities)
            }
        })
}

fn collect_connection_info(env: &InstallerEnv) -> Result<Option<SshConnectionInfo>> {
    let connector = RemoteMachineConnector::new(&env.collaborators);
    let info = connector.collect_ssh_connection_info(&env.args.remote_opts, false)?;
    if let Some(info) = &info {
        env.collaborators.summary().append("SSH Connection Info", info);
    }
    Ok(info)
}

fn run_on_hosts<'a>(
    env: &'a InstallerEnv,
    info: SshConnectionInfo,
    utilities: Vec<Utility>,
) -> Step<'a, Vec<Utility>> {
    Step::of(utilities).for_each(move |utility| {
        let hosts = info.hosts.clone();
        Step::effect(move || {
            let collaborators = &env.collaborators;
            collaborators.summary().show_summary_and_prompt_for_enter(
                &format!("Installing Utility: {}", utility.display_name),
                collaborators.printer().as_ref(),
                collaborators.prompter().as_ref(),
            )?;
            for host in &hosts {
                let output = run_provisioner_wrapper(env, &utility, host)?;
                collaborators.printer().print(output.trim_end());
            }
            Ok(utility)
        })
        .named("run_remote_provisioner_wrapper")
    })
}

/// `install --environment Local <sub_command> <utility>[@version] [args] [--force] [--uninstall] -y [-v]`
pub fn build_provisioner_command(env: &InstallerEnv, utility: &Utility) -> String {
    let mut parts = vec![
        "install".to_string(),
        "--environment".to_string(),
        "Local".to_string(),
    ];
    parts.extend(env.args.sub_command_name.split_whitespace().map(str::to_string));
    parts.push(match utility.version.as_deref() {
        Some(version) if !version.is_empty() => format!("{}@{version}", utility.display_name),
        _ => utility.display_name.clone(),
    });
    if let Some(args) = &utility.maybe_args {
        parts.extend(args.as_cli_args().iter().map(|arg| quote(arg).into_owned()));
    }
    if env.args.force {
        parts.push("--force".to_string());
    }
    if env.args.uninstall {
        parts.push("--uninstall".to_string());
    }
    parts.push("-y".to_string());
    if env.collaborators.context().verbose {
        parts.push("-v".to_string());
    }
    parts.join(" ")
}

pub fn build_wrapper_vars(env: &InstallerEnv, command: &str) -> Vec<String> {
    let mut vars = vec![
        extra_var("provisioner_command", command),
        format!("required_plugins=['{INSTALLERS_PLUGIN}']"),
    ];
    let testing = env::var(INSTALLER_PLUGIN_TEST_ENV).is_ok_and(|value| value.eq_ignore_ascii_case("true"));
    match env::current_exe() {
        Ok(exe) if testing => {
            vars.push("install_method='testing'".to_string());
            vars.push(extra_var("provisioner_binary_path", &exe.to_string_lossy()));
        }
        _ => vars.push("install_method='pip'".to_string()),
    }
    vars.push(format!(
        "git_access_token={}",
        env.collaborators.git_access_token().unwrap_or_default()
    ));
    vars
}

fn run_provisioner_wrapper(env: &InstallerEnv, utility: &Utility, host: &AnsibleHost) -> Result<String> {
    let command = build_provisioner_command(env, utility);
    info!(host = %host.host, command = %command, "Running provisioner on remote host");
    let request = PlaybookRun {
        hosts: vec![host.clone()],
        playbook: AnsiblePlaybook::new(
            PROVISIONER_WRAPPER_PLAYBOOK,
            playbooks::PROVISIONER_WRAPPER,
            env.args.remote_opts.remote_context.clone(),
        ),
        ansible_vars: build_wrapper_vars(env, &command),
        ansible_tags: Vec::new(),
    };
    env.collaborators.playbook_executor().run(&request)
}
