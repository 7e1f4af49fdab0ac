//! Playbook-backed runners for the single-board, example and system commands.
//!
//! Each runner is a short [`Step`] pipeline: pick the target hosts, record
//! what is about to happen in the summary, then hand one [`PlaybookRun`] per
//! host to the playbook executor.

pub mod hello;
pub mod image_burner;
pub mod network;
pub mod os_configure;
pub mod system_info;

use crate::ansible::{AnsiblePlaybook, PlaybookRun};
use crate::chain::Step;
use crate::collaborators::Collaborators;
use crate::error::ProvisionerError;
use crate::remote::{AnsibleHost, RemoteMachineConnector, RemoteOpts, RunEnvironment, SshConnectionInfo};
use anyhow::Result;
use provisioner_release::DRY_RUN_RESPONSE;
use tracing::{info, warn};

/// Value of the `become_root` playbook variable when privileges are needed.
pub const BECOME_ROOT: &str = "become_root=yes";
pub const REBOOT_REQUIRED: &str = "reboot_required=true";

/// Use `--environment` when given, otherwise ask.
pub(crate) fn resolve_run_environment(
    collaborators: &Collaborators,
    opts: &RemoteOpts,
) -> Result<RunEnvironment> {
    if let Some(environment) = opts.environment {
        return Ok(environment);
    }
    let prompter = collaborators.prompter();
    collaborators.summary().append_result("Run Environment", || {
        let selected =
            prompter.select_single("Please choose a running environment", &RunEnvironment::variants())?;
        match selected.as_deref() {
            Some("Local") => Ok(RunEnvironment::Local),
            Some("Remote") | Some(DRY_RUN_RESPONSE) => Ok(RunEnvironment::Remote),
            Some(other) => Err(ProvisionerError::UnsupportedRunEnvironment(other.to_string()).into()),
            None => Err(ProvisionerError::StepEvaluationFailure(
                "No run environment was selected".to_string(),
            )
            .into()),
        }
    })
}

/// Collect SSH endpoints, recording them in the summary. `Empty` when none were selected.
pub(crate) fn collect_hosts<'a>(
    collaborators: &'a Collaborators,
    opts: &'a RemoteOpts,
    force_single_conn: bool,
) -> Step<'a, Vec<AnsibleHost>> {
    Step::effect_optional(move || {
        let connector = RemoteMachineConnector::new(collaborators);
        let info = connector.collect_ssh_connection_info(opts, force_single_conn)?;
        match info {
            Some(SshConnectionInfo { hosts }) if !hosts.is_empty() => {
                collaborators
                    .summary()
                    .append("SSH Connection Info", &SshConnectionInfo { hosts: hosts.clone() });
                Ok(Some(hosts))
            }
            _ => {
                warn!("No remote hosts were selected");
                collaborators
                    .printer()
                    .warning("No remote hosts were selected, nothing to do");
                Ok(None)
            }
        }
    })
    .named("collect_ssh_connection_info")
}

/// The local-connection host for the current user.
pub(crate) fn local_hosts() -> Vec<AnsibleHost> {
    vec![AnsibleHost::local(&whoami::username())]
}

/// Show the summary under `title`, then run `playbook` once per host and print each output.
pub(crate) fn run_playbook_per_host<'a>(
    collaborators: &'a Collaborators,
    title: &'a str,
    hosts: Vec<AnsibleHost>,
    playbook: AnsiblePlaybook,
    vars_for_host: impl Fn(&AnsibleHost) -> Vec<String> + 'a,
    ansible_tags: Vec<String>,
) -> Step<'a, Vec<String>> {
    Step::effect(move || {
        collaborators.summary().show_summary_and_prompt_for_enter(
            title,
            collaborators.printer().as_ref(),
            collaborators.prompter().as_ref(),
        )?;
        Ok(hosts)
    })
    .for_each(move |host| {
        let request = PlaybookRun {
            ansible_vars: vars_for_host(&host),
            hosts: vec![host],
            playbook: playbook.clone(),
            ansible_tags: ansible_tags.clone(),
        };
        Step::effect(move || {
            info!(host = %request.hosts[0].host, playbook = %request.playbook.name, "Running playbook");
            let output = collaborators.playbook_executor().run(&request)?;
            collaborators.printer().print(output.trim_end());
            Ok(output)
        })
        .named("run_ansible_playbook")
    })
}
