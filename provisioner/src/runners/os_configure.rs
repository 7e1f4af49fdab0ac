//! `single-board raspberry-pi node configure`: hardening and base packages on one node.

use super::{BECOME_ROOT, REBOOT_REQUIRED, collect_hosts, run_playbook_per_host};
use crate::ansible::{AnsiblePlaybook, extra_var, playbooks};
use crate::collaborators::Collaborators;
use crate::remote::{AnsibleHost, RemoteOpts};
use anyhow::Result;

pub const CONFIGURE_NODE_PLAYBOOK: &str = "rpi_configure_node";
pub const CONFIGURE_NODE_TAGS: [&str; 2] = ["configure_remote_node", "reboot"];

pub fn configure_vars(host: &AnsibleHost) -> Vec<String> {
    vec![
        extra_var("host_name", &host.host),
        BECOME_ROOT.to_string(),
        REBOOT_REQUIRED.to_string(),
    ]
}

/// Returns `false` when no host was selected.
pub fn run(collaborators: &Collaborators, opts: &RemoteOpts) -> Result<bool> {
    let mut remote_context = opts.remote_context.clone();
    remote_context.become_root = true;
    let playbook = AnsiblePlaybook::new(CONFIGURE_NODE_PLAYBOOK, playbooks::RPI_CONFIGURE_NODE, remote_context);

    let outcome = collect_hosts(collaborators, opts, true)
        .flat_map(move |hosts| {
            run_playbook_per_host(
                collaborators,
                "Configure Raspberry Pi OS",
                hosts,
                playbook,
                configure_vars,
                CONFIGURE_NODE_TAGS.map(str::to_string).to_vec(),
            )
        })
        .named("configure_remote_node")
        .evaluate();
    Ok(outcome.into_result()?.is_some())
}
