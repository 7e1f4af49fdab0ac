//! `system info`: facts about this machine, or about remote nodes through a playbook.

use super::{collect_hosts, resolve_run_environment, run_playbook_per_host};
use crate::ansible::{AnsiblePlaybook, playbooks};
use crate::chain::Step;
use crate::collaborators::Collaborators;
use crate::context::Context;
use crate::remote::{RemoteOpts, RunEnvironment};
use anyhow::Result;

pub const SYSTEM_INFO_PLAYBOOK: &str = "system_info";

pub fn local_system_info(ctx: &Context) -> Vec<(String, String)> {
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string());
    let cpus = std::thread::available_parallelism()
        .map(|count| count.get().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    vec![
        ("hostname".to_string(), hostname),
        ("os".to_string(), ctx.os_arch.os.clone()),
        ("arch".to_string(), ctx.os_arch.arch.clone()),
        ("kernel".to_string(), ctx.os_arch.release.clone()),
        ("distribution".to_string(), whoami::distro()),
        ("cpus".to_string(), cpus),
        ("user".to_string(), whoami::username()),
    ]
}

/// Returns `false` when a remote run selected no hosts.
pub fn run(collaborators: &Collaborators, opts: &RemoteOpts) -> Result<bool> {
    let playbook = AnsiblePlaybook::new(
        SYSTEM_INFO_PLAYBOOK,
        playbooks::SYSTEM_INFO,
        opts.remote_context.clone(),
    );

    let outcome = Step::effect(move || resolve_run_environment(collaborators, opts))
        .named("resolve_run_environment")
        .flat_map(move |environment| match environment {
            RunEnvironment::Local => Step::effect(move || {
                let printer = collaborators.printer();
                printer.header("System Information");
                printer.table(&local_system_info(collaborators.context()));
                Ok(())
            }),
            RunEnvironment::Remote => collect_hosts(collaborators, opts, false)
                .flat_map(move |hosts| {
                    run_playbook_per_host(
                        collaborators,
                        "System Information",
                        hosts,
                        playbook,
                        |_| Vec::new(),
                        vec!["system_info".to_string()],
                    )
                })
                .map(|_| ()),
        })
        .named("collect_system_info")
        .evaluate();
    Ok(outcome.into_result()?.is_some())
}
