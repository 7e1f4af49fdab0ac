//! `examples ansible hello`: the smallest playbook round trip.

use super::{collect_hosts, local_hosts, resolve_run_environment, run_playbook_per_host};
use crate::ansible::{AnsiblePlaybook, extra_var, playbooks};
use crate::chain::Step;
use crate::collaborators::Collaborators;
use crate::remote::{RemoteOpts, RunEnvironment};
use anyhow::Result;

pub const HELLO_WORLD_PLAYBOOK: &str = "hello_world";

#[derive(Debug, Clone, Default)]
pub struct HelloArgs {
    pub username: String,
    pub remote_opts: RemoteOpts,
}

/// Run the greeting playbook and return its output, one entry per host.
pub fn run(collaborators: &Collaborators, args: &HelloArgs) -> Result<Vec<String>> {
    let playbook = AnsiblePlaybook::new(
        HELLO_WORLD_PLAYBOOK,
        playbooks::HELLO_WORLD,
        args.remote_opts.remote_context.clone(),
    );
    let username = args.username.clone();
    collaborators.summary().append("Username", &username);

    let outcome = Step::effect(move || resolve_run_environment(collaborators, &args.remote_opts))
        .named("resolve_run_environment")
        .flat_map(move |environment| match environment {
            RunEnvironment::Local => Step::of(local_hosts()),
            RunEnvironment::Remote => collect_hosts(collaborators, &args.remote_opts, false),
        })
        .flat_map(move |hosts| {
            run_playbook_per_host(
                collaborators,
                "Hello World",
                hosts,
                playbook,
                move |_| vec![extra_var("username", &username)],
                vec!["hello".to_string()],
            )
        })
        .named("run_hello_world")
        .evaluate();
    Ok(outcome.into_result()?.unwrap_or_default())
}
