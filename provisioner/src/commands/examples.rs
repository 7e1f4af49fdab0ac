//! `examples ...` commands.

use super::Session;
use crate::runners::hello::{self, HelloArgs};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct ExamplesArgs {
    #[command(subcommand)]
    pub command: ExamplesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ExamplesCommand {
    /// Playbook examples
    Ansible(AnsibleExamplesArgs),
}

#[derive(Debug, Args)]
pub struct AnsibleExamplesArgs {
    #[command(subcommand)]
    pub command: AnsibleExample,
}

#[derive(Debug, Subcommand)]
pub enum AnsibleExample {
    /// Greet a user from a playbook
    Hello(HelloFlags),
}

#[derive(Debug, Args)]
pub struct HelloFlags {
    /// Name to greet, defaults to plugins.examples.hello_world.username
    #[arg(long, env = "PROV_USERNAME")]
    pub username: Option<String>,
}

pub fn run(args: ExamplesArgs, session: &Session) -> Result<()> {
    let ExamplesCommand::Ansible(AnsibleExamplesArgs {
        command: AnsibleExample::Hello(flags),
    }) = args.command;

    let username = flags
        .username
        .filter(|name| !name.is_empty())
        .or_else(|| session.config.plugin_str("examples.hello_world.username"))
        .unwrap_or_else(whoami::username);
    let args = HelloArgs {
        username,
        remote_opts: session.remote_opts.clone(),
    };
    hello::run(&session.collaborators(), &args)?;
    Ok(())
}
