//! `system ...` commands.

use super::Session;
use crate::runners::system_info;
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct SystemArgs {
    #[command(subcommand)]
    pub command: SystemCommand,
}

#[derive(Debug, Subcommand)]
pub enum SystemCommand {
    /// Show OS, architecture and hardware facts
    Info,
}

pub fn run(args: SystemArgs, session: &Session) -> Result<()> {
    match args.command {
        SystemCommand::Info => {
            system_info::run(&session.collaborators(), &session.remote_opts)?;
        }
    }
    Ok(())
}
