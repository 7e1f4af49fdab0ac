//! `config` command: inspect the merged configuration.

use super::Session;
use crate::config::ProvisionerConfig;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as YAML (secrets masked unless verbose)
    View,
}

pub fn render(config: &ProvisionerConfig, verbose: bool) -> Result<String> {
    let shown = if verbose { config.clone() } else { config.masked() };
    serde_yaml::to_string(&shown).context("Failed to serialize configuration")
}

pub fn run(args: ConfigArgs, session: &Session) -> Result<()> {
    match args.command {
        ConfigCommand::View => {
            print!("{}", render(&session.config, session.ctx.verbose)?);
        }
    }
    Ok(())
}
