//! CLI command implementations.

pub mod completions;
pub mod config;
pub mod examples;
pub mod install;
pub mod single_board;
pub mod system;

use crate::cli::{Cli, RemoteArgs};
use crate::collaborators::Collaborators;
use crate::config::{ConfigResolver, ProvisionerConfig};
use crate::context::Context;
use crate::remote::{RemoteContext, RemoteOpts};
use anyhow::Result;
use tracing::debug;

/// Everything a command needs that is derived from the global flags.
pub struct Session {
    pub ctx: Context,
    pub config: ProvisionerConfig,
    pub git_access_token: Option<String>,
    pub remote_opts: RemoteOpts,
}

impl Session {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut builder = Context::builder()
            .dry_run(cli.dry_run)
            .verbose(cli.is_verbose())
            .auto_prompt(cli.auto_prompt)
            .non_interactive(cli.non_interactive);
        if let Some(os_arch) = &cli.os_arch {
            builder = builder.os_arch(os_arch.clone());
        }
        let ctx = builder.build()?;

        let config = ConfigResolver::for_home(&ctx.home_dir).resolve()?;
        debug!(hosts = config.remote.hosts.len(), "Configuration loaded");

        let git_access_token = cli
            .git_access_token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| {
                let token = &config.vcs.github.git_access_token;
                (!token.is_empty()).then(|| token.clone())
            });
        let remote_opts = remote_opts(&cli.remote, &ctx, &config);

        Ok(Self {
            ctx,
            config,
            git_access_token,
            remote_opts,
        })
    }

    /// Fresh collaborators for one command.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(self.ctx.clone()).with_git_access_token(self.git_access_token.clone())
    }
}

pub fn remote_opts(args: &RemoteArgs, ctx: &Context, config: &ProvisionerConfig) -> RemoteOpts {
    RemoteOpts {
        environment: args.environment,
        connect_mode: args.connect_mode,
        scan_range: args.ip_discovery_range.clone(),
        node_username: args.node_username.clone(),
        node_password: args.node_password.clone(),
        ssh_private_key_file_path: args.ssh_private_key_file_path.clone(),
        ip_address: args.ip_address.clone(),
        port: args.port,
        hostname: args.hostname.clone(),
        hosts: Vec::new(),
        remote_context: RemoteContext {
            verbose: ctx.verbose,
            dry_run: ctx.dry_run,
            non_interactive: ctx.non_interactive,
            become_root: false,
        },
    }
    .with_config(config)
}
