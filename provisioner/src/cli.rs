//! CLI argument definitions for provisioner.
//!
//! Separated from `main.rs` so that the command modules and shell completion
//! generation can reference these types.

use clap::{Args, Parser, Subcommand};

use crate::commands;
use crate::context::{OsArch, Verbosity};
use crate::remote::{ConnectMode, RunEnvironment};

#[derive(Debug, Parser)]
#[command(name = "provisioner")]
#[command(about = "Provisioner - install and configure software on local and remote machines")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output verbosity
    #[arg(long, value_enum, global = true, env = "PROV_VERBOSITY")]
    pub verbosity: Option<Verbosity>,

    /// Shorthand for --verbosity Verbose
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Answer ENTER prompts and confirmations automatically
    #[arg(short = 'y', long, global = true, env = "PROV_AUTO_PROMPT")]
    pub auto_prompt: bool,

    /// Show what would be done without making changes
    #[arg(long, global = true, env = "PROV_DRY_RUN")]
    pub dry_run: bool,

    /// Fail instead of prompting
    #[arg(long, global = true, env = "PROV_NON_INTERACTIVE")]
    pub non_interactive: bool,

    /// Override the detected OS and architecture, e.g. darwin_arm64
    #[arg(long, global = true, env = "PROV_OS_ARCH", value_parser = OsArch::parse)]
    pub os_arch: Option<OsArch>,

    /// GitHub token for release lookups and remote installs
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub git_access_token: Option<String>,

    #[command(flatten)]
    pub remote: RemoteArgs,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose || self.verbosity == Some(Verbosity::Verbose)
    }
}

/// Flags that select and authenticate remote hosts.
#[derive(Debug, Clone, Default, Args)]
pub struct RemoteArgs {
    /// Where to run: this machine or remote hosts
    #[arg(long, value_enum, global = true, env = "PROV_ENVIRONMENT")]
    pub environment: Option<RunEnvironment>,

    /// How to select remote hosts
    #[arg(long, value_enum, global = true, env = "PROV_CONNECT_MODE")]
    pub connect_mode: Option<ConnectMode>,

    /// Remote node username
    #[arg(long, global = true, env = "PROV_NODE_USERNAME")]
    pub node_username: Option<String>,

    /// Remote node password
    #[arg(long, global = true, env = "PROV_NODE_PASSWORD", hide_env_values = true)]
    pub node_password: Option<String>,

    /// Private key used to authenticate with remote nodes
    #[arg(long, global = true, env = "PROV_SSH_PRIVATE_KEY_FILE_PATH")]
    pub ssh_private_key_file_path: Option<String>,

    /// Remote node IP address
    #[arg(long, global = true, env = "PROV_IP_ADDRESS")]
    pub ip_address: Option<String>,

    /// Remote node SSH port
    #[arg(long, global = true, env = "PROV_PORT")]
    pub port: Option<u16>,

    /// Remote node hostname
    #[arg(long, global = true, env = "PROV_HOSTNAME")]
    pub hostname: Option<String>,

    /// LAN range scanned with nmap, e.g. 192.168.1.1/24
    #[arg(long, global = true, env = "PROV_IP_DISCOVERY_RANGE")]
    pub ip_discovery_range: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install utilities locally or on remote hosts
    Install(commands::install::InstallArgs),

    /// Single board computer provisioning
    #[command(name = "single-board")]
    SingleBoard(commands::single_board::SingleBoardArgs),

    /// Playbook examples
    Examples(commands::examples::ExamplesArgs),

    /// System information
    System(commands::system::SystemArgs),

    /// Inspect the effective configuration
    Config(commands::config::ConfigArgs),

    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}
