//! `single-board raspberry-pi ...` commands.

use super::Session;
use crate::runners::image_burner::{self, BurnImageArgs};
use crate::runners::network::{self, NetworkArgs};
use crate::runners::os_configure;
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct SingleBoardArgs {
    #[command(subcommand)]
    pub command: SingleBoardCommand,
}

#[derive(Debug, Subcommand)]
pub enum SingleBoardCommand {
    /// Raspberry Pi boards
    #[command(name = "raspberry-pi")]
    RaspberryPi(RaspberryPiArgs),
}

#[derive(Debug, Args)]
pub struct RaspberryPiArgs {
    #[command(subcommand)]
    pub command: RaspberryPiCommand,
}

#[derive(Debug, Subcommand)]
pub enum RaspberryPiCommand {
    /// Configure a running node
    Node(NodeArgs),

    /// Operating system image operations
    Os(OsArgs),
}

#[derive(Debug, Args)]
pub struct NodeArgs {
    #[command(subcommand)]
    pub command: NodeCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// Apply the base OS configuration and reboot
    Configure,

    /// Define a static IP address and reboot
    Network(NetworkFlags),
}

#[derive(Debug, Args)]
pub struct NetworkFlags {
    /// Static IP address to assign
    #[arg(long, env = "PROV_STATIC_IP_ADDRESS")]
    pub static_ip_address: Option<String>,

    /// Gateway address, defaults to plugins.single_board.network.gw_ip_address
    #[arg(long, env = "PROV_GW_IP_ADDRESS")]
    pub gw_ip_address: Option<String>,

    /// DNS resolver address, defaults to plugins.single_board.network.dns_ip_address
    #[arg(long, env = "PROV_DNS_IP_ADDRESS")]
    pub dns_ip_address: Option<String>,
}

#[derive(Debug, Args)]
pub struct OsArgs {
    #[command(subcommand)]
    pub command: OsCommand,
}

#[derive(Debug, Subcommand)]
pub enum OsCommand {
    /// Download an OS image and write it to a block device
    #[command(name = "burn-image")]
    BurnImage(BurnImageFlags),
}

#[derive(Debug, Args)]
pub struct BurnImageFlags {
    /// Image URL, defaults to the configured Raspberry Pi OS image
    #[arg(long, env = "PROV_IMAGE_DOWNLOAD_URL")]
    pub image_download_url: Option<String>,

    /// Configured image flavour to download
    #[arg(long, value_parser = ["32bit", "64bit"], default_value = image_burner::DEFAULT_IMAGE_BITS)]
    pub image_bits: String,
}

pub fn run(args: SingleBoardArgs, session: &Session) -> Result<()> {
    let SingleBoardCommand::RaspberryPi(rpi) = args.command;
    let collaborators = session.collaborators();
    match rpi.command {
        RaspberryPiCommand::Node(NodeArgs {
            command: NodeCommand::Configure,
        }) => {
            os_configure::run(&collaborators, &session.remote_opts)?;
        }
        RaspberryPiCommand::Node(NodeArgs {
            command: NodeCommand::Network(flags),
        }) => {
            let args = NetworkArgs {
                remote_opts: session.remote_opts.clone(),
                static_ip: flags.static_ip_address,
                gw_ip: flags.gw_ip_address,
                dns_ip: flags.dns_ip_address,
            };
            network::run(&collaborators, &args, &session.config)?;
        }
        RaspberryPiCommand::Os(OsArgs {
            command: OsCommand::BurnImage(flags),
        }) => {
            let args = BurnImageArgs {
                image_download_url: flags.image_download_url,
                image_bits: Some(flags.image_bits),
            };
            image_burner::run(&collaborators, &args, &session.config)?;
        }
    }
    Ok(())
}
