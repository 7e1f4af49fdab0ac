//! `single-board raspberry-pi node network`: static IP, gateway and DNS on one node.

use super::{BECOME_ROOT, REBOOT_REQUIRED, collect_hosts, run_playbook_per_host};
use crate::ansible::{AnsiblePlaybook, extra_var, playbooks};
use crate::chain::Step;
use crate::collaborators::Collaborators;
use crate::config::ProvisionerConfig;
use crate::remote::{AnsibleHost, NetworkConfigurationInfo, RemoteMachineConnector, RemoteOpts};
use anyhow::Result;
use tracing::{debug, info};

pub const CONFIGURE_NETWORK_PLAYBOOK: &str = "rpi_configure_network";
pub const CONFIGURE_NETWORK_TAGS: [&str; 3] = ["configure_rpi_network", "define_static_ip", "reboot"];
const HOSTS_FILE_COMMENT: &str = "Added by provisioner";

#[derive(Debug, Clone, Default)]
pub struct NetworkArgs {
    pub remote_opts: RemoteOpts,
    pub static_ip: Option<String>,
    pub gw_ip: Option<String>,
    pub dns_ip: Option<String>,
}

/// Flag values, falling back to `plugins.single_board.network.*` for gateway and DNS.
pub fn network_defaults(args: &NetworkArgs, config: &ProvisionerConfig) -> NetworkConfigurationInfo {
    let or_config = |value: &Option<String>, key: &str| {
        value
            .clone()
            .filter(|value| !value.is_empty())
            .or_else(|| config.plugin_str(key))
            .unwrap_or_default()
    };
    NetworkConfigurationInfo {
        static_ip: args.static_ip.clone().unwrap_or_default(),
        gateway_ip: or_config(&args.gw_ip, "single_board.network.gw_ip_address"),
        dns_ip: or_config(&args.dns_ip, "single_board.network.dns_ip_address"),
    }
}

pub fn network_vars(host: &AnsibleHost, network: &NetworkConfigurationInfo) -> Vec<String> {
    vec![
        extra_var("host_name", &host.host),
        extra_var("static_ip", &network.static_ip),
        extra_var("gateway_address", &network.gateway_ip),
        extra_var("dns_address", &network.dns_ip),
        BECOME_ROOT.to_string(),
        REBOOT_REQUIRED.to_string(),
    ]
}

/// Returns `false` when no host was selected.
pub fn run(collaborators: &Collaborators, args: &NetworkArgs, config: &ProvisionerConfig) -> Result<bool> {
    let defaults = network_defaults(args, config);
    let mut remote_context = args.remote_opts.remote_context.clone();
    remote_context.become_root = true;
    let playbook = AnsiblePlaybook::new(
        CONFIGURE_NETWORK_PLAYBOOK,
        playbooks::RPI_CONFIGURE_NETWORK,
        remote_context,
    );

    let outcome = collect_hosts(collaborators, &args.remote_opts, true)
        .flat_map(move |hosts| collect_network_info(collaborators, &defaults).map(move |network| (hosts, network)))
        .flat_map(move |(hosts, network)| {
            let vars_network = network.clone();
            run_playbook_per_host(
                collaborators,
                "Configure Raspberry Pi network",
                hosts.clone(),
                playbook,
                move |host| network_vars(host, &vars_network),
                CONFIGURE_NETWORK_TAGS.map(str::to_string).to_vec(),
            )
            .map(move |_| (hosts, network))
        })
        .flat_map(move |(hosts, network)| maybe_add_hosts_entry(collaborators, hosts, network))
        .named("configure_rpi_network")
        .evaluate();
    Ok(outcome.into_result()?.is_some())
}

fn collect_network_info<'a>(
    collaborators: &'a Collaborators,
    defaults: &NetworkConfigurationInfo,
) -> Step<'a, NetworkConfigurationInfo> {
    let defaults = defaults.clone();
    Step::effect(move || {
        let connector = RemoteMachineConnector::new(collaborators);
        let summary = collaborators.summary();
        summary.append_result("Static IP Info", || {
            connector.collect_network_configuration_info(&defaults)
        })
    })
    .named("collect_network_configuration_info")
}

fn maybe_add_hosts_entry<'a>(
    collaborators: &'a Collaborators,
    hosts: Vec<AnsibleHost>,
    network: NetworkConfigurationInfo,
) -> Step<'a, ()> {
    Step::effect(move || {
        let Some(host) = hosts.first() else {
            return Ok(());
        };
        let question = format!(
            "Add '{} {}' to /etc/hosts on this machine?",
            network.static_ip, host.host
        );
        if !collaborators.prompter().confirm(&question, false)? {
            debug!("Skipping hosts file entry");
            return Ok(());
        }
        collaborators.hosts_file().add_entry(
            &network.static_ip,
            std::slice::from_ref(&host.host),
            Some(HOSTS_FILE_COMMENT),
        )?;
        info!(host = %host.host, ip = %network.static_ip, "Added hosts file entry");
        collaborators.printer().success(&format!(
            "Added hosts entry. name: {}, ip: {}",
            host.host, network.static_ip
        ));
        Ok(())
    })
    .named("add_hosts_file_entry")
}
