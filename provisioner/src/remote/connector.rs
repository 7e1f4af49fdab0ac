//! Collects SSH endpoints and credentials for a remote run.
//!
//! ```text
//! select method ─┬─ ScanLAN    → scan + pick hosts ─┐
//!                ├─ ConfigFile → pick config hosts ─┼─ auth method ─┬─ password
//!                └─ Flags      → ask for one host ──┘               └─ private key
//! ```

use super::{AnsibleHost, ConnectMode, NetworkConfigurationInfo, RemoteOpts, SshConnectionInfo};
use crate::checks::Checks;
use crate::collaborators::Collaborators;
use crate::output::Printer;
use crate::prompter::Prompter;
use crate::remote::NetworkScanner;
use anyhow::Result;
use provisioner_release::DRY_RUN_RESPONSE;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_SCAN_RANGE: &str = "192.168.1.1/24";
pub const DEFAULT_NODE_USERNAME: &str = "pi";

const SCAN_LAN_OPTION: &str = "Scan LAN";
const CONFIG_FILE_OPTION: &str = "User Config";
const FLAGS_OPTION: &str = "Enter Manually";
const PASSWORD_OPTION: &str = "Password";
const SSH_KEY_OPTION: &str = "SSH Private Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMethod {
    Password,
    SshPrivateKey,
}

pub struct RemoteMachineConnector {
    dry_run: bool,
    checks: Arc<dyn Checks>,
    prompter: Arc<dyn Prompter>,
    printer: Arc<dyn Printer>,
    scanner: Arc<dyn NetworkScanner>,
}

impl RemoteMachineConnector {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            dry_run: collaborators.context().dry_run,
            checks: collaborators.checks(),
            prompter: collaborators.prompter(),
            printer: collaborators.printer(),
            scanner: collaborators.network_scanner(),
        }
    }

    /// Select hosts and credentials, or `None` when nothing could be selected.
    ///
    /// With `force_single_conn` the selection is narrowed to exactly one host.
    pub fn collect_ssh_connection_info(
        &self,
        opts: &RemoteOpts,
        force_single_conn: bool,
    ) -> Result<Option<SshConnectionInfo>> {
        if self.dry_run {
            return Ok(Some(dry_run_connection_info()));
        }

        let Some(mode) = self.ask_device_selection_method(opts)? else {
            warn!("No device selection method chosen");
            return Ok(None);
        };
        debug!(mode = %mode, "Selecting remote hosts");

        let hosts = match mode {
            ConnectMode::ScanLan => self.run_lan_scan_selection(opts, force_single_conn)?,
            ConnectMode::ConfigFile => self.run_config_based_selection(opts, force_single_conn)?,
            ConnectMode::Flags => self.run_manual_host_selection(opts)?,
        };
        let Some(mut hosts) = hosts.filter(|hosts| !hosts.is_empty()) else {
            return Ok(None);
        };

        self.apply_credentials(opts, &mut hosts)?;
        Ok(Some(SshConnectionInfo { hosts }))
    }

    /// Fill the static address, gateway and DNS, prompting for missing values.
    pub fn collect_network_configuration_info(
        &self,
        defaults: &NetworkConfigurationInfo,
    ) -> Result<NetworkConfigurationInfo> {
        if self.dry_run {
            return Ok(NetworkConfigurationInfo {
                static_ip: DRY_RUN_RESPONSE.to_string(),
                gateway_ip: DRY_RUN_RESPONSE.to_string(),
                dns_ip: DRY_RUN_RESPONSE.to_string(),
            });
        }

        let value_or_prompt = |value: &str, message: &str| -> Result<String> {
            if value.is_empty() {
                self.prompter.input(message, None, false)
            } else {
                Ok(value.to_string())
            }
        };
        Ok(NetworkConfigurationInfo {
            static_ip: value_or_prompt(&defaults.static_ip, "Enter a desired static IP address")?,
            gateway_ip: value_or_prompt(&defaults.gateway_ip, "Enter the gateway address")?,
            dns_ip: value_or_prompt(&defaults.dns_ip, "Enter the DNS resolver address")?,
        })
    }

    fn ask_device_selection_method(&self, opts: &RemoteOpts) -> Result<Option<ConnectMode>> {
        if let Some(mode) = opts.connect_mode {
            return Ok(Some(mode));
        }
        let options = [SCAN_LAN_OPTION, CONFIG_FILE_OPTION, FLAGS_OPTION].map(str::to_string);
        let selected = self
            .prompter
            .select_single("Please choose how to select remote hosts", &options)?;
        Ok(selected.and_then(|choice| match choice.as_str() {
            SCAN_LAN_OPTION => Some(ConnectMode::ScanLan),
            CONFIG_FILE_OPTION => Some(ConnectMode::ConfigFile),
            FLAGS_OPTION => Some(ConnectMode::Flags),
            _ => None,
        }))
    }

    fn run_lan_scan_selection(
        &self,
        opts: &RemoteOpts,
        force_single_conn: bool,
    ) -> Result<Option<Vec<AnsibleHost>>> {
        if !self.checks.is_tool_exist("nmap") {
            warn!("Missing mandatory utility. name: nmap");
            self.printer
                .warning("Missing mandatory utility. name: nmap, cannot scan the LAN");
            return Ok(None);
        }

        let range = match &opts.scan_range {
            Some(range) if !range.is_empty() => range.clone(),
            _ => self
                .prompter
                .input("Enter an IP range to scan", Some(DEFAULT_SCAN_RANGE), false)?,
        };

        let spinner = self.printer.spinner(&format!("Scanning LAN {range}"));
        let scanned = self.scanner.scan(&range);
        spinner.finish_and_clear();
        let scanned = scanned?;
        if scanned.is_empty() {
            self.printer.warning(&format!("No hosts found in {range}"));
            return Ok(None);
        }

        let candidates = scanned
            .iter()
            .map(|host| AnsibleHost {
                host: host.name().to_string(),
                ip_address: host.ip_address.clone(),
                port: opts.port,
                ..Default::default()
            })
            .collect();
        self.select_hosts(candidates, force_single_conn)
    }

    fn run_config_based_selection(
        &self,
        opts: &RemoteOpts,
        force_single_conn: bool,
    ) -> Result<Option<Vec<AnsibleHost>>> {
        if opts.hosts.is_empty() {
            self.printer
                .warning("No remote hosts are defined under remote.hosts in the configuration");
            return Ok(None);
        }
        self.select_hosts(opts.hosts.clone(), force_single_conn)
    }

    fn run_manual_host_selection(&self, opts: &RemoteOpts) -> Result<Option<Vec<AnsibleHost>>> {
        let ip_address = match &opts.ip_address {
            Some(ip) if !ip.is_empty() => ip.clone(),
            _ => self.prompter.input("Enter remote node IP address", None, false)?,
        };
        let host = match &opts.hostname {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self
                .prompter
                .input("Enter remote node hostname", Some(&ip_address), false)?,
        };
        Ok(Some(vec![AnsibleHost {
            host,
            ip_address,
            port: opts.port,
            ..Default::default()
        }]))
    }

    /// Offer `candidates` keyed by `"host, ip"` and map the answers back.
    fn select_hosts(
        &self,
        candidates: Vec<AnsibleHost>,
        force_single_conn: bool,
    ) -> Result<Option<Vec<AnsibleHost>>> {
        let identifiers: Vec<String> = candidates.iter().map(host_identifier).collect();
        let mut by_identifier: HashMap<String, AnsibleHost> = identifiers
            .iter()
            .cloned()
            .zip(candidates)
            .collect();

        let selected = if force_single_conn {
            self.prompter
                .select_single("Please choose a remote host", &identifiers)?
                .into_iter()
                .collect::<Vec<_>>()
        } else {
            self.prompter
                .select_multiple("Please choose remote hosts", &identifiers)?
        };

        let hosts: Vec<AnsibleHost> = selected
            .iter()
            .filter_map(|identifier| by_identifier.remove(identifier))
            .collect();
        if hosts.is_empty() {
            return Ok(None);
        }
        Ok(Some(hosts))
    }

    fn apply_credentials(&self, opts: &RemoteOpts, hosts: &mut [AnsibleHost]) -> Result<()> {
        let cli_password = opts.node_password.clone().filter(|pw| !pw.is_empty());
        let cli_key = opts
            .ssh_private_key_file_path
            .clone()
            .filter(|path| !path.is_empty());
        let has_config_credentials = hosts
            .iter()
            .all(|host| host.has_credentials() && !host.username.is_empty());

        if cli_password.is_none() && cli_key.is_none() && has_config_credentials {
            debug!("Using credentials from the configuration");
            return Ok(());
        }

        let username = match &opts.node_username {
            Some(username) if !username.is_empty() => username.clone(),
            _ => self.prompter.input(
                "Enter remote node user name",
                Some(DEFAULT_NODE_USERNAME),
                false,
            )?,
        };

        let (password, key) = if let Some(password) = cli_password {
            info!("Identified SSH password from CLI argument.");
            (Some(password), None)
        } else if let Some(key) = cli_key {
            info!("Identified SSH private key path from CLI argument.");
            (None, Some(key))
        } else {
            match self.ask_auth_method()? {
                AuthMethod::Password => (
                    Some(self.prompter.input("Enter remote node password", None, true)?),
                    None,
                ),
                AuthMethod::SshPrivateKey => (
                    None,
                    Some(self.prompter.input(
                        "Enter SSH private key path",
                        Some("~/.ssh/id_ed25519"),
                        false,
                    )?),
                ),
            }
        };

        for host in hosts.iter_mut() {
            host.username = username.clone();
            host.password = password.clone();
            host.ssh_private_key_file_path = key.clone();
        }
        Ok(())
    }

    fn ask_auth_method(&self) -> Result<AuthMethod> {
        let options = [PASSWORD_OPTION, SSH_KEY_OPTION].map(str::to_string);
        let selected = self
            .prompter
            .select_single("Please choose an SSH authentication method", &options)?;
        Ok(match selected.as_deref() {
            Some(SSH_KEY_OPTION) => AuthMethod::SshPrivateKey,
            _ => AuthMethod::Password,
        })
    }
}

fn host_identifier(host: &AnsibleHost) -> String {
    format!("{}, {}", host.host, host.ip_address)
}

fn dry_run_connection_info() -> SshConnectionInfo {
    SshConnectionInfo {
        hosts: vec![AnsibleHost {
            host: DRY_RUN_RESPONSE.to_string(),
            ip_address: DRY_RUN_RESPONSE.to_string(),
            username: DRY_RUN_RESPONSE.to_string(),
            password: Some(DRY_RUN_RESPONSE.to_string()),
            ..Default::default()
        }],
    }
}
