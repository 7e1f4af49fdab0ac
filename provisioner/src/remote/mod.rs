//! Remote targets: run environments, SSH endpoints and how they are collected.

pub mod connector;
pub mod hosts_file;
pub mod scanner;

use crate::config::ProvisionerConfig;
use crate::summary::SummaryObject;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

pub use connector::RemoteMachineConnector;
pub use hosts_file::{EtcHostsFile, HostsFile};
pub use scanner::{NetworkScanner, NmapScanner, ScannedHost};

/// Marker stored in [`AnsibleHost::ip_address`] for hosts reached without SSH.
pub const ANSIBLE_LOCAL_CONNECTION: &str = "ansible_connection=local";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[value(rename_all = "verbatim")]
pub enum RunEnvironment {
    Local,
    Remote,
}

impl RunEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunEnvironment::Local => "Local",
            RunEnvironment::Remote => "Remote",
        }
    }

    pub fn variants() -> Vec<String> {
        vec!["Local".to_string(), "Remote".to_string()]
    }
}

impl fmt::Display for RunEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SummaryObject for RunEnvironment {
    fn as_summary_object(&self, _verbose: bool) -> Value {
        Value::String(self.as_str().to_string())
    }
}

/// How remote hosts are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum ConnectMode {
    #[value(name = "ConfigFile")]
    ConfigFile,
    #[value(name = "ScanLAN")]
    ScanLan,
    #[value(name = "Flags")]
    Flags,
}

impl ConnectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectMode::ConfigFile => "ConfigFile",
            ConnectMode::ScanLan => "ScanLAN",
            ConnectMode::Flags => "Flags",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ConfigFile" => Some(ConnectMode::ConfigFile),
            "ScanLAN" => Some(ConnectMode::ScanLan),
            "Flags" => Some(ConnectMode::Flags),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One SSH-reachable (or local) target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnsibleHost {
    pub host: String,
    pub ip_address: String,
    pub username: String,
    pub password: Option<String>,
    pub ssh_private_key_file_path: Option<String>,
    pub port: Option<u16>,
}

impl AnsibleHost {
    /// The host that binds playbooks to this machine.
    pub fn local(username: &str) -> Self {
        Self {
            host: "localhost".to_string(),
            ip_address: ANSIBLE_LOCAL_CONNECTION.to_string(),
            username: username.to_string(),
            ..Default::default()
        }
    }

    pub fn is_local(&self) -> bool {
        self.ip_address == ANSIBLE_LOCAL_CONNECTION
    }

    pub fn has_credentials(&self) -> bool {
        self.password.is_some() || self.ssh_private_key_file_path.is_some()
    }
}

impl SummaryObject for AnsibleHost {
    fn as_summary_object(&self, verbose: bool) -> Value {
        let mut object = json!({
            "host": self.host,
            "ip_address": self.ip_address,
            "username": self.username,
        });
        if let Some(port) = self.port {
            object["port"] = json!(port);
        }
        if let Some(key) = &self.ssh_private_key_file_path {
            object["ssh_private_key_file_path"] = json!(key);
        }
        if verbose && let Some(password) = &self.password {
            object["password"] = json!(password);
        }
        object
    }
}

/// Ordered SSH endpoints chosen for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SshConnectionInfo {
    pub hosts: Vec<AnsibleHost>,
}

impl SummaryObject for SshConnectionInfo {
    fn as_summary_object(&self, verbose: bool) -> Value {
        json!({ "hosts": self.hosts.as_summary_object(verbose) })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkConfigurationInfo {
    pub static_ip: String,
    pub gateway_ip: String,
    pub dns_ip: String,
}

impl SummaryObject for NetworkConfigurationInfo {
    fn as_summary_object(&self, _verbose: bool) -> Value {
        json!({
            "static_ip": self.static_ip,
            "gateway_ip": self.gateway_ip,
            "dns_ip": self.dns_ip,
        })
    }
}

/// Settings that shape how a playbook runs on the remote end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteContext {
    pub verbose: bool,
    pub dry_run: bool,
    pub non_interactive: bool,
    pub become_root: bool,
}

/// Remote-related flags for one invocation.
#[derive(Debug, Clone, Default)]
pub struct RemoteOpts {
    pub environment: Option<RunEnvironment>,
    pub connect_mode: Option<ConnectMode>,
    pub scan_range: Option<String>,
    pub node_username: Option<String>,
    pub node_password: Option<String>,
    pub ssh_private_key_file_path: Option<String>,
    pub ip_address: Option<String>,
    pub port: Option<u16>,
    pub hostname: Option<String>,
    /// Hosts declared under `remote.hosts` in the configuration.
    pub hosts: Vec<AnsibleHost>,
    pub remote_context: RemoteContext,
}

impl RemoteOpts {
    /// Fill config-derived fields (`remote.hosts`, the LAN scan range).
    pub fn with_config(mut self, config: &ProvisionerConfig) -> Self {
        self.hosts = hosts_from_config(config);
        if self.scan_range.is_none() && !config.remote.lan_scan.ip_discovery_range.is_empty() {
            self.scan_range = Some(config.remote.lan_scan.ip_discovery_range.clone());
        }
        self
    }
}

pub fn hosts_from_config(config: &ProvisionerConfig) -> Vec<AnsibleHost> {
    let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
    config
        .remote
        .hosts
        .iter()
        .map(|host| AnsibleHost {
            host: host.name.clone(),
            ip_address: host.address.clone(),
            username: host.auth.username.clone(),
            password: non_empty(&host.auth.password),
            ssh_private_key_file_path: non_empty(&host.auth.ssh_private_key_file_path),
            port: host.port,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_enum_names_match_cli_values() {
        assert_eq!(
            RunEnvironment::from_str("Remote", false).unwrap(),
            RunEnvironment::Remote
        );
        assert_eq!(ConnectMode::from_str("ScanLAN", false).unwrap(), ConnectMode::ScanLan);
        assert_eq!(ConnectMode::from_name("ConfigFile"), Some(ConnectMode::ConfigFile));
        assert_eq!(ConnectMode::ScanLan.to_string(), "ScanLAN");
    }

    #[test]
    fn test_local_host_marker() {
        let host = AnsibleHost::local("pi");
        assert!(host.is_local());
        assert_eq!(host.ip_address, "ansible_connection=local");
        assert!(!host.has_credentials());
    }

    #[test]
    fn test_summary_hides_password_unless_verbose() {
        let host = AnsibleHost {
            host: "kmaster".into(),
            ip_address: "192.168.1.200".into(),
            username: "pi".into(),
            password: Some("raspberry".into()),
            ..Default::default()
        };
        assert!(host.as_summary_object(false).get("password").is_none());
        assert_eq!(host.as_summary_object(true)["password"], "raspberry");
    }

    #[test]
    fn test_hosts_from_config() {
        let config = parse_config(
            r#"
remote:
  hosts:
    - name: kmaster
      address: 192.168.1.200
      auth:
        username: pi
        ssh_private_key_file_path: /home/pi/.ssh/id_ed25519
      port: 2222
  lan_scan:
    ip_discovery_range: 192.168.1.1/24
"#,
        )
        .unwrap();

        let opts = RemoteOpts::default().with_config(&config);
        assert_eq!(opts.scan_range.as_deref(), Some("192.168.1.1/24"));
        assert_eq!(
            opts.hosts,
            vec![AnsibleHost {
                host: "kmaster".into(),
                ip_address: "192.168.1.200".into(),
                username: "pi".into(),
                password: None,
                ssh_private_key_file_path: Some("/home/pi/.ssh/id_ed25519".into()),
                port: Some(2222),
            }]
        );
    }
}
