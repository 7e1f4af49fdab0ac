//! The `hosts` inventory written before every playbook run.

use super::quote;
use crate::remote::{ANSIBLE_LOCAL_CONNECTION, AnsibleHost};
use anyhow::{Context, Result, bail};

pub const INVENTORY_GROUP: &str = "[selected_hosts]";

/// One inventory line for `host`.
///
/// A local host is bound with `ansible_connection=local` instead of an
/// `ansible_host=` address.
pub fn render_host_line(host: &AnsibleHost) -> String {
    let mut fields = vec![quote(&host.host).into_owned()];
    if host.is_local() {
        fields.push(ANSIBLE_LOCAL_CONNECTION.to_string());
    } else {
        fields.push(format!("ansible_host={}", quote(&host.ip_address)));
    }
    if !host.username.is_empty() {
        fields.push(format!("ansible_user={}", quote(&host.username)));
    }
    if let Some(password) = &host.password {
        fields.push(format!("ansible_password={}", quote(password)));
    }
    if let Some(key) = &host.ssh_private_key_file_path {
        fields.push(format!("ansible_private_key_file={}", quote(key)));
    }
    if let Some(port) = host.port {
        fields.push(format!("ansible_port={port}"));
    }
    fields.join(" ")
}

pub fn render_inventory(hosts: &[AnsibleHost]) -> String {
    let mut out = String::from(INVENTORY_GROUP);
    out.push('\n');
    for host in hosts {
        out.push_str(&render_host_line(host));
        out.push('\n');
    }
    out
}

pub fn parse_host_line(line: &str) -> Result<AnsibleHost> {
    let fields = shlex::split(line).with_context(|| format!("Malformed inventory line: {line}"))?;
    let mut fields = fields.into_iter();
    let Some(name) = fields.next() else {
        bail!("Empty inventory line");
    };

    let mut host = AnsibleHost {
        host: name,
        ..Default::default()
    };
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            bail!("Malformed inventory field: {field}");
        };
        match key {
            "ansible_connection" if value == "local" => {
                host.ip_address = ANSIBLE_LOCAL_CONNECTION.to_string();
            }
            "ansible_host" => host.ip_address = value.to_string(),
            "ansible_user" => host.username = value.to_string(),
            "ansible_password" => host.password = Some(value.to_string()),
            "ansible_private_key_file" => host.ssh_private_key_file_path = Some(value.to_string()),
            "ansible_port" => {
                host.port = Some(value.parse().with_context(|| format!("Invalid port: {value}"))?)
            }
            _ => bail!("Unknown inventory field: {key}"),
        }
    }
    Ok(host)
}

/// Parse a file produced by [`render_inventory`].
pub fn parse_inventory(content: &str) -> Result<Vec<AnsibleHost>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('['))
        .map(parse_host_line)
        .collect()
}
