//! `install k8s distro <name>` utilities.

use super::registry;
use crate::ansible::{AnsiblePlaybook, playbooks};
use crate::installer::{ActiveInstallSource, AnsibleSource, Utility};
use crate::remote::RemoteContext;
use std::collections::BTreeMap;

/// Dynamic argument keys accepted by the k3s installers.
pub const K3S_TOKEN: &str = "k3s_token";
pub const K3S_URL: &str = "k3s_url";
pub const K3S_ADDITIONAL_CLI_ARGS: &str = "k3s_additional_cli_args";

fn k3s(name: &str, playbook: &str, content: &str, tag: &str, description: &str) -> Utility {
    Utility::new(name, "k3s", description, ActiveInstallSource::Ansible).with_ansible(AnsibleSource {
        playbook: AnsiblePlaybook::new(
            playbook,
            content,
            RemoteContext {
                become_root: true,
                ..Default::default()
            },
        ),
        ansible_tags: vec![tag.to_string()],
        ansible_vars: Vec::new(),
    })
}

pub fn k8s_utilities() -> BTreeMap<String, Utility> {
    registry([
        k3s(
            "k3s-server",
            "k3s_server",
            playbooks::K3S_SERVER,
            "k3s_server_install",
            "Lightweight Kubernetes control plane",
        ),
        k3s(
            "k3s-agent",
            "k3s_agent",
            playbooks::K3S_AGENT,
            "k3s_agent_install",
            "Lightweight Kubernetes worker node",
        ),
    ])
}
