//! Playbook execution contract and its `ansible-playbook` implementation.

pub mod inventory;
pub mod runner;

use crate::remote::{AnsibleHost, RemoteContext};
use anyhow::Result;
use std::borrow::Cow;

pub use runner::AnsibleRunner;

/// Shell-quote `value` for an inventory line or an `-e` argument.
pub fn quote(value: &str) -> Cow<'_, str> {
    shlex::try_quote(value).unwrap_or(Cow::Borrowed(value))
}

/// `key=value` for `ansible-playbook -e`.
pub fn extra_var(key: &str, value: &str) -> String {
    format!("{key}={}", quote(value))
}

/// Token replaced with the on-disk playbook root when a playbook is written.
pub const PLAYBOOKS_PATH_TOKEN: &str = "{ansible_playbooks_path}";
/// Token replaced with the play-level modifiers (become, environment).
pub const MODIFIERS_TOKEN: &str = "{modifiers}";

pub mod playbooks {
    pub const PROVISIONER_WRAPPER: &str =
        include_str!("../../resources/ansible/playbooks/provisioner_wrapper.yml");
    pub const HELLO_WORLD: &str = include_str!("../../resources/ansible/playbooks/hello_world.yml");
    pub const RPI_CONFIGURE_NODE: &str =
        include_str!("../../resources/ansible/playbooks/rpi_configure_node.yml");
    pub const RPI_CONFIGURE_NETWORK: &str =
        include_str!("../../resources/ansible/playbooks/rpi_configure_network.yml");
    pub const SYSTEM_INFO: &str = include_str!("../../resources/ansible/playbooks/system_info.yml");
    pub const K3S_SERVER: &str = include_str!("../../resources/ansible/playbooks/k3s_server.yml");
    pub const K3S_AGENT: &str = include_str!("../../resources/ansible/playbooks/k3s_agent.yml");
}

/// Support files written next to every generated playbook.
pub const ANSIBLE_CFG: &str = include_str!("../../resources/ansible/ansible.cfg");
pub const PROVISIONER_ROLE_TASKS: &str =
    include_str!("../../resources/ansible/roles/provisioner/tasks/main.yml");

/// A named, templated playbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsiblePlaybook {
    pub name: String,
    pub content: String,
    pub remote_context: RemoteContext,
}

impl AnsiblePlaybook {
    pub fn new(name: &str, content: &str, remote_context: RemoteContext) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
            remote_context,
        }
    }

    /// Substitute the template tokens for a playbook root at `playbooks_path`.
    pub fn render(&self, playbooks_path: &str) -> String {
        self.content
            .replace(MODIFIERS_TOKEN, &render_modifiers(&self.remote_context))
            .replace(PLAYBOOKS_PATH_TOKEN, playbooks_path)
    }
}

/// Play-level keys implied by the remote context, indented for a play body.
pub fn render_modifiers(remote_context: &RemoteContext) -> String {
    let mut lines = Vec::new();
    if remote_context.become_root {
        lines.push("become: true".to_string());
    }
    if remote_context.verbose {
        lines.push("environment:".to_string());
        lines.push("    PROVISIONER_VERBOSE: \"true\"".to_string());
    }
    lines.join("\n  ")
}

/// One playbook invocation against a set of hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybookRun {
    pub hosts: Vec<AnsibleHost>,
    pub playbook: AnsiblePlaybook,
    pub ansible_vars: Vec<String>,
    pub ansible_tags: Vec<String>,
}

pub trait PlaybookExecutor: Send + Sync {
    /// Run the playbook and return its combined output.
    ///
    /// Under dry-run the output is the rendered playbook followed by a
    /// `command:` block with the invocation that would have run.
    fn run(&self, request: &PlaybookRun) -> Result<String>;
}
