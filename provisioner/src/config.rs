//! Configuration resolver.
//!
//! The effective configuration is the embedded default merged with the user's
//! `~/.config/provisioner/config.yaml`. Merging is right-biased per leaf: a
//! non-empty user value wins, an empty or absent one keeps the default.
//! `$VAR` and `${VAR}` references in string values are expanded before the
//! typed tree is built.

use crate::error::ProvisionerError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const INTERNAL_CONFIG: &str = include_str!("../resources/config.yaml");

/// Overrides the user configuration path.
pub const CONFIG_PATH_ENV: &str = "PROVISIONER_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    pub remote: RemoteConfig,
    pub vcs: VcsConfig,
    pub plugins: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub hosts: Vec<HostConfig>,
    pub lan_scan: LanScanConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub name: String,
    pub address: String,
    pub auth: HostAuthConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostAuthConfig {
    pub username: String,
    pub password: String,
    pub ssh_private_key_file_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanScanConfig {
    pub ip_discovery_range: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcsConfig {
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub organization: String,
    pub repository: String,
    pub branch: String,
    pub git_access_token: String,
}

fn pick(base: &str, other: &str) -> String {
    if other.is_empty() { base } else { other }.to_string()
}

impl ProvisionerConfig {
    /// Right-biased merge; `other` wins on every non-empty leaf.
    pub fn merge(&self, other: &ProvisionerConfig) -> ProvisionerConfig {
        ProvisionerConfig {
            remote: RemoteConfig {
                hosts: if other.remote.hosts.is_empty() {
                    self.remote.hosts.clone()
                } else {
                    other.remote.hosts.clone()
                },
                lan_scan: LanScanConfig {
                    ip_discovery_range: pick(
                        &self.remote.lan_scan.ip_discovery_range,
                        &other.remote.lan_scan.ip_discovery_range,
                    ),
                },
            },
            vcs: VcsConfig {
                github: self.vcs.github.merge(&other.vcs.github),
            },
            plugins: merge_plugins(&self.plugins, &other.plugins),
        }
    }

    /// Look up a plugin value by dotted path, e.g. `single_board.network.gw_ip_address`.
    pub fn plugin_value(&self, dotted: &str) -> Option<&Value> {
        let mut parts = dotted.split('.');
        let mut current = self.plugins.get(parts.next()?)?;
        for part in parts {
            current = current.as_mapping()?.get(part)?;
        }
        Some(current)
    }

    /// String form of a plugin scalar, `None` when absent or empty.
    pub fn plugin_str(&self, dotted: &str) -> Option<String> {
        let value = match self.plugin_value(dotted)? {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }

    /// Copy with passwords and tokens replaced by `********`.
    pub fn masked(&self) -> ProvisionerConfig {
        let mut masked = self.clone();
        for host in &mut masked.remote.hosts {
            if !host.auth.password.is_empty() {
                host.auth.password = "********".to_string();
            }
        }
        if !masked.vcs.github.git_access_token.is_empty() {
            masked.vcs.github.git_access_token = "********".to_string();
        }
        masked
    }
}

impl GithubConfig {
    fn merge(&self, other: &GithubConfig) -> GithubConfig {
        GithubConfig {
            organization: pick(&self.organization, &other.organization),
            repository: pick(&self.repository, &other.repository),
            branch: pick(&self.branch, &other.branch),
            git_access_token: pick(&self.git_access_token, &other.git_access_token),
        }
    }
}

fn is_empty_leaf(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn merge_plugins(
    base: &BTreeMap<String, Value>,
    other: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut merged = base.clone();
    for (key, value) in other {
        let combined = match merged.get(key) {
            Some(existing) => merge_values(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

fn merge_values(base: &Value, other: &Value) -> Value {
    match (base, other) {
        (Value::Mapping(base_map), Value::Mapping(other_map)) => {
            let mut merged: Mapping = base_map.clone();
            for (key, value) in other_map {
                let combined = match merged.get(key) {
                    Some(existing) => merge_values(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), combined);
            }
            Value::Mapping(merged)
        }
        (_, other) if is_empty_leaf(other) => base.clone(),
        (_, other) => other.clone(),
    }
}

/// Expand `$VAR` / `${VAR}` in every string scalar. Unset variables expand to "".
fn expand_env(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(
            shellexpand::env_with_context_no_errors(&text, |name| {
                Some(std::env::var(name).unwrap_or_default())
            })
            .into_owned(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(expand_env).collect()),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, value)| (key, expand_env(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Deserialise a YAML document with environment expansion.
pub fn parse_config(content: &str) -> Result<ProvisionerConfig> {
    let raw: Value = serde_yaml::from_str(content)?;
    if raw.is_null() {
        return Ok(ProvisionerConfig::default());
    }
    Ok(serde_yaml::from_value(expand_env(raw))?)
}

pub struct ConfigResolver {
    internal: String,
    user_path: PathBuf,
}

impl ConfigResolver {
    pub fn new(user_path: impl Into<PathBuf>) -> Self {
        Self::with_internal(INTERNAL_CONFIG, user_path)
    }

    pub fn with_internal(internal: &str, user_path: impl Into<PathBuf>) -> Self {
        Self {
            internal: internal.to_string(),
            user_path: user_path.into(),
        }
    }

    /// Resolver for the default locations, honouring `PROVISIONER_CONFIG_PATH`.
    pub fn for_home(home_dir: &Path) -> Self {
        let user_path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir.join(".config").join("provisioner").join("config.yaml"));
        Self::new(user_path)
    }

    pub fn user_path(&self) -> &Path {
        &self.user_path
    }

    pub fn resolve(&self) -> Result<ProvisionerConfig> {
        let internal = parse_config(&self.internal).map_err(|err| {
            ProvisionerError::FailedToReadConfigurationFile(format!(
                "Failed to parse internal configuration: {err}"
            ))
        })?;

        let content = match std::fs::read_to_string(&self.user_path) {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %self.user_path.display(), error = %err, "No user configuration, using internal defaults");
                return Ok(internal);
            }
        };

        match parse_config(&content) {
            Ok(user) => {
                debug!(path = %self.user_path.display(), "Merging user configuration");
                Ok(internal.merge(&user))
            }
            Err(err) => {
                debug!(path = %self.user_path.display(), error = %err, "Ignoring unreadable user configuration");
                Ok(internal)
            }
        }
    }
}
