//! Registry entries: what a utility is and how it gets installed.

use crate::ansible::{AnsiblePlaybook, extra_var};
use crate::collaborators::Collaborators;
use crate::error::ProvisionerError;
use crate::summary::SummaryObject;
use anyhow::Result;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// `(version, os, arch) -> String`, used for release filenames and nested paths.
pub type ReleaseNameResolver = Arc<dyn Fn(&str, &str, &str) -> String + Send + Sync>;
/// Maps the host `(os, arch)` into the vocabulary a release uses.
pub type OsArchNormaliser = Arc<dyn Fn(&str, &str) -> (String, String) + Send + Sync>;
/// Native installer: `(version, collaborators, args) -> output`.
pub type InstallFn =
    Arc<dyn Fn(Option<&str>, &Collaborators, Option<&DynamicArgs>) -> Result<String> + Send + Sync>;

pub const LATEST: &str = "latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveInstallSource {
    GitHub,
    Script,
    Ansible,
    Callback,
}

impl ActiveInstallSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveInstallSource::GitHub => "GitHub",
            ActiveInstallSource::Script => "Script",
            ActiveInstallSource::Ansible => "Ansible",
            ActiveInstallSource::Callback => "Callback",
        }
    }
}

impl fmt::Display for ActiveInstallSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct GithubSource {
    pub owner: String,
    pub repo: String,
    /// `"os_arch"` pairs in the normalised vocabulary.
    pub supported_releases: BTreeSet<String>,
    pub release_name_resolver: ReleaseNameResolver,
    pub archive_nested_binary_path: Option<ReleaseNameResolver>,
    pub alternative_base_url: Option<String>,
    pub os_arch_normaliser: Option<OsArchNormaliser>,
}

impl GithubSource {
    pub fn new(
        owner: &str,
        repo: &str,
        supported_releases: &[&str],
        release_name_resolver: impl Fn(&str, &str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            supported_releases: supported_releases.iter().map(|s| s.to_string()).collect(),
            release_name_resolver: Arc::new(release_name_resolver),
            archive_nested_binary_path: None,
            alternative_base_url: None,
            os_arch_normaliser: None,
        }
    }

    pub fn with_nested_binary_path(
        mut self,
        resolver: impl Fn(&str, &str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.archive_nested_binary_path = Some(Arc::new(resolver));
        self
    }

    pub fn with_alternative_base_url(mut self, url: &str) -> Self {
        self.alternative_base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_os_arch_normaliser(
        mut self,
        normaliser: impl Fn(&str, &str) -> (String, String) + Send + Sync + 'static,
    ) -> Self {
        self.os_arch_normaliser = Some(Arc::new(normaliser));
        self
    }

    pub fn normalise(&self, os: &str, arch: &str) -> (String, String) {
        match &self.os_arch_normaliser {
            Some(normaliser) => normaliser(os, arch),
            None => (os.to_string(), arch.to_string()),
        }
    }

    pub fn supports(&self, os: &str, arch: &str) -> bool {
        self.supported_releases.contains(&format!("{os}_{arch}"))
    }
}

impl fmt::Debug for GithubSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubSource")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("supported_releases", &self.supported_releases)
            .field("alternative_base_url", &self.alternative_base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub install_script: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsibleSource {
    pub playbook: AnsiblePlaybook,
    pub ansible_tags: Vec<String>,
    pub ansible_vars: Vec<String>,
}

#[derive(Clone)]
pub struct CallbackSource {
    pub install_fn: InstallFn,
}

impl fmt::Debug for CallbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallbackSource")
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallSources {
    pub github: Option<GithubSource>,
    pub script: Option<ScriptSource>,
    pub ansible: Option<AnsibleSource>,
    pub callback: Option<CallbackSource>,
}

/// Free-form `key=value` arguments attached to a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicArgs(pub BTreeMap<String, String>);

impl DynamicArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Insert only when `value` is present and non-empty.
    pub fn with_optional(self, key: &str, value: Option<&str>) -> Self {
        match value.filter(|value| !value.is_empty()) {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// `["key=value", ...]` for `ansible-playbook -e`, shell-quoted.
    pub fn as_ansible_vars(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(key, value)| extra_var(key, value))
            .collect()
    }

    /// `["--key-name", "value", ...]` for re-invoking the CLI.
    pub fn as_cli_args(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(key, value)| [format!("--{}", key.replace('_', "-")), value.clone()])
            .collect()
    }
}

impl SummaryObject for DynamicArgs {
    fn as_summary_object(&self, _verbose: bool) -> Value {
        json!(self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Utility {
    pub display_name: String,
    pub binary_name: String,
    pub description: String,
    pub version: Option<String>,
    /// Arguments that make the installed binary print its version.
    pub version_command: Option<String>,
    pub active_source: ActiveInstallSource,
    pub source: InstallSources,
    pub maybe_args: Option<DynamicArgs>,
}

impl Utility {
    pub fn new(
        display_name: &str,
        binary_name: &str,
        description: &str,
        active_source: ActiveInstallSource,
    ) -> Self {
        Self {
            display_name: display_name.to_string(),
            binary_name: binary_name.to_string(),
            description: description.to_string(),
            version: None,
            version_command: None,
            active_source,
            source: InstallSources::default(),
            maybe_args: None,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn with_version_command(mut self, args: &str) -> Self {
        self.version_command = Some(args.to_string());
        self
    }

    pub fn with_github(mut self, source: GithubSource) -> Self {
        self.source.github = Some(source);
        self
    }

    pub fn with_script(mut self, install_script: &str) -> Self {
        self.source.script = Some(ScriptSource {
            install_script: install_script.to_string(),
        });
        self
    }

    pub fn with_ansible(mut self, source: AnsibleSource) -> Self {
        self.source.ansible = Some(source);
        self
    }

    pub fn with_callback(
        mut self,
        install_fn: impl Fn(Option<&str>, &Collaborators, Option<&DynamicArgs>) -> Result<String>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.source.callback = Some(CallbackSource {
            install_fn: Arc::new(install_fn),
        });
        self
    }

    /// True when the version must be looked up upstream.
    pub fn needs_version_lookup(&self) -> bool {
        self.version
            .as_deref()
            .is_none_or(|version| version.is_empty() || version == LATEST)
    }

    pub fn version_label(&self) -> &str {
        match self.version.as_deref() {
            Some(version) if !version.is_empty() => version,
            _ => LATEST,
        }
    }

    fn missing_source(&self) -> anyhow::Error {
        ProvisionerError::InstallerSource(format!(
            "Missing {} install source. name: {}",
            self.active_source, self.display_name
        ))
        .into()
    }

    pub fn github(&self) -> Result<&GithubSource> {
        self.source.github.as_ref().ok_or_else(|| self.missing_source())
    }

    pub fn script(&self) -> Result<&ScriptSource> {
        self.source.script.as_ref().ok_or_else(|| self.missing_source())
    }

    pub fn ansible(&self) -> Result<&AnsibleSource> {
        self.source.ansible.as_ref().ok_or_else(|| self.missing_source())
    }

    pub fn callback(&self) -> Result<&CallbackSource> {
        self.source.callback.as_ref().ok_or_else(|| self.missing_source())
    }

    /// The sub-record named by `active_source` must be present.
    pub fn validate(&self) -> Result<()> {
        let present = match self.active_source {
            ActiveInstallSource::GitHub => self.source.github.is_some(),
            ActiveInstallSource::Script => self.source.script.is_some(),
            ActiveInstallSource::Ansible => self.source.ansible.is_some(),
            ActiveInstallSource::Callback => self.source.callback.is_some(),
        };
        if present {
            Ok(())
        } else {
            Err(self.missing_source())
        }
    }
}

impl SummaryObject for Utility {
    fn as_summary_object(&self, verbose: bool) -> Value {
        let mut object = json!({
            "display_name": self.display_name,
            "binary_name": self.binary_name,
            "version": self.version_label(),
            "active_source": self.active_source.as_str(),
        });
        if let Some(args) = &self.maybe_args {
            object["args"] = args.as_summary_object(verbose);
        }
        if verbose {
            object["description"] = json!(self.description);
            if let Some(github) = &self.source.github {
                object["source"] = json!({
                    "owner": github.owner,
                    "repo": github.repo,
                    "supported_releases": github.supported_releases,
                    "alternative_base_url": github.alternative_base_url,
                });
            }
            if let Some(ansible) = &self.source.ansible {
                object["source"] = json!({
                    "playbook": ansible.playbook.name,
                    "ansible_tags": ansible.ansible_tags,
                });
            }
        }
        object
    }
}

/// A user request such as `anchor@v0.10.0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameVersionArgs {
    pub name: String,
    pub version: Option<String>,
    pub dynamic_args: Option<DynamicArgs>,
}

impl NameVersionArgs {
    pub fn parse(request: &str) -> Self {
        let (name, version) = match request.split_once('@') {
            Some((name, version)) => (name, Some(version.to_string()).filter(|v| !v.is_empty())),
            None => (request, None),
        };
        Self {
            name: name.trim().to_string(),
            version,
            dynamic_args: None,
        }
    }

    pub fn with_dynamic_args(mut self, args: DynamicArgs) -> Self {
        self.dynamic_args = (!args.is_empty()).then_some(args);
        self
    }

    /// `name` or `name@version`.
    pub fn request(&self) -> String {
        match &self.version {
            Some(version) => format!("{}@{version}", self.name),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_kind;

    #[test]
    fn test_parse_name_version() {
        assert_eq!(
            NameVersionArgs::parse("anchor@v0.10.0"),
            NameVersionArgs {
                name: "anchor".into(),
                version: Some("v0.10.0".into()),
                dynamic_args: None,
            }
        );
        assert_eq!(NameVersionArgs::parse("helm").version, None);
        assert_eq!(NameVersionArgs::parse("helm@").version, None);
        assert_eq!(NameVersionArgs::parse("k9s@latest").request(), "k9s@latest");
    }

    #[test]
    fn test_dynamic_args_projections() {
        let args = DynamicArgs::new()
            .with("k3s_token", "abc")
            .with_optional("k3s_url", Some("https://kmaster:6443"))
            .with_optional("k3s_additional_cli_args", None);
        assert_eq!(
            args.as_ansible_vars(),
            vec!["k3s_token=abc", "k3s_url=https://kmaster:6443"]
        );
        assert_eq!(
            args.as_cli_args(),
            vec!["--k3s-token", "abc", "--k3s-url", "https://kmaster:6443"]
        );
    }

    #[test]
    fn test_validate_requires_active_source() {
        let utility = Utility::new("anchor", "anchor", "Solana framework", ActiveInstallSource::GitHub)
            .with_script("echo nope");
        let err = utility.validate().unwrap_err();
        assert_eq!(error_kind(&err), "InstallerSourceError");

        let ok = Utility::new("rustup", "rustup", "Rust toolchain", ActiveInstallSource::Script)
            .with_script("echo ok");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_version_lookup_needed() {
        let utility = Utility::new("yq", "yq", "", ActiveInstallSource::GitHub);
        assert!(utility.needs_version_lookup());
        assert!(utility.clone().with_version(LATEST).needs_version_lookup());
        assert!(!utility.with_version("v4.44.3").needs_version_lookup());
    }

    #[test]
    fn test_github_normaliser_and_support() {
        let source = GithubSource::new("derailed", "k9s", &["Darwin_arm64"], |_, os, arch| {
            format!("k9s_{os}_{arch}.tar.gz")
        })
        .with_os_arch_normaliser(|os, arch| {
            let os = match os {
                "darwin" => "Darwin",
                "linux" => "Linux",
                other => other,
            };
            (os.to_string(), arch.to_string())
        });
        let (os, arch) = source.normalise("darwin", "arm64");
        assert!(source.supports(&os, &arch));
        assert!(!source.supports("darwin", "arm64"));
    }

    #[test]
    fn test_summary_projection() {
        let utility = Utility::new("anchor", "anchor", "Solana framework", ActiveInstallSource::GitHub)
            .with_version("v0.10.0")
            .with_github(GithubSource::new("coral-xyz", "anchor", &["darwin_arm64"], |v, _, _| {
                format!("anchor-{v}-macos")
            }));
        let quiet = utility.as_summary_object(false);
        assert_eq!(quiet["version"], "v0.10.0");
        assert!(quiet.get("source").is_none());
        assert_eq!(utility.as_summary_object(true)["source"]["owner"], "coral-xyz");
    }
}
