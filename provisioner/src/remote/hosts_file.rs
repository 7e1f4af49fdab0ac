//! `/etc/hosts` maintenance after a static network configure.

use crate::command_runner::{CommandOptions, CommandRunner};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub trait HostsFile: Send + Sync {
    /// Add `<ip> <names...>` unless an identical mapping already exists.
    fn add_entry(&self, ip_address: &str, dns_names: &[String], comment: Option<&str>) -> Result<()>;
}

pub struct EtcHostsFile {
    runner: Arc<dyn CommandRunner>,
    path: PathBuf,
}

impl EtcHostsFile {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_path(runner, "/etc/hosts")
    }

    pub fn with_path(runner: Arc<dyn CommandRunner>, path: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            path: path.into(),
        }
    }
}

pub fn render_hosts_line(ip_address: &str, dns_names: &[String], comment: Option<&str>) -> String {
    let mut line = format!("{ip_address} {}", dns_names.join(" "));
    if let Some(comment) = comment {
        line.push_str(&format!(" # {comment}"));
    }
    line
}

/// True when `content` maps `ip_address` to every name in `dns_names`.
pub fn has_entry(content: &str, ip_address: &str, dns_names: &[String]) -> bool {
    content.lines().any(|line| {
        let line = line.split('#').next().unwrap_or_default();
        let mut fields = line.split_whitespace();
        fields.next() == Some(ip_address) && {
            let names: Vec<&str> = fields.collect();
            dns_names.iter().all(|name| names.contains(&name.as_str()))
        }
    })
}

impl HostsFile for EtcHostsFile {
    fn add_entry(&self, ip_address: &str, dns_names: &[String], comment: Option<&str>) -> Result<()> {
        let existing = std::fs::read_to_string(&self.path).unwrap_or_default();
        if has_entry(&existing, ip_address, dns_names) {
            info!(ip_address, "Hosts file already contains entry");
            return Ok(());
        }

        let line = render_hosts_line(ip_address, dns_names, comment);
        let script = format!(
            "echo {} >> {}",
            shlex::try_quote(&line)?,
            shlex::try_quote(&self.path.to_string_lossy())?
        );
        self.runner
            .run_checked("sudo", &["sh", "-c", &script], &CommandOptions::default())?;
        info!(ip_address, path = %self.path.display(), "Added hosts file entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCommandRunner;
    use tempfile::tempdir;

    #[test]
    fn test_render_hosts_line() {
        assert_eq!(
            render_hosts_line("192.168.1.200", &["kmaster".into(), "kmaster.local".into()], Some("provisioner")),
            "192.168.1.200 kmaster kmaster.local # provisioner"
        );
    }

    #[test]
    fn test_has_entry() {
        let content = "127.0.0.1 localhost\n192.168.1.200 kmaster # provisioner\n";
        assert!(has_entry(content, "192.168.1.200", &["kmaster".into()]));
        assert!(!has_entry(content, "192.168.1.200", &["knode1".into()]));
        assert!(!has_entry(content, "192.168.1.201", &["kmaster".into()]));
    }

    #[test]
    fn test_add_entry_appends_with_sudo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, "127.0.0.1 localhost\n").unwrap();

        let runner = Arc::new(FakeCommandRunner::new());
        let hosts = EtcHostsFile::with_path(runner.clone(), &path);
        hosts
            .add_entry("192.168.1.200", &["kmaster".into()], None)
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "sudo");
        assert!(calls[0].args[2].contains("'192.168.1.200 kmaster'"));
    }

    #[test]
    fn test_add_entry_skips_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, "192.168.1.200 kmaster\n").unwrap();

        let runner = Arc::new(FakeCommandRunner::new());
        let hosts = EtcHostsFile::with_path(runner.clone(), &path);
        hosts
            .add_entry("192.168.1.200", &["kmaster".into()], None)
            .unwrap();
        assert!(runner.calls().is_empty());
    }
}
