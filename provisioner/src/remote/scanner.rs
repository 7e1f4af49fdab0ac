//! LAN discovery through `nmap` ping scans.

use crate::command_runner::{CommandOptions, CommandRunner};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedHost {
    pub hostname: String,
    pub ip_address: String,
}

impl ScannedHost {
    /// Display name, falling back to the address when reverse DNS gave nothing.
    pub fn name(&self) -> &str {
        if self.hostname.is_empty() {
            &self.ip_address
        } else {
            &self.hostname
        }
    }
}

pub trait NetworkScanner: Send + Sync {
    fn scan(&self, ip_range: &str) -> Result<Vec<ScannedHost>>;
}

pub struct NmapScanner {
    runner: Arc<dyn CommandRunner>,
}

impl NmapScanner {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl NetworkScanner for NmapScanner {
    fn scan(&self, ip_range: &str) -> Result<Vec<ScannedHost>> {
        debug!(ip_range, "Scanning LAN");
        let stdout = self
            .runner
            .run_checked("nmap", &["-sn", "-oG", "-", ip_range], &CommandOptions::default())
            .with_context(|| format!("Failed to scan {ip_range}"))?;
        Ok(parse_grepable_output(&stdout))
    }
}

/// Parse `nmap -oG` lines such as `Host: 192.168.1.10 (raspberrypi.local)\tStatus: Up`.
pub fn parse_grepable_output(output: &str) -> Vec<ScannedHost> {
    output
        .lines()
        .filter(|line| line.starts_with("Host:") && line.contains("Status: Up"))
        .filter_map(|line| {
            let rest = line.strip_prefix("Host:")?.trim_start();
            let (ip, rest) = rest.split_once(' ').unwrap_or((rest, ""));
            let hostname = rest
                .trim_start()
                .strip_prefix('(')
                .and_then(|rest| rest.split_once(')'))
                .map(|(name, _)| name.to_string())
                .unwrap_or_default();
            Some(ScannedHost {
                hostname,
                ip_address: ip.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCommandRunner;

    const SAMPLE: &str = "# Nmap 7.94 scan initiated as: nmap -sn -oG - 192.168.1.1/24\n\
Host: 192.168.1.1 (router.lan)\tStatus: Up\n\
Host: 192.168.1.200 (kmaster.lan)\tStatus: Up\n\
Host: 192.168.1.201 ()\tStatus: Up\n\
Host: 192.168.1.202 (gone.lan)\tStatus: Down\n\
# Nmap done at ...\n";

    #[test]
    fn test_parse_grepable_output() {
        let hosts = parse_grepable_output(SAMPLE);
        assert_eq!(hosts.len(), 3);
        assert_eq!(hosts[1].hostname, "kmaster.lan");
        assert_eq!(hosts[1].ip_address, "192.168.1.200");
        assert_eq!(hosts[2].name(), "192.168.1.201");
    }

    #[test]
    fn test_scan_runs_nmap() {
        let runner = Arc::new(FakeCommandRunner::new().with_stdout("nmap", SAMPLE));
        let scanner = NmapScanner::new(runner.clone());

        let hosts = scanner.scan("192.168.1.1/24").unwrap();
        assert_eq!(hosts.len(), 3);
        assert_eq!(
            runner.calls()[0].args,
            vec!["-sn", "-oG", "-", "192.168.1.1/24"]
        );
    }
}
