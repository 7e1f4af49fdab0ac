//! Presence checks for local tools.

use crate::error::ProvisionerError;
use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

pub trait Checks: Send + Sync {
    fn is_tool_exist(&self, name: &str) -> bool;

    /// Fail with `MissingUtility` when `name` is not installed.
    fn require_tool(&self, name: &str) -> Result<()> {
        if self.is_tool_exist(name) {
            Ok(())
        } else {
            Err(ProvisionerError::MissingUtility(name.to_string()).into())
        }
    }
}

/// Looks tools up on `PATH`, plus the provisioner's own bin directory.
pub struct SystemChecks {
    bin_dir: PathBuf,
}

impl SystemChecks {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }
}

impl Checks for SystemChecks {
    fn is_tool_exist(&self, name: &str) -> bool {
        let found = which::which(name).is_ok() || self.bin_dir.join(name).is_file();
        debug!(tool = name, found, "Checked tool presence");
        found
    }
}
