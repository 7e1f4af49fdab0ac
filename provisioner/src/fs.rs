//! Typed filesystem primitives.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write `content`, creating parent directories as needed.
    fn write(&self, path: &Path, content: &str) -> Result<PathBuf>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a file or symlink; missing paths are not an error.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Remove a directory tree; missing paths are not an error.
    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    fn set_executable(&self, path: &Path) -> Result<()>;

    /// Point `link` at `target`, replacing whatever `link` was.
    fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    fn is_archive(&self, path: &Path) -> bool;

    /// Unpack into `target_dir`, returning the files written.
    fn unpack_archive(&self, archive: &Path, target_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// The real filesystem. Mutations are skipped under dry-run.
pub struct LocalFileSystem {
    dry_run: bool,
}

impl LocalFileSystem {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn skip(&self, action: &str, path: &Path) -> bool {
        if self.dry_run {
            debug!(action, path = %path.display(), "dry-run: skipping filesystem change");
        }
        self.dry_run
    }
}

impl FileSystem for LocalFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn write(&self, path: &Path, content: &str) -> Result<PathBuf> {
        if self.skip("write", path) {
            return Ok(path.to_path_buf());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "Wrote file");
        Ok(path.to_path_buf())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        if self.skip("create_dir_all", path) {
            return Ok(());
        }
        fs::create_dir_all(path).with_context(|| format!("Failed to create {}", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        if self.skip("remove_file", path) {
            return Ok(());
        }
        // symlink_metadata so a dangling link still counts as present
        if fs::symlink_metadata(path).is_err() {
            return Ok(());
        }
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
        info!(path = %path.display(), "Removed file");
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        if self.skip("remove_dir_all", path) || !path.exists() {
            return Ok(());
        }
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        info!(path = %path.display(), "Removed directory");
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if self.skip("copy", to) {
            return Ok(());
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
        Ok(())
    }

    fn set_executable(&self, path: &Path) -> Result<()> {
        if self.skip("set_executable", path) {
            return Ok(());
        }
        provisioner_common::set_executable(path)
            .with_context(|| format!("Failed to make {} executable", path.display()))
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        if self.skip("symlink", link) {
            return Ok(());
        }
        let parent = link
            .parent()
            .with_context(|| format!("Symlink path has no parent: {}", link.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let file_name = link
            .file_name()
            .with_context(|| format!("Symlink path has no file name: {}", link.display()))?
            .to_string_lossy()
            .into_owned();
        let staging = parent.join(format!(".{file_name}.{}.tmp", std::process::id()));
        let _ = fs::remove_file(&staging);

        std::os::unix::fs::symlink(target, &staging)
            .with_context(|| format!("Failed to create symlink {}", staging.display()))?;
        // rename over the old link so readers never observe a missing entry
        fs::rename(&staging, link)
            .with_context(|| format!("Failed to replace symlink {}", link.display()))?;
        info!(link = %link.display(), target = %target.display(), "Updated symlink");
        Ok(())
    }

    fn is_archive(&self, path: &Path) -> bool {
        provisioner_common::is_archive(path)
    }

    fn unpack_archive(&self, archive: &Path, target_dir: &Path) -> Result<Vec<PathBuf>> {
        if self.skip("unpack_archive", archive) {
            return Ok(Vec::new());
        }
        let files = provisioner_common::unpack_archive(archive, target_dir)
            .with_context(|| format!("Failed to unpack {}", archive.display()))?;
        info!(archive = %archive.display(), files = files.len(), "Unpacked archive");
        Ok(files)
    }
}
