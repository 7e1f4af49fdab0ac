//! Process-wide execution context.
//!
//! A [`Context`] is built once per invocation from the global CLI flags and
//! threaded through every collaborator. It is immutable after construction.

use anyhow::{Context as _, Result, bail};
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output verbosity accepted by `--verbosity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
#[value(rename_all = "verbatim")]
pub enum Verbosity {
    #[default]
    Normal,
    Verbose,
}

/// Operating system, architecture and kernel release of the target host.
///
/// OS and arch are stored normalised: `darwin` / `linux` and `amd64` / `arm64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsArch {
    pub os: String,
    pub arch: String,
    pub release: String,
}

impl OsArch {
    pub fn new(os: &str, arch: &str, release: &str) -> Self {
        Self {
            os: normalize_os(os),
            arch: normalize_arch(arch),
            release: release.to_string(),
        }
    }

    /// Detect the running host.
    pub fn detect() -> Self {
        let release = nix::sys::utsname::uname()
            .map(|uts| uts.release().to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(std::env::consts::OS, std::env::consts::ARCH, &release)
    }

    /// Parse an `<os>_<arch>` override such as `darwin_arm64`.
    pub fn parse(value: &str) -> Result<Self> {
        let Some((os, arch)) = value.trim().split_once('_') else {
            bail!("Invalid os_arch '{value}', expected <os>_<arch> (e.g. linux_amd64)");
        };
        if os.is_empty() || arch.is_empty() {
            bail!("Invalid os_arch '{value}', expected <os>_<arch> (e.g. linux_amd64)");
        }
        Ok(Self::new(os, arch, ""))
    }

    /// The `<os>_<arch>` pair used as a registry key.
    pub fn pair(&self) -> String {
        format!("{}_{}", self.os, self.arch)
    }

    pub fn is_linux(&self) -> bool {
        self.os == "linux"
    }

    pub fn is_darwin(&self) -> bool {
        self.os == "darwin"
    }
}

impl fmt::Display for OsArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pair())
    }
}

pub fn normalize_os(os: &str) -> String {
    match os.to_lowercase().as_str() {
        "macos" | "osx" | "darwin" => "darwin".to_string(),
        other => other.to_string(),
    }
}

pub fn normalize_arch(arch: &str) -> String {
    match arch.to_lowercase().as_str() {
        "x86_64" | "x64" | "amd64" => "amd64".to_string(),
        "aarch64" | "arm64" => "arm64".to_string(),
        "armv7l" | "armv7" | "arm" => "armv7".to_string(),
        "i686" | "i386" | "x86" => "386".to_string(),
        other => other.to_string(),
    }
}

/// Flags and host facts shared by every component of a single run.
#[derive(Debug, Clone)]
pub struct Context {
    pub dry_run: bool,
    pub verbose: bool,
    pub auto_prompt: bool,
    pub non_interactive: bool,
    pub os_arch: OsArch,
    pub home_dir: PathBuf,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// `~/.config/provisioner`
    pub fn config_dir(&self) -> PathBuf {
        self.home_dir.join(".config").join("provisioner")
    }

    /// `~/.config/provisioner/binaries`
    pub fn binaries_dir(&self) -> PathBuf {
        self.config_dir().join("binaries")
    }

    /// `~/.local/bin`
    pub fn bin_dir(&self) -> PathBuf {
        self.home_dir.join(".local").join("bin")
    }

    /// `~/.config/provisioner/ansible`
    pub fn ansible_dir(&self) -> PathBuf {
        self.config_dir().join("ansible")
    }

    /// `~/.config/provisioner/config.yaml`
    pub fn user_config_path(&self) -> PathBuf {
        self.config_dir().join("config.yaml")
    }

    /// Render a path under the home directory with a leading `~`.
    pub fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.home_dir) {
            Ok(relative) => format!("~/{}", relative.display()),
            Err(_) => path.display().to_string(),
        }
    }
}

/// Builder for contexts in tests and in `main`.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    dry_run: bool,
    verbose: bool,
    auto_prompt: bool,
    non_interactive: bool,
    os_arch: Option<OsArch>,
    home_dir: Option<PathBuf>,
}

impl ContextBuilder {
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn auto_prompt(mut self, auto_prompt: bool) -> Self {
        self.auto_prompt = auto_prompt;
        self
    }

    pub fn non_interactive(mut self, non_interactive: bool) -> Self {
        self.non_interactive = non_interactive;
        self
    }

    pub fn os_arch(mut self, os_arch: OsArch) -> Self {
        self.os_arch = Some(os_arch);
        self
    }

    pub fn home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    pub fn build(self) -> Result<Context> {
        let home_dir = match self.home_dir {
            Some(home) => home,
            None => directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().to_path_buf())
                .context("Could not determine home directory")?,
        };
        let os_arch = self.os_arch.unwrap_or_else(OsArch::detect);

        let ctx = Context {
            dry_run: self.dry_run,
            verbose: self.verbose,
            auto_prompt: self.auto_prompt,
            non_interactive: self.non_interactive,
            os_arch,
            home_dir,
        };
        debug!(
            os_arch = %ctx.os_arch,
            dry_run = ctx.dry_run,
            verbose = ctx.verbose,
            "Context created"
        );
        Ok(ctx)
    }
}
