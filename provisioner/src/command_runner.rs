//! Abstraction over external command execution for testability.
//!
//! Every child process the provisioner launches (install scripts, `ansible-playbook`,
//! `nmap`, `dd`, version checks) goes through [`CommandRunner`]. Under dry-run the
//! real runner echoes the command instead of spawning it.

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Output};
use tracing::{debug, info};

pub trait CommandRunner: Send + Sync {
    /// Run a command and capture its full output (stdout + stderr + exit status).
    fn run_output(&self, program: &str, args: &[&str], options: &CommandOptions) -> Result<Output>;

    /// Run a command and return only its exit status (inherits stdio).
    fn run_status(
        &self,
        program: &str,
        args: &[&str],
        options: &CommandOptions,
    ) -> Result<ExitStatus>;

    /// Run a command and return its stdout, failing on a non-zero exit.
    fn run_checked(&self, program: &str, args: &[&str], options: &CommandOptions) -> Result<String> {
        let output = self.run_output(program, args, options)?;
        if !output.status.success() {
            bail!(
                "'{}' exited with {}: {}",
                format_command(program, args),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a shell snippet through `sh -c`.
    fn run_shell(&self, script: &str, options: &CommandOptions) -> Result<String> {
        self.run_checked("sh", &["-c", script], options)
    }
}

#[derive(Debug, Default, Clone)]
pub struct CommandOptions {
    /// Working directory for the command.
    pub cwd: Option<PathBuf>,
    /// Additional environment variables.
    pub env: Vec<(String, String)>,
}

impl CommandOptions {
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Default::default()
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Render a command line for display, quoting arguments where needed.
pub fn format_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .map(|part| shlex::try_quote(part).map(|q| q.into_owned()).unwrap_or_else(|_| part.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Production implementation that delegates to [`std::process::Command`].
pub struct RealCommandRunner {
    dry_run: bool,
}

impl RealCommandRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn command(program: &str, args: &[&str], options: &CommandOptions) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &options.env {
            cmd.env(k, v);
        }
        cmd
    }

    fn echo(program: &str, args: &[&str]) -> String {
        let line = format_command(program, args);
        println!("  {} {}", "Would run:".cyan(), line);
        line
    }
}

impl CommandRunner for RealCommandRunner {
    fn run_output(&self, program: &str, args: &[&str], options: &CommandOptions) -> Result<Output> {
        if self.dry_run {
            let line = Self::echo(program, args);
            return Ok(Output {
                status: ExitStatus::from_raw(0),
                stdout: line.into_bytes(),
                stderr: Vec::new(),
            });
        }

        debug!(program, ?args, "Running command");
        let output = Self::command(program, args, options)
            .output()
            .with_context(|| format!("Failed to run '{program}'"))?;
        info!(program, success = output.status.success(), "Command completed");
        Ok(output)
    }

    fn run_status(
        &self,
        program: &str,
        args: &[&str],
        options: &CommandOptions,
    ) -> Result<ExitStatus> {
        if self.dry_run {
            Self::echo(program, args);
            return Ok(ExitStatus::from_raw(0));
        }

        debug!(program, ?args, "Running command");
        let status = Self::command(program, args, options)
            .status()
            .with_context(|| format!("Failed to run '{program}'"))?;
        info!(program, success = status.success(), "Command completed");
        Ok(status)
    }
}
