//! [`PlaybookExecutor`] backed by `ansible-playbook`.

use super::inventory::render_inventory;
use super::{ANSIBLE_CFG, PROVISIONER_ROLE_TASKS, PlaybookExecutor, PlaybookRun};
use crate::command_runner::{CommandOptions, CommandRunner, format_command};
use crate::fs::FileSystem;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const ANSIBLE_PLAYBOOK: &str = "ansible-playbook";

pub struct AnsibleRunner {
    ansible_dir: PathBuf,
    dry_run: bool,
    verbose: bool,
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn CommandRunner>,
}

impl AnsibleRunner {
    pub fn new(
        ansible_dir: impl Into<PathBuf>,
        dry_run: bool,
        verbose: bool,
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            ansible_dir: ansible_dir.into(),
            dry_run,
            verbose,
            fs,
            runner,
        }
    }

    pub fn hosts_path(&self) -> PathBuf {
        self.ansible_dir.join("hosts")
    }

    pub fn playbook_path(&self, name: &str) -> PathBuf {
        self.ansible_dir.join("playbooks").join(format!("{name}.yml"))
    }

    /// Arguments passed to `ansible-playbook`, in order.
    pub fn build_args(&self, request: &PlaybookRun) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            self.hosts_path().to_string_lossy().into_owned(),
            self.playbook_path(&request.playbook.name)
                .to_string_lossy()
                .into_owned(),
        ];
        for var in &request.ansible_vars {
            args.push("-e".to_string());
            args.push(var.clone());
        }
        if !request.ansible_tags.is_empty() {
            args.push("--tags".to_string());
            args.push(request.ansible_tags.join(","));
        }
        if self.verbose || request.playbook.remote_context.verbose {
            args.push("-vvvv".to_string());
        }
        args
    }

    /// Write the inventory, config, role and playbook for this run.
    fn materialize(&self, request: &PlaybookRun, rendered: &str) -> Result<()> {
        let dir = &self.ansible_dir;
        self.fs
            .write(&self.hosts_path(), &render_inventory(&request.hosts))?;
        self.fs.write(&dir.join("ansible.cfg"), ANSIBLE_CFG)?;
        self.fs.create_dir_all(&dir.join("callback_plugins"))?;
        self.fs.write(
            &dir.join("roles/provisioner/tasks/main.yml"),
            PROVISIONER_ROLE_TASKS,
        )?;
        self.fs
            .write(&self.playbook_path(&request.playbook.name), rendered)?;
        debug!(dir = %dir.display(), playbook = %request.playbook.name, "Materialized ansible assets");
        Ok(())
    }

    fn playbooks_root(&self) -> String {
        self.ansible_dir.to_string_lossy().into_owned()
    }
}

fn config_path(dir: &Path) -> String {
    dir.join("ansible.cfg").to_string_lossy().into_owned()
}

impl PlaybookExecutor for AnsibleRunner {
    fn run(&self, request: &PlaybookRun) -> Result<String> {
        let rendered = request.playbook.render(&self.playbooks_root());
        let args = self.build_args(request);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = format_command(ANSIBLE_PLAYBOOK, &arg_refs);

        if self.dry_run {
            return Ok(format!("{rendered}\n\ncommand:\n{command}"));
        }

        self.materialize(request, &rendered)?;
        info!(playbook = %request.playbook.name, hosts = request.hosts.len(), "Running playbook");
        let options = CommandOptions::with_cwd(&self.ansible_dir)
            .with_env("ANSIBLE_CONFIG", config_path(&self.ansible_dir));
        let output = self
            .runner
            .run_output(ANSIBLE_PLAYBOOK, &arg_refs, &options)
            .with_context(|| format!("Failed to run playbook {}", request.playbook.name))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            combined.push_str(&stderr);
        }
        if !output.status.success() {
            bail!(
                "Playbook {} failed ({}): {}",
                request.playbook.name,
                output.status,
                combined.trim()
            );
        }
        Ok(combined)
    }
}
