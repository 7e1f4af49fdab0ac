//! Per-invocation handles to every side-effecting component.
//!
//! Each handle is built on first use and then reused for the rest of the
//! run. Tests swap in fakes with the `with_*` builders before anything is
//! resolved.

use crate::ansible::{AnsibleRunner, PlaybookExecutor};
use crate::checks::{Checks, SystemChecks};
use crate::command_runner::{CommandRunner, RealCommandRunner};
use crate::context::Context;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::output::{ConsolePrinter, Printer};
use crate::prompter::{CliclackPrompter, Prompter};
use crate::remote::{EtcHostsFile, HostsFile, NetworkScanner, NmapScanner};
use crate::summary::Summary;
use provisioner_release::github::GITHUB_API_URL;
use provisioner_release::{BlockingHttpClient, GithubReleaseApi, HttpClient, ReleaseApi};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

pub struct Collaborators {
    ctx: Context,
    git_access_token: Option<String>,
    lock: Mutex<()>,
    summary: Arc<Summary>,
    runner: OnceLock<Arc<dyn CommandRunner>>,
    fs: OnceLock<Arc<dyn FileSystem>>,
    checks: OnceLock<Arc<dyn Checks>>,
    printer: OnceLock<Arc<dyn Printer>>,
    prompter: OnceLock<Arc<dyn Prompter>>,
    http: OnceLock<Arc<dyn HttpClient>>,
    release_api: OnceLock<Arc<dyn ReleaseApi>>,
    playbook_executor: OnceLock<Arc<dyn PlaybookExecutor>>,
    scanner: OnceLock<Arc<dyn NetworkScanner>>,
    hosts_file: OnceLock<Arc<dyn HostsFile>>,
}

fn preset<T: ?Sized>(cell: &OnceLock<Arc<T>>, value: Arc<T>) {
    let _ = cell.set(value);
}

impl Collaborators {
    pub fn new(ctx: Context) -> Self {
        Self {
            summary: Arc::new(Summary::new(ctx.verbose)),
            ctx,
            git_access_token: None,
            lock: Mutex::new(()),
            runner: OnceLock::new(),
            fs: OnceLock::new(),
            checks: OnceLock::new(),
            printer: OnceLock::new(),
            prompter: OnceLock::new(),
            http: OnceLock::new(),
            release_api: OnceLock::new(),
            playbook_executor: OnceLock::new(),
            scanner: OnceLock::new(),
            hosts_file: OnceLock::new(),
        }
    }

    pub fn with_git_access_token(mut self, token: Option<String>) -> Self {
        self.git_access_token = token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn with_command_runner(self, runner: Arc<dyn CommandRunner>) -> Self {
        preset(&self.runner, runner);
        self
    }

    pub fn with_file_system(self, fs: Arc<dyn FileSystem>) -> Self {
        preset(&self.fs, fs);
        self
    }

    pub fn with_checks(self, checks: Arc<dyn Checks>) -> Self {
        preset(&self.checks, checks);
        self
    }

    pub fn with_printer(self, printer: Arc<dyn Printer>) -> Self {
        preset(&self.printer, printer);
        self
    }

    pub fn with_prompter(self, prompter: Arc<dyn Prompter>) -> Self {
        preset(&self.prompter, prompter);
        self
    }

    pub fn with_http_client(self, http: Arc<dyn HttpClient>) -> Self {
        preset(&self.http, http);
        self
    }

    pub fn with_release_api(self, release_api: Arc<dyn ReleaseApi>) -> Self {
        preset(&self.release_api, release_api);
        self
    }

    pub fn with_playbook_executor(self, executor: Arc<dyn PlaybookExecutor>) -> Self {
        preset(&self.playbook_executor, executor);
        self
    }

    pub fn with_network_scanner(self, scanner: Arc<dyn NetworkScanner>) -> Self {
        preset(&self.scanner, scanner);
        self
    }

    pub fn with_hosts_file(self, hosts_file: Arc<dyn HostsFile>) -> Self {
        preset(&self.hosts_file, hosts_file);
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn git_access_token(&self) -> Option<&str> {
        self.git_access_token.as_deref()
    }

    pub fn summary(&self) -> Arc<Summary> {
        Arc::clone(&self.summary)
    }

    /// Resolve `cell`, building it under the shared lock on first use.
    ///
    /// `init` must not resolve other collaborators; callers fetch those
    /// before calling in.
    fn resolve<T: ?Sized>(&self, cell: &OnceLock<Arc<T>>, init: impl FnOnce() -> Arc<T>) -> Arc<T> {
        if let Some(value) = cell.get() {
            return Arc::clone(value);
        }
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cell.get_or_init(init))
    }

    pub fn command_runner(&self) -> Arc<dyn CommandRunner> {
        let dry_run = self.ctx.dry_run;
        self.resolve(&self.runner, || Arc::new(RealCommandRunner::new(dry_run)))
    }

    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        let dry_run = self.ctx.dry_run;
        self.resolve(&self.fs, || Arc::new(LocalFileSystem::new(dry_run)))
    }

    pub fn checks(&self) -> Arc<dyn Checks> {
        let bin_dir = self.ctx.bin_dir();
        self.resolve(&self.checks, || Arc::new(SystemChecks::new(bin_dir)))
    }

    pub fn printer(&self) -> Arc<dyn Printer> {
        let dry_run = self.ctx.dry_run;
        self.resolve(&self.printer, || Arc::new(ConsolePrinter::new(dry_run)))
    }

    pub fn prompter(&self) -> Arc<dyn Prompter> {
        let ctx = &self.ctx;
        let prompter = CliclackPrompter::new(ctx.dry_run, ctx.auto_prompt, ctx.non_interactive);
        self.resolve(&self.prompter, || Arc::new(prompter))
    }

    pub fn http_client(&self) -> Arc<dyn HttpClient> {
        let dry_run = self.ctx.dry_run;
        self.resolve(&self.http, || Arc::new(BlockingHttpClient::new(dry_run)))
    }

    pub fn release_api(&self) -> Arc<dyn ReleaseApi> {
        let dry_run = self.ctx.dry_run;
        let token = self.git_access_token.clone();
        self.resolve(&self.release_api, || {
            Arc::new(GithubReleaseApi::with_base_url(GITHUB_API_URL, token, dry_run))
        })
    }

    pub fn playbook_executor(&self) -> Arc<dyn PlaybookExecutor> {
        if let Some(executor) = self.playbook_executor.get() {
            return Arc::clone(executor);
        }
        let fs = self.file_system();
        let runner = self.command_runner();
        let ctx = &self.ctx;
        let executor = AnsibleRunner::new(ctx.ansible_dir(), ctx.dry_run, ctx.verbose, fs, runner);
        self.resolve(&self.playbook_executor, || Arc::new(executor))
    }

    pub fn network_scanner(&self) -> Arc<dyn NetworkScanner> {
        if let Some(scanner) = self.scanner.get() {
            return Arc::clone(scanner);
        }
        let runner = self.command_runner();
        self.resolve(&self.scanner, || Arc::new(NmapScanner::new(runner)))
    }

    pub fn hosts_file(&self) -> Arc<dyn HostsFile> {
        if let Some(hosts_file) = self.hosts_file.get() {
            return Arc::clone(hosts_file);
        }
        let runner = self.command_runner();
        self.resolve(&self.hosts_file, || Arc::new(EtcHostsFile::new(runner)))
    }
}
