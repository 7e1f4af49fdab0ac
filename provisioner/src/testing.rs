//! In-memory collaborators for unit and integration tests.
//!
//! Every fake records what it was asked to do behind an `Arc<Mutex<..>>` so
//! a clone handed to [`Collaborators`](crate::collaborators::Collaborators)
//! can still be inspected afterwards.

use crate::ansible::{PlaybookExecutor, PlaybookRun};
use crate::checks::Checks;
use crate::command_runner::{CommandOptions, CommandRunner};
use crate::output::Printer;
use crate::prompter::Prompter;
use crate::remote::{HostsFile, NetworkScanner, ScannedHost};
use anyhow::Result;
use indicatif::ProgressBar;
use provisioner_release::{HttpClient, ReleaseApi, ReleaseError};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCall {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CommandCall {
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
struct CannedOutput {
    stdout: String,
    stderr: String,
    code: i32,
}

/// Records commands instead of spawning them.
#[derive(Default, Clone)]
pub struct FakeCommandRunner {
    responses: HashMap<String, CannedOutput>,
    calls: Arc<Mutex<Vec<CommandCall>>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdout(mut self, program: &str, stdout: &str) -> Self {
        self.responses.insert(
            program.to_string(),
            CannedOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                code: 0,
            },
        );
        self
    }

    pub fn with_failure(mut self, program: &str, stderr: &str) -> Self {
        self.responses.insert(
            program.to_string(),
            CannedOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                code: 1,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<CommandCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, program: &str, args: &[&str], options: &CommandOptions) -> CannedOutput {
        lock(&self.calls).push(CommandCall {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            cwd: options.cwd.clone(),
            env: options.env.clone(),
        });
        self.responses.get(program).cloned().unwrap_or(CannedOutput {
            stdout: String::new(),
            stderr: String::new(),
            code: 0,
        })
    }
}

impl CommandRunner for FakeCommandRunner {
    fn run_output(&self, program: &str, args: &[&str], options: &CommandOptions) -> Result<Output> {
        let canned = self.record(program, args, options);
        Ok(Output {
            status: ExitStatus::from_raw(canned.code << 8),
            stdout: canned.stdout.into_bytes(),
            stderr: canned.stderr.into_bytes(),
        })
    }

    fn run_status(&self, program: &str, args: &[&str], options: &CommandOptions) -> Result<ExitStatus> {
        let canned = self.record(program, args, options);
        Ok(ExitStatus::from_raw(canned.code << 8))
    }
}

/// Tool lookup backed by a fixed set of names.
#[derive(Default, Clone)]
pub struct FakeChecks {
    tools: Arc<Mutex<BTreeSet<String>>>,
}

impl FakeChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(self, name: &str) -> Self {
        self.add_tool(name);
        self
    }

    pub fn add_tool(&self, name: &str) {
        lock(&self.tools).insert(name.to_string());
    }
}

impl Checks for FakeChecks {
    fn is_tool_exist(&self, name: &str) -> bool {
        lock(&self.tools).contains(name)
    }
}

#[derive(Default)]
struct PrompterState {
    confirms: VecDeque<bool>,
    inputs: VecDeque<String>,
    selections: VecDeque<Option<String>>,
    multi_selections: VecDeque<Vec<String>>,
    enter_prompts: usize,
    messages: Vec<String>,
}

/// Answers prompts from queues.
///
/// An empty queue falls back to the default value, the first option for
/// single-select, or every option for multi-select.
#[derive(Default, Clone)]
pub struct FakePrompter {
    state: Arc<Mutex<PrompterState>>,
}

impl FakePrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirm(self, answer: bool) -> Self {
        lock(&self.state).confirms.push_back(answer);
        self
    }

    pub fn with_input(self, answer: &str) -> Self {
        lock(&self.state).inputs.push_back(answer.to_string());
        self
    }

    pub fn with_selection(self, answer: Option<&str>) -> Self {
        lock(&self.state)
            .selections
            .push_back(answer.map(str::to_string));
        self
    }

    pub fn with_multi_selection(self, answers: &[&str]) -> Self {
        lock(&self.state)
            .multi_selections
            .push_back(answers.iter().map(|a| a.to_string()).collect());
        self
    }

    pub fn enter_prompts(&self) -> usize {
        lock(&self.state).enter_prompts
    }

    /// Every prompt message in the order it was asked.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.state).messages.clone()
    }
}

impl Prompter for FakePrompter {
    fn prompt_for_enter(&self, message: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.enter_prompts += 1;
        state.messages.push(message.to_string());
        Ok(())
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let mut state = lock(&self.state);
        state.messages.push(message.to_string());
        Ok(state.confirms.pop_front().unwrap_or(default))
    }

    fn input(&self, message: &str, default: Option<&str>, _redact: bool) -> Result<String> {
        let mut state = lock(&self.state);
        state.messages.push(message.to_string());
        Ok(state
            .inputs
            .pop_front()
            .unwrap_or_else(|| default.unwrap_or_default().to_string()))
    }

    fn select_single(&self, message: &str, options: &[String]) -> Result<Option<String>> {
        let mut state = lock(&self.state);
        state.messages.push(message.to_string());
        Ok(state
            .selections
            .pop_front()
            .unwrap_or_else(|| options.first().cloned()))
    }

    fn select_multiple(&self, message: &str, options: &[String]) -> Result<Vec<String>> {
        let mut state = lock(&self.state);
        state.messages.push(message.to_string());
        Ok(state
            .multi_selections
            .pop_front()
            .unwrap_or_else(|| options.to_vec()))
    }
}

/// Captures printed lines without styling.
#[derive(Default, Clone)]
pub struct FakePrinter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl FakePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn output(&self) -> String {
        self.lines().join("\n")
    }

    pub fn contains(&self, text: &str) -> bool {
        self.lines().iter().any(|line| line.contains(text))
    }

    fn push(&self, msg: &str) {
        lock(&self.lines).push(msg.to_string());
    }
}

impl Printer for FakePrinter {
    fn print(&self, msg: &str) {
        self.push(msg);
    }

    fn success(&self, msg: &str) {
        self.push(msg);
    }

    fn info(&self, msg: &str) {
        self.push(msg);
    }

    fn warning(&self, msg: &str) {
        self.push(msg);
    }

    fn error(&self, msg: &str) {
        self.push(msg);
    }

    fn header(&self, title: &str) {
        self.push(title);
    }

    fn spinner(&self, msg: &str) -> ProgressBar {
        self.push(msg);
        ProgressBar::hidden()
    }

    fn download_progress(&self, msg: &str) -> ProgressBar {
        self.push(msg);
        ProgressBar::hidden()
    }
}

/// Serves canned bodies and writes fixed bytes for downloads.
#[derive(Clone)]
pub struct FakeHttpClient {
    texts: HashMap<String, String>,
    download_content: Vec<u8>,
    downloads: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl Default for FakeHttpClient {
    fn default() -> Self {
        Self {
            texts: HashMap::new(),
            download_content: b"#!/bin/sh\necho fake\n".to_vec(),
            downloads: Arc::default(),
        }
    }
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, url: &str, body: &str) -> Self {
        self.texts.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_download_content(mut self, content: &[u8]) -> Self {
        self.download_content = content.to_vec();
        self
    }

    /// `(url, dest)` of every download in order.
    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        lock(&self.downloads).clone()
    }
}

impl HttpClient for FakeHttpClient {
    fn get_text(&self, url: &str, _timeout: Duration) -> Result<String, ReleaseError> {
        self.texts
            .get(url)
            .cloned()
            .ok_or_else(|| ReleaseError::Network(format!("no canned response for {url}")))
    }

    fn download_file(
        &self,
        url: &str,
        dest: &Path,
        _verify_already_downloaded: bool,
        _progress: Option<&ProgressBar>,
    ) -> Result<PathBuf, ReleaseError> {
        lock(&self.downloads).push((url.to_string(), dest.to_path_buf()));
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, &self.download_content)?;
        Ok(dest.to_path_buf())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDownload {
    pub owner: String,
    pub repo: String,
    pub version: String,
    pub filename: String,
    pub dest_dir: PathBuf,
}

/// Release API with a configurable latest tag and file-writing downloads.
#[derive(Clone)]
pub struct FakeReleaseApi {
    latest: Option<String>,
    content: Vec<u8>,
    lookups: Arc<Mutex<Vec<(String, String)>>>,
    downloads: Arc<Mutex<Vec<ReleaseDownload>>>,
}

impl Default for FakeReleaseApi {
    fn default() -> Self {
        Self {
            latest: None,
            content: b"#!/bin/sh\necho fake\n".to_vec(),
            lookups: Arc::default(),
            downloads: Arc::default(),
        }
    }
}

impl FakeReleaseApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latest(mut self, version: &str) -> Self {
        self.latest = Some(version.to_string());
        self
    }

    pub fn with_content(mut self, content: &[u8]) -> Self {
        self.content = content.to_vec();
        self
    }

    pub fn lookups(&self) -> Vec<(String, String)> {
        lock(&self.lookups).clone()
    }

    pub fn downloads(&self) -> Vec<ReleaseDownload> {
        lock(&self.downloads).clone()
    }
}

impl ReleaseApi for FakeReleaseApi {
    fn latest_version(&self, owner: &str, repo: &str) -> Result<Option<String>, ReleaseError> {
        lock(&self.lookups).push((owner.to_string(), repo.to_string()));
        Ok(self.latest.clone())
    }

    fn download_release_binary(
        &self,
        owner: &str,
        repo: &str,
        version: &str,
        filename: &str,
        dest_dir: &Path,
        _progress: Option<&ProgressBar>,
    ) -> Result<PathBuf, ReleaseError> {
        lock(&self.downloads).push(ReleaseDownload {
            owner: owner.to_string(),
            repo: repo.to_string(),
            version: version.to_string(),
            filename: filename.to_string(),
            dest_dir: dest_dir.to_path_buf(),
        });
        std::fs::create_dir_all(dest_dir)?;
        let dest = dest_dir.join(filename);
        std::fs::write(&dest, &self.content)?;
        Ok(dest)
    }
}

/// Records playbook runs and answers with fixed output.
#[derive(Default, Clone)]
pub struct FakePlaybookExecutor {
    output: String,
    runs: Arc<Mutex<Vec<PlaybookRun>>>,
}

impl FakePlaybookExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, output: &str) -> Self {
        self.output = output.to_string();
        self
    }

    pub fn runs(&self) -> Vec<PlaybookRun> {
        lock(&self.runs).clone()
    }
}

impl PlaybookExecutor for FakePlaybookExecutor {
    fn run(&self, request: &PlaybookRun) -> Result<String> {
        lock(&self.runs).push(request.clone());
        Ok(self.output.clone())
    }
}

#[derive(Default, Clone)]
pub struct FakeNetworkScanner {
    hosts: Vec<ScannedHost>,
    ranges: Arc<Mutex<Vec<String>>>,
}

impl FakeNetworkScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, hostname: &str, ip_address: &str) -> Self {
        self.hosts.push(ScannedHost {
            hostname: hostname.to_string(),
            ip_address: ip_address.to_string(),
        });
        self
    }

    pub fn ranges(&self) -> Vec<String> {
        lock(&self.ranges).clone()
    }
}

impl NetworkScanner for FakeNetworkScanner {
    fn scan(&self, ip_range: &str) -> Result<Vec<ScannedHost>> {
        lock(&self.ranges).push(ip_range.to_string());
        Ok(self.hosts.clone())
    }
}

#[derive(Default, Clone)]
pub struct FakeHostsFile {
    entries: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl FakeHostsFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.entries).clone()
    }
}

impl HostsFile for FakeHostsFile {
    fn add_entry(&self, ip_address: &str, dns_names: &[String], _comment: Option<&str>) -> Result<()> {
        lock(&self.entries).push((ip_address.to_string(), dns_names.to_vec()));
        Ok(())
    }
}
