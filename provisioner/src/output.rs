//! Output helpers for consistent CLI output.
//!
//! [`Output`] holds the cargo-like formatting primitives. Components never call
//! it directly; they print through a [`Printer`] so tests can capture what a
//! run would have shown.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::borrow::Cow;
use std::time::Duration;

/// Standard output helper for consistent CLI formatting.
pub struct Output;

impl Output {
    /// Example: `✓ Installed anchor`
    pub fn success(msg: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), msg.as_ref());
    }

    /// Example: `✗ install: ex: MissingUtility, message: ...` (stderr)
    pub fn error(msg: impl AsRef<str>) {
        eprintln!("{} {}", "✗".red().bold(), msg.as_ref().red());
    }

    pub fn warning(msg: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow(), msg.as_ref());
    }

    pub fn info(msg: impl AsRef<str>) {
        println!("{} {}", "→".cyan(), msg.as_ref().dimmed());
    }

    pub fn header(msg: impl AsRef<str>) {
        println!("\n{}\n", msg.as_ref().bold().cyan());
    }

    pub fn plain(msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }

    pub fn spinner(msg: impl Into<Cow<'static, str>>) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    pub fn download_bar(msg: impl Into<Cow<'static, str>>) -> ProgressBar {
        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg}\n  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb.set_message(msg);
        pb
    }
}

/// Align `key: value` rows on the widest key.
pub fn format_table(rows: &[(String, String)]) -> Vec<String> {
    let width = rows
        .iter()
        .map(|(key, _)| key.chars().count() + 1)
        .max()
        .unwrap_or(0);
    rows.iter()
        .map(|(key, value)| format!("{:<width$} {}", format!("{key}:"), value))
        .collect()
}

/// User-facing output sink.
pub trait Printer: Send + Sync {
    fn print(&self, msg: &str);
    fn success(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warning(&self, msg: &str);
    fn error(&self, msg: &str);
    fn header(&self, title: &str);

    fn table(&self, rows: &[(String, String)]) {
        for line in format_table(rows) {
            self.print(&line);
        }
    }

    /// Spinner around a long-running blocking call. Finish it with `finish_and_clear`.
    fn spinner(&self, msg: &str) -> ProgressBar;

    /// Byte progress bar for downloads.
    fn download_progress(&self, msg: &str) -> ProgressBar;
}

pub struct ConsolePrinter {
    dry_run: bool,
}

impl ConsolePrinter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl Printer for ConsolePrinter {
    fn print(&self, msg: &str) {
        Output::plain(msg);
    }

    fn success(&self, msg: &str) {
        Output::success(msg);
    }

    fn info(&self, msg: &str) {
        Output::info(msg);
    }

    fn warning(&self, msg: &str) {
        Output::warning(msg);
    }

    fn error(&self, msg: &str) {
        Output::error(msg);
    }

    fn header(&self, title: &str) {
        Output::header(title);
    }

    fn spinner(&self, msg: &str) -> ProgressBar {
        if self.dry_run {
            return ProgressBar::hidden();
        }
        Output::spinner(msg.to_string())
    }

    fn download_progress(&self, msg: &str) -> ProgressBar {
        if self.dry_run {
            return ProgressBar::hidden();
        }
        Output::download_bar(msg.to_string())
    }
}
