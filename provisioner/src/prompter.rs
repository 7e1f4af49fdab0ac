//! Interactive prompts that honour `--auto-prompt`, `--non-interactive` and `--dry-run`.

use crate::error::ProvisionerError;
use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use provisioner_release::DRY_RUN_RESPONSE;
use tracing::debug;

pub trait Prompter: Send + Sync {
    /// Block until the user presses ENTER.
    fn prompt_for_enter(&self, message: &str) -> Result<()>;

    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Free-text input. `redact` hides the typed value.
    fn input(&self, message: &str, default: Option<&str>, redact: bool) -> Result<String>;

    /// Pick one option; `None` when the user picked nothing.
    fn select_single(&self, message: &str, options: &[String]) -> Result<Option<String>>;

    fn select_multiple(&self, message: &str, options: &[String]) -> Result<Vec<String>>;
}

/// Terminal prompter built on `cliclack`.
pub struct CliclackPrompter {
    dry_run: bool,
    auto_prompt: bool,
    non_interactive: bool,
}

impl CliclackPrompter {
    pub fn new(dry_run: bool, auto_prompt: bool, non_interactive: bool) -> Self {
        Self {
            dry_run,
            auto_prompt,
            non_interactive,
        }
    }

    fn ensure_interactive(&self, message: &str) -> Result<()> {
        if self.non_interactive || !std::io::stdin().is_terminal() {
            return Err(ProvisionerError::PromptUnavailable(format!(
                "Prompt requires an interactive terminal: {message}"
            ))
            .into());
        }
        Ok(())
    }
}

impl Prompter for CliclackPrompter {
    fn prompt_for_enter(&self, message: &str) -> Result<()> {
        if self.dry_run || self.auto_prompt {
            debug!(message, "Skipping ENTER prompt");
            return Ok(());
        }
        self.ensure_interactive(message)?;
        cliclack::input(message)
            .placeholder("Press ENTER to continue")
            .required(false)
            .interact::<String>()
            .context("Failed to read confirmation")?;
        Ok(())
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        if self.dry_run || self.auto_prompt {
            return Ok(true);
        }
        self.ensure_interactive(message)?;
        cliclack::confirm(message)
            .initial_value(default)
            .interact()
            .context("Failed to read confirmation")
    }

    fn input(&self, message: &str, default: Option<&str>, redact: bool) -> Result<String> {
        if self.dry_run {
            return Ok(DRY_RUN_RESPONSE.to_string());
        }
        if self.auto_prompt
            && let Some(default) = default
        {
            return Ok(default.to_string());
        }
        self.ensure_interactive(message)?;

        if redact {
            return cliclack::password(message)
                .mask('▪')
                .interact()
                .context("Failed to read input");
        }

        let mut prompt = cliclack::input(message);
        if let Some(default) = default {
            prompt = prompt.default_input(default);
        }
        prompt.interact::<String>().context("Failed to read input")
    }

    fn select_single(&self, message: &str, options: &[String]) -> Result<Option<String>> {
        if self.dry_run {
            return Ok(Some(DRY_RUN_RESPONSE.to_string()));
        }
        if options.is_empty() {
            return Ok(None);
        }
        self.ensure_interactive(message)?;

        let mut select = cliclack::select(message);
        for option in options {
            select = select.item(option.clone(), option, "");
        }
        select
            .interact()
            .map(Some)
            .context("Failed to read selection")
    }

    fn select_multiple(&self, message: &str, options: &[String]) -> Result<Vec<String>> {
        if self.dry_run {
            return Ok(vec![DRY_RUN_RESPONSE.to_string()]);
        }
        if options.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_interactive(message)?;

        let mut select = cliclack::multiselect(message).required(false);
        for option in options {
            select = select.item(option.clone(), option, "");
        }
        select.interact().context("Failed to read selection")
    }
}
