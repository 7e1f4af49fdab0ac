//! Error kinds surfaced at the CLI boundary.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionerError {
    #[error("Utility is not supported: {name}")]
    InstallerUtilityNotSupported { name: String },

    #[error("{0}")]
    InstallerSource(String),

    #[error("{0}")]
    VersionResolver(String),

    #[error("Utility {utility} does not support OS/arch {os_arch}")]
    OsArchNotSupported { utility: String, os_arch: String },

    #[error("Missing required utility: {0}")]
    MissingUtility(String),

    #[error("{0}")]
    FailedToReadConfigurationFile(String),

    #[error("{0}")]
    StepEvaluationFailure(String),

    #[error("Unsupported run environment: {0}")]
    UnsupportedRunEnvironment(String),

    #[error("{0}")]
    PromptUnavailable(String),
}

impl ProvisionerError {
    /// Stable tag printed in the critical line.
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionerError::InstallerUtilityNotSupported { .. } => "InstallerUtilityNotSupported",
            ProvisionerError::InstallerSource(_) => "InstallerSourceError",
            ProvisionerError::VersionResolver(_) => "VersionResolverError",
            ProvisionerError::OsArchNotSupported { .. } => "OsArchNotSupported",
            ProvisionerError::MissingUtility(_) => "MissingUtility",
            ProvisionerError::FailedToReadConfigurationFile(_) => "FailedToReadConfigurationFile",
            ProvisionerError::StepEvaluationFailure(_) => "StepEvaluationFailure",
            ProvisionerError::UnsupportedRunEnvironment(_) => "UnsupportedRunEnvironment",
            ProvisionerError::PromptUnavailable(_) => "PromptUnavailable",
        }
    }
}

/// Fallback tag for errors that did not originate from a pipeline step.
pub const CLI_APPLICATION_EXCEPTION: &str = "CliApplicationException";

/// Name of the step an error escaped from, attached with `anyhow::Error::context`.
#[derive(Debug, Clone)]
pub struct StepLabel(pub String);

impl fmt::Display for StepLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn error_kind(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<ProvisionerError>()
        .map(ProvisionerError::kind)
        .unwrap_or(CLI_APPLICATION_EXCEPTION)
}

/// Format the single line printed for a managed failure:
/// `<step>: ex: <ErrorKind>, message: <text>`.
pub fn critical_line(default_step: &str, err: &anyhow::Error) -> String {
    let step = err
        .downcast_ref::<StepLabel>()
        .map(|label| label.0.as_str())
        .unwrap_or(default_step);
    let message = match err.downcast_ref::<ProvisionerError>() {
        Some(known) => known.to_string(),
        None => err.root_cause().to_string(),
    };
    format!("{step}: ex: {}, message: {message}", error_kind(err))
}
