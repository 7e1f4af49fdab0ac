//! The installer pipeline.
//!
//! [`run`] validates the requested utilities against the registry, settles
//! the run environment and hands every utility to the local or remote leaf.
//! All steps are [`Step`]s evaluated once at the end of `run`.

pub mod github;
pub mod local;
pub mod remote;
pub mod uninstall;
pub mod utility;

use crate::chain::{Outcome, Step};
use crate::collaborators::Collaborators;
use crate::error::ProvisionerError;
use crate::remote::{RemoteOpts, RunEnvironment};
use crate::summary::SummaryObject;
use anyhow::Result;
use provisioner_release::DRY_RUN_RESPONSE;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub use utility::{
    ActiveInstallSource, AnsibleSource, DynamicArgs, GithubSource, NameVersionArgs, Utility,
};

/// Plugin name forwarded to remote re-invocations.
pub const INSTALLERS_PLUGIN: &str = "installers";

#[derive(Debug, Clone, Default)]
pub struct InstallerArgs {
    pub utilities: Vec<NameVersionArgs>,
    /// CLI path below `install`, e.g. `cli` or `k8s distro`.
    pub sub_command_name: String,
    pub remote_opts: RemoteOpts,
    pub force: bool,
    pub uninstall: bool,
}

pub struct InstallerEnv {
    pub collaborators: Collaborators,
    pub args: InstallerArgs,
    pub supported_utilities: BTreeMap<String, Utility>,
}

impl InstallerEnv {
    pub fn new(
        collaborators: Collaborators,
        args: InstallerArgs,
        supported_utilities: BTreeMap<String, Utility>,
    ) -> Self {
        Self {
            collaborators,
            args,
            supported_utilities,
        }
    }
}

/// Install (or uninstall) every requested utility.
///
/// Returns `Ok(false)` when the pipeline finished without producing a value,
/// and the first failure otherwise.
pub fn run(env: &InstallerEnv) -> Result<bool> {
    let outcome = Step::of(env.args.utilities.clone())
        .flat_map(|requests| validate_requested_utilities(env, requests))
        .map(|requests| apply_custom_versions(env, requests))
        .flat_map(|utilities| append_summary_entries(env, utilities))
        .flat_map(|utilities| print_installer_welcome(env, utilities))
        .flat_map(|utilities| resolve_run_environment(env, utilities))
        .flat_map(|(environment, utilities)| dispatch(env, environment, utilities))
        .evaluate();

    match outcome {
        Outcome::Success(_) => Ok(true),
        Outcome::Empty => Ok(false),
        Outcome::Failure(err) => Err(err),
    }
}

fn validate_requested_utilities<'a>(
    env: &'a InstallerEnv,
    requests: Vec<NameVersionArgs>,
) -> Step<'a, Vec<NameVersionArgs>> {
    let unknown = requests
        .iter()
        .find(|request| !env.supported_utilities.contains_key(&request.name))
        .map(|request| request.name.clone());
    let misconfigured = requests
        .iter()
        .filter_map(|request| env.supported_utilities.get(&request.name))
        .find_map(|utility| utility.validate().err());
    let step = match (unknown, misconfigured) {
        (Some(name), _) => Step::fail(ProvisionerError::InstallerUtilityNotSupported { name }),
        (None, Some(err)) => Step::fail(err),
        (None, None) => Step::of(requests),
    };
    step.named("validate_requested_utilities")
}

/// Copy each registry entry, applying the requested version and arguments.
fn apply_custom_versions(env: &InstallerEnv, requests: Vec<NameVersionArgs>) -> Vec<Utility> {
    requests
        .into_iter()
        .filter_map(|request| {
            let mut utility = env.supported_utilities.get(&request.name)?.clone();
            if let Some(version) = request.version.filter(|version| !version.is_empty()) {
                debug!(utility = %request.name, version = %version, "Overriding version");
                utility.version = Some(version);
            }
            utility.maybe_args = request.dynamic_args;
            Some(utility)
        })
        .collect()
}

fn append_summary_entries<'a>(env: &'a InstallerEnv, utilities: Vec<Utility>) -> Step<'a, Vec<Utility>> {
    Step::effect(move || {
        let summary = env.collaborators.summary();
        for utility in &utilities {
            summary.append(&utility.display_name, &utility.as_summary_object(true));
        }
        Ok(utilities)
    })
}

fn print_installer_welcome<'a>(env: &'a InstallerEnv, utilities: Vec<Utility>) -> Step<'a, Vec<Utility>> {
    Step::effect(move || {
        let printer = env.collaborators.printer();
        let action = if env.args.uninstall {
            "Uninstalling"
        } else {
            "Installing"
        };
        printer.header(&format!("{action} utilities"));
        let mut rows: Vec<(String, String)> = utilities
            .iter()
            .map(|u| (u.display_name.clone(), u.version_label().to_string()))
            .collect();
        let environment = env
            .args
            .remote_opts
            .environment
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Not selected".to_string());
        rows.push(("environment".to_string(), environment));
        printer.table(&rows);
        Ok(utilities)
    })
}

fn resolve_run_environment<'a>(
    env: &'a InstallerEnv,
    utilities: Vec<Utility>,
) -> Step<'a, (RunEnvironment, Vec<Utility>)> {
    if let Some(environment) = env.args.remote_opts.environment {
        return Step::of((environment, utilities));
    }

    Step::effect(move || {
        let summary = env.collaborators.summary();
        let prompter = env.collaborators.prompter();
        let environment = summary.append_result("Run Environment", || {
            let selected = prompter
                .select_single("Please choose a running environment", &RunEnvironment::variants())?;
            match selected.as_deref() {
                Some("Local") => Ok(RunEnvironment::Local),
                Some("Remote") | Some(DRY_RUN_RESPONSE) => Ok(RunEnvironment::Remote),
                Some(other) => Err(ProvisionerError::UnsupportedRunEnvironment(other.to_string()).into()),
                None => Err(ProvisionerError::StepEvaluationFailure(
                    "No run environment was selected".to_string(),
                )
                .into()),
            }
        })?;
        Ok((environment, utilities))
    })
    .named("resolve_run_environment")
}

fn dispatch<'a>(
    env: &'a InstallerEnv,
    environment: RunEnvironment,
    utilities: Vec<Utility>,
) -> Step<'a, Vec<Utility>> {
    info!(environment = %environment, count = utilities.len(), "Running installer");
    match (environment, env.args.uninstall) {
        (RunEnvironment::Local, false) => local::install_utilities(env, utilities),
        (RunEnvironment::Local, true) => uninstall::uninstall_utilities(env, utilities),
        (RunEnvironment::Remote, _) => remote::install_utilities(env, utilities),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, OsArch};
    use crate::error::error_kind;
    use crate::testing::{FakePrinter, FakePrompter};
    use std::sync::Arc;

    fn registry() -> BTreeMap<String, Utility> {
        let utility = Utility::new("rustup", "rustup", "Rust toolchain installer", ActiveInstallSource::Script)
            .with_script("echo installing rustup");
        BTreeMap::from([("rustup".to_string(), utility)])
    }

    fn env_with(args: InstallerArgs, prompter: FakePrompter, printer: FakePrinter) -> InstallerEnv {
        let ctx = Context::builder()
            .home_dir("/tmp/provisioner-test-home")
            .os_arch(OsArch::new("linux", "amd64", ""))
            .dry_run(true)
            .build()
            .unwrap();
        let collaborators = Collaborators::new(ctx)
            .with_prompter(Arc::new(prompter))
            .with_printer(Arc::new(printer));
        InstallerEnv::new(collaborators, args, registry())
    }

    #[test]
    fn test_unknown_utility_is_rejected() {
        let env = env_with(
            InstallerArgs {
                utilities: vec![NameVersionArgs::parse("unknown-tool")],
                ..Default::default()
            },
            FakePrompter::new(),
            FakePrinter::new(),
        );
        let err = run(&env).unwrap_err();
        assert_eq!(error_kind(&err), "InstallerUtilityNotSupported");
        assert!(err.to_string().contains("validate_requested_utilities"));
    }

    #[test]
    fn test_utility_without_its_active_source_is_rejected() {
        let mut env = env_with(
            InstallerArgs {
                utilities: vec![NameVersionArgs::parse("broken")],
                ..Default::default()
            },
            FakePrompter::new(),
            FakePrinter::new(),
        );
        env.supported_utilities.insert(
            "broken".to_string(),
            Utility::new("broken", "broken", "No release source", ActiveInstallSource::GitHub),
        );

        let err = run(&env).unwrap_err();
        assert_eq!(error_kind(&err), "InstallerSourceError");
        assert!(format!("{err:#}").contains("Missing"));
        assert!(env.collaborators.summary().entries().is_empty());
    }

    #[test]
    fn test_custom_version_and_args_are_applied() {
        let env = env_with(InstallerArgs::default(), FakePrompter::new(), FakePrinter::new());
        let requests = vec![NameVersionArgs::parse("rustup@1.27.1")
            .with_dynamic_args(DynamicArgs::new().with("profile", "minimal"))];
        let utilities = apply_custom_versions(&env, requests);
        assert_eq!(utilities[0].version.as_deref(), Some("1.27.1"));
        assert_eq!(
            utilities[0].maybe_args.as_ref().and_then(|a| a.get("profile")),
            Some("minimal")
        );
    }

    #[test]
    fn test_environment_prompt_is_recorded_in_summary() {
        let prompter = FakePrompter::new().with_selection(Some("Local"));
        let env = env_with(
            InstallerArgs {
                utilities: vec![NameVersionArgs::parse("rustup")],
                ..Default::default()
            },
            prompter.clone(),
            FakePrinter::new(),
        );
        assert!(run(&env).unwrap());

        let names: Vec<String> = env
            .collaborators
            .summary()
            .entries()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["rustup", "Run Environment"]);
        assert_eq!(prompter.messages()[0], "Please choose a running environment");
    }

    #[test]
    fn test_unknown_environment_choice_fails() {
        let prompter = FakePrompter::new().with_selection(Some("Cloud"));
        let env = env_with(
            InstallerArgs {
                utilities: vec![NameVersionArgs::parse("rustup")],
                ..Default::default()
            },
            prompter,
            FakePrinter::new(),
        );
        let err = run(&env).unwrap_err();
        assert_eq!(error_kind(&err), "UnsupportedRunEnvironment");
    }
}
