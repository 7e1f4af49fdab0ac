//! Installing utilities on this machine.

use super::utility::{ActiveInstallSource, Utility};
use super::{InstallerEnv, github};
use crate::ansible::PlaybookRun;
use crate::chain::Step;
use crate::command_runner::CommandOptions;
use crate::remote::AnsibleHost;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where an install left the utility.
#[derive(Debug, Clone)]
struct Installed {
    utility: Utility,
    /// Stable path of the published binary, for GitHub installs.
    binary_path: Option<PathBuf>,
    output: Option<String>,
}

pub fn install_utilities<'a>(env: &'a InstallerEnv, utilities: Vec<Utility>) -> Step<'a, Vec<Utility>> {
    Step::of(utilities).for_each(move |utility| install_utility(env, utility))
}

fn install_utility<'a>(env: &'a InstallerEnv, utility: Utility) -> Step<'a, Utility> {
    let checks = env.collaborators.checks();
    let printer = env.collaborators.printer();

    Step::of(utility)
        .map(move |utility| {
            let installed = checks.is_tool_exist(&utility.binary_name);
            debug!(utility = %utility.binary_name, installed, "Checked local installation");
            (utility, installed)
        })
        .if_then_else(
            |(_, installed)| *installed && !env.args.force,
            move |(utility, _)| {
                printer.info(&format!(
                    "Utility already installed locally. name: {}",
                    utility.binary_name
                ));
                Step::empty()
            },
            move |(utility, installed)| {
                if installed {
                    env.collaborators.printer().info("Force reinstalling utility");
                }
                Step::of(utility)
            },
        )
        .flat_map(move |utility| show_pre_install_summary(env, utility))
        .flat_map(move |utility| dispatch_install(env, utility))
        .flat_map(move |installed| post_install(env, installed))
}

fn show_pre_install_summary<'a>(env: &'a InstallerEnv, utility: Utility) -> Step<'a, Utility> {
    Step::effect(move || {
        let collaborators = &env.collaborators;
        collaborators.summary().show_summary_and_prompt_for_enter(
            &format!("Installing Utility: {}", utility.display_name),
            collaborators.printer().as_ref(),
            collaborators.prompter().as_ref(),
        )?;
        Ok(utility)
    })
}

fn dispatch_install<'a>(env: &'a InstallerEnv, utility: Utility) -> Step<'a, Installed> {
    info!(utility = %utility.display_name, source = %utility.active_source, "Installing utility");
    match utility.active_source {
        ActiveInstallSource::Callback => Step::effect(move || {
            let callback = utility.callback()?;
            let output = (callback.install_fn)(
                utility.version.as_deref(),
                &env.collaborators,
                utility.maybe_args.as_ref(),
            )?;
            Ok(Installed {
                utility,
                binary_path: None,
                output: Some(output),
            })
        })
        .named("install_from_callback"),
        ActiveInstallSource::Script => Step::effect(move || {
            let script = &utility.script()?.install_script;
            let output = env
                .collaborators
                .command_runner()
                .run_shell(script, &CommandOptions::default())?;
            Ok(Installed {
                utility,
                binary_path: None,
                output: Some(output),
            })
        })
        .named("install_from_script"),
        ActiveInstallSource::Ansible => Step::effect(move || {
            let output = run_local_playbook(env, &utility)?;
            Ok(Installed {
                utility,
                binary_path: None,
                output: Some(output),
            })
        })
        .named("install_from_ansible"),
        ActiveInstallSource::GitHub => github::install_from_github(env, utility).map(|(utility, path)| {
            Installed {
                utility,
                binary_path: Some(path),
                output: None,
            }
        }),
    }
}

fn run_local_playbook(env: &InstallerEnv, utility: &Utility) -> Result<String> {
    let source = utility.ansible()?;
    let mut ansible_vars = utility
        .maybe_args
        .as_ref()
        .map(|args| args.as_ansible_vars())
        .unwrap_or_default();
    ansible_vars.extend(source.ansible_vars.iter().cloned());
    ansible_vars.push(format!(
        "git_access_token={}",
        env.collaborators.git_access_token().unwrap_or_default()
    ));

    let request = PlaybookRun {
        hosts: vec![AnsibleHost::local(&whoami::username())],
        playbook: source.playbook.clone(),
        ansible_vars,
        ansible_tags: source.ansible_tags.clone(),
    };
    env.collaborators.playbook_executor().run(&request)
}

fn post_install<'a>(env: &'a InstallerEnv, installed: Installed) -> Step<'a, Utility> {
    Step::effect(move || {
        let collaborators = &env.collaborators;
        let printer = collaborators.printer();
        let Installed {
            utility,
            binary_path,
            output,
        } = installed;

        if let Some(output) = output.filter(|output| !output.trim().is_empty()) {
            printer.print(output.trim_end());
        }

        if let Some(version_args) = &utility.version_command {
            let program = binary_path
                .as_ref()
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_else(|| utility.binary_name.clone());
            let args = shlex::split(version_args).unwrap_or_default();
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            match collaborators
                .command_runner()
                .run_checked(&program, &args, &CommandOptions::default())
            {
                Ok(stdout) => printer.print(&format!("Version installed: {}", stdout.trim())),
                Err(err) => debug!(error = %err, "Could not read installed version"),
            }
        }

        let mut rows = vec![
            ("name".to_string(), utility.binary_name.clone()),
            ("version".to_string(), utility.version_label().to_string()),
        ];
        if let Some(path) = &binary_path {
            rows.push(("binary".to_string(), collaborators.context().display_path(path)));
        }
        printer.success("Successfully installed utility");
        printer.table(&rows);
        Ok(utility)
    })
}
