//! Removing locally published GitHub utilities.

use super::InstallerEnv;
use super::utility::{ActiveInstallSource, Utility};
use crate::chain::Step;
use crate::error::ProvisionerError;
use tracing::info;

pub fn uninstall_utilities<'a>(env: &'a InstallerEnv, utilities: Vec<Utility>) -> Step<'a, Vec<Utility>> {
    Step::of(utilities).for_each(move |utility| uninstall_utility(env, utility))
}

fn uninstall_utility<'a>(env: &'a InstallerEnv, utility: Utility) -> Step<'a, Utility> {
    Step::effect(move || {
        if utility.active_source != ActiveInstallSource::GitHub {
            return Err(ProvisionerError::InstallerSource(format!(
                "Uninstall is only supported for GitHub sourced utilities. name: {}, source: {}",
                utility.display_name, utility.active_source
            ))
            .into());
        }

        let collaborators = &env.collaborators;
        let ctx = collaborators.context();
        let printer = collaborators.printer();
        let fs = collaborators.file_system();

        printer.info(&format!("Uninstalling utility: {}", utility.display_name));
        let link = ctx.bin_dir().join(&utility.binary_name);
        printer.info(&format!("Removing symlink at {}", link.display()));
        fs.remove_file(&link)?;

        let binaries = ctx.binaries_dir().join(&utility.binary_name);
        printer.info(&format!("Removing binary directory at {}", binaries.display()));
        fs.remove_dir_all(&binaries)?;

        info!(utility = %utility.display_name, "Uninstalled utility");
        Ok(utility)
    })
    .named("uninstall_utility")
}
