//! Release-artifact installs: resolve, download, unpack, publish.

use super::InstallerEnv;
use super::utility::{ActiveInstallSource, Utility};
use crate::chain::Step;
use crate::error::ProvisionerError;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct Release {
    utility: Utility,
    version: String,
    os: String,
    arch: String,
    filename: String,
}

/// Run the download pipeline and return the utility with its published path.
pub fn install_from_github<'a>(env: &'a InstallerEnv, utility: Utility) -> Step<'a, (Utility, PathBuf)> {
    Step::of(utility)
        .flat_map(move |utility| resolve_version(env, utility))
        .flat_map(move |utility| resolve_release_filename(env, utility))
        .flat_map(move |release| download(env, release))
        .flat_map(move |(release, archive)| unpack(env, release, archive))
        .flat_map(move |(release, root)| reshape_archive_root(env, release, root))
        .flat_map(move |(release, root)| publish(env, release, root))
}

fn resolve_version<'a>(env: &'a InstallerEnv, utility: Utility) -> Step<'a, Utility> {
    Step::effect(move || {
        if !utility.needs_version_lookup() {
            return Ok(utility);
        }
        if utility.active_source != ActiveInstallSource::GitHub {
            return Err(ProvisionerError::InstallerSource(format!(
                "Cannot resolve the latest version without a GitHub source. name: {}",
                utility.display_name
            ))
            .into());
        }

        let source = utility.github()?;
        let latest = env
            .collaborators
            .release_api()
            .latest_version(&source.owner, &source.repo)
            .with_context(|| format!("Failed to look up the latest {}/{} release", source.owner, source.repo))?;
        let Some(version) = latest.filter(|version| !version.is_empty()) else {
            return Err(ProvisionerError::VersionResolver(format!(
                "Failed to resolve the latest version of {}/{}",
                source.owner, source.repo
            ))
            .into());
        };
        info!(utility = %utility.display_name, version = %version, "Resolved latest version");
        let mut utility = utility;
        utility.version = Some(version);
        Ok(utility)
    })
    .named("resolve_utility_version")
}

fn resolve_release_filename<'a>(env: &'a InstallerEnv, utility: Utility) -> Step<'a, Release> {
    Step::effect(move || {
        let source = utility.github()?;
        let os_arch = &env.collaborators.context().os_arch;
        let (os, arch) = source.normalise(&os_arch.os, &os_arch.arch);
        if !source.supports(&os, &arch) {
            return Err(ProvisionerError::OsArchNotSupported {
                utility: utility.display_name.clone(),
                os_arch: format!("{os}_{arch}"),
            }
            .into());
        }
        let version = utility.version_label().to_string();
        let filename = (source.release_name_resolver)(&version, &os, &arch);
        debug!(utility = %utility.display_name, filename = %filename, "Resolved release filename");
        Ok(Release {
            utility,
            version,
            os,
            arch,
            filename,
        })
    })
    .named("resolve_release_filename")
}

fn download<'a>(env: &'a InstallerEnv, release: Release) -> Step<'a, (Release, PathBuf)> {
    Step::effect(move || {
        let collaborators = &env.collaborators;
        let source = release.utility.github()?;
        collaborators.printer().info(&format!(
            "Downloading from GitHub. owner: {}, repo: {}, name: {}, version: {}",
            source.owner, source.repo, release.filename, release.version
        ));

        let dest_dir = collaborators
            .context()
            .binaries_dir()
            .join(&release.utility.binary_name)
            .join(&release.version);
        let dest = dest_dir.join(&release.filename);

        let bar = collaborators
            .printer()
            .download_progress(&format!("Downloading {}", release.filename));
        let downloaded = match &source.alternative_base_url {
            Some(base_url) => collaborators.http_client().download_file(
                &format!("{base_url}/{}", release.filename),
                &dest,
                true,
                Some(&bar),
            ),
            None => collaborators.release_api().download_release_binary(
                &source.owner,
                &source.repo,
                &release.version,
                &release.filename,
                &dest_dir,
                Some(&bar),
            ),
        };
        bar.finish_and_clear();
        let downloaded = downloaded.with_context(|| format!("Failed to download {}", release.filename))?;
        debug!(path = %downloaded.display(), "Downloaded release artifact");
        Ok((release, downloaded))
    })
    .named("download_binary")
}

fn unpack<'a>(env: &'a InstallerEnv, release: Release, archive: PathBuf) -> Step<'a, (Release, PathBuf)> {
    Step::effect(move || {
        let collaborators = &env.collaborators;
        let fs = collaborators.file_system();
        let root = archive
            .parent()
            .map(Path::to_path_buf)
            .with_context(|| format!("Download has no parent directory: {}", archive.display()))?;
        if fs.is_archive(&archive) {
            fs.unpack_archive(&archive, &root)?;
        }
        collaborators.printer().info(&format!(
            "Unpacked Utility. path: {}",
            collaborators.context().display_path(&root)
        ));
        Ok((release, root))
    })
    .named("unpack_archive")
}

fn reshape_archive_root<'a>(
    env: &'a InstallerEnv,
    release: Release,
    root: PathBuf,
) -> Step<'a, (Release, PathBuf)> {
    Step::effect(move || {
        let source = release.utility.github()?;
        if let Some(nested) = &source.archive_nested_binary_path {
            let nested = root.join(nested(&release.version, &release.os, &release.arch));
            let target = root.join(&release.utility.binary_name);
            if nested != target {
                env.collaborators.file_system().copy(&nested, &target)?;
            }
        }
        Ok((release, root))
    })
    .named("reshape_archive_root")
}

fn publish<'a>(env: &'a InstallerEnv, release: Release, root: PathBuf) -> Step<'a, (Utility, PathBuf)> {
    Step::effect(move || {
        let collaborators = &env.collaborators;
        let fs = collaborators.file_system();
        let binary = root.join(&release.utility.binary_name);
        let link = collaborators
            .context()
            .bin_dir()
            .join(&release.utility.binary_name);
        fs.set_executable(&binary)?;
        fs.symlink(&binary, &link)?;
        info!(binary = %binary.display(), link = %link.display(), "Published utility");

        let mut utility = release.utility;
        utility.version = Some(release.version);
        Ok((utility, link))
    })
    .named("publish_symlink")
}
