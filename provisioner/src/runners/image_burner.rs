//! `single-board raspberry-pi os burn-image`: write an OS image to removable media.
//!
//! Device discovery and the raw write stay with the platform tools (`lsblk` or
//! `diskutil`, then `dd`); this module only strings them together.

use crate::chain::Step;
use crate::collaborators::Collaborators;
use crate::command_runner::CommandOptions;
use crate::config::ProvisionerConfig;
use crate::error::ProvisionerError;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_IMAGE_BITS: &str = "64bit";

#[derive(Debug, Clone, Default)]
pub struct BurnImageArgs {
    pub image_download_url: Option<String>,
    /// `32bit` or `64bit`, selecting `plugins.single_board.os.raspbian.download_url.<bits>`.
    pub image_bits: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    pub path: String,
    pub description: String,
}

/// Parse `lsblk -p -d -n -o NAME,SIZE,TYPE,MODEL`, keeping whole disks.
pub fn parse_lsblk(output: &str) -> Vec<BlockDevice> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            (fields.len() >= 3 && fields[2] == "disk").then(|| BlockDevice {
                path: fields[0].to_string(),
                description: line.trim().to_string(),
            })
        })
        .collect()
}

/// Parse the `/dev/diskN (external, physical):` headers of `diskutil list`.
pub fn parse_diskutil(output: &str) -> Vec<BlockDevice> {
    output
        .lines()
        .filter(|line| line.starts_with("/dev/disk"))
        .filter_map(|line| {
            let path = line.split_whitespace().next()?;
            Some(BlockDevice {
                path: path.to_string(),
                description: line.trim().trim_end_matches(':').to_string(),
            })
        })
        .collect()
}

pub fn resolve_download_url(args: &BurnImageArgs, config: &ProvisionerConfig) -> Result<String> {
    if let Some(url) = args.image_download_url.as_ref().filter(|url| !url.is_empty()) {
        return Ok(url.clone());
    }
    let bits = args.image_bits.as_deref().unwrap_or(DEFAULT_IMAGE_BITS);
    config
        .plugin_str(&format!("single_board.os.raspbian.download_url.{bits}"))
        .ok_or_else(|| {
            ProvisionerError::StepEvaluationFailure(format!(
                "No image download URL configured for {bits}"
            ))
            .into()
        })
}

/// Returns `false` when the user backed out before anything was written.
pub fn run(collaborators: &Collaborators, args: &BurnImageArgs, config: &ProvisionerConfig) -> Result<bool> {
    let outcome = Step::effect(move || check_prerequisites(collaborators))
        .named("check_prerequisites")
        .flat_map(move |_| list_block_devices(collaborators))
        .flat_map(move |devices| select_block_device(collaborators, devices))
        .flat_map(move |device| confirm_burn(collaborators, device))
        .flat_map(move |device| {
            Step::effect(move || resolve_download_url(args, config))
                .named("resolve_image_url")
                .flat_map(move |url| download_image(collaborators, url))
                .map(move |image| (device, image))
        })
        .flat_map(move |(device, image)| {
            unpack_image(collaborators, image).map(move |image| (device, image))
        })
        .flat_map(move |(device, image)| burn_image(collaborators, device, image))
        .evaluate();
    Ok(outcome.into_result()?.is_some())
}

fn check_prerequisites(collaborators: &Collaborators) -> Result<()> {
    let os_arch = &collaborators.context().os_arch;
    if !os_arch.is_linux() && !os_arch.is_darwin() {
        return Err(ProvisionerError::OsArchNotSupported {
            utility: "burn-image".to_string(),
            os_arch: os_arch.pair(),
        }
        .into());
    }
    collaborators.checks().require_tool("dd")
}

fn list_block_devices(collaborators: &Collaborators) -> Step<'_, Vec<BlockDevice>> {
    Step::effect(move || {
        let runner = collaborators.command_runner();
        let options = CommandOptions::default();
        let devices = if collaborators.context().os_arch.is_darwin() {
            parse_diskutil(&runner.run_checked("diskutil", &["list", "external", "physical"], &options)?)
        } else {
            parse_lsblk(&runner.run_checked("lsblk", &["-p", "-d", "-n", "-o", "NAME,SIZE,TYPE,MODEL"], &options)?)
        };
        debug!(count = devices.len(), "Listed block devices");
        Ok(devices)
    })
    .named("list_block_devices")
}

fn select_block_device(collaborators: &Collaborators, devices: Vec<BlockDevice>) -> Step<'_, String> {
    Step::effect_optional(move || {
        let dry_run = collaborators.context().dry_run;
        if devices.is_empty() && !dry_run {
            warn!("No block devices found");
            collaborators.printer().warning("No block devices found, is the media inserted?");
            return Ok(None);
        }
        let options: Vec<String> = devices.iter().map(|device| device.description.clone()).collect();
        let selected = collaborators
            .prompter()
            .select_single("Please select a block device to burn the image to", &options)?;
        let Some(selected) = selected else {
            return Ok(None);
        };
        let path = devices
            .iter()
            .find(|device| device.description == selected)
            .map(|device| device.path.clone())
            .unwrap_or(selected);
        collaborators.summary().append("Block Device", &path);
        Ok(Some(path))
    })
    .named("select_block_device")
}

fn confirm_burn(collaborators: &Collaborators, device: String) -> Step<'_, String> {
    Step::effect_optional(move || {
        let question = format!("All data on {device} will be erased. Continue?");
        if collaborators.prompter().confirm(&question, false)? {
            Ok(Some(device))
        } else {
            collaborators.printer().warning("Aborted, nothing was written");
            Ok(None)
        }
    })
    .named("confirm_burn")
}

fn download_image(collaborators: &Collaborators, url: String) -> Step<'_, PathBuf> {
    Step::effect(move || {
        let filename = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("image.img");
        let dest = collaborators.context().config_dir().join("images").join(filename);
        collaborators
            .printer()
            .info(&format!("Downloading image. url: {url}"));
        let bar = collaborators.printer().download_progress(&format!("Downloading {filename}"));
        let downloaded = collaborators.http_client().download_file(&url, &dest, true, Some(&bar));
        bar.finish_and_clear();
        let downloaded = downloaded.with_context(|| format!("Failed to download {url}"))?;
        info!(path = %downloaded.display(), "Downloaded image");
        Ok(downloaded)
    })
    .named("download_image")
}

fn unpack_image(collaborators: &Collaborators, image: PathBuf) -> Step<'_, PathBuf> {
    Step::effect(move || {
        let fs = collaborators.file_system();
        if !fs.is_archive(&image) {
            return Ok(image);
        }
        if collaborators.context().dry_run {
            let unpacked = unpacked_image_path(&image);
            debug!(path = %unpacked.display(), "dry-run: assuming unpacked image");
            return Ok(unpacked);
        }
        let dir = image.parent().map(Path::to_path_buf).unwrap_or_default();
        let files = fs.unpack_archive(&image, &dir)?;
        let unpacked = files
            .iter()
            .find(|file| file.extension().is_some_and(|ext| ext == "img"))
            .or_else(|| files.first())
            .cloned()
            .with_context(|| format!("Archive contained no image: {}", image.display()))?;
        collaborators.printer().info(&format!(
            "Unpacked image. path: {}",
            collaborators.context().display_path(&unpacked)
        ));
        Ok(unpacked)
    })
    .named("unpack_image")
}

/// `raspios.img.xz` unpacks to `raspios.img`, `raspios.tar.gz` to `raspios`.
fn unpacked_image_path(archive: &Path) -> PathBuf {
    let stripped = archive.with_extension("");
    if stripped.extension().is_some_and(|ext| ext == "tar") {
        stripped.with_extension("")
    } else {
        stripped
    }
}

fn burn_image(collaborators: &Collaborators, device: String, image: PathBuf) -> Step<'_, ()> {
    Step::effect(move || {
        let runner = collaborators.command_runner();
        let options = CommandOptions::default();
        let input = format!("if={}", image.display());
        let output = format!("of={device}");
        if collaborators.context().os_arch.is_darwin() {
            runner.run_checked("diskutil", &["unmountDisk", &device], &options)?;
            runner.run_checked("sudo", &["dd", &input, &output, "bs=4m"], &options)?;
        } else {
            runner.run_checked("sudo", &["dd", &input, &output, "bs=4M", "conv=fsync", "status=progress"], &options)?;
        }
        runner.run_checked("sync", &[], &options)?;
        info!(device = %device, "Burned image");
        collaborators
            .printer()
            .success(&format!("Image burned successfully. device: {device}"));
        Ok(())
    })
    .named("burn_image")
}
