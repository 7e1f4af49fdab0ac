use crate::error::CommonError;
use flate2::read::GzDecoder;
use lzma_rs::xz_decompress;
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use tar::Archive;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    TarGz,
    TarXz,
    Tar,
    Zip,
    /// A single xz-compressed file such as `raspios.img.xz`.
    Xz,
    Raw,
}

pub fn detect_archive_type(name: &str) -> ArchiveType {
    let lower = name.to_lowercase();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        ArchiveType::TarGz
    } else if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
        ArchiveType::TarXz
    } else if lower.ends_with(".tar") {
        ArchiveType::Tar
    } else if lower.ends_with(".zip") {
        ArchiveType::Zip
    } else if lower.ends_with(".xz") {
        ArchiveType::Xz
    } else {
        ArchiveType::Raw
    }
}

/// Returns true when the file name carries a supported archive extension.
pub fn is_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| detect_archive_type(name) != ArchiveType::Raw)
        .unwrap_or(false)
}

/// Unpack `archive_path` into `target_dir`, returning the list of regular files written.
pub fn unpack_archive(archive_path: &Path, target_dir: &Path) -> Result<Vec<PathBuf>, CommonError> {
    let name = archive_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    fs::create_dir_all(target_dir)?;
    let file = File::open(archive_path)?;

    match detect_archive_type(name) {
        ArchiveType::TarGz => {
            let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
            extract_tar_entries(&mut archive, target_dir)
        }
        ArchiveType::TarXz => {
            let mut decompressed = Vec::new();
            xz_decompress(&mut BufReader::new(file), &mut decompressed)
                .map_err(|err| CommonError::Archive(err.to_string()))?;
            let mut archive = Archive::new(Cursor::new(decompressed));
            extract_tar_entries(&mut archive, target_dir)
        }
        ArchiveType::Tar => {
            let mut archive = Archive::new(BufReader::new(file));
            extract_tar_entries(&mut archive, target_dir)
        }
        ArchiveType::Zip => extract_zip_entries(file, target_dir),
        ArchiveType::Xz => {
            let out_path = target_dir.join(&name[..name.len() - ".xz".len()]);
            let mut output = File::create(&out_path)?;
            xz_decompress(&mut BufReader::new(file), &mut output)
                .map_err(|err| CommonError::Archive(err.to_string()))?;
            Ok(vec![out_path])
        }
        ArchiveType::Raw => Err(CommonError::UnsupportedArchive(name.to_string())),
    }
}

pub fn set_executable(path: &Path) -> Result<(), CommonError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

fn extract_tar_entries<R: Read>(
    archive: &mut Archive<R>,
    target_dir: &Path,
) -> Result<Vec<PathBuf>, CommonError> {
    let mut extracted = Vec::new();

    for entry in archive
        .entries()
        .map_err(|err| CommonError::Archive(err.to_string()))?
    {
        let mut entry = entry.map_err(|err| CommonError::Archive(err.to_string()))?;
        let entry_path = entry
            .path()
            .map_err(|err| CommonError::Archive(err.to_string()))?
            .to_path_buf();
        let is_file = entry.header().entry_type().is_file();

        // unpack_in refuses entries that would escape target_dir
        let unpacked = entry
            .unpack_in(target_dir)
            .map_err(|err| CommonError::Archive(err.to_string()))?;

        if unpacked && is_file {
            extracted.push(target_dir.join(entry_path));
        }
    }

    Ok(extracted)
}

fn extract_zip_entries(file: File, target_dir: &Path) -> Result<Vec<PathBuf>, CommonError> {
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|err| CommonError::Archive(err.to_string()))?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|err| CommonError::Archive(err.to_string()))?;
        let Some(enclosed) = file.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let out_path = target_dir.join(enclosed);

        if file.name().ends_with('/') {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&out_path)?;
        std::io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))?;
        }

        extracted.push(out_path);
    }

    Ok(extracted)
}
