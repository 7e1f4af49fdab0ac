use crate::error::CommonError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash a file without loading it into memory.
pub fn sha256_file(path: &Path) -> Result<String, CommonError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare a file against an expected sha256 digest.
pub fn verify_file(path: &Path, expected: &str) -> Result<(), CommonError> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        return Ok(());
    }

    Err(CommonError::ChecksumMismatch {
        filename: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        expected: expected.trim().to_lowercase(),
        actual,
    })
}

pub fn parse_checksum_file(content: &str) -> HashMap<String, String> {
    let mut checksums = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((algo, rest)) = line.split_once('(') {
            if algo.trim().eq_ignore_ascii_case("sha256") {
                if let Some((file_part, hash_part)) = rest.split_once(')') {
                    if let Some((_, hash)) = hash_part.split_once('=') {
                        let filename = file_part.trim().trim_start_matches("./");
                        let hash = hash.trim();
                        if !filename.is_empty() && !hash.is_empty() {
                            checksums.insert(filename.to_string(), hash.to_lowercase());
                            continue;
                        }
                    }
                }
            }
        }

        let mut parts = line.split_whitespace();
        let Some(hash) = parts.next() else {
            continue;
        };
        // single-file `.sha256` assets often carry only the digest
        let filename = parts.next().unwrap_or("");

        let filename = filename.trim_start_matches('*').trim_start_matches("./");
        checksums.insert(filename.to_string(), hash.to_lowercase());
    }

    checksums
}
