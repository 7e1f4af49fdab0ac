//! Blocking HTTP downloads with verify-already-downloaded semantics.

use crate::error::ReleaseError;
use crate::DRY_RUN_RESPONSE;
use indicatif::ProgressBar;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, USER_AGENT};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Timeout applied to metadata lookups and small GETs.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout applied to artifact downloads.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub trait HttpClient: Send + Sync {
    /// GET `url` and return the body as text.
    fn get_text(&self, url: &str, timeout: Duration) -> Result<String, ReleaseError>;

    /// Download `url` into `dest`, returning the final path.
    ///
    /// With `verify_already_downloaded`, an existing `dest` is kept unless the
    /// server reports a different size.
    fn download_file(
        &self,
        url: &str,
        dest: &Path,
        verify_already_downloaded: bool,
        progress: Option<&ProgressBar>,
    ) -> Result<PathBuf, ReleaseError>;
}

pub struct BlockingHttpClient {
    client: Client,
    dry_run: bool,
}

impl BlockingHttpClient {
    pub fn new(dry_run: bool) -> Self {
        let client = Client::builder()
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(client, dry_run)
    }

    pub fn with_client(client: Client, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    fn remote_size(&self, url: &str) -> Option<u64> {
        let response = self
            .client
            .head(url)
            .header(USER_AGENT, "provisioner")
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
    }

    fn is_already_downloaded(&self, url: &str, dest: &Path) -> bool {
        let Ok(metadata) = fs::metadata(dest) else {
            return false;
        };
        if !metadata.is_file() || metadata.len() == 0 {
            return false;
        }

        // Partial downloads never reach `dest`, so an unknown remote size keeps the file.
        match self.remote_size(url) {
            Some(size) => size == metadata.len(),
            None => true,
        }
    }
}

impl HttpClient for BlockingHttpClient {
    fn get_text(&self, url: &str, timeout: Duration) -> Result<String, ReleaseError> {
        if self.dry_run {
            debug!(url, "dry-run: skipping GET");
            return Ok(DRY_RUN_RESPONSE.to_string());
        }

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, "provisioner")
            .timeout(timeout)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(ReleaseError::Network(format!("GET {url}: status {status}: {body}")));
        }

        Ok(response.text()?)
    }

    fn download_file(
        &self,
        url: &str,
        dest: &Path,
        verify_already_downloaded: bool,
        progress: Option<&ProgressBar>,
    ) -> Result<PathBuf, ReleaseError> {
        if self.dry_run {
            debug!(url, dest = %dest.display(), "dry-run: skipping download");
            return Ok(dest.to_path_buf());
        }

        if verify_already_downloaded && self.is_already_downloaded(url, dest) {
            info!(dest = %dest.display(), "file already downloaded, skipping");
            return Ok(dest.to_path_buf());
        }

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, "provisioner")
            .timeout(DOWNLOAD_TIMEOUT)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ReleaseError::Network(format!("GET {url}: status {status}")));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let file_name = dest
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ReleaseError::Parse(format!("invalid destination {}", dest.display())))?;
        let partial = dest.with_file_name(format!("{file_name}.part"));

        let mut response = response;
        let file = File::create(&partial)?;
        match progress {
            Some(bar) => {
                if let Some(total) = response.content_length() {
                    bar.set_length(total);
                }
                let mut writer = bar.wrap_write(file);
                response.copy_to(&mut writer)?;
            }
            None => {
                let mut file = file;
                response.copy_to(&mut file)?;
            }
        }

        fs::rename(&partial, dest)?;
        info!(url, dest = %dest.display(), "downloaded file");
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn download_writes_destination() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/helm-v3.14.0-linux-amd64.tar.gz")
            .with_status(200)
            .with_body("archive-bytes")
            .create();

        let dir = tempdir().unwrap();
        let dest = dir.path().join("v3.14.0").join("helm-v3.14.0-linux-amd64.tar.gz");
        let client = BlockingHttpClient::new(false);

        let path = client
            .download_file(
                &format!("{}/helm-v3.14.0-linux-amd64.tar.gz", server.url()),
                &dest,
                true,
                None,
            )
            .unwrap();

        mock.assert();
        assert_eq!(path, dest);
        assert_eq!(fs::read(&dest).unwrap(), b"archive-bytes");
        assert!(!dest.with_file_name("helm-v3.14.0-linux-amd64.tar.gz.part").exists());
    }

    #[test]
    fn existing_download_is_not_fetched_again() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/tool").expect(0).create();

        let dir = tempdir().unwrap();
        let dest = dir.path().join("tool");
        fs::write(&dest, b"cached").unwrap();

        let client = BlockingHttpClient::new(false);
        client
            .download_file(&format!("{}/tool", server.url()), &dest, true, None)
            .unwrap();

        mock.assert();
        assert_eq!(fs::read(&dest).unwrap(), b"cached");
    }

    #[test]
    fn failed_status_is_an_error() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/missing").with_status(404).create();

        let dir = tempdir().unwrap();
        let client = BlockingHttpClient::new(false);
        let err = client
            .download_file(
                &format!("{}/missing", server.url()),
                &dir.path().join("missing"),
                false,
                None,
            )
            .unwrap_err();

        assert!(matches!(err, ReleaseError::Network(_)));
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn dry_run_performs_no_io() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("never");
        let client = BlockingHttpClient::new(true);

        let path = client
            .download_file("http://127.0.0.1:9/never", &dest, true, None)
            .unwrap();
        assert_eq!(path, dest);
        assert!(!dest.exists());
        assert_eq!(
            client.get_text("http://127.0.0.1:9/", LOOKUP_TIMEOUT).unwrap(),
            DRY_RUN_RESPONSE
        );
    }
}
