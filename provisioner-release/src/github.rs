use crate::api::Release;
use crate::download::{BlockingHttpClient, HttpClient, LOOKUP_TIMEOUT};
use crate::error::ReleaseError;
use crate::DRY_RUN_RESPONSE;
use indicatif::ProgressBar;
use provisioner_common::checksum::{parse_checksum_file, verify_file};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Upstream release lookups and artifact downloads for an `(owner, repo)` pair.
pub trait ReleaseApi: Send + Sync {
    /// Tag of the latest published release, `None` when the repository has none.
    fn latest_version(&self, owner: &str, repo: &str) -> Result<Option<String>, ReleaseError>;

    /// Download the asset `filename` of release `version` into `dest_dir`.
    fn download_release_binary(
        &self,
        owner: &str,
        repo: &str,
        version: &str,
        filename: &str,
        dest_dir: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<PathBuf, ReleaseError>;
}

pub struct GithubReleaseApi {
    client: Client,
    http: BlockingHttpClient,
    base_url: String,
    dry_run: bool,
}

impl GithubReleaseApi {
    pub fn new(dry_run: bool) -> Self {
        Self::with_base_url(GITHUB_API_URL, env::var("GITHUB_TOKEN").ok(), dry_run)
    }

    pub fn with_base_url(base_url: &str, token: Option<String>, dry_run: bool) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("provisioner"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        if let Some(token) = token.filter(|token| !token.trim().is_empty()) {
            if let Ok(value) = HeaderValue::from_str(&format!("token {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http: BlockingHttpClient::with_client(client.clone(), dry_run),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            dry_run,
        }
    }

    fn fetch_release(&self, url: &str) -> Result<Option<Release>, ReleaseError> {
        debug!(url, "fetching release metadata");
        let response = self.client.get(url).timeout(LOOKUP_TIMEOUT).send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(ReleaseError::GitHubApi(format!("status {status}: {body}")));
        }

        response
            .json::<Release>()
            .map(Some)
            .map_err(|err| ReleaseError::Parse(err.to_string()))
    }

    fn verify_checksum(
        &self,
        release: &Release,
        filename: &str,
        path: &Path,
    ) -> Result<(), ReleaseError> {
        let Some(asset) = release.find_checksum_asset(filename) else {
            return Ok(());
        };

        let content = self
            .http
            .get_text(&asset.browser_download_url, LOOKUP_TIMEOUT)?;
        let checksums = parse_checksum_file(&content);
        let expected = checksums
            .get(filename)
            .or_else(|| checksums.get(""))
            .or_else(|| (checksums.len() == 1).then(|| checksums.values().next()).flatten());

        match expected {
            Some(expected) => {
                verify_file(path, expected)?;
                info!(filename, "checksum verified");
            }
            None => warn!(filename, checksum_file = %asset.name, "no checksum entry for asset"),
        }

        Ok(())
    }
}

impl ReleaseApi for GithubReleaseApi {
    fn latest_version(&self, owner: &str, repo: &str) -> Result<Option<String>, ReleaseError> {
        if self.dry_run {
            return Ok(Some(DRY_RUN_RESPONSE.to_string()));
        }

        let url = format!("{}/repos/{owner}/{repo}/releases/latest", self.base_url);
        Ok(self
            .fetch_release(&url)?
            .map(|release| release.tag_name)
            .filter(|tag| !tag.trim().is_empty()))
    }

    fn download_release_binary(
        &self,
        owner: &str,
        repo: &str,
        version: &str,
        filename: &str,
        dest_dir: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<PathBuf, ReleaseError> {
        let dest = dest_dir.join(filename);
        if self.dry_run {
            return Ok(dest);
        }

        let url = format!(
            "{}/repos/{owner}/{repo}/releases/tags/{version}",
            self.base_url
        );
        let release = self.fetch_release(&url)?.ok_or_else(|| {
            ReleaseError::GitHubApi(format!("release {version} not found for {owner}/{repo}"))
        })?;

        let asset = release
            .find_asset(filename)
            .ok_or_else(|| ReleaseError::AssetNotFound {
                repo: format!("{owner}/{repo}"),
                version: version.to_string(),
                name: filename.to_string(),
                available: release.asset_names(),
            })?;

        if asset.browser_download_url.trim().is_empty() {
            return Err(ReleaseError::NoDownloadUrl(asset.name.clone()));
        }

        if release.find_checksum_asset(filename).is_none() {
            debug!(filename, "release publishes no checksum, skipping verification");
            return self
                .http
                .download_file(&asset.browser_download_url, &dest, true, progress);
        }

        if dest.is_file() {
            match self.verify_checksum(&release, filename, &dest) {
                Ok(()) => {
                    info!(dest = %dest.display(), "verified download already present, skipping");
                    return Ok(dest);
                }
                Err(err) => {
                    warn!(dest = %dest.display(), error = %err, "discarding unverified download");
                    fs::remove_file(&dest)?;
                }
            }
        }

        // Only verified content is ever renamed into `dest`.
        let staging = dest_dir.join(format!("{filename}.unverified"));
        let staged = self
            .http
            .download_file(&asset.browser_download_url, &staging, false, progress)?;
        if let Err(err) = self.verify_checksum(&release, filename, &staged) {
            if let Err(remove_err) = fs::remove_file(&staged) {
                warn!(path = %staged.display(), error = %remove_err, "failed to remove unverified download");
            }
            return Err(err);
        }
        fs::rename(&staged, &dest)?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provisioner_common::checksum::sha256_hex;
    use tempfile::tempdir;

    fn release_json(server_url: &str, with_checksum: bool) -> String {
        let checksum = if with_checksum {
            format!(
                r#",{{"name": "checksums.txt", "browser_download_url": "{server_url}/download/checksums.txt", "size": 80}}"#
            )
        } else {
            String::new()
        };
        format!(
            r#"{{
                "tag_name": "v0.10.0",
                "assets": [
                    {{"name": "anchor-v0.10.0-macos", "browser_download_url": "{server_url}/download/anchor-v0.10.0-macos", "size": 6}}
                    {checksum}
                ]
            }}"#
        )
    }

    #[test]
    fn latest_version_reads_tag_name() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/coral-xyz/anchor/releases/latest")
            .match_header("authorization", "token secret")
            .with_status(200)
            .with_body(r#"{"tag_name": "v0.29.0", "assets": []}"#)
            .create();

        let api = GithubReleaseApi::with_base_url(&server.url(), Some("secret".into()), false);
        let version = api.latest_version("coral-xyz", "anchor").unwrap();

        mock.assert();
        assert_eq!(version.as_deref(), Some("v0.29.0"));
    }

    #[test]
    fn latest_version_is_none_without_releases() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/repos/acme/empty/releases/latest")
            .with_status(404)
            .create();

        let api = GithubReleaseApi::with_base_url(&server.url(), None, false);
        assert_eq!(api.latest_version("acme", "empty").unwrap(), None);
    }

    #[test]
    fn api_errors_are_reported() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/repos/acme/tool/releases/latest")
            .with_status(500)
            .with_body("boom")
            .create();

        let api = GithubReleaseApi::with_base_url(&server.url(), None, false);
        let err = api.latest_version("acme", "tool").unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn download_verifies_checksum() {
        let mut server = mockito::Server::new();
        let url = server.url();
        let _release = server
            .mock("GET", "/repos/coral-xyz/anchor/releases/tags/v0.10.0")
            .with_status(200)
            .with_body(release_json(&url, true))
            .create();
        let _binary = server
            .mock("GET", "/download/anchor-v0.10.0-macos")
            .with_status(200)
            .with_body("binary")
            .create();
        let _checksums = server
            .mock("GET", "/download/checksums.txt")
            .with_status(200)
            .with_body(format!("{}  anchor-v0.10.0-macos\n", sha256_hex(b"binary")))
            .create();

        let dir = tempdir().unwrap();
        let api = GithubReleaseApi::with_base_url(&url, None, false);
        let path = api
            .download_release_binary(
                "coral-xyz",
                "anchor",
                "v0.10.0",
                "anchor-v0.10.0-macos",
                dir.path(),
                None,
            )
            .unwrap();

        assert_eq!(path, dir.path().join("anchor-v0.10.0-macos"));
        assert_eq!(std::fs::read(&path).unwrap(), b"binary");
    }

    #[test]
    fn download_rejects_checksum_mismatch() {
        let mut server = mockito::Server::new();
        let url = server.url();
        let _release = server
            .mock("GET", "/repos/coral-xyz/anchor/releases/tags/v0.10.0")
            .with_status(200)
            .with_body(release_json(&url, true))
            .create();
        let _binary = server
            .mock("GET", "/download/anchor-v0.10.0-macos")
            .with_status(200)
            .with_body("tampered")
            .create();
        let _checksums = server
            .mock("GET", "/download/checksums.txt")
            .with_status(200)
            .with_body(format!("{}  anchor-v0.10.0-macos\n", sha256_hex(b"binary")))
            .create();

        let dir = tempdir().unwrap();
        let api = GithubReleaseApi::with_base_url(&url, None, false);
        let err = api
            .download_release_binary(
                "coral-xyz",
                "anchor",
                "v0.10.0",
                "anchor-v0.10.0-macos",
                dir.path(),
                None,
            )
            .unwrap_err();

        assert!(matches!(err, ReleaseError::Common(_)));
        assert!(!dir.path().join("anchor-v0.10.0-macos").exists());
        assert!(!dir.path().join("anchor-v0.10.0-macos.unverified").exists());
    }

    #[test]
    fn existing_download_is_reverified() {
        let mut server = mockito::Server::new();
        let url = server.url();
        let _release = server
            .mock("GET", "/repos/coral-xyz/anchor/releases/tags/v0.10.0")
            .with_status(200)
            .with_body(release_json(&url, true))
            .create();
        let binary = server
            .mock("GET", "/download/anchor-v0.10.0-macos")
            .with_status(200)
            .with_body("tampered")
            .create();
        let _checksums = server
            .mock("GET", "/download/checksums.txt")
            .with_status(200)
            .with_body(format!("{}  anchor-v0.10.0-macos\n", sha256_hex(b"binary")))
            .create();

        let dir = tempdir().unwrap();
        let dest = dir.path().join("anchor-v0.10.0-macos");
        std::fs::write(&dest, b"stale").unwrap();

        let api = GithubReleaseApi::with_base_url(&url, None, false);
        let result = api.download_release_binary(
            "coral-xyz",
            "anchor",
            "v0.10.0",
            "anchor-v0.10.0-macos",
            dir.path(),
            None,
        );

        assert!(result.is_err());
        binary.assert();
        assert!(!dest.exists());
    }

    #[test]
    fn verified_download_is_reused() {
        let mut server = mockito::Server::new();
        let url = server.url();
        let _release = server
            .mock("GET", "/repos/coral-xyz/anchor/releases/tags/v0.10.0")
            .with_status(200)
            .with_body(release_json(&url, true))
            .create();
        let binary = server
            .mock("GET", "/download/anchor-v0.10.0-macos")
            .expect(0)
            .create();
        let _checksums = server
            .mock("GET", "/download/checksums.txt")
            .with_status(200)
            .with_body(format!("{}  anchor-v0.10.0-macos\n", sha256_hex(b"binary")))
            .create();

        let dir = tempdir().unwrap();
        let dest = dir.path().join("anchor-v0.10.0-macos");
        std::fs::write(&dest, b"binary").unwrap();

        let api = GithubReleaseApi::with_base_url(&url, None, false);
        let path = api
            .download_release_binary(
                "coral-xyz",
                "anchor",
                "v0.10.0",
                "anchor-v0.10.0-macos",
                dir.path(),
                None,
            )
            .unwrap();

        binary.assert();
        assert_eq!(path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"binary");
    }

    #[test]
    fn missing_asset_lists_available_names() {
        let mut server = mockito::Server::new();
        let url = server.url();
        let _release = server
            .mock("GET", "/repos/coral-xyz/anchor/releases/tags/v0.10.0")
            .with_status(200)
            .with_body(release_json(&url, false))
            .create();

        let dir = tempdir().unwrap();
        let api = GithubReleaseApi::with_base_url(&url, None, false);
        let err = api
            .download_release_binary(
                "coral-xyz",
                "anchor",
                "v0.10.0",
                "anchor-v0.10.0-linux",
                dir.path(),
                None,
            )
            .unwrap_err();

        match err {
            ReleaseError::AssetNotFound { available, .. } => {
                assert_eq!(available, vec!["anchor-v0.10.0-macos".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dry_run_returns_sentinels() {
        let dir = tempdir().unwrap();
        let api = GithubReleaseApi::with_base_url("http://127.0.0.1:9", None, true);

        assert_eq!(
            api.latest_version("coral-xyz", "anchor").unwrap().as_deref(),
            Some(DRY_RUN_RESPONSE)
        );
        let path = api
            .download_release_binary("coral-xyz", "anchor", "v1", "anchor", dir.path(), None)
            .unwrap();
        assert_eq!(path, dir.path().join("anchor"));
        assert!(!path.exists());
    }
}
