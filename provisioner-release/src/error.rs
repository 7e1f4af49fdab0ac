use provisioner_common::CommonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("network error: {0}")]
    Network(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("GitHub API error: {0}")]
    GitHubApi(String),
    #[error("release {version} of {repo} has no asset named '{name}'. Available: {}", available.join(", "))]
    AssetNotFound {
        repo: String,
        version: String,
        name: String,
        available: Vec<String>,
    },
    #[error("no download url for asset {0}")]
    NoDownloadUrl(String),
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl From<reqwest::Error> for ReleaseError {
    fn from(err: reqwest::Error) -> Self {
        ReleaseError::Network(err.to_string())
    }
}
