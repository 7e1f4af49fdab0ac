pub mod api;
pub mod download;
pub mod error;
pub mod github;

pub use api::{Asset, Release};
pub use download::{BlockingHttpClient, HttpClient};
pub use error::ReleaseError;
pub use github::{GithubReleaseApi, ReleaseApi};

/// Value returned by every lookup that would have touched the network under dry-run.
pub const DRY_RUN_RESPONSE: &str = "DRY_RUN_RESPONSE";
