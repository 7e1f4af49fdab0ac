use serde::Deserialize;

/// A published release as returned by `GET /repos/{owner}/{repo}/releases/...`.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    #[serde(default)]
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

impl Release {
    pub fn find_asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name == name)
    }

    pub fn asset_names(&self) -> Vec<String> {
        self.assets.iter().map(|asset| asset.name.clone()).collect()
    }

    /// Locate a checksum companion for `asset_name`, preferring `<name>.sha256`.
    pub fn find_checksum_asset(&self, asset_name: &str) -> Option<&Asset> {
        let preferred = format!("{asset_name}.sha256");
        if let Some(asset) = self.find_asset(&preferred) {
            return Some(asset);
        }

        ["checksums.txt", "SHA256SUMS", "sha256sums.txt"]
            .iter()
            .find_map(|name| self.find_asset(name))
    }
}
