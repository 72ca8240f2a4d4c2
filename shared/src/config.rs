use crate::kinds::RecordKind;
use poskas_atoms::media::{asset_origin_from_api_base, UrlNormalizer};

const DEFAULT_TABLE_NAME: &str = "poskas";
const DEFAULT_BUCKET_NAME: &str = "poskas-app";
const DEFAULT_UPLOAD_ROOT: &str = "uploads";

/// Deployment settings for content storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentConfig {
    pub table_name: String,
    pub bucket_name: String,
    pub api_base_url: String,
    /// Origin serving uploaded files. Derived from `api_base_url` unless set.
    pub asset_base_url: String,
    pub legacy_asset_hosts: Vec<String>,
    pub upload_root: String,
}

impl ContentConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_base_url = get("API_BASE_URL").unwrap_or_default();
        let asset_base_url = get("ASSET_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| asset_origin_from_api_base(&api_base_url));
        let legacy_asset_hosts = get("LEGACY_ASSET_HOSTS")
            .map(|hosts| {
                hosts
                    .split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let upload_root = get("UPLOAD_ROOT")
            .map(|root| root.trim_matches('/').to_string())
            .filter(|root| !root.is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_ROOT.to_string());

        Self {
            table_name: get("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            bucket_name: get("S3_BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET_NAME.to_string()),
            api_base_url,
            asset_base_url,
            legacy_asset_hosts,
            upload_root,
        }
    }

    pub fn normalizer(&self) -> UrlNormalizer {
        UrlNormalizer::new(&self.asset_base_url)
            .with_legacy_origins(self.legacy_asset_hosts.iter().cloned())
    }

    /// Upload path handed to the upload collaborator for one screen.
    pub fn upload_path(&self, kind: RecordKind) -> String {
        format!("{}/{}", self.upload_root, kind.upload_folder())
    }
}
