//! Upload error types

use poskas_atoms::media::{AssetId, ImageAsset};
use thiserror::Error;

/// One pending image that could not be uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to upload {display_name} (image {asset_id}): {reason}")]
pub struct UploadFailure {
    pub asset_id: AssetId,
    pub display_name: String,
    pub reason: String,
}

impl UploadFailure {
    pub fn new(asset: &ImageAsset, reason: impl Into<String>) -> Self {
        Self {
            asset_id: asset.id.clone(),
            display_name: asset.alt_text(),
            reason: reason.into(),
        }
    }
}

/// Save errors. Malformed content never ends up here; only the upload
/// collaborator can fail a save.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Uploads failed while the caller asked for all-or-nothing.
    #[error("{} image upload(s) failed: {}", .0.len(), file_names(.0))]
    UploadsFailed(Vec<UploadFailure>),
}

impl SaveError {
    pub fn failures(&self) -> &[UploadFailure] {
        match self {
            SaveError::UploadsFailed(failures) => failures,
        }
    }
}

fn file_names(failures: &[UploadFailure]) -> String {
    failures
        .iter()
        .map(|f| f.display_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
