use crate::error::UploadFailure;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use poskas_atoms::media::{AssetId, ImageAsset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========== RECORDS ==========

/// Content field exactly as read from the parent record. `images` is
/// whatever the row holds: an array, an encoded string, a single object
/// or nothing at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Value,
}

impl RawRecord {
    pub fn new(content: impl Into<String>, images: Value) -> Self {
        Self {
            content: Some(content.into()),
            images,
        }
    }
}

/// Content field as it is written back. Every placeholder in `content`
/// resolves to exactly one entry of `images` and every entry is referenced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub content: String,
    pub images: Vec<ImageAsset>,
}

impl StoredRecord {
    /// The image list the way it is stored in a text column.
    pub fn images_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.images)
    }
}

impl From<StoredRecord> for RawRecord {
    fn from(record: StoredRecord) -> Self {
        let images = record
            .images
            .iter()
            .filter_map(|asset| serde_json::to_value(asset).ok())
            .collect();
        Self {
            content: Some(record.content),
            images: Value::Array(images),
        }
    }
}

// ========== UPLOADS ==========

/// An image inserted in the editor whose bytes have not been sent yet.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub asset: ImageAsset,
    pub data: Vec<u8>,
}

impl PendingUpload {
    pub fn new(display_name: &str, local_uri: &str, data: Vec<u8>) -> Self {
        Self {
            asset: ImageAsset::local(display_name, local_uri),
            data,
        }
    }

    /// Pending upload for a pasted `data:<mime>;base64,<payload>` image.
    pub fn from_data_uri(display_name: &str, uri: &str) -> Result<Self, String> {
        let uri = uri.trim();
        let rest = uri
            .get(..5)
            .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
            .map(|_| &uri[5..])
            .ok_or_else(|| "Not a data URI".to_string())?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| "Data URI has no payload".to_string())?;
        if !meta.to_ascii_lowercase().ends_with(";base64") {
            return Err("Only base64 data URIs are supported".to_string());
        }

        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("Invalid base64 payload: {}", e))?;

        Ok(Self::new(display_name, uri, data))
    }

    pub fn id(&self) -> &AssetId {
        &self.asset.id
    }
}

/// What the upload collaborator hands back for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    pub server_path: String,
    #[serde(default)]
    pub filename: Option<String>,
}

// ========== SAVE ==========

/// How a save reacts to failed uploads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SavePolicy {
    /// Save what uploaded, report the rest.
    #[default]
    BestEffort,
    /// Any failed upload fails the save.
    AllOrNothing,
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub record: StoredRecord,
    /// Uploads that failed; their images are not in `record`.
    pub failures: Vec<UploadFailure>,
}

impl SaveOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_uri_is_decoded() {
        let upload = PendingUpload::from_data_uri("paste.png", "data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(upload.data, vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert!(upload.asset.is_pending());
        assert_eq!(upload.asset.display_name, "paste.png");
        assert!(upload.asset.url.starts_with("data:image/png"));
    }

    #[test]
    fn test_bad_data_uris() {
        assert!(PendingUpload::from_data_uri("a", "blob:abc").is_err());
        assert!(PendingUpload::from_data_uri("a", "data:image/png;base64").is_err());
        assert!(PendingUpload::from_data_uri("a", "data:text/plain,hello").is_err());
        assert!(PendingUpload::from_data_uri("a", "data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_stored_record_to_raw() {
        let record = StoredRecord {
            content: "[IMG:7]".into(),
            images: vec![ImageAsset::persisted("7", "x.jpg", "/uploads/x.jpg")],
        };
        assert_eq!(
            record.images_json().unwrap(),
            r#"[{"id":7,"displayName":"x.jpg","url":"/uploads/x.jpg","serverPath":"/uploads/x.jpg"}]"#
        );

        let raw = RawRecord::from(record);
        assert_eq!(raw.content.as_deref(), Some("[IMG:7]"));
        assert_eq!(raw.images[0]["id"], json!(7));
    }
}
