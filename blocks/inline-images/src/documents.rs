use crate::error::SaveError;
use crate::types::{PendingUpload, RawRecord, SaveOutcome, SavePolicy, StoredRecord};
use crate::uploads::{upload_all, ImageUploader};
use poskas_atoms::content::{
    decode, encode_nodes, filter_referenced, materialize, referenced_ids, strip_dangling,
    token_image_ids, EditableDocument,
};
use poskas_atoms::media::{parse_image_list, AssetId, ImageAsset, UrlNormalizer};
use std::collections::{HashMap, HashSet};

/// Turns stored records into editable documents and back. One assembler
/// per screen: it carries that screen's upload path, the deployment's
/// asset origin and the upload collaborator.
pub struct DocumentAssembler<U> {
    normalizer: UrlNormalizer,
    upload_path: String,
    uploader: U,
    policy: SavePolicy,
}

impl<U: ImageUploader> DocumentAssembler<U> {
    pub fn new(normalizer: UrlNormalizer, upload_path: impl Into<String>, uploader: U) -> Self {
        Self {
            normalizer,
            upload_path: upload_path.into(),
            uploader,
            policy: SavePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SavePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn normalizer(&self) -> &UrlNormalizer {
        &self.normalizer
    }

    pub fn upload_path(&self) -> &str {
        &self.upload_path
    }

    /// Open a stored record in the editor.
    ///
    /// Never fails: an unreadable image list gives an empty registry and
    /// placeholders without an asset show up as diagnostic text.
    pub fn load_for_editing(&self, record: &RawRecord) -> EditableDocument {
        let assets = parse_image_list(&record.images, &self.normalizer);
        let stored = record.content.as_deref().unwrap_or_default();
        let tokens = decode(stored, &assets);
        let nodes = materialize(&tokens, &assets);

        tracing::info!(
            "📥 load_for_editing: chars={} images={} tokens={} placed={}",
            stored.len(),
            assets.len(),
            tokens.len(),
            token_image_ids(&tokens).len(),
        );

        EditableDocument { nodes, assets }
    }

    /// Upload what is pending, encode the document and keep only the images
    /// the encoded text still references.
    ///
    /// `pending` holds the local images inserted during this session. Ones
    /// the user removed again are never uploaded. With
    /// [`SavePolicy::BestEffort`] failed uploads are reported in the outcome
    /// and their placeholders are dropped from the content.
    pub async fn prepare_for_save(
        &self,
        doc: EditableDocument,
        pending: Vec<PendingUpload>,
    ) -> Result<SaveOutcome, SaveError> {
        let EditableDocument { nodes, assets } = doc;
        let content = encode_nodes(&nodes);
        let referenced: HashSet<String> = referenced_ids(&content)
            .into_iter()
            .map(str::to_string)
            .collect();

        let registry = merge_registry(assets, &pending);

        let (to_upload, unused): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|upload| referenced.contains(upload.id().as_str()));
        for upload in &unused {
            tracing::debug!("Skipping upload of removed image id={}", upload.id());
        }

        let results = upload_all(&self.uploader, &self.upload_path, &self.normalizer, to_upload).await;
        let mut uploaded: HashMap<AssetId, ImageAsset> = HashMap::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(asset) => {
                    uploaded.insert(asset.id.clone(), asset);
                }
                Err(failure) => {
                    tracing::warn!("⚠️ {}", failure);
                    failures.push(failure);
                }
            }
        }

        if !failures.is_empty() && self.policy == SavePolicy::AllOrNothing {
            tracing::error!(
                "❌ prepare_for_save aborted: {} upload(s) failed",
                failures.len()
            );
            return Err(SaveError::UploadsFailed(failures));
        }

        let uploaded_count = uploaded.len();
        let candidates: Vec<ImageAsset> = registry
            .into_iter()
            .map(|asset| uploaded.remove(&asset.id).unwrap_or(asset))
            .filter(|asset| {
                if asset.is_persisted() {
                    return true;
                }
                if referenced.contains(asset.id.as_str()) {
                    tracing::warn!(
                        "⚠️ Dropping image id={} name={}: it was never uploaded",
                        asset.id,
                        asset.display_name,
                    );
                }
                false
            })
            .collect();

        let images = filter_referenced(&candidates, &content);
        let content = strip_dangling(&content, &images);

        tracing::info!(
            "✅ prepare_for_save: chars={} images={} uploaded={} failed={} dropped={}",
            content.len(),
            images.len(),
            uploaded_count,
            failures.len(),
            candidates.len() - images.len(),
        );

        Ok(SaveOutcome {
            record: StoredRecord { content, images },
            failures,
        })
    }
}

/// Registry in insertion order: the document's assets first, then pending
/// assets the editor never registered.
fn merge_registry(mut assets: Vec<ImageAsset>, pending: &[PendingUpload]) -> Vec<ImageAsset> {
    for upload in pending {
        if !assets.iter().any(|asset| asset.id == upload.asset.id) {
            assets.push(upload.asset.clone());
        }
    }
    assets
}
