//! AWS side of rich content: configuration, S3 uploads and the DynamoDB
//! content fields of business records.

pub mod config;
pub mod kinds;
pub mod records;
pub mod s3_uploads;

pub use config::ContentConfig;
pub use kinds::RecordKind;
pub use records::{load_record_content, save_record_content};
pub use s3_uploads::S3ImageUploader;

use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use inline_images_block::{DocumentAssembler, PendingUpload, SaveOutcome, SavePolicy};
use poskas_atoms::content::EditableDocument;

/// Clients and settings shared by every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dynamo_client: DynamoClient,
    pub s3_client: S3Client,
    pub config: ContentConfig,
}

impl AppState {
    pub async fn from_env() -> Self {
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let config = ContentConfig::from_env();
        tracing::info!(
            "🚀 Content storage: table={} bucket={} assets={}",
            config.table_name,
            config.bucket_name,
            config.asset_base_url,
        );

        Self {
            dynamo_client: DynamoClient::new(&aws),
            s3_client: S3Client::new(&aws),
            config,
        }
    }

    /// Assembler for one screen, uploading into the app bucket.
    pub fn assembler(&self, kind: RecordKind) -> DocumentAssembler<S3ImageUploader> {
        DocumentAssembler::new(
            self.config.normalizer(),
            self.config.upload_path(kind),
            S3ImageUploader::new(self.s3_client.clone(), &self.config.bucket_name),
        )
    }

    /// Load a record's content field ready for the editor. A missing
    /// record opens as an empty document.
    pub async fn open_content(
        &self,
        kind: RecordKind,
        record_id: &str,
        field: &str,
    ) -> Result<EditableDocument, String> {
        let raw = load_record_content(
            &self.dynamo_client,
            &self.config.table_name,
            kind,
            record_id,
            field,
        )
        .await?
        .unwrap_or_default();

        Ok(self.assembler(kind).load_for_editing(&raw))
    }

    /// Upload pending images, then write the content field back.
    pub async fn save_content(
        &self,
        kind: RecordKind,
        record_id: &str,
        field: &str,
        doc: EditableDocument,
        pending: Vec<PendingUpload>,
        policy: SavePolicy,
    ) -> Result<SaveOutcome, String> {
        let outcome = self
            .assembler(kind)
            .with_policy(policy)
            .prepare_for_save(doc, pending)
            .await
            .map_err(|e| e.to_string())?;

        save_record_content(
            &self.dynamo_client,
            &self.config.table_name,
            kind,
            record_id,
            field,
            &outcome.record,
        )
        .await?;

        if !outcome.is_complete() {
            tracing::warn!(
                "⚠️ Saved {} without {} image(s)",
                kind.sort_key(record_id),
                outcome.failures.len()
            );
        }
        Ok(outcome)
    }
}
