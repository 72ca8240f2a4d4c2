use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use inline_images_block::{ImageUploader, UploadRequest, UploadedFile};
use poskas_atoms::media::AssetId;

/// Upload collaborator writing images straight into the app bucket.
/// Objects are served from the asset origin under the same key.
#[derive(Debug, Clone)]
pub struct S3ImageUploader {
    client: S3Client,
    bucket_name: String,
}

impl S3ImageUploader {
    pub fn new(client: S3Client, bucket_name: impl Into<String>) -> Self {
        Self {
            client,
            bucket_name: bucket_name.into(),
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }
}

#[async_trait]
impl ImageUploader for S3ImageUploader {
    async fn upload(
        &self,
        upload_path: &str,
        request: UploadRequest<'_>,
    ) -> Result<UploadedFile, String> {
        let key = object_key(upload_path, request.asset_id, request.filename);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(request.content_type)
            .body(ByteStream::from(request.data.to_vec()))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 put_object failed for key {}: {}", key, e);
                format!("S3 put_object error: {}", e)
            })?;

        let server_path = format!("/{}", key);
        Ok(UploadedFile {
            url: server_path.clone(),
            server_path,
            filename: Some(request.filename.to_string()),
        })
    }
}

/// `<upload path>/<id>-<sanitized name>`
pub fn object_key(upload_path: &str, asset_id: &AssetId, filename: &str) -> String {
    let folder = upload_path.trim_matches('/');
    let name = sanitize_filename(filename);
    if folder.is_empty() {
        format!("{}-{}", asset_id, name)
    } else {
        format!("{}/{}-{}", folder, asset_id, name)
    }
}

fn sanitize_filename(filename: &str) -> String {
    // Browsers hand over full paths on some platforms
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '-'
        };
        if c == '-' && cleaned.ends_with('-') {
            continue;
        }
        cleaned.push(c);
    }

    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}
