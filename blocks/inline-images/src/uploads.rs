use crate::error::UploadFailure;
use crate::types::{PendingUpload, UploadedFile};
use async_trait::async_trait;
use image::ImageFormat;
use poskas_atoms::media::{AssetId, ImageAsset, UrlNormalizer};
use std::path::Path;
use std::sync::Arc;

/// One file handed to the upload collaborator.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub asset_id: &'a AssetId,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

/// The external upload endpoint: takes bytes and a deployment-scoped
/// upload path, returns where the file now lives.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(
        &self,
        upload_path: &str,
        request: UploadRequest<'_>,
    ) -> Result<UploadedFile, String>;
}

#[async_trait]
impl<T: ImageUploader + ?Sized> ImageUploader for Arc<T> {
    async fn upload(
        &self,
        upload_path: &str,
        request: UploadRequest<'_>,
    ) -> Result<UploadedFile, String> {
        (**self).upload(upload_path, request).await
    }
}

/// MIME type of an image payload, sniffed from its magic bytes. Formats
/// the decoder cannot sniff are accepted by extension.
pub fn sniff_content_type(data: &[u8], filename: &str) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(data) {
        return mime_for(format);
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())?;
    match extension.as_str() {
        "svg" => Some("image/svg+xml"),
        "heic" | "heif" => Some("image/heic"),
        _ => None,
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    let mime = match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Ico => "image/x-icon",
        ImageFormat::Avif => "image/avif",
        _ => return None,
    };
    Some(mime)
}

/// Upload every pending asset concurrently. Results come back in the
/// order of `pending`, whatever order the uploads finish in.
pub(crate) async fn upload_all<U>(
    uploader: &U,
    upload_path: &str,
    normalizer: &UrlNormalizer,
    pending: Vec<PendingUpload>,
) -> Vec<Result<ImageAsset, UploadFailure>>
where
    U: ImageUploader + ?Sized,
{
    let uploads = pending
        .into_iter()
        .map(|upload| upload_one(uploader, upload_path, normalizer, upload));
    futures::future::join_all(uploads).await
}

async fn upload_one<U>(
    uploader: &U,
    upload_path: &str,
    normalizer: &UrlNormalizer,
    pending: PendingUpload,
) -> Result<ImageAsset, UploadFailure>
where
    U: ImageUploader + ?Sized,
{
    let PendingUpload { mut asset, data } = pending;

    if data.is_empty() {
        return Err(UploadFailure::new(&asset, "file is empty"));
    }
    let filename = upload_filename(&asset);
    let Some(content_type) = sniff_content_type(&data, &filename) else {
        tracing::warn!("⚠️ Refusing to upload id={} name={}: not an image", asset.id, filename);
        return Err(UploadFailure::new(&asset, "file is not a supported image"));
    };

    tracing::info!(
        "📤 Uploading image id={} name={} type={} bytes={} path={}",
        asset.id,
        filename,
        content_type,
        data.len(),
        upload_path,
    );

    let request = UploadRequest {
        asset_id: &asset.id,
        filename: &filename,
        content_type,
        data: &data,
    };

    let uploaded = match uploader.upload(upload_path, request).await {
        Ok(uploaded) => uploaded,
        Err(e) => {
            tracing::error!("❌ Upload failed: id={} name={} error={}", asset.id, filename, e);
            return Err(UploadFailure::new(&asset, e));
        }
    };

    let server_path = uploaded.server_path.trim();
    if server_path.is_empty() {
        tracing::error!("❌ Upload of id={} returned no storage path", asset.id);
        return Err(UploadFailure::new(&asset, "upload returned no storage path"));
    }

    let display_source = match uploaded.url.trim() {
        "" => server_path,
        url => url,
    };
    asset.url = normalizer.normalize(display_source);
    asset.server_path = Some(server_path.to_string());
    asset.local_uri = None;
    if asset.display_name.trim().is_empty() {
        if let Some(name) = uploaded.filename {
            asset.display_name = name;
        }
    }

    tracing::info!("✅ Uploaded image id={} server_path={}", asset.id, server_path);
    Ok(asset)
}

fn upload_filename(asset: &ImageAsset) -> String {
    let name = asset.display_name.trim();
    if name.is_empty() {
        format!("image-{}", asset.id)
    } else {
        name.to_string()
    }
}
