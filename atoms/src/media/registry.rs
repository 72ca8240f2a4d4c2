use super::model::ImageAsset;
use super::url::UrlNormalizer;
use serde_json::Value;

/// Stored image lists have been seen encoded up to twice; one extra round
/// covers the odd triple-quoted row.
const MAX_DECODE_ROUNDS: usize = 3;

/// Parse a document's stored `images` value into assets.
///
/// Accepts a JSON array, a JSON-encoded string of one (also double
/// encoded), or a single bare object. Anything unreadable yields an empty
/// list. Order is kept and nothing is de-duplicated here.
pub fn parse_image_list(raw: &Value, normalizer: &UrlNormalizer) -> Vec<ImageAsset> {
    let items = match unwrap_encoded(raw.clone(), 0) {
        Value::Array(items) => items,
        Value::Object(map) => vec![Value::Object(map)],
        Value::Null => return Vec::new(),
        other => {
            tracing::warn!("⚠️ Unreadable image list, expected array or object, got: {}", other);
            return Vec::new();
        }
    };

    let mut assets = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let item = unwrap_encoded(item, 0);
        if !item.is_object() {
            tracing::debug!("Skipping image entry {}: not an object", index);
            continue;
        }
        match serde_json::from_value::<ImageAsset>(item) {
            Ok(asset) if asset.id.is_empty() => {
                tracing::warn!("⚠️ Skipping image entry {}: empty id", index);
            }
            Ok(asset) if !asset.id.fits_placeholder() => {
                tracing::warn!(
                    "⚠️ Skipping image entry {}: id={} cannot be referenced from text",
                    index,
                    asset.id,
                );
            }
            Ok(asset) => assets.push(resolve(asset, normalizer)),
            Err(e) => {
                tracing::warn!("⚠️ Skipping image entry {}: {}", index, e);
            }
        }
    }

    assets
}

/// [`parse_image_list`] for a list that was persisted as text.
pub fn parse_image_list_str(raw: &str, normalizer: &UrlNormalizer) -> Vec<ImageAsset> {
    parse_image_list(&Value::String(raw.to_string()), normalizer)
}

/// Peel JSON-in-a-string layers. Strings that do not parse become `Null`.
fn unwrap_encoded(value: Value, rounds: usize) -> Value {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() || rounds >= MAX_DECODE_ROUNDS {
                return Value::Null;
            }
            match serde_json::from_str::<Value>(text) {
                Ok(inner) => unwrap_encoded(inner, rounds + 1),
                Err(e) => {
                    tracing::warn!("⚠️ Image list is not valid JSON: {}", e);
                    Value::Null
                }
            }
        }
        other => other,
    }
}

/// Recompute the display URL and fill in a storage path for assets that
/// were persisted before storage paths were recorded.
fn resolve(mut asset: ImageAsset, normalizer: &UrlNormalizer) -> ImageAsset {
    if asset.server_path.is_none() && !asset.url.is_empty() {
        asset.server_path = normalizer.server_path(&asset.url);
    }

    asset.url = match (&asset.server_path, &asset.local_uri) {
        (Some(path), _) => normalizer.normalize(path),
        (None, Some(local)) => local.clone(),
        (None, None) => normalizer.normalize(&asset.url),
    };

    asset
}
