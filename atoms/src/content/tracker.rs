//! Which registry entries does the encoded text still reference?

use super::markup::normalize_markup;
use super::placeholder::{referenced_ids, PLACEHOLDER_REGEX};
use crate::media::model::{AssetId, ImageAsset};
use regex::Captures;
use std::collections::HashSet;

/// Assets whose id appears as a placeholder in `encoded`, in the order of
/// `assets`, each id at most once.
pub fn filter_referenced(assets: &[ImageAsset], encoded: &str) -> Vec<ImageAsset> {
    let referenced: HashSet<&str> = referenced_ids(encoded).into_iter().collect();
    let mut kept = HashSet::new();

    assets
        .iter()
        .filter(|asset| {
            referenced.contains(asset.id.as_str()) && kept.insert(asset.id.as_str())
        })
        .cloned()
        .collect()
}

/// Ids of `assets` that `encoded` no longer references.
pub fn unreferenced_ids(assets: &[ImageAsset], encoded: &str) -> Vec<AssetId> {
    let referenced: HashSet<&str> = referenced_ids(encoded).into_iter().collect();
    assets
        .iter()
        .filter(|asset| !referenced.contains(asset.id.as_str()))
        .map(|asset| asset.id.clone())
        .collect()
}

/// Remove placeholders that point at none of `assets` and re-normalize the
/// text around them, so every remaining placeholder resolves.
pub fn strip_dangling(encoded: &str, assets: &[ImageAsset]) -> String {
    let known: HashSet<&str> = assets.iter().map(|a| a.id.as_str()).collect();
    let mut dropped = 0usize;

    let stripped = PLACEHOLDER_REGEX.replace_all(encoded, |cap: &Captures| {
        match cap.get(1).map(|id| id.as_str()) {
            Some(id) if known.contains(id) => cap[0].to_string(),
            _ => {
                dropped += 1;
                String::new()
            }
        }
    });

    if dropped == 0 {
        return encoded.to_string();
    }
    tracing::debug!("Removed {} dangling image placeholder(s)", dropped);
    normalize_markup(&stripped)
}
