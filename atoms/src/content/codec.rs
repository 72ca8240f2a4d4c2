//! Placeholder codec: stored text <-> rich content.

use super::markup::{push_text, render, simplify, tokenize, Piece};
use super::model::{push_run, ContentToken, EditableDocument, ImageNode, Mark, Marks, Node};
use super::placeholder::PLACEHOLDER_REGEX;
use crate::media::model::{AssetId, ImageAsset};
use std::collections::HashMap;

/// Text shown in place of a placeholder whose asset is gone.
pub fn unresolved_label(id: &str) -> String {
    format!("[image not found: {}]", id)
}

/// Split stored text into text and image tokens.
///
/// Placeholders whose id has no asset become a visible diagnostic text
/// token. Text between placeholders is kept byte for byte.
pub fn decode(stored: &str, assets: &[ImageAsset]) -> Vec<ContentToken> {
    let by_id = index_assets(assets);
    let mut tokens = Vec::new();
    let mut cursor = 0;

    for cap in PLACEHOLDER_REGEX.captures_iter(stored) {
        let (Some(whole), Some(id)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            tokens.push(ContentToken::text(&stored[cursor..whole.start()]));
        }
        cursor = whole.end();

        match by_id.get(id.as_str()) {
            Some(asset) => tokens.push(ContentToken::image(asset.id.clone())),
            None => {
                tracing::warn!("⚠️ Placeholder references unknown image id={}", id.as_str());
                tokens.push(ContentToken::text(unresolved_label(id.as_str())));
            }
        }
    }
    if cursor < stored.len() {
        tokens.push(ContentToken::text(&stored[cursor..]));
    }

    tokens
}

/// Build editor nodes from decoded tokens. Markup left in text tokens is
/// parsed into marks; formatting may span across images.
pub fn materialize(tokens: &[ContentToken], assets: &[ImageAsset]) -> Vec<Node> {
    let by_id = index_assets(assets);
    let mut nodes = Vec::new();
    let mut depth = [0usize; 3];

    for token in tokens {
        match token {
            ContentToken::Text { text } => {
                for piece in tokenize(text) {
                    match piece {
                        Piece::Open(mark) => depth[mark.index()] += 1,
                        Piece::Close(mark) => {
                            depth[mark.index()] = depth[mark.index()].saturating_sub(1)
                        }
                        Piece::Break => nodes.push(Node::LineBreak),
                        Piece::Text(text) => push_run(&mut nodes, &text, active_marks(&depth)),
                        Piece::Image(_) => {}
                    }
                }
            }
            ContentToken::ImageRef { image_ref } => match by_id.get(image_ref.as_str()) {
                Some(asset) => nodes.push(Node::Image(ImageNode {
                    id: asset.id.clone(),
                    url: asset.url.clone(),
                    alt: asset.alt_text(),
                })),
                None => push_run(
                    &mut nodes,
                    &unresolved_label(image_ref.as_str()),
                    active_marks(&depth),
                ),
            },
        }
    }

    nodes
}

/// Serialize a document to stored text with placeholders and minimal
/// markup, normalized.
pub fn encode(doc: &EditableDocument) -> String {
    encode_nodes(&doc.nodes)
}

pub fn encode_nodes(nodes: &[Node]) -> String {
    let mut pieces = Vec::new();
    collect_pieces(nodes, &mut pieces);
    render(&simplify(pieces))
}

fn collect_pieces(nodes: &[Node], out: &mut Vec<Piece>) {
    for node in nodes {
        match node {
            Node::Text(run) => {
                if run.text.is_empty() {
                    continue;
                }
                for mark in run.marks.iter() {
                    out.push(Piece::Open(mark));
                }
                push_text(out, &run.text);
                for mark in run.marks.iter().rev() {
                    out.push(Piece::Close(mark));
                }
            }
            Node::LineBreak => out.push(Piece::Break),
            Node::Image(image) if image.id.fits_placeholder() => {
                out.push(Piece::Image(image.id.clone()))
            }
            Node::Image(image) => {
                tracing::warn!("⚠️ Image id={} cannot be written as a placeholder", image.id);
                push_text(out, &unresolved_label(image.id.as_str()));
            }
            Node::Paragraph { children } => {
                if !out.is_empty() && out.last() != Some(&Piece::Break) {
                    out.push(Piece::Break);
                }
                collect_pieces(children, out);
                out.push(Piece::Break);
            }
        }
    }
}

fn active_marks(depth: &[usize; 3]) -> Marks {
    Mark::ALL
        .into_iter()
        .filter(|m| depth[m.index()] > 0)
        .fold(Marks::plain(), Marks::with)
}

/// First asset wins when ids repeat.
fn index_assets(assets: &[ImageAsset]) -> HashMap<&str, &ImageAsset> {
    let mut by_id = HashMap::with_capacity(assets.len());
    for asset in assets {
        by_id.entry(asset.id.as_str()).or_insert(asset);
    }
    by_id
}

/// Image ids of the tokens, in order.
pub fn token_image_ids(tokens: &[ContentToken]) -> Vec<&AssetId> {
    tokens
        .iter()
        .filter_map(|t| match t {
            ContentToken::ImageRef { image_ref } => Some(image_ref),
            ContentToken::Text { .. } => None,
        })
        .collect()
}
