//! Plain-text rendering of stored content for table cells and lists.

use super::markup::{tokenize, Piece};
use super::placeholder::PLACEHOLDER_REGEX;
use regex::NoExpand;

pub const DEFAULT_IMAGE_LABEL: &str = "[image]";

/// Stored content without markup, placeholders replaced by `image_label`,
/// whitespace collapsed to single spaces.
pub fn plain_text(stored: &str, image_label: &str) -> String {
    let labelled = PLACEHOLDER_REGEX.replace_all(stored, NoExpand(image_label));
    let mut text = String::with_capacity(labelled.len());
    for piece in tokenize(&labelled) {
        match piece {
            Piece::Text(t) => text.push_str(&t),
            Piece::Break => text.push(' '),
            Piece::Open(_) | Piece::Close(_) | Piece::Image(_) => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`plain_text`] cut to `max_chars` characters with a trailing ellipsis.
pub fn excerpt(stored: &str, image_label: &str, max_chars: usize) -> String {
    let text = plain_text(stored, image_label);
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}
