//! Minimal inline markup: `<strong>`, `<em>`, `<u>` and line breaks.
//!
//! Stored text accumulated every formatting bug the old editors had:
//! `<strong><strong>…</strong></strong>`, stray closers, empty wrappers,
//! endless blank lines. [`normalize_markup`] cleans all of that up by
//! running [`simplify_once`] until the piece list stops changing.

use super::model::Mark;
use super::placeholder::placeholder;
use crate::media::model::AssetId;
use regex::Regex;
use std::sync::LazyLock;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(/?)\s*(strong|b|em|i|u)\s*>|<\s*br\s*/?\s*>").expect("markup tag regex")
});

/// Every pass either shrinks the list or leaves it alone; this only
/// guards against a rule bug turning into a hang.
const MAX_PASSES: usize = 16;

/// At most this many line breaks in a row survive.
const MAX_CONSECUTIVE_BREAKS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Piece {
    Text(String),
    Image(AssetId),
    Break,
    Open(Mark),
    Close(Mark),
}

impl Mark {
    pub fn open_tag(self) -> &'static str {
        match self {
            Mark::Bold => "<strong>",
            Mark::Italic => "<em>",
            Mark::Underline => "<u>",
        }
    }

    pub fn close_tag(self) -> &'static str {
        match self {
            Mark::Bold => "</strong>",
            Mark::Italic => "</em>",
            Mark::Underline => "</u>",
        }
    }

    fn from_tag(name: &str) -> Option<Mark> {
        match name.to_ascii_lowercase().as_str() {
            "strong" | "b" => Some(Mark::Bold),
            "em" | "i" => Some(Mark::Italic),
            "u" => Some(Mark::Underline),
            _ => None,
        }
    }
}

/// Clean up formatting markup and blank lines in stored text.
pub fn normalize_markup(text: &str) -> String {
    render(&simplify(tokenize(text)))
}

/// Split text into markup pieces. Anything that is not a recognized tag
/// stays literal text; placeholders are left inside text pieces.
pub(crate) fn tokenize(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut cursor = 0;

    for cap in TAG_REGEX.captures_iter(text) {
        let Some(whole) = cap.get(0) else { continue };
        push_text(&mut pieces, &text[cursor..whole.start()]);
        cursor = whole.end();

        match cap.get(2).and_then(|name| Mark::from_tag(name.as_str())) {
            Some(mark) if cap.get(1).is_some_and(|slash| !slash.as_str().is_empty()) => {
                pieces.push(Piece::Close(mark))
            }
            Some(mark) => pieces.push(Piece::Open(mark)),
            None => pieces.push(Piece::Break),
        }
    }
    push_text(&mut pieces, &text[cursor..]);

    pieces
}

/// Text with embedded newlines becomes text and break pieces.
pub(crate) fn push_text(pieces: &mut Vec<Piece>, text: &str) {
    if text.is_empty() {
        return;
    }
    let text = text.replace("\r\n", "\n");
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            pieces.push(Piece::Break);
        }
        if !line.is_empty() {
            pieces.push(Piece::Text(line.to_string()));
        }
    }
}

/// Apply [`simplify_once`] until nothing changes.
pub(crate) fn simplify(mut pieces: Vec<Piece>) -> Vec<Piece> {
    for _ in 0..MAX_PASSES {
        let next = simplify_once(&pieces);
        if next == pieces {
            return next;
        }
        pieces = next;
    }
    pieces
}

/// One normalization pass:
/// - an opener for a mark that is already open is dropped with its closer
/// - closers without an opener are dropped
/// - crossed tags are re-nested
/// - `<x></x>` and `</x><x>` pairs disappear
/// - unclosed marks are closed at the end
/// - leading breaks, trailing breaks and breaks past the second in a row go
fn simplify_once(pieces: &[Piece]) -> Vec<Piece> {
    let mut out: Vec<Piece> = Vec::with_capacity(pieces.len());
    let mut stack: Vec<Mark> = Vec::new();
    let mut skip = [0usize; 3];
    let mut seen_content = false;
    // Marks between breaks do not split a run of blank lines
    let mut breaks_since_content = 0usize;

    for piece in pieces {
        match piece {
            Piece::Open(mark) => {
                if stack.contains(mark) {
                    skip[mark.index()] += 1;
                    continue;
                }
                stack.push(*mark);
                emit_open(&mut out, *mark);
            }
            Piece::Close(mark) => {
                if skip[mark.index()] > 0 {
                    skip[mark.index()] -= 1;
                    continue;
                }
                let Some(pos) = stack.iter().position(|m| m == mark) else {
                    continue;
                };
                let reopen = stack.split_off(pos + 1);
                for inner in reopen.iter().rev() {
                    emit_close(&mut out, *inner);
                }
                stack.pop();
                emit_close(&mut out, *mark);
                for inner in reopen {
                    stack.push(inner);
                    emit_open(&mut out, inner);
                }
            }
            Piece::Break => {
                if seen_content && breaks_since_content < MAX_CONSECUTIVE_BREAKS {
                    breaks_since_content += 1;
                    out.push(Piece::Break);
                }
            }
            Piece::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                seen_content = true;
                breaks_since_content = 0;
                match out.last_mut() {
                    Some(Piece::Text(prev)) => prev.push_str(text),
                    _ => out.push(Piece::Text(text.clone())),
                }
            }
            Piece::Image(id) => {
                seen_content = true;
                breaks_since_content = 0;
                out.push(Piece::Image(id.clone()));
            }
        }
    }

    while let Some(mark) = stack.pop() {
        emit_close(&mut out, mark);
    }
    strip_trailing_breaks(&mut out);

    out
}

fn emit_open(out: &mut Vec<Piece>, mark: Mark) {
    if out.last() == Some(&Piece::Close(mark)) {
        out.pop();
    } else {
        out.push(Piece::Open(mark));
    }
}

fn emit_close(out: &mut Vec<Piece>, mark: Mark) {
    if out.last() == Some(&Piece::Open(mark)) {
        out.pop();
    } else {
        out.push(Piece::Close(mark));
    }
}

fn strip_trailing_breaks(out: &mut Vec<Piece>) {
    let last_content = out
        .iter()
        .rposition(|p| matches!(p, Piece::Text(_) | Piece::Image(_)));
    let keep_from = last_content.map_or(0, |i| i + 1);
    let tail = out.split_off(keep_from);
    out.extend(tail.into_iter().filter(|p| *p != Piece::Break));
}

pub(crate) fn render(pieces: &[Piece]) -> String {
    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Image(id) => out.push_str(&placeholder(id)),
            Piece::Break => out.push('\n'),
            Piece::Open(mark) => out.push_str(mark.open_tag()),
            Piece::Close(mark) => out.push_str(mark.close_tag()),
        }
    }
    out
}
