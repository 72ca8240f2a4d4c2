//! The `[IMG:<id>]` wire format.
//!
//! Records written by every earlier version use this grammar, so it must
//! not change. Ids are integers, or integers with a fractional part for
//! the float ids older clients generated.

use crate::media::model::AssetId;
use regex::Regex;
use std::sync::LazyLock;

pub static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[IMG:([0-9]+(?:\.[0-9]+)?)\]").expect("placeholder regex"));

pub fn placeholder(id: &AssetId) -> String {
    format!("[IMG:{}]", id)
}

/// Ids referenced by `text`, in order of appearance, repeats included.
pub fn referenced_ids(text: &str) -> Vec<&str> {
    PLACEHOLDER_REGEX
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_format() {
        assert_eq!(placeholder(&AssetId::new("42")), "[IMG:42]");
    }

    #[test]
    fn test_referenced_ids_in_order() {
        let text = "a [IMG:3] b [IMG:1699999999999.123] c [IMG:3]";
        assert_eq!(referenced_ids(text), vec!["3", "1699999999999.123", "3"]);
    }

    #[test]
    fn test_malformed_placeholders_are_ignored() {
        let text = "[IMG:] [IMG:abc] [IMG:1.] [img:4] [IMG: 5] [IMG:6";
        assert!(referenced_ids(text).is_empty());
    }

    #[test]
    fn test_only_ascii_digits_are_ids() {
        assert!(referenced_ids("[IMG:٣] [IMG:１２]").is_empty());
        assert_eq!(referenced_ids("[IMG:٣][IMG:3]"), vec!["3"]);
    }
}
