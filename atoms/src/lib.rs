//! Domain atoms for inline-image content.
//!
//! `media` knows about image assets and where they live; `content` knows
//! how stored placeholder text maps onto the editable rich-content tree.
//! Nothing in here performs I/O.

pub mod content;
pub mod media;
