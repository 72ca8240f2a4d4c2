// Re-export model types and codec functions
pub mod codec;
pub mod markup;
pub mod model;
pub mod placeholder;
pub mod preview;
pub mod tracker;

pub use codec::{decode, encode, encode_nodes, materialize, token_image_ids, unresolved_label};
pub use markup::normalize_markup;
pub use model::{ContentToken, EditableDocument, ImageNode, Mark, Marks, Node, TextRun};
pub use placeholder::{placeholder, referenced_ids, PLACEHOLDER_REGEX};
pub use preview::{excerpt, plain_text};
pub use tracker::{filter_referenced, strip_dangling, unreferenced_ids};
