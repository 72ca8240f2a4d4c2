use crate::media::model::{AssetId, ImageAsset};
use serde::{Deserialize, Serialize};

/// One piece of decoded stored text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentToken {
    #[serde(rename_all = "camelCase")]
    ImageRef { image_ref: AssetId },
    Text { text: String },
}

impl ContentToken {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(id: impl Into<AssetId>) -> Self {
        Self::ImageRef {
            image_ref: id.into(),
        }
    }
}

/// Inline formatting a text run may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
}

impl Mark {
    /// Canonical nesting order, outermost first.
    pub const ALL: [Mark; 3] = [Mark::Bold, Mark::Italic, Mark::Underline];

    pub(crate) fn index(self) -> usize {
        match self {
            Mark::Bold => 0,
            Mark::Italic => 1,
            Mark::Underline => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl Marks {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn with(mut self, mark: Mark) -> Self {
        self.set(mark, true);
        self
    }

    pub fn contains(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Underline => self.underline,
        }
    }

    pub fn set(&mut self, mark: Mark, on: bool) {
        match mark {
            Mark::Bold => self.bold = on,
            Mark::Italic => self.italic = on,
            Mark::Underline => self.underline = on,
        }
    }

    pub fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.underline)
    }

    /// Active marks in canonical order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Mark> + '_ {
        Mark::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageNode {
    pub id: AssetId,
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

/// A node of the editable rich-content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Text(TextRun),
    LineBreak,
    Image(ImageNode),
    Paragraph { children: Vec<Node> },
}

/// What the editing surface works on: the content tree plus every image
/// asset the document knows about, referenced or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditableDocument {
    pub nodes: Vec<Node>,
    pub assets: Vec<ImageAsset>,
}

impl EditableDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text, extending the previous run when the formatting matches.
    pub fn push_text(&mut self, text: &str, marks: Marks) {
        push_run(&mut self.nodes, text, marks);
    }

    pub fn push_line_break(&mut self) {
        self.nodes.push(Node::LineBreak);
    }

    /// Register `asset` (once per id) and append an image node bound to it.
    ///
    /// An id the placeholder grammar cannot carry is replaced by a fresh
    /// one. Returns the id the node is bound to.
    pub fn insert_image(&mut self, mut asset: ImageAsset) -> AssetId {
        if !asset.id.fits_placeholder() {
            let replacement = AssetId::generate();
            tracing::warn!(
                "⚠️ Image id={} cannot be referenced from text, inserting as id={}",
                asset.id,
                replacement,
            );
            asset.id = replacement;
        }

        let id = asset.id.clone();
        self.nodes.push(Node::Image(ImageNode {
            id: id.clone(),
            url: asset.url.clone(),
            alt: asset.alt_text(),
        }));
        if self.asset(&id).is_none() {
            self.assets.push(asset);
        }
        id
    }

    /// Remove every image node bound to `id`. The asset stays registered;
    /// saving drops it once nothing references it. Returns the number of
    /// nodes removed.
    pub fn remove_image(&mut self, id: &AssetId) -> usize {
        remove_images(&mut self.nodes, id)
    }

    /// Image ids in document order, repeats included.
    pub fn image_ids(&self) -> Vec<AssetId> {
        let mut ids = Vec::new();
        collect_image_ids(&self.nodes, &mut ids);
        ids
    }

    pub fn asset(&self, id: &AssetId) -> Option<&ImageAsset> {
        self.assets.iter().find(|a| &a.id == id)
    }
}

pub(crate) fn push_run(nodes: &mut Vec<Node>, text: &str, marks: Marks) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        if last.marks == marks {
            last.text.push_str(text);
            return;
        }
    }
    nodes.push(Node::Text(TextRun {
        text: text.to_string(),
        marks,
    }));
}

fn remove_images(nodes: &mut Vec<Node>, id: &AssetId) -> usize {
    let before = nodes.len();
    nodes.retain(|node| !matches!(node, Node::Image(image) if &image.id == id));
    let mut removed = before - nodes.len();
    for node in nodes.iter_mut() {
        if let Node::Paragraph { children } = node {
            removed += remove_images(children, id);
        }
    }
    removed
}

fn collect_image_ids(nodes: &[Node], ids: &mut Vec<AssetId>) {
    for node in nodes {
        match node {
            Node::Image(image) => ids.push(image.id.clone()),
            Node::Paragraph { children } => collect_image_ids(children, ids),
            Node::Text(_) | Node::LineBreak => {}
        }
    }
}
