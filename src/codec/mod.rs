//! Conversion between block sequences and Markdown.
//!
//! The forward direction flattens a document into the text and image lists a
//! generation backend consumes. Text and images travel as parallel inputs
//! because the backend decides where images land in the article, marking
//! them with `image_<k>` placeholders. The reverse direction
//! ([`markdown_to_blocks`]) turns an article back into blocks for publishing.

mod markdown;
pub mod prompt;

pub use markdown::*;

use serde::{Deserialize, Serialize};

use crate::models::{BlockContent, ContentBlock};

/// Separator placed between consecutive text blocks in the prompt text.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Flattened document content handed to the generation backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardPrompt {
    /// Text block contents in order, joined by [`BLOCK_SEPARATOR`].
    pub text: String,
    /// Image blocks in their original relative order.
    pub images: Vec<ImageRef>,
}

/// An image block as seen by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// 1-based placeholder index (`image_<index>`).
    pub index: usize,
    pub token: String,
    /// Position of the block in the source sequence.
    pub position: usize,
}

impl ForwardPrompt {
    pub fn image_tokens(&self) -> Vec<&str> {
        self.images.iter().map(|i| i.token.as_str()).collect()
    }
}

/// Split a block sequence into prompt text and image references.
///
/// Whitespace-only text blocks are kept as empty entries so they still show up
/// as blank lines; nothing is reordered or dropped.
pub fn forward(blocks: &[ContentBlock]) -> ForwardPrompt {
    let mut texts: Vec<&str> = Vec::new();
    let mut images = Vec::new();

    for (position, block) in blocks.iter().enumerate() {
        match &block.content {
            BlockContent::Text { text } => {
                if text.trim().is_empty() {
                    texts.push("");
                } else {
                    texts.push(text);
                }
            }
            BlockContent::Image { image_token } => images.push(ImageRef {
                index: images.len() + 1,
                token: image_token.clone(),
                position,
            }),
        }
    }

    ForwardPrompt {
        text: texts.join(BLOCK_SEPARATOR),
        images,
    }
}
