use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A single unit of document content.
///
/// Blocks form an ordered sequence; position encodes reading order and is
/// significant in both codec directions. The payload is carried by
/// [`BlockContent`], so a text block always has text and an image block
/// always has a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Stable identifier, unique within one document snapshot.
    #[serde(rename = "block_id")]
    pub id: String,
    #[serde(flatten)]
    pub content: BlockContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "block_type", rename_all = "snake_case")]
pub enum BlockContent {
    Text {
        #[serde(default)]
        text: String,
    },
    /// The token is opaque; only the document provider can turn it into bytes.
    Image { image_token: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    Image,
}

impl ContentBlock {
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: BlockContent::Text { text: text.into() },
        }
    }

    pub fn image(id: impl Into<String>, image_token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: BlockContent::Image {
                image_token: image_token.into(),
            },
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self.content {
            BlockContent::Text { .. } => BlockKind::Text,
            BlockContent::Image { .. } => BlockKind::Image,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            BlockContent::Text { text } => Some(text),
            BlockContent::Image { .. } => None,
        }
    }

    pub fn image_token(&self) -> Option<&str> {
        match &self.content {
            BlockContent::Image { image_token } => Some(image_token),
            BlockContent::Text { .. } => None,
        }
    }
}

/// Image bytes resolved from a token, ready for inline rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedImage {
    pub mime_type: String,
    /// Standard base64 (padded) encoding of the image bytes.
    pub data: String,
}

impl ResolvedImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64_STANDARD.encode(bytes),
        }
    }

    /// Load a local image file, inferring the MIME type from its extension.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(mime_for_path(path), &bytes))
    }

    /// Decode the payload back into raw image bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(&self.data)
    }

    /// The `data:` URI used when embedding this image in Markdown.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// A block produced from Markdown for writing back through the document provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundBlock {
    /// Synthetic id assigned in output order (`md-1`, `md-2`, ...).
    pub id: String,
    #[serde(flatten)]
    pub content: OutboundContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundContent {
    Heading1 { text: String },
    Heading2 { text: String },
    Heading3 { text: String },
    Text { text: String },
    Image { image_token: String },
}

impl OutboundBlock {
    /// Numeric block type understood by the document API.
    pub fn block_type(&self) -> u32 {
        match self.content {
            OutboundContent::Text { .. } => 2,
            OutboundContent::Heading1 { .. } => 3,
            OutboundContent::Heading2 { .. } => 4,
            OutboundContent::Heading3 { .. } => 5,
            OutboundContent::Image { .. } => 27,
        }
    }

    /// Heading level, or `None` for body text and images.
    pub fn heading_level(&self) -> Option<u8> {
        match self.content {
            OutboundContent::Heading1 { .. } => Some(1),
            OutboundContent::Heading2 { .. } => Some(2),
            OutboundContent::Heading3 { .. } => Some(3),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            OutboundContent::Heading1 { text }
            | OutboundContent::Heading2 { text }
            | OutboundContent::Heading3 { text }
            | OutboundContent::Text { text } => Some(text),
            OutboundContent::Image { .. } => None,
        }
    }
}
