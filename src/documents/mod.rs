//! Document provider seam: reading blocks, resolving images, writing blocks.

mod client;

pub use client::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ArticleError;
use crate::models::{ContentBlock, OutboundBlock, ResolvedImage};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: access token missing or invalid")]
    Unauthorized,

    #[error("Document API error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<DocumentError> for ArticleError {
    fn from(e: DocumentError) -> Self {
        ArticleError::BackendUnavailable(e.to_string())
    }
}

#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Read the document's text and image blocks in reading order.
    async fn read_blocks(&self, doc_id: &str) -> Result<Vec<ContentBlock>, DocumentError>;

    /// The document title, when the provider knows one.
    async fn read_title(&self, _doc_id: &str) -> Result<Option<String>, DocumentError> {
        Ok(None)
    }

    /// Fetch the bytes behind an image token.
    async fn resolve_image(&self, doc_id: &str, token: &str)
        -> Result<ResolvedImage, DocumentError>;

    /// Append blocks to the end of a document.
    async fn write_blocks(&self, doc_id: &str, blocks: &[OutboundBlock])
        -> Result<(), DocumentError>;
}
