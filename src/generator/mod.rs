//! Generation backend seam.
//!
//! The backend is a black box that turns source material into an article and
//! revises it on request. It is expected to treat calls sharing a session id
//! as one conversation.

mod client;

pub use client::*;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::codec::ForwardPrompt;
use crate::error::ArticleError;
use crate::models::{Message, ResolvedImage};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key missing or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<GeneratorError> for ArticleError {
    fn from(e: GeneratorError) -> Self {
        ArticleError::BackendUnavailable(e.to_string())
    }
}

/// First-turn input: text and images travel side by side.
///
/// `images` holds the resolved image payloads in placeholder order. It is
/// empty unless the backend reports [`ArticleGenerator::supports_images`].
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub session_id: Uuid,
    pub doc_id: String,
    pub source: ForwardPrompt,
    pub images: Vec<ResolvedImage>,
    pub instruction: String,
}

/// Continuation input carrying the full conversation so far.
#[derive(Debug, Clone)]
pub struct RefinementRequest {
    pub session_id: Uuid,
    pub source: ForwardPrompt,
    pub images: Vec<ResolvedImage>,
    pub history: Vec<Message>,
    pub current_article: String,
    pub instruction: String,
}

#[async_trait]
pub trait ArticleGenerator: Send + Sync {
    /// Whether image payloads should be resolved and sent with each request.
    fn supports_images(&self) -> bool {
        false
    }

    /// Produce the first article for a new session.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GeneratorError>;

    /// Produce a revised article for an existing session.
    async fn refine(&self, request: &RefinementRequest) -> Result<String, GeneratorError>;

    /// Let the backend drop any state kept for `session_id`.
    async fn release(&self, _session_id: Uuid) -> Result<(), GeneratorError> {
        Ok(())
    }
}
