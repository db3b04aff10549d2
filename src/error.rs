//! Error taxonomy shared by the codec, session machine and workspace.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArticleError {
    /// Blank instruction, empty block set or malformed request. No state changed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown or reset session id.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Generation backend or document provider failed or timed out. Safe to retry.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A single image token could not be resolved.
    #[error("Failed to resolve image {token}: {reason}")]
    ResolutionFailure { token: String, reason: String },
}

impl ArticleError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Self::SessionNotFound(id.to_string())
    }

    pub fn backend(msg: impl std::fmt::Display) -> Self {
        Self::BackendUnavailable(msg.to_string())
    }
}

pub type Result<T, E = ArticleError> = std::result::Result<T, E>;
