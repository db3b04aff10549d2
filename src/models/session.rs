use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::block::{ContentBlock, ResolvedImage};

/// One document-to-article conversation.
///
/// Sessions are **ephemeral**: they live only in the session store and are
/// released when reset. `blocks` is the snapshot captured at creation and
/// never changes afterwards; `history` is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Originating document, kept for scoping and audit.
    pub doc_id: String,
    pub blocks: Vec<ContentBlock>,
    pub history: Vec<Message>,
    /// Latest article text; always equals the last assistant entry.
    pub current_article: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of a session.
///
/// - `Active`: accepts refine, preview and reset
/// - `Reset`: terminal, no operation accepts the id again
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Reset,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

impl Session {
    /// Build an `Active` session whose first turn is already complete.
    pub fn first_turn(
        id: Uuid,
        doc_id: String,
        blocks: Vec<ContentBlock>,
        instruction: &str,
        content: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            doc_id,
            blocks,
            history: vec![Message::user(instruction), Message::assistant(content.clone())],
            current_article: content,
            state: SessionState::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append one user/assistant turn and make `content` the current article.
    pub fn push_turn(&mut self, instruction: &str, content: String) {
        self.history.push(Message::user(instruction));
        self.history.push(Message::assistant(content.clone()));
        self.current_article = content;
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Number of completed user/assistant turns.
    pub fn turns(&self) -> usize {
        self.history.len() / 2
    }

    /// Image tokens in block order.
    pub fn image_tokens(&self) -> Vec<&str> {
        self.blocks.iter().filter_map(|b| b.image_token()).collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            doc_id: self.doc_id.clone(),
            state: self.state,
            message_count: self.history.len(),
            current_article: self.current_article.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Session info without the block snapshot or full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub doc_id: String,
    pub state: SessionState,
    pub message_count: usize,
    pub current_article: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a create or refine turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub session_id: Uuid,
    pub content: String,
    /// Full history after the turn.
    pub messages: Vec<Message>,
}

/// Rendered article with every resolvable placeholder replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    pub session_id: Uuid,
    pub doc_id: String,
    pub article_content: String,
    /// Successfully resolved images, in block order.
    pub images: Vec<ResolvedImage>,
    pub original_blocks: Vec<ContentBlock>,
}

/// Input for starting a session.
///
/// When `blocks` is omitted the workspace reads them from the document provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    pub doc_id: String,
    #[serde(default)]
    pub blocks: Option<Vec<ContentBlock>>,
    pub instruction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineArticleInput {
    pub session_id: Uuid,
    pub instruction: String,
}

/// Options for publishing the current article.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishOptions {
    /// Target document; defaults to the session's source document.
    #[serde(default)]
    pub doc_id: Option<String>,
    /// Turn standalone placeholder lines back into image blocks.
    #[serde(default)]
    pub reinsert_images: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    pub session_id: Uuid,
    pub doc_id: String,
    pub blocks_written: usize,
    pub images_reinserted: usize,
}

/// Blocks read from the document provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContent {
    pub doc_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub blocks: Vec<ContentBlock>,
}
