//! Session state machine.
//!
//! ```text
//! (none) --create--> Active --refine--> Active --reset--> Reset
//! ```
//!
//! `preview` is a read-only self-loop on `Active`. Creation is all-or-nothing:
//! the session is stored only after the backend has produced the first
//! article, so a failed create leaves no trace.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use uuid::Uuid;

use crate::codec::forward;
use crate::documents::DocumentProvider;
use crate::error::{ArticleError, Result};
use crate::generator::{ArticleGenerator, GenerationRequest, RefinementRequest};
use crate::models::*;
use crate::resolver::{placeholder_indices, resolve_placeholders};
use crate::store::SessionStore;

#[derive(Clone)]
pub struct SessionMachine {
    store: SessionStore,
    generator: Arc<dyn ArticleGenerator>,
    documents: Arc<dyn DocumentProvider>,
    image_timeout: Option<Duration>,
}

fn require_instruction(instruction: &str) -> Result<()> {
    if instruction.trim().is_empty() {
        return Err(ArticleError::invalid("instruction must not be blank"));
    }
    Ok(())
}

impl SessionMachine {
    pub fn new(
        store: SessionStore,
        generator: Arc<dyn ArticleGenerator>,
        documents: Arc<dyn DocumentProvider>,
    ) -> Self {
        Self {
            store,
            generator,
            documents,
            image_timeout: None,
        }
    }

    /// Bound every single image download. A download that runs past `limit`
    /// counts as a resolution failure for that image only.
    pub fn with_image_timeout(mut self, limit: Duration) -> Self {
        self.image_timeout = Some(limit);
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Start a session from a block snapshot and produce the first article.
    pub async fn create(
        &self,
        doc_id: &str,
        blocks: Vec<ContentBlock>,
        instruction: &str,
    ) -> Result<TurnOutcome> {
        if blocks.is_empty() {
            return Err(ArticleError::invalid("document has no content blocks"));
        }
        require_instruction(instruction)?;

        let source = forward(&blocks);
        let images = self.images_for_backend(doc_id, &source.image_tokens()).await;
        let request = GenerationRequest {
            session_id: Uuid::new_v4(),
            doc_id: doc_id.to_string(),
            source,
            images,
            instruction: instruction.to_string(),
        };
        tracing::debug!(
            doc_id,
            blocks = blocks.len(),
            images = request.source.images.len(),
            image_payloads = request.images.len(),
            text_len = request.source.text.len(),
            "Generating first article"
        );

        let content = self.generator.generate(&request).await?;

        let session = Session::first_turn(
            request.session_id,
            request.doc_id,
            blocks,
            instruction,
            content,
        );
        let outcome = TurnOutcome {
            session_id: session.id,
            content: session.current_article.clone(),
            messages: session.history.clone(),
        };
        self.store.create(session).await?;

        tracing::info!(session_id = %outcome.session_id, doc_id, "Created session");
        Ok(outcome)
    }

    /// Run one refinement turn against an active session.
    pub async fn refine(&self, session_id: Uuid, instruction: &str) -> Result<TurnOutcome> {
        require_instruction(instruction)?;

        let turn = self.store.begin_turn(session_id).await?;
        let session = turn.snapshot().await?;

        let source = forward(&session.blocks);
        let images = self
            .images_for_backend(&session.doc_id, &source.image_tokens())
            .await;
        let request = RefinementRequest {
            session_id,
            source,
            images,
            history: session.history,
            current_article: session.current_article,
            instruction: instruction.to_string(),
        };
        let content = self.generator.refine(&request).await?;

        let updated = turn
            .commit(|s| s.push_turn(instruction, content))
            .await
            .inspect_err(|_| {
                tracing::warn!(%session_id, "Session reset during refinement, discarding result");
            })?;

        tracing::info!(%session_id, turns = updated.turns(), "Refined article");
        Ok(TurnOutcome {
            session_id,
            content: updated.current_article,
            messages: updated.history,
        })
    }

    /// Render the current article with its images resolved. Never mutates.
    pub async fn preview(&self, session_id: Uuid) -> Result<Preview> {
        let session = self.store.get(session_id).await?;
        let images = self.resolve_images(&session).await;

        let unmatched: Vec<usize> = placeholder_indices(&session.current_article)
            .into_iter()
            .filter(|&k| k > images.len())
            .collect();
        if !unmatched.is_empty() {
            tracing::debug!(%session_id, ?unmatched, "Placeholders without a resolved image");
        }

        Ok(Preview {
            session_id,
            article_content: resolve_placeholders(&session.current_article, &images),
            doc_id: session.doc_id,
            images,
            original_blocks: session.blocks,
        })
    }

    /// Resolve every image block, keeping block order. Failures are logged
    /// and skipped.
    pub async fn resolve_images(&self, session: &Session) -> Vec<ResolvedImage> {
        self.resolve_tokens(&session.doc_id, &session.image_tokens())
            .await
    }

    /// Images are only downloaded for backends that can take them.
    async fn images_for_backend(&self, doc_id: &str, tokens: &[&str]) -> Vec<ResolvedImage> {
        if tokens.is_empty() || !self.generator.supports_images() {
            return Vec::new();
        }
        self.resolve_tokens(doc_id, tokens).await
    }

    async fn resolve_tokens(&self, doc_id: &str, tokens: &[&str]) -> Vec<ResolvedImage> {
        let results = join_all(tokens.iter().map(|token| self.resolve_one(doc_id, token))).await;

        results
            .into_iter()
            .filter_map(|result| match result {
                Ok(image) => Some(image),
                Err(failure) => {
                    tracing::warn!(doc_id, "{}", failure);
                    None
                }
            })
            .collect()
    }

    async fn resolve_one(&self, doc_id: &str, token: &str) -> Result<ResolvedImage> {
        let failure = |reason: String| ArticleError::ResolutionFailure {
            token: token.to_string(),
            reason,
        };

        let fetch = self.documents.resolve_image(doc_id, token);
        let fetched = match self.image_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| failure(format!("timed out after {}s", limit.as_secs_f32())))?,
            None => fetch.await,
        };
        fetched.map_err(|e| failure(e.to_string()))
    }

    /// Mark the session `Reset` and release it.
    ///
    /// Unknown or already reset ids report `SessionNotFound`.
    pub async fn reset(&self, session_id: Uuid) -> Result<()> {
        self.store.delete(session_id).await?;

        if let Err(e) = self.generator.release(session_id).await {
            tracing::warn!(%session_id, "Backend failed to release session: {}", e);
        }
        tracing::info!(%session_id, "Reset session");
        Ok(())
    }

    pub async fn get(&self, session_id: Uuid) -> Result<SessionSummary> {
        self.store.get(session_id).await.map(|s| s.summary())
    }

    pub async fn list(&self) -> Vec<SessionSummary> {
        self.store.list().await
    }
}
