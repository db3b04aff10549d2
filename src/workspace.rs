//! Workspace orchestrator: maps user actions onto the session machine, the
//! generation backend and the document provider.
//!
//! Every call that reaches a remote service is bounded by the configured
//! timeout and surfaces `BackendUnavailable` when it elapses. Dropping a
//! bounded call drops its turn without committing anything. Image downloads
//! are bounded one by one instead, so a stalled image only drops that image.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::codec::{markdown_to_blocks, reinsert_images};
use crate::config::Config;
use crate::documents::{DocumentProvider, OpenApiDocuments};
use crate::error::{ArticleError, Result};
use crate::generator::{ArticleGenerator, ChatCompletionsGenerator};
use crate::models::*;
use crate::session::SessionMachine;
use crate::store::SessionStore;

#[derive(Clone)]
pub struct Workspace {
    machine: SessionMachine,
    documents: Arc<dyn DocumentProvider>,
    timeout: Duration,
}

impl Workspace {
    pub fn new(
        store: SessionStore,
        generator: Arc<dyn ArticleGenerator>,
        documents: Arc<dyn DocumentProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            machine: SessionMachine::new(store, generator, documents.clone())
                .with_image_timeout(timeout),
            documents,
            timeout,
        }
    }

    /// Wire the HTTP clients described by `config` around a fresh store.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SessionStore::new(),
            Arc::new(ChatCompletionsGenerator::new(&config.generator)),
            Arc::new(OpenApiDocuments::new(&config.documents)),
            config.backend_timeout,
        )
    }

    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    async fn bounded<T, F>(&self, action: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(action, timeout = ?self.timeout, "Backend call timed out");
                Err(ArticleError::backend(format!(
                    "{} timed out after {}s",
                    action,
                    self.timeout.as_secs_f32()
                )))
            }
        }
    }

    pub async fn load_document(&self, doc_id: &str) -> Result<DocumentContent> {
        let (title, blocks) = self
            .bounded("reading document", async {
                let title = self.documents.read_title(doc_id).await?;
                let blocks = self.documents.read_blocks(doc_id).await?;
                Ok::<_, ArticleError>((title, blocks))
            })
            .await?;

        Ok(DocumentContent {
            doc_id: doc_id.to_string(),
            title,
            blocks,
        })
    }

    /// Fetch one image of a document for direct display.
    pub async fn document_image(&self, doc_id: &str, token: &str) -> Result<ResolvedImage> {
        self.bounded("image download", async {
            self.documents
                .resolve_image(doc_id, token)
                .await
                .map_err(|e| ArticleError::ResolutionFailure {
                    token: token.to_string(),
                    reason: e.to_string(),
                })
        })
        .await
    }

    /// Start a session. Blocks are read from the document when not supplied.
    pub async fn generate(&self, input: CreateArticleInput) -> Result<TurnOutcome> {
        let blocks = match input.blocks {
            Some(blocks) => blocks,
            None => {
                self.bounded("reading document", async {
                    self.documents
                        .read_blocks(&input.doc_id)
                        .await
                        .map_err(ArticleError::from)
                })
                .await?
            }
        };

        self.bounded(
            "generation",
            self.machine.create(&input.doc_id, blocks, &input.instruction),
        )
        .await
    }

    pub async fn refine(&self, input: RefineArticleInput) -> Result<TurnOutcome> {
        self.bounded(
            "refinement",
            self.machine.refine(input.session_id, &input.instruction),
        )
        .await
    }

    /// Never fails on images: each download carries its own timeout.
    pub async fn preview(&self, session_id: Uuid) -> Result<Preview> {
        self.machine.preview(session_id).await
    }

    /// Reset a session, tolerating ids that are already gone.
    ///
    /// Returns whether a live session was released.
    pub async fn reset(&self, session_id: Uuid) -> Result<bool> {
        match self.machine.reset(session_id).await {
            Ok(()) => Ok(true),
            Err(ArticleError::SessionNotFound(_)) => {
                tracing::debug!(%session_id, "Reset of unknown session ignored");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn session(&self, session_id: Uuid) -> Result<SessionSummary> {
        self.machine.get(session_id).await
    }

    pub async fn sessions(&self) -> Vec<SessionSummary> {
        self.machine.list().await
    }

    /// Write the current article to a document as blocks.
    pub async fn publish(&self, session_id: Uuid, options: PublishOptions) -> Result<PublishReport> {
        let session = self.machine.store().get(session_id).await?;

        let blocks = markdown_to_blocks(&session.current_article);
        let (blocks, images_reinserted) = if options.reinsert_images {
            reinsert_images(blocks, &session.image_tokens())
        } else {
            (blocks, 0)
        };
        if blocks.is_empty() {
            return Err(ArticleError::invalid("article has no content to publish"));
        }

        let doc_id = options.doc_id.unwrap_or_else(|| session.doc_id.clone());
        self.bounded("publishing", async {
            self.documents
                .write_blocks(&doc_id, &blocks)
                .await
                .map_err(ArticleError::from)
        })
        .await?;

        tracing::info!(%session_id, doc_id = %doc_id, blocks = blocks.len(), images_reinserted, "Published article");
        Ok(PublishReport {
            session_id,
            doc_id,
            blocks_written: blocks.len(),
            images_reinserted,
        })
    }
}
