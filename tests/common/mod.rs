//! Scripted stand-ins for the generation backend and the document provider.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docsmith::documents::{DocumentError, DocumentProvider};
use docsmith::generator::{ArticleGenerator, GenerationRequest, GeneratorError, RefinementRequest};
use docsmith::models::*;
use docsmith::store::SessionStore;
use docsmith::workspace::Workspace;
use tokio::sync::Notify;
use uuid::Uuid;

/// Generator that answers from a script, falling back to numbered articles.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub generated: Mutex<Vec<GenerationRequest>>,
    pub refined: Mutex<Vec<RefinementRequest>>,
    pub released: Mutex<Vec<Uuid>>,
    delay: Mutex<Option<Duration>>,
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
    images: AtomicBool,
}

impl ScriptedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, content: &str) {
        self.replies.lock().unwrap().push_back(Ok(content.to_string()));
    }

    pub fn fail_next(&self, reason: &str) {
        self.replies.lock().unwrap().push_back(Err(reason.to_string()));
    }

    /// Ask for image payloads like a multimodal model.
    pub fn accept_images(&self) {
        self.images.store(true, Ordering::SeqCst);
    }

    pub fn delay_all(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Pause the next call: `entered` fires once the call is in flight, and
    /// the call finishes only after `release` is notified.
    pub fn hold_next(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((entered.clone(), release.clone()));
        (entered, release)
    }

    pub fn generate_calls(&self) -> usize {
        self.generated.lock().unwrap().len()
    }

    pub fn refine_calls(&self) -> usize {
        self.refined.lock().unwrap().len()
    }

    async fn answer(&self, fallback: String) -> Result<String, GeneratorError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(content),
            Some(Err(reason)) => Err(GeneratorError::Server(reason)),
            None => Ok(fallback),
        }
    }
}

#[async_trait]
impl ArticleGenerator for ScriptedGenerator {
    fn supports_images(&self) -> bool {
        self.images.load(Ordering::SeqCst)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GeneratorError> {
        self.generated.lock().unwrap().push(request.clone());
        self.answer(format!("# Article\n\n{}", request.instruction)).await
    }

    async fn refine(&self, request: &RefinementRequest) -> Result<String, GeneratorError> {
        self.refined.lock().unwrap().push(request.clone());
        let turn = request.history.len() / 2 + 1;
        self.answer(format!("# Article v{}\n\n{}", turn, request.instruction))
            .await
    }

    async fn release(&self, session_id: Uuid) -> Result<(), GeneratorError> {
        self.released.lock().unwrap().push(session_id);
        Ok(())
    }
}

/// Document provider backed by in-memory maps.
#[derive(Default)]
pub struct MemoryDocuments {
    docs: Mutex<HashMap<String, Vec<ContentBlock>>>,
    titles: Mutex<HashMap<String, String>>,
    images: Mutex<HashMap<String, ResolvedImage>>,
    broken: Mutex<HashSet<String>>,
    slow: Mutex<HashMap<String, Duration>>,
    pub resolved: Mutex<Vec<String>>,
    pub written: Mutex<Vec<(String, Vec<OutboundBlock>)>>,
}

impl MemoryDocuments {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_document(&self, doc_id: &str, blocks: Vec<ContentBlock>) {
        self.docs.lock().unwrap().insert(doc_id.to_string(), blocks);
    }

    pub fn set_title(&self, doc_id: &str, title: &str) {
        self.titles
            .lock()
            .unwrap()
            .insert(doc_id.to_string(), title.to_string());
    }

    /// Make downloads of `token` take `delay` before answering.
    pub fn slow_image(&self, token: &str, delay: Duration) {
        self.slow.lock().unwrap().insert(token.to_string(), delay);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolved.lock().unwrap().len()
    }

    pub fn add_image(&self, token: &str, mime_type: &str, bytes: &[u8]) {
        self.images
            .lock()
            .unwrap()
            .insert(token.to_string(), ResolvedImage::from_bytes(mime_type, bytes));
    }

    pub fn break_image(&self, token: &str) {
        self.broken.lock().unwrap().insert(token.to_string());
    }

    pub fn writes(&self) -> Vec<(String, Vec<OutboundBlock>)> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentProvider for MemoryDocuments {
    async fn read_blocks(&self, doc_id: &str) -> Result<Vec<ContentBlock>, DocumentError> {
        self.docs
            .lock()
            .unwrap()
            .get(doc_id)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))
    }

    async fn read_title(&self, doc_id: &str) -> Result<Option<String>, DocumentError> {
        Ok(self.titles.lock().unwrap().get(doc_id).cloned())
    }

    async fn resolve_image(&self, _doc_id: &str, token: &str) -> Result<ResolvedImage, DocumentError> {
        self.resolved.lock().unwrap().push(token.to_string());
        let delay = self.slow.lock().unwrap().get(token).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.broken.lock().unwrap().contains(token) {
            return Err(DocumentError::Server(format!("download of {} failed", token)));
        }
        self.images
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(token.to_string()))
    }

    async fn write_blocks(&self, doc_id: &str, blocks: &[OutboundBlock]) -> Result<(), DocumentError> {
        self.written
            .lock()
            .unwrap()
            .push((doc_id.to_string(), blocks.to_vec()));
        Ok(())
    }
}

pub fn sample_blocks() -> Vec<ContentBlock> {
    vec![
        ContentBlock::text("b1", "# Title"),
        ContentBlock::text("b2", "body"),
        ContentBlock::image("b3", "tok1"),
    ]
}

pub struct Harness {
    pub generator: Arc<ScriptedGenerator>,
    pub documents: Arc<MemoryDocuments>,
    pub store: SessionStore,
    pub workspace: Workspace,
}

pub fn harness() -> Harness {
    harness_with_timeout(Duration::from_secs(5))
}

pub fn harness_with_timeout(timeout: Duration) -> Harness {
    let generator = ScriptedGenerator::new();
    let documents = MemoryDocuments::new();
    let store = SessionStore::new();
    let workspace = Workspace::new(store.clone(), generator.clone(), documents.clone(), timeout);
    Harness {
        generator,
        documents,
        store,
        workspace,
    }
}
