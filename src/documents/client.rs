//! HTTP client for the docx open API.
//!
//! Responses come wrapped in a `{code, msg, data}` envelope; a non-zero
//! `code` is an error even when the HTTP status is 200.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{DocumentError, DocumentProvider};
use crate::config::DocumentsConfig;
use crate::models::{ContentBlock, OutboundBlock, OutboundContent, ResolvedImage};

const PAGE_SIZE: u32 = 500;
/// The API accepts at most this many children per insert call.
const WRITE_BATCH: usize = 50;
const BLOCK_TEXT: u32 = 2;
const BLOCK_HEADING1: u32 = 3;
const BLOCK_HEADING9: u32 = 11;
const BLOCK_IMAGE: u32 = 27;
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, Clone)]
pub struct OpenApiDocuments {
    base_url: String,
    access_token: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct BlockPage {
    #[serde(default)]
    items: Vec<RawBlock>,
    #[serde(default)]
    has_more: bool,
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentMeta {
    document: DocumentInfo,
}

#[derive(Debug, Deserialize)]
struct DocumentInfo {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    block_id: String,
    block_type: u32,
    #[serde(flatten)]
    bodies: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    #[serde(default)]
    elements: Vec<TextElement>,
}

#[derive(Debug, Deserialize)]
struct TextElement {
    text_run: Option<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    #[serde(default)]
    content: String,
}

impl OpenApiDocuments {
    pub fn new(config: &DocumentsConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            access_token: config.access_token.clone(),
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref token) = self.access_token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DocumentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(DocumentError::NotFound(body)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DocumentError::Unauthorized),
            _ => Err(DocumentError::Server(format!("{}: {}", status, body))),
        }
    }

    async fn handle_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, DocumentError> {
        let envelope: Envelope<T> = Self::check_status(response).await?.json().await?;
        if envelope.code != 0 {
            return Err(DocumentError::Api {
                code: envelope.code,
                msg: envelope.msg,
            });
        }
        Ok(envelope.data)
    }
}

/// Map a raw API block onto a content block.
///
/// Headings become text with a Markdown marker so the reverse codec puts them
/// back in the same bucket; levels deeper than 3 share the `###` marker. Blocks
/// with blank text and unsupported block types yield `None`.
fn to_content_block(raw: RawBlock) -> Option<ContentBlock> {
    match raw.block_type {
        BLOCK_TEXT => {
            let text = body_text(raw.bodies.get("text")?)?;
            Some(ContentBlock::text(raw.block_id, text))
        }
        BLOCK_HEADING1..=BLOCK_HEADING9 => {
            let level = raw.block_type - BLOCK_HEADING1 + 1;
            let text = body_text(raw.bodies.get(&format!("heading{}", level))?)?;
            let marker = "#".repeat(level.min(3) as usize);
            Some(ContentBlock::text(raw.block_id, format!("{} {}", marker, text)))
        }
        BLOCK_IMAGE => {
            let token = raw.bodies.get("image")?.get("token")?.as_str()?;
            Some(ContentBlock::image(raw.block_id, token))
        }
        _ => None,
    }
}

fn body_text(body: &Value) -> Option<String> {
    let body: TextBody = serde_json::from_value(body.clone()).ok()?;
    let text: String = body
        .elements
        .into_iter()
        .filter_map(|e| e.text_run.map(|r| r.content))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn to_api_block(block: &OutboundBlock) -> Value {
    let text_body = |text: &str| json!({ "elements": [{ "text_run": { "content": text } }] });

    match &block.content {
        OutboundContent::Text { text } => json!({ "block_type": 2, "text": text_body(text) }),
        OutboundContent::Heading1 { text } => {
            json!({ "block_type": 3, "heading1": text_body(text) })
        }
        OutboundContent::Heading2 { text } => {
            json!({ "block_type": 4, "heading2": text_body(text) })
        }
        OutboundContent::Heading3 { text } => {
            json!({ "block_type": 5, "heading3": text_body(text) })
        }
        OutboundContent::Image { image_token } => {
            json!({ "block_type": 27, "image": { "token": image_token } })
        }
    }
}

#[async_trait]
impl DocumentProvider for OpenApiDocuments {
    async fn read_blocks(&self, doc_id: &str) -> Result<Vec<ContentBlock>, DocumentError> {
        let mut blocks = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .request(Method::GET, &format!("/docx/v1/documents/{}/blocks", doc_id))
                .query(&[("page_size", PAGE_SIZE.to_string())]);
            if let Some(ref token) = page_token {
                req = req.query(&[("page_token", token)]);
            }

            let page: BlockPage = Self::handle_envelope(req.send().await?)
                .await?
                .ok_or_else(|| DocumentError::InvalidResponse("missing data".to_string()))?;

            blocks.extend(page.items.into_iter().filter_map(to_content_block));

            match page.page_token {
                Some(token) if page.has_more => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(doc_id, blocks = blocks.len(), "Read document blocks");
        Ok(blocks)
    }

    async fn read_title(&self, doc_id: &str) -> Result<Option<String>, DocumentError> {
        let response = self
            .request(Method::GET, &format!("/docx/v1/documents/{}", doc_id))
            .send()
            .await?;
        let meta: Option<DocumentMeta> = Self::handle_envelope(response).await?;

        Ok(meta
            .and_then(|m| m.document.title)
            .filter(|t| !t.trim().is_empty()))
    }

    async fn resolve_image(
        &self,
        _doc_id: &str,
        token: &str,
    ) -> Result<ResolvedImage, DocumentError> {
        let response = self
            .request(Method::GET, &format!("/drive/v1/medias/{}/download", token))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();
        let bytes = response.bytes().await?;

        Ok(ResolvedImage::from_bytes(mime_type, &bytes))
    }

    async fn write_blocks(
        &self,
        doc_id: &str,
        blocks: &[OutboundBlock],
    ) -> Result<(), DocumentError> {
        for batch in blocks.chunks(WRITE_BATCH) {
            let children: Vec<Value> = batch.iter().map(to_api_block).collect();
            let response = self
                .request(
                    Method::POST,
                    &format!("/docx/v1/documents/{}/blocks/{}/children", doc_id, doc_id),
                )
                .json(&json!({ "children": children, "index": -1 }))
                .send()
                .await?;
            Self::handle_envelope::<Value>(response).await?;
        }

        tracing::info!(doc_id, blocks = blocks.len(), "Wrote blocks to document");
        Ok(())
    }
}
