//! HTTP client for OpenAI-compatible chat-completions endpoints.
//!
//! Sessions are kept by docsmith, so every call replays the whole conversation
//! exactly as it was first sent: the system prompt, the first-turn prompt, and
//! each refine prompt with its answer, followed by the new request.
//!
//! Multimodal backends get the resolved images as `image_url` content parts
//! on the first-turn message.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ArticleGenerator, GenerationRequest, GeneratorError, RefinementRequest};
use crate::codec::{prompt, ForwardPrompt};
use crate::config::GeneratorConfig;
use crate::models::{ResolvedImage, Role};

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct ChatCompletionsGenerator {
    base_url: String,
    model: String,
    api_key: Option<String>,
    multimodal: bool,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

fn message(role: &str, content: impl Into<String>) -> Value {
    json!({ "role": role, "content": content.into() })
}

/// A user message carrying text plus inline `data:` images.
fn user_message(text: String, images: &[ResolvedImage]) -> Value {
    if images.is_empty() {
        return message("user", text);
    }

    let mut parts = vec![json!({ "type": "text", "text": text })];
    parts.extend(images.iter().map(|image| {
        json!({
            "type": "image_url",
            "image_url": { "url": image.data_uri() }
        })
    }));
    json!({ "role": "user", "content": parts })
}

fn first_turn(source: &ForwardPrompt, images: &[ResolvedImage], instruction: &str) -> Vec<Value> {
    vec![
        message("system", prompt::SYSTEM_PROMPT),
        user_message(prompt::create_prompt(source, instruction), images),
    ]
}

/// Rebuild the messages of every earlier turn, then append the new request.
///
/// A later user entry was sent as a refine prompt over the assistant answer
/// right before it, so it is replayed in that form.
fn conversation(request: &RefinementRequest) -> Vec<Value> {
    let mut messages = vec![message("system", prompt::SYSTEM_PROMPT)];

    for (i, entry) in request.history.iter().enumerate() {
        let replayed = match (entry.role, i) {
            (Role::User, 0) => user_message(
                prompt::create_prompt(&request.source, &entry.content),
                &request.images,
            ),
            (Role::User, _) => message(
                "user",
                prompt::refine_prompt(&request.history[i - 1].content, &entry.content),
            ),
            (Role::Assistant, _) => message("assistant", entry.content.as_str()),
        };
        messages.push(replayed);
    }
    messages.push(message(
        "user",
        prompt::refine_prompt(&request.current_article, &request.instruction),
    ));

    messages
}

impl ChatCompletionsGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            multimodal: config.multimodal,
            client: Client::new(),
        }
    }

    async fn complete(&self, messages: Vec<Value>) -> Result<String, GeneratorError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        tracing::debug!(
            model = %self.model,
            messages = body.messages.len(),
            multimodal = self.multimodal,
            "Calling chat completions"
        );
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST => GeneratorError::BadRequest(body),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GeneratorError::Unauthorized,
                _ => GeneratorError::Server(format!("{}: {}", status, body)),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GeneratorError::InvalidResponse("no completion returned".to_string()))
    }
}

#[async_trait]
impl ArticleGenerator for ChatCompletionsGenerator {
    fn supports_images(&self) -> bool {
        self.multimodal
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GeneratorError> {
        self.complete(first_turn(&request.source, &request.images, &request.instruction))
            .await
    }

    async fn refine(&self, request: &RefinementRequest) -> Result<String, GeneratorError> {
        self.complete(conversation(request)).await
    }
}
