//! Native Ollama provider.
//!
//! Talks to a local Ollama server (`http://localhost:11434` by default)
//! over its own `/api/chat` endpoint. Streaming responses arrive as
//! newline-delimited JSON objects, each carrying a `message.content`
//! fragment, until one arrives with `done: true`.

use async_trait::async_trait;
use futures::StreamExt;
use promptgate_core::error::ProviderError;
use promptgate_core::message::Message;
use promptgate_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::wire::{LineBuffer, http_client, reject_status, transport_error};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// A provider backed by a local Ollama server.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the given base URL (without the `/api` suffix).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(300),
        }
    }

    /// Provider for `http://localhost:11434`.
    pub fn local() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> ChatRequest {
        ChatRequest {
            model: request.model.clone(),
            messages: Self::to_api_messages(&request.messages),
            stream,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                stop: request.stop.clone(),
            },
        }
    }

    async fn post_chat(&self, request: &ProviderRequest, stream: bool) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = Self::request_body(request, stream);

        debug!(
            provider = "ollama",
            model = %request.model,
            context_name = request.context_name.as_deref().unwrap_or(""),
            prompt_chars = request.messages.iter().map(|m| m.content.len()).sum::<usize>(),
            stream,
            "Sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("ollama", &self.base_url, &e))?;

        reject_status("ollama", &request.model, response).await
    }
}

/// What a single NDJSON line means for the stream.
#[derive(Debug, PartialEq)]
enum ChatLine {
    Fragment(String),
    Done(Option<(u32, u32)>),
    Skip,
}

/// Decode one line of an `/api/chat` stream.
fn decode_line(line: &str) -> Result<ChatLine, ProviderError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ChatLine::Skip);
    }

    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|e| ProviderError::StreamInterrupted(format!("malformed stream fragment: {e}")))?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::StreamInterrupted(error));
    }

    if chunk.done {
        let usage = match (chunk.prompt_eval_count, chunk.eval_count) {
            (Some(p), Some(c)) => Some((p, c)),
            _ => None,
        };
        return Ok(ChatLine::Done(usage));
    }

    match chunk.message {
        Some(message) if !message.content.is_empty() => Ok(ChatLine::Fragment(message.content)),
        _ => Ok(ChatLine::Skip),
    }
}

fn usage_from(counts: Option<(u32, u32)>) -> Option<Usage> {
    counts.map(|(prompt, completion)| Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: prompt + completion,
    })
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let response = self.post_chat(&request, false).await?;

        let chunk: ChatChunk = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        if let Some(error) = chunk.error {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: error,
            });
        }

        Ok(ProviderResponse {
            message: Message::assistant(chunk.message.map(|m| m.content).unwrap_or_default()),
            usage: usage_from(chunk.prompt_eval_count.zip(chunk.eval_count)),
            model: chunk.model.unwrap_or(request.model),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let response = self.post_chat(&request, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = LineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::StreamInterrupted(e.to_string()))).await;
                        return;
                    }
                };
                lines.push(&bytes);

                while let Some(line) = lines.next_line() {
                    match decode_line(&line) {
                        Ok(ChatLine::Fragment(text)) => {
                            if tx.send(Ok(StreamChunk::text(text))).await.is_err() {
                                return; // receiver dropped
                            }
                        }
                        Ok(ChatLine::Done(counts)) => {
                            let _ = tx.send(Ok(StreamChunk::finished(usage_from(counts)))).await;
                            return;
                        }
                        Ok(ChatLine::Skip) => trace!("Skipping empty stream line"),
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            // Connection closed without a done marker; flush any final line.
            if let Some(line) = lines.finish() {
                match decode_line(&line) {
                    Ok(ChatLine::Fragment(text)) => {
                        let _ = tx.send(Ok(StreamChunk::text(text))).await;
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                    Ok(_) => {}
                }
            }
            let _ = tx.send(Ok(StreamChunk::finished(None))).await;
        });

        Ok(rx)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("ollama", &self.base_url, &e))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                debug!(error = %e, "Ollama health check failed");
                Ok(false)
            }
        }
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

/// One object of an `/api/chat` response (streamed or not).
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<ApiMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
