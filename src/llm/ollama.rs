//! Ollama client implementation
//!
//! Async HTTP client for the Ollama `/api/chat` endpoint with tool calling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{ChatError, Config, Message, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{BackendReply, ModelBackend, TokenUsage};

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

/// Outbound message: role and content, nothing else
#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ReplyMessage,
    #[serde(default)]
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

/// Ollama tool call format
#[derive(Debug, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

/// Ollama function in tool call
#[derive(Debug, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ollama.timeout_secs))
            .build()
            .map_err(|e| ChatError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.ollama_url(),
            model: config.model.name.clone(),
            temperature: config.model.temperature,
        })
    }

    /// Create a client with custom base URL and model
    pub fn with_base_url(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let mut config = Config::default();
        config.model.name = model.into();
        let mut client = Self::from_config(&config)?;
        client.base_url = base_url.into();
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the wire request for a turn
    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDefinition],
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|msg| OllamaMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                })
                .collect(),
            stream: false,
            // Some models change behavior when an empty list is present
            tools: if tools.is_empty() { None } else { Some(tools) },
            options: self
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        }
    }

    /// Parse a raw `/api/chat` body into a reply
    fn parse_reply(body: &str) -> Result<BackendReply> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| ChatError::malformed(format!("Failed to parse response: {}", e)))?;

        let tool_calls = response
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                if tc.function.name.is_empty() {
                    return Err(ChatError::malformed("tool call without a function name"));
                }
                let arguments = normalize_arguments(&tc.function.name, tc.function.arguments)?;
                Ok(ToolCall::new(tc.function.name, arguments))
            })
            .collect::<Result<Vec<_>>>()?;

        let usage = match (response.prompt_eval_count, response.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        Ok(BackendReply {
            content: response.message.content,
            tool_calls,
            usage,
            model: response.model,
        })
    }

    fn connect_error(&self, e: reqwest::Error) -> ChatError {
        if e.is_connect() {
            ChatError::backend(format!(
                "Cannot connect to Ollama at {}. Is it running?",
                self.base_url
            ))
        } else if e.is_timeout() {
            ChatError::backend(format!("Ollama at {} timed out", self.base_url))
        } else {
            ChatError::backend(e.to_string())
        }
    }
}

/// Arguments may arrive as an object, a JSON-encoded string, or be absent
fn normalize_arguments(name: &str, arguments: serde_json::Value) -> Result<serde_json::Value> {
    match arguments {
        serde_json::Value::Null => Ok(serde_json::json!({})),
        serde_json::Value::String(raw) if raw.trim().is_empty() => Ok(serde_json::json!({})),
        serde_json::Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
            ChatError::malformed(format!("arguments for '{}' are not valid JSON: {}", name, e))
        }),
        other => Ok(other),
    }
}

#[async_trait]
impl ModelBackend for OllamaClient {
    async fn converse(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<BackendReply> {
        let request = self.build_request(messages, tools);
        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "sending chat request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!("request body: {}", serde_json::to_string(&request)?);
        }

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 && error_text.contains("not found") {
                return Err(ChatError::ModelNotFound(self.model.clone()));
            }

            return Err(ChatError::backend(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ChatError::backend(format!("Failed to read response: {}", e)))?;
        tracing::debug!("response body: {}", truncate(&response_text, 500));

        let reply = Self::parse_reply(&response_text)?;
        if let Some(ref usage) = reply.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "token usage"
            );
        }
        Ok(reply)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            return Err(ChatError::backend(format!(
                "Failed to list models ({})",
                response.status()
            )));
        }

        let models_response: ModelsResponse = response.json().await?;
        Ok(models_response.models.into_iter().map(|m| m.name).collect())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
