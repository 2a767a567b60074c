//! Model backend trait
//!
//! Abstracts the LLM server so the orchestrator can be driven by Ollama or a
//! scripted backend in tests.

use async_trait::async_trait;

use crate::core::{Message, Result, ToolCall, ToolDefinition};

/// One turn's reply from the model backend
#[derive(Debug, Clone, Default)]
pub struct BackendReply {
    /// Text content of the response
    pub content: String,
    /// Tool calls the model wants to make, in the order listed
    pub tool_calls: Vec<ToolCall>,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model that generated the response
    pub model: String,
}

impl BackendReply {
    /// A terminal text reply
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// A reply requesting tool invocations
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            ..Default::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Trait for LLM backends
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Send the conversation and manifest, get back text or tool calls.
    ///
    /// An empty `tools` slice means no manifest is attached at all.
    async fn converse(&self, messages: &[Message], tools: &[ToolDefinition])
        -> Result<BackendReply>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Check if a model is available
    async fn is_model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models
            .iter()
            .any(|m| m == model || m.split(':').next() == model.split(':').next()))
    }

    /// Get the backend name
    fn name(&self) -> &str;
}
