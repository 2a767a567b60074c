//! Custom error types for toolchat
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for toolchat operations
#[derive(Error, Debug)]
pub enum ChatError {
    /// Model backend unreachable or returned a non-success status
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Model backend replied with a payload we cannot interpret
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    /// Model not available
    #[error("Model '{0}' not available in Ollama. Run: ollama pull {0}")]
    ModelNotFound(String),

    /// Requested tool is not known to the tool provider
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool provider accepted the call but it failed
    #[error("Tool '{name}' failed: {message}")]
    ToolCall { name: String, message: String },

    /// Connection or protocol errors talking to the tool provider
    #[error("Tool provider error: {0}")]
    ToolProvider(String),

    /// The whole run exceeded its time budget
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Client sent something we cannot run
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for toolchat operations
pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Create a backend unavailable error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a tool call failure
    pub fn tool_call(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ToolCall {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a tool provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::ToolProvider(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error aborts an orchestration run.
    ///
    /// Tool-level failures are folded into the conversation instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::ToolNotFound(_) | Self::ToolCall { .. } | Self::ToolProvider(_)
        )
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::BackendUnavailable(err.to_string())
        }
    }
}
