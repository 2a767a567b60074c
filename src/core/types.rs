//! Shared types used across toolchat modules
//!
//! Contains message structures, tool descriptors, and orchestration results.

use serde::{Deserialize, Serialize};

/// Marker prefixed to tool messages that carry a failure
pub const TOOL_ERROR_MARKER: &str = "Error: ";

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
    /// Tool that produced this message (tool role only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Tool calls requested by the assistant in this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_name: None,
            tool_calls: Vec::new(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create an assistant message that requests tool invocations
    pub fn tool_request(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create a tool result message
    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Whether this message carries a tool failure
    pub fn is_tool_error(&self) -> bool {
        self.role == Role::Tool && self.content.starts_with(TOOL_ERROR_MARKER)
    }
}

/// A tool call requested by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// A tool as advertised by the tool provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for the arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Translate into the backend's function-tool format
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::function(&self.name, &self.description, self.input_schema.clone())
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Payload returned by a tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolContent {
    Text(String),
    Structured(serde_json::Value),
}

impl ToolContent {
    /// Plain-text rendering used when folding into the conversation
    pub fn as_text(&self) -> String {
        match self {
            ToolContent::Text(text) => text.clone(),
            ToolContent::Structured(value) => value.to_string(),
        }
    }
}

/// Result of executing a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Output from the tool
    pub content: ToolContent,
    /// Whether the tool reported a failure
    pub is_error: bool,
}

impl ToolOutput {
    /// Create a successful text result
    pub fn text(tool_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            content: ToolContent::Text(text.into()),
            is_error: false,
        }
    }

    /// Create a successful structured result
    pub fn structured(tool_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            content: ToolContent::Structured(value),
            is_error: false,
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            content: ToolContent::Text(error.into()),
            is_error: true,
        }
    }

    /// Fold into a tool-role message; failures carry the error marker
    pub fn to_message(&self) -> Message {
        let text = self.content.as_text();
        let content = if self.is_error && !text.starts_with(TOOL_ERROR_MARKER) {
            format!("{}{}", TOOL_ERROR_MARKER, text)
        } else {
            text
        };
        Message::tool(&self.tool_name, content)
    }
}

/// Outcome of one orchestration run
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestrationResult {
    /// Final (or best partial) assistant text
    pub final_text: String,
    /// Tools dispatched to the provider, in first-use order. Calls that
    /// failed count; names refused as never offered do not.
    pub tools_used: Vec<String>,
    /// Whether `tools_used` came from keyword inference instead of real calls
    pub tools_inferred: bool,
    /// Whether the run stopped at the turn limit with calls still pending
    pub truncated: bool,
    /// Backend round-trips performed
    pub turns: usize,
    /// Full conversation, including every appended message
    pub messages: Vec<Message>,
}
