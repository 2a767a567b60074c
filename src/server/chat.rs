//! `POST /api/chat` handler

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{Message, Role};
use crate::server::error::ApiError;
use crate::server::ServerState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<IncomingMessage>,
}

/// A message as sent by the chat UI; user messages may carry enabled tools
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub tools: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub content: String,
    pub tools_used: Vec<String>,
    pub truncated: bool,
}

impl ChatRequest {
    /// Split into the conversation and the tool names enabled on the latest user message
    pub fn into_parts(self) -> (Vec<Message>, Vec<String>) {
        let tools = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.tools.clone())
            .unwrap_or_default();

        let messages = self
            .messages
            .into_iter()
            .map(|m| Message {
                role: m.role,
                content: m.content,
                tool_name: None,
                tool_calls: Vec::new(),
            })
            .collect();

        (messages, tools)
    }
}

#[tracing::instrument(skip_all)]
pub(crate) async fn chat(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }

    let (messages, tools) = request.into_parts();
    let result = state.orchestrator.run(messages, &tools).await?;

    Ok(Json(ChatResponse {
        content: result.final_text,
        tools_used: result.tools_used,
        truncated: result.truncated,
    }))
}
