//! Conversation orchestrator
//!
//! Drives the exchange between the conversation, the model backend, and the
//! tool provider. Each run:
//!
//! 1. resolves the offered tool names against the provider's catalog,
//! 2. asks the backend for a reply,
//! 3. if the reply requests tools, appends the request, calls every tool in
//!    order, appends one tool message per call, and asks again,
//! 4. stops on a terminal reply or when the turn limit is reached.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::loop_state::TurnState;
use crate::core::config::AgentConfig;
use crate::core::{
    ChatError, Config, Message, OrchestrationResult, Result, Role, ToolCall, ToolDefinition,
    ToolOutput,
};
use crate::llm::{ModelBackend, OllamaClient};
use crate::tools::{infer_tools_used, ToolRegistry, ToolSession};

/// Main orchestrator; cheap to share across concurrent requests
pub struct Orchestrator {
    /// Model backend
    backend: Arc<dyn ModelBackend>,
    /// Tool registry, opens one session per run
    registry: ToolRegistry,
    /// Loop configuration
    config: AgentConfig,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn ModelBackend>, registry: ToolRegistry, config: AgentConfig) -> Self {
        Self {
            backend,
            registry,
            config,
        }
    }

    /// Build an Ollama-backed orchestrator from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = OllamaClient::from_config(config)?;
        let registry = ToolRegistry::from_config(config)?;
        Ok(Self::new(Arc::new(backend), registry, config.agent.clone()))
    }

    pub fn backend(&self) -> &dyn ModelBackend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run a conversation to a terminal answer.
    ///
    /// `available_tools` are the tool names the caller allows; names the
    /// provider does not know are ignored. Backend failures and the run
    /// timeout abort with an error; tool failures are folded into the
    /// conversation.
    pub async fn run(
        &self,
        initial_messages: Vec<Message>,
        available_tools: &[String],
    ) -> Result<OrchestrationResult> {
        if initial_messages.is_empty() {
            return Err(ChatError::InvalidRequest(
                "conversation has no messages".to_string(),
            ));
        }

        let mut session = self.registry.open_session();
        let budget = self.config.request_timeout_secs;

        let outcome = match tokio::time::timeout(
            Duration::from_secs(budget),
            self.run_in_session(&mut session, initial_messages, available_tools),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ChatError::Timeout(budget)),
        };

        if let Err(e) = session.close().await {
            tracing::warn!("failed to close tool session: {}", e);
        }

        match &outcome {
            Ok(result) => tracing::info!(
                turns = result.turns,
                tools = ?result.tools_used,
                truncated = result.truncated,
                "run complete"
            ),
            Err(e) => tracing::error!("run failed: {}", e),
        }

        outcome
    }

    async fn run_in_session(
        &self,
        session: &mut ToolSession,
        initial_messages: Vec<Message>,
        available_tools: &[String],
    ) -> Result<OrchestrationResult> {
        let mut messages = self.with_system_prompt(initial_messages);

        // Tool availability is advisory: a provider outage means no tools
        let descriptors = match session.resolve(available_tools).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                tracing::warn!("tool discovery failed, continuing without tools: {}", e);
                Vec::new()
            }
        };
        let offered: Vec<String> = descriptors.iter().map(|d| d.name.clone()).collect();
        let manifest: Vec<ToolDefinition> =
            descriptors.iter().map(|d| d.to_definition()).collect();

        let mut state = TurnState::new(self.config.max_turns);

        while state.should_continue() {
            tracing::debug!(
                turn = state.turn + 1,
                max_turns = state.max_turns,
                tools = manifest.len(),
                "calling backend"
            );

            let reply = self.backend.converse(&messages, &manifest).await?;
            state.next_turn();
            state.record_text(&reply.content);

            if reply.is_terminal() {
                messages.push(Message::assistant(&reply.content));
                state.final_answer = Some(reply.content);
                break;
            }

            tracing::info!(
                turn = state.turn,
                calls = reply.tool_calls.len(),
                "executing tool calls"
            );

            messages.push(Message::tool_request(
                reply.content.clone(),
                reply.tool_calls.clone(),
            ));
            state.record_requests(reply.tool_calls.len());

            // No backend call is left to read the results
            if state.on_last_turn() {
                tracing::debug!(
                    pending = reply.tool_calls.len(),
                    "turn limit reached, skipping pending tool calls"
                );
                break;
            }

            // Sequential: later tools may depend on earlier side effects
            for call in &reply.tool_calls {
                let output = if offered.contains(&call.name) {
                    state.record_tool(&call.name);
                    self.invoke(session, call).await
                } else {
                    refuse(call)
                };
                messages.push(output.to_message());
            }
        }

        let truncated = state.hit_limit();
        let final_text = match state.final_answer.take() {
            Some(answer) => answer,
            None => {
                tracing::warn!(
                    max_turns = state.max_turns,
                    "tool loop limit reached, returning partial answer"
                );
                state.last_text.clone().unwrap_or_else(|| {
                    format!(
                        "Stopped after {} turns: tool loop limit reached.",
                        state.max_turns
                    )
                })
            }
        };

        let (tools_used, tools_inferred) = self.report_tools(&state, &messages, &offered);

        Ok(OrchestrationResult {
            final_text,
            tools_used,
            tools_inferred,
            truncated,
            turns: state.turn,
            messages,
        })
    }

    /// Call one offered tool; every failure becomes an error output
    async fn invoke(&self, session: &mut ToolSession, call: &ToolCall) -> ToolOutput {
        match session.call_tool(&call.name, call.arguments.clone()).await {
            Ok(output) => {
                if output.is_error {
                    tracing::warn!(tool = %call.name, "tool reported an error");
                }
                output
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, "tool call failed: {}", e);
                ToolOutput::failure(&call.name, e.to_string())
            }
        }
    }

    /// Real tool calls win; the keyword guess only fills an empty report
    fn report_tools(
        &self,
        state: &TurnState,
        messages: &[Message],
        offered: &[String],
    ) -> (Vec<String>, bool) {
        if state.requested_calls > 0 || !self.config.infer_tools_used {
            return (state.tools_used.clone(), false);
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let inferred = infer_tools_used(last_user, offered);
        let was_inferred = !inferred.is_empty();
        (inferred, was_inferred)
    }

    fn with_system_prompt(&self, messages: Vec<Message>) -> Vec<Message> {
        match &self.config.system_prompt {
            Some(prompt) if messages.first().map(|m| m.role) != Some(Role::System) => {
                let mut result = Vec::with_capacity(messages.len() + 1);
                result.push(Message::system(prompt.clone()));
                result.extend(messages);
                result
            }
            _ => messages,
        }
    }

    /// Check that the backend is reachable and the model is pulled
    pub async fn check_model(&self, model: &str) -> Result<()> {
        if self.backend.is_model_available(model).await? {
            Ok(())
        } else {
            Err(ChatError::ModelNotFound(model.to_string()))
        }
    }
}

/// Answer a call for a tool that was never offered to the model
fn refuse(call: &ToolCall) -> ToolOutput {
    let err = ChatError::ToolNotFound(call.name.clone());
    tracing::warn!(tool = %call.name, "model requested a tool that was not offered");
    ToolOutput::failure(&call.name, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::BackendReply;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingBackend {
        replies: Mutex<Vec<BackendReply>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl ModelBackend for RecordingBackend {
        async fn converse(
            &self,
            messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<BackendReply> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.replies.lock().unwrap().remove(0))
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(vec!["llama3.2:3b".to_string()])
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn orchestrator(
        replies: Vec<BackendReply>,
        config: AgentConfig,
    ) -> (Orchestrator, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend {
            replies: Mutex::new(replies),
            seen: Mutex::new(Vec::new()),
        });
        let orch = Orchestrator::new(backend.clone(), ToolRegistry::disabled(), config);
        (orch, backend)
    }

    #[tokio::test]
    async fn test_system_prompt_prepended_once() {
        let config = AgentConfig {
            system_prompt: Some("Be brief.".to_string()),
            ..AgentConfig::default()
        };
        let (orch, backend) = orchestrator(vec![BackendReply::text("hi")], config);

        orch.run(vec![Message::user("hello")], &[]).await.unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0][0], Message::system("Be brief."));
        assert_eq!(seen[0][1], Message::user("hello"));
    }

    #[tokio::test]
    async fn test_existing_system_prompt_kept() {
        let config = AgentConfig {
            system_prompt: Some("Be brief.".to_string()),
            ..AgentConfig::default()
        };
        let (orch, backend) = orchestrator(vec![BackendReply::text("hi")], config);

        orch.run(vec![Message::system("Custom"), Message::user("hello")], &[])
            .await
            .unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].len(), 2);
        assert_eq!(seen[0][0].content, "Custom");
    }

    #[tokio::test]
    async fn test_empty_conversation_rejected() {
        let (orch, _) = orchestrator(vec![], AgentConfig::default());
        let err = orch.run(Vec::new(), &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_check_model() {
        let (orch, _) = orchestrator(vec![], AgentConfig::default());
        assert!(orch.check_model("llama3.2:3b").await.is_ok());
        assert!(matches!(
            orch.check_model("mistral:7b").await,
            Err(ChatError::ModelNotFound(_))
        ));
    }
}
