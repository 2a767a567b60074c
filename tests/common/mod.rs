//! Scripted backend and tool provider for driving the orchestrator offline

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use toolchat::core::config::AgentConfig;
use toolchat::core::{ChatError, Message, Result, ToolDefinition, ToolDescriptor, ToolOutput};
use toolchat::llm::{BackendReply, ModelBackend};
use toolchat::tools::{ToolConnector, ToolProvider, ToolRegistry};
use toolchat::Orchestrator;

/// What the backend saw on one turn
#[derive(Debug, Clone)]
pub struct Turn {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Replays scripted replies; the last reply repeats once the script runs out
pub struct ScriptedBackend {
    script: Mutex<Vec<Result<BackendReply>>>,
    last: Mutex<Option<BackendReply>>,
    pub turns: Mutex<Vec<Turn>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<BackendReply>) -> Arc<Self> {
        Self::with_results(replies.into_iter().map(Ok).collect())
    }

    pub fn with_results(script: Vec<Result<BackendReply>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            last: Mutex::new(None),
            turns: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.turns.lock().unwrap().len()
    }

    pub fn turn(&self, index: usize) -> Turn {
        self.turns.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn converse(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<BackendReply> {
        self.turns.lock().unwrap().push(Turn {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.function.name.clone()).collect(),
        });

        let next = {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                None
            } else {
                Some(script.remove(0))
            }
        };

        match next {
            Some(Ok(reply)) => {
                *self.last.lock().unwrap() = Some(reply.clone());
                Ok(reply)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ChatError::backend("script exhausted")),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["llama3.2:3b".to_string()])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

type Handler = Arc<dyn Fn(&Value) -> Result<ToolOutput> + Send + Sync>;

/// In-memory tool provider with call recording
pub struct ScriptedTools {
    catalog: Vec<ToolDescriptor>,
    handlers: HashMap<String, Handler>,
    pub calls: Arc<Mutex<Vec<(String, Value)>>>,
    pub connects: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
}

impl ScriptedTools {
    pub fn new() -> Self {
        Self {
            catalog: Vec::new(),
            handlers: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a tool that answers with fixed text
    pub fn tool(self, name: &str, reply: &str) -> Self {
        let tool_name = name.to_string();
        let reply = reply.to_string();
        self.handler(name, move |_| Ok(ToolOutput::text(&tool_name, &reply)))
    }

    /// Add a tool with a custom handler
    pub fn handler<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<ToolOutput> + Send + Sync + 'static,
    {
        self.catalog.push(ToolDescriptor::new(
            name,
            format!("{} tool", name),
            json!({"type": "object", "properties": {}}),
        ));
        self.handlers.insert(name.to_string(), Arc::new(handler));
        self
    }

    /// Advertise a tool in the catalog without being able to run it
    pub fn advertised_only(mut self, name: &str) -> Self {
        self.catalog
            .push(ToolDescriptor::new(name, "unreachable", json!({"type": "object"})));
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn recorded_calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

struct ScriptedSession {
    catalog: Vec<ToolDescriptor>,
    handlers: HashMap<String, Handler>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl ToolProvider for ScriptedSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.catalog.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        match self.handlers.get(name) {
            Some(handler) => handler(&arguments),
            None => Err(ChatError::tool_call(name, "provider has no handler")),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ToolConnector for ScriptedTools {
    async fn connect(&self) -> Result<Box<dyn ToolProvider>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            catalog: self.catalog.clone(),
            handlers: self.handlers.clone(),
            calls: Arc::clone(&self.calls),
            closes: Arc::clone(&self.closes),
        }))
    }
}

/// Connector whose server is always down
pub struct UnreachableTools;

#[async_trait]
impl ToolConnector for UnreachableTools {
    async fn connect(&self) -> Result<Box<dyn ToolProvider>> {
        Err(ChatError::provider("connection refused"))
    }
}

pub fn orchestrator(
    backend: Arc<ScriptedBackend>,
    tools: Arc<ScriptedTools>,
    config: AgentConfig,
) -> Orchestrator {
    Orchestrator::new(backend, ToolRegistry::new(tools), config)
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
