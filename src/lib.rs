//! toolchat - tool-augmented chat for local LLMs
//!
//! Drives a multi-turn conversation between a client, an Ollama model and
//! the tools exposed by an MCP server. The model either answers or asks for
//! tools; requested tools are called in order, their results are folded back
//! into the conversation, and the model is asked again until it answers or
//! the turn limit is reached.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Model backend abstraction with the Ollama implementation
//! - **Tools**: Run-scoped MCP sessions and the tool usage heuristic
//! - **Agent**: The orchestration loop
//! - **Server**: The `/api/chat` endpoint
//!
//! # Usage
//!
//! ```rust,no_run
//! use toolchat::{Config, Message, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> toolchat::Result<()> {
//!     let orchestrator = Orchestrator::from_config(&Config::load())?;
//!     let result = orchestrator
//!         .run(vec![Message::user("What's the weather?")], &["web_search".to_string()])
//!         .await?;
//!     println!("{} (tools: {:?})", result.final_text, result.tools_used);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod core;
pub mod llm;
pub mod server;
pub mod tools;

// Re-export commonly used items
pub use agent::Orchestrator;
pub use core::{ChatError, Config, Message, OrchestrationResult, Result};
