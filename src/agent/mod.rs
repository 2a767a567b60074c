//! Agent module - orchestration of the tool-calling loop
//!
//! Contains the logic that coordinates model backend calls and tool execution.

pub mod loop_state;
pub mod orchestrator;

pub use loop_state::TurnState;
pub use orchestrator::Orchestrator;
