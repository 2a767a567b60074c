//! Tools module - tool discovery and invocation
//!
//! Contains the tool registry, provider connections, and the usage heuristic.

pub mod heuristic;
pub mod provider;
pub mod registry;

pub use heuristic::infer_tools_used;
pub use provider::{McpConnector, NoToolsConnector, ToolConnector, ToolProvider};
pub use registry::{ToolRegistry, ToolSession};
