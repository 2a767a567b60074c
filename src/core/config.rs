//! Configuration management for toolchat
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/toolchat/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::core::error::{ChatError, Result};

/// Main configuration for toolchat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Model configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Tool provider configuration
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Orchestration behavior
    #[serde(default)]
    pub agent: AgentConfig,
    /// Chat endpoint configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model used for chat and tool calling
    /// Default: llama3.2:3b
    pub name: String,
    /// Sampling temperature sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// MCP tool provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Streamable HTTP endpoint of the MCP server; tools are disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

/// Orchestration behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum backend round-trips per run
    /// Default: 6
    pub max_turns: usize,
    /// Time budget for a whole run in seconds
    /// Default: 180
    pub request_timeout_secs: u64,
    /// Report keyword-inferred tools when the model made no tool calls
    pub infer_tools_used: bool,
    /// System prompt prepended when the conversation has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: 127.0.0.1)
    pub host: String,
    /// Bind port (default: 3001)
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 120,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: env::var("TOOLCHAT_MODEL").unwrap_or_else(|_| "llama3.2:3b".to_string()),
            temperature: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 6,
            request_timeout_secs: 180,
            infer_tools_used: true,
            system_prompt: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: env::var("TOOLCHAT_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("toolchat")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        let config_path = Self::config_file();
        let mut config = if config_path.exists() {
            match Self::load_from_file() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("ignoring config file, using defaults: {}", e);
                    Self::default()
                }
            }
        } else {
            tracing::debug!("no config file at {}, using defaults", config_path.display());
            Self::default()
        };
        config.apply_env();
        config
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(ChatError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ChatError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ChatError::config(format!("Failed to parse config: {}", e)))
    }

    /// Environment variables that override file values
    fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    fn apply_env_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("OLLAMA_HOST") {
            self.ollama.host = host;
        }
        if let Some(port) = var("OLLAMA_PORT") {
            match port.parse() {
                Ok(port) => self.ollama.port = port,
                Err(_) => tracing::warn!("ignoring invalid OLLAMA_PORT '{}'", port),
            }
        }
        if let Some(model) = var("TOOLCHAT_MODEL") {
            self.model.name = model;
        }
        if let Some(url) = var("TOOLCHAT_MCP_URL") {
            if !url.is_empty() {
                self.tools.server_url = Some(url);
            }
        }
        if let Some(port) = var("TOOLCHAT_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("ignoring invalid TOOLCHAT_PORT '{}'", port),
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| ChatError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ChatError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| ChatError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Validated MCP endpoint, if tools are configured
    pub fn tool_server_url(&self) -> Result<Option<url::Url>> {
        match self.tools.server_url.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => url::Url::parse(raw)
                .map(Some)
                .map_err(|e| ChatError::config(format!("Invalid tool server URL '{}': {}", raw, e))),
        }
    }

    /// Socket address for the chat endpoint
    pub fn server_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ChatError::config(format!("Invalid server address: {}", e)))
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
