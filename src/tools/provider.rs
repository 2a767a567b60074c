//! Tool provider connections
//!
//! A [`ToolConnector`] opens run-scoped connections; a [`ToolProvider`] is one
//! such connection. [`McpConnector`] speaks MCP over Streamable HTTP.

use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
        RawContent, Tool,
    },
    service::RunningService,
    transport::StreamableHttpClientTransport,
    RoleClient, ServiceExt,
};
use serde_json::Value;

use crate::core::{ChatError, Result, ToolContent, ToolDescriptor, ToolOutput};

/// An open connection to a tool provider
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Discover the tools the provider currently offers
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool; tool-reported failures come back as `is_error` outputs
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput>;

    /// Tear the connection down
    async fn close(&mut self) -> Result<()>;
}

/// Opens provider connections; shared across concurrent runs
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ToolProvider>>;
}

/// Connector used when no tool server is configured
#[derive(Debug, Clone, Default)]
pub struct NoToolsConnector;

#[async_trait]
impl ToolConnector for NoToolsConnector {
    async fn connect(&self) -> Result<Box<dyn ToolProvider>> {
        Ok(Box::new(NoToolsProvider))
    }
}

struct NoToolsProvider;

#[async_trait]
impl ToolProvider for NoToolsProvider {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(Vec::new())
    }

    async fn call_tool(&self, name: &str, _arguments: Value) -> Result<ToolOutput> {
        Err(ChatError::ToolNotFound(name.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Connects to an MCP server over Streamable HTTP
#[derive(Debug, Clone)]
pub struct McpConnector {
    url: url::Url,
}

impl McpConnector {
    pub fn new(url: url::Url) -> Self {
        Self { url }
    }

    fn client_info() -> ClientInfo {
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "toolchat".to_string(),
                title: Some("toolchat".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
        }
    }
}

#[async_trait]
impl ToolConnector for McpConnector {
    async fn connect(&self) -> Result<Box<dyn ToolProvider>> {
        tracing::debug!(url = %self.url, "connecting to MCP server");

        let transport = StreamableHttpClientTransport::from_uri(self.url.as_str());
        let service = Self::client_info()
            .serve(transport)
            .await
            .map_err(|e| ChatError::provider(format!("MCP initialization failed: {}", e)))?;

        Ok(Box::new(McpProvider {
            service: Some(service),
        }))
    }
}

/// One live MCP client session
pub struct McpProvider {
    service: Option<RunningService<RoleClient, ClientInfo>>,
}

impl McpProvider {
    fn service(&self) -> Result<&RunningService<RoleClient, ClientInfo>> {
        self.service
            .as_ref()
            .ok_or_else(|| ChatError::provider("MCP connection already closed"))
    }
}

#[async_trait]
impl ToolProvider for McpProvider {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let result = self
            .service()?
            .list_tools(Default::default())
            .await
            .map_err(|e| ChatError::provider(format!("tools/list failed: {}", e)))?;

        Ok(result.tools.into_iter().map(descriptor_from_mcp).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = self
            .service()?
            .call_tool(params)
            .await
            .map_err(|e| ChatError::tool_call(name, e.to_string()))?;

        Ok(output_from_mcp(name, result))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(service) = self.service.take() {
            service
                .cancel()
                .await
                .map_err(|e| ChatError::provider(format!("MCP shutdown failed: {}", e)))?;
        }
        Ok(())
    }
}

fn descriptor_from_mcp(tool: Tool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
        input_schema: Value::Object(tool.input_schema.as_ref().clone()),
    }
}

/// First text element is canonical; otherwise keep the structured payload
fn output_from_mcp(name: &str, result: CallToolResult) -> ToolOutput {
    let first_text = result.content.iter().find_map(|c| match &c.raw {
        RawContent::Text(t) => Some(t.text.clone()),
        _ => None,
    });

    let content = match (first_text, result.structured_content) {
        (Some(text), _) => ToolContent::Text(text),
        (None, Some(structured)) => ToolContent::Structured(structured),
        (None, None) => match serde_json::to_value(&result.content) {
            Ok(value) => ToolContent::Structured(value),
            Err(e) => {
                tracing::warn!(tool = name, "could not serialize tool result content: {}", e);
                ToolContent::Structured(Value::Null)
            }
        },
    };

    ToolOutput {
        tool_name: name.to_string(),
        content,
        is_error: result.is_error.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_tools_provider() {
        let mut provider = NoToolsConnector.connect().await.unwrap();
        assert!(provider.list_tools().await.unwrap().is_empty());

        let err = provider
            .call_tool("calculator", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ToolNotFound(_)));
        provider.close().await.unwrap();
    }

    #[test]
    fn test_first_text_is_canonical() {
        use rmcp::model::Content;

        let result = CallToolResult::success(vec![Content::text("24C"), Content::text("sunny")]);
        let output = output_from_mcp("weather", result);
        assert_eq!(output.content, ToolContent::Text("24C".to_string()));
        assert!(!output.is_error);

        let failed = CallToolResult::error(vec![Content::text("offline")]);
        assert!(output_from_mcp("weather", failed).is_error);
    }

    #[test]
    fn test_textless_result_kept_as_content_json() {
        let output = output_from_mcp("noop", CallToolResult::success(Vec::new()));
        assert_eq!(output.content, ToolContent::Structured(serde_json::json!([])));
    }
}
