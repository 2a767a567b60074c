//! Tool registry - run-scoped access to the tool provider
//!
//! The registry is shared by every request and only knows how to connect.
//! Each orchestration run opens its own [`ToolSession`], which connects on
//! first use, reuses that connection for every call in the run, and is closed
//! when the run ends.

use std::sync::Arc;

use serde_json::Value;

use crate::core::{ChatError, Config, Result, ToolDescriptor, ToolOutput};
use crate::tools::provider::{McpConnector, NoToolsConnector, ToolConnector, ToolProvider};

/// Registry of tool providers
#[derive(Clone)]
pub struct ToolRegistry {
    connector: Arc<dyn ToolConnector>,
}

impl ToolRegistry {
    /// Create a registry backed by the given connector
    pub fn new(connector: Arc<dyn ToolConnector>) -> Self {
        Self { connector }
    }

    /// A registry that offers no tools
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoToolsConnector))
    }

    /// Build from configuration; no server URL means no tools
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.tool_server_url()? {
            Some(url) => {
                tracing::info!(url = %url, "tool provider configured");
                Ok(Self::new(Arc::new(McpConnector::new(url))))
            }
            None => {
                tracing::info!("no tool server configured, tools disabled");
                Ok(Self::disabled())
            }
        }
    }

    /// Open a session owned by a single run
    pub fn open_session(&self) -> ToolSession {
        ToolSession {
            connector: Arc::clone(&self.connector),
            provider: None,
            descriptors: Vec::new(),
            discovered: false,
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::disabled()
    }
}

/// A run-scoped connection to the tool provider
pub struct ToolSession {
    connector: Arc<dyn ToolConnector>,
    provider: Option<Box<dyn ToolProvider>>,
    /// Known tools in discovery order, unique by name
    descriptors: Vec<ToolDescriptor>,
    discovered: bool,
}

impl ToolSession {
    async fn provider(&mut self) -> Result<&dyn ToolProvider> {
        if self.provider.is_none() {
            self.provider = Some(self.connector.connect().await?);
        }
        match self.provider.as_deref() {
            Some(provider) => Ok(provider),
            None => Err(ChatError::provider("tool provider not connected")),
        }
    }

    /// Discover tools, merging them into what this session already knows.
    ///
    /// A descriptor with an already known name replaces the earlier one.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        let fresh = self.provider().await?.list_tools().await?;
        for descriptor in fresh {
            match self.descriptors.iter_mut().find(|d| d.name == descriptor.name) {
                Some(existing) => *existing = descriptor,
                None => self.descriptors.push(descriptor),
            }
        }
        self.discovered = true;
        tracing::debug!(count = self.descriptors.len(), "tools discovered");
        Ok(self.descriptors.clone())
    }

    /// Descriptors known so far, without contacting the provider
    pub fn known_tools(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Look up a discovered descriptor
    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Keep the descriptors whose names are offered, in discovery order.
    ///
    /// Unknown names are dropped. Nothing is discovered when nothing is offered.
    pub async fn resolve(&mut self, offered: &[String]) -> Result<Vec<ToolDescriptor>> {
        if offered.is_empty() {
            return Ok(Vec::new());
        }
        if !self.discovered {
            self.list_tools().await?;
        }

        for name in offered {
            if self.descriptor(name).is_none() {
                tracing::debug!(tool = %name, "offered tool not provided, dropping");
            }
        }

        Ok(self
            .descriptors
            .iter()
            .filter(|d| offered.contains(&d.name))
            .cloned()
            .collect())
    }

    /// Invoke a tool by name
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutput> {
        if !self.discovered {
            self.list_tools().await?;
        }
        if self.descriptor(name).is_none() {
            return Err(ChatError::ToolNotFound(name.to_string()));
        }

        tracing::info!(tool = %name, "calling tool");
        self.provider().await?.call_tool(name, arguments).await
    }

    /// Close the connection if one was opened; safe to call twice
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut provider) = self.provider.take() {
            provider.close().await?;
            tracing::debug!("tool session closed");
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.provider.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider whose catalog changes on every discovery
    struct ShiftingProvider {
        catalogs: Mutex<Vec<Vec<ToolDescriptor>>>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolProvider for ShiftingProvider {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
            let mut catalogs = self.catalogs.lock().unwrap();
            Ok(if catalogs.len() > 1 {
                catalogs.remove(0)
            } else {
                catalogs[0].clone()
            })
        }

        async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
            Ok(ToolOutput::text(name, arguments.to_string()))
        }

        async fn close(&mut self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingConnector {
        catalogs: Vec<Vec<ToolDescriptor>>,
        connects: AtomicUsize,
        closes: Arc<AtomicUsize>,
    }

    impl CountingConnector {
        fn new(catalogs: Vec<Vec<ToolDescriptor>>) -> Arc<Self> {
            Arc::new(Self {
                catalogs,
                connects: AtomicUsize::new(0),
                closes: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl ToolConnector for CountingConnector {
        async fn connect(&self) -> Result<Box<dyn ToolProvider>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ShiftingProvider {
                catalogs: Mutex::new(self.catalogs.clone()),
                closes: Arc::clone(&self.closes),
            }))
        }
    }

    fn tool(name: &str, description: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, description, json!({"type": "object"}))
    }

    #[tokio::test]
    async fn test_connects_lazily_and_once() {
        let connector = CountingConnector::new(vec![vec![tool("calculator", "math")]]);
        let registry = ToolRegistry::new(connector.clone());
        let mut session = registry.open_session();

        assert!(!session.is_connected());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);

        session.call_tool("calculator", json!({"expr": "1+1"})).await.unwrap();
        session.call_tool("calculator", json!({"expr": "2+2"})).await.unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_later_discovery_supersedes_by_name() {
        let connector = CountingConnector::new(vec![
            vec![tool("web_search", "old"), tool("calculator", "math")],
            vec![tool("web_search", "new"), tool("file_reader", "files")],
        ]);
        let mut session = ToolRegistry::new(connector).open_session();

        session.list_tools().await.unwrap();
        let tools = session.list_tools().await.unwrap();

        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["web_search", "calculator", "file_reader"]);
        assert_eq!(session.descriptor("web_search").unwrap().description, "new");
    }

    #[tokio::test]
    async fn test_resolve_drops_unknown_names() {
        let connector = CountingConnector::new(vec![vec![
            tool("web_search", "search"),
            tool("calculator", "math"),
        ]]);
        let mut session = ToolRegistry::new(connector).open_session();

        let offered = vec!["calculator".to_string(), "teleporter".to_string()];
        let resolved = session.resolve(&offered).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "calculator");
    }

    #[tokio::test]
    async fn test_resolve_nothing_offered_skips_connection() {
        let connector = CountingConnector::new(vec![vec![tool("calculator", "math")]]);
        let mut session = ToolRegistry::new(connector.clone()).open_session();

        assert!(session.resolve(&[]).await.unwrap().is_empty());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let connector = CountingConnector::new(vec![vec![tool("calculator", "math")]]);
        let mut session = ToolRegistry::new(connector).open_session();

        let err = session.call_tool("web_search", json!({})).await.unwrap_err();
        assert!(matches!(err, ChatError::ToolNotFound(ref name) if name == "web_search"));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let connector = CountingConnector::new(vec![vec![tool("calculator", "math")]]);
        let registry = ToolRegistry::new(connector.clone());

        let mut a = registry.open_session();
        let mut b = registry.open_session();
        a.list_tools().await.unwrap();
        b.list_tools().await.unwrap();
        a.close().await.unwrap();

        assert!(!a.is_connected());
        assert!(b.is_connected());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }
}
