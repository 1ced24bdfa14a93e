use crate::errors::{AgentError, AgentResult};
use crate::tools::{ToolClient, ToolInfo};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Routes tool calls across an ordered list of clients.
///
/// A call goes to each client in turn until one does not answer
/// `ToolNotFound`. Any other error is returned as is.
#[derive(Clone, Default)]
pub struct ToolRouter {
    clients: Vec<Arc<dyn ToolClient>>,
}

impl ToolRouter {
    pub fn new<T>(clients: T) -> Self
    where
        T: IntoIterator<Item = Arc<dyn ToolClient>>,
    {
        Self {
            clients: clients.into_iter().collect(),
        }
    }

    /// Builder-style helper to append a client.
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn ToolClient>) -> Self {
        self.clients.push(client);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl ToolClient for ToolRouter {
    async fn list_tools(&self) -> AgentResult<Vec<ToolInfo>> {
        let mut all_tools = Vec::new();
        for client in &self.clients {
            all_tools.extend(client.list_tools().await?);
        }
        Ok(all_tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> AgentResult<Value> {
        for (index, client) in self.clients.iter().enumerate() {
            match client.call_tool(name, arguments.clone()).await {
                Err(AgentError::ToolNotFound { .. }) => {
                    debug!(tool = name, client = index, "tool not offered by client");
                }
                other => return other,
            }
        }
        Err(AgentError::ToolNotFound {
            tool_name: name.to_string(),
        })
    }

    async fn close(&self) {
        for client in &self.clients {
            client.close().await;
        }
    }
}
