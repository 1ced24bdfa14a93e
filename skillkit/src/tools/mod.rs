//! Tool-calling clients handed to skills that declare a tool need.
//!
//! - [`ToolClient`]: one source of callable tools (for example a tool server)
//! - [`ToolRouter`]: fans calls out over several clients in order
//! - [`ToolInfo`]: advertised tool metadata

pub mod router;

pub use router::ToolRouter;

use crate::compat::{MaybeSend, MaybeSync};
use crate::errors::AgentResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Advertised metadata for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ToolInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A client able to list and invoke tools.
///
/// Implementations report an unknown tool with
/// [`AgentError::ToolNotFound`](crate::errors::AgentError::ToolNotFound) so
/// that a [`ToolRouter`] can move on to the next client.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait ToolClient: MaybeSend + MaybeSync {
    async fn list_tools(&self) -> AgentResult<Vec<ToolInfo>>;

    async fn call_tool(&self, name: &str, arguments: Value) -> AgentResult<Value>;

    /// Releases connections held by the client. No-op by default.
    async fn close(&self) {}
}
