//! Shared fixtures and helpers for skillkit tests.
//!
//! These are lightweight, in-process stand-ins for a transport adapter and a
//! tool server. They let tests drive an agent end to end and inspect the
//! events it emits without any network plumbing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::agent::AgentDefinition;
use crate::errors::{AgentError, AgentResult};
use crate::runtime::auth::AuthRequest;
use crate::runtime::core::{DispatchEvent, ErrorEnvelope, IncomingInvocation, SkillExecutor};
use crate::tools::{ToolClient, ToolInfo};
use serde_json::{Map, Value};

pub use crate::runtime::core::CollectingSink;

/// Drives an agent the way a transport adapter would.
#[derive(Clone)]
pub struct AgentTestClient {
    executor: SkillExecutor,
}

impl AgentTestClient {
    #[must_use]
    pub fn new(agent: AgentDefinition) -> Self {
        Self {
            executor: SkillExecutor::new(agent),
        }
    }

    #[must_use]
    pub fn from_executor(executor: SkillExecutor) -> Self {
        Self { executor }
    }

    #[must_use]
    pub fn executor(&self) -> &SkillExecutor {
        &self.executor
    }

    /// Names of the registered skills.
    #[must_use]
    pub fn list_skills(&self) -> Vec<String> {
        self.executor.list_operations()
    }

    /// Calls `skill` without credentials.
    ///
    /// `params` must be a JSON object; any other value is passed as
    /// `{"input": params}`.
    pub async fn call(&self, skill: &str, params: Value) -> TestResult {
        self.call_with_credentials(skill, params, AuthRequest::default())
            .await
    }

    pub async fn call_with_credentials(
        &self,
        skill: &str,
        params: Value,
        credentials: AuthRequest,
    ) -> TestResult {
        let invocation =
            IncomingInvocation::new(skill, into_params(params)).with_credentials(credentials);
        self.dispatch(invocation).await
    }

    /// Sends raw message text, letting the executor pick the skill.
    pub async fn send_message(&self, text: &str, credentials: AuthRequest) -> TestResult {
        self.dispatch(IncomingInvocation::from_message(text, credentials))
            .await
    }

    /// Calls a streaming skill and returns the chunk values in order.
    ///
    /// # Panics
    ///
    /// Panics if the invocation emits an error.
    pub async fn stream(&self, skill: &str, params: Value) -> Vec<Value> {
        let result = self.call(skill, params).await;
        if let Some(error) = result.error() {
            panic!("streaming skill '{skill}' failed: {}", error.message);
        }
        result.stream_values()
    }

    pub async fn dispatch(&self, invocation: IncomingInvocation) -> TestResult {
        let sink = CollectingSink::new();
        self.executor.execute(invocation, &sink).await;
        TestResult {
            events: sink.take(),
        }
    }
}

fn into_params(params: Value) -> Map<String, Value> {
    match params {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("input".to_string(), other);
            map
        }
    }
}

/// Everything one invocation emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestResult {
    events: Vec<DispatchEvent>,
}

impl TestResult {
    #[must_use]
    pub fn events(&self) -> &[DispatchEvent] {
        &self.events
    }

    /// The single result value, if one was emitted.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.events.iter().find_map(|event| match event {
            DispatchEvent::Result(value) => Some(value),
            _ => None,
        })
    }

    #[must_use]
    pub fn error(&self) -> Option<&ErrorEnvelope> {
        self.events.iter().find_map(|event| match event {
            DispatchEvent::Error(envelope) => Some(envelope),
            _ => None,
        })
    }

    #[must_use]
    pub fn stream_values(&self) -> Vec<Value> {
        self.events
            .iter()
            .filter_map(|event| match event {
                DispatchEvent::Stream(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.events.iter().any(DispatchEvent::is_error)
    }
}

type ToolFn = Arc<dyn Fn(Value) -> AgentResult<Value> + Send + Sync>;

/// An in-memory tool server backed by closures.
///
/// Every call is recorded; see [`calls`](Self::calls).
#[derive(Clone, Default)]
pub struct FakeToolClient {
    tools: Vec<(ToolInfo, ToolFn)>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    closed: Arc<Mutex<bool>>,
}

impl FakeToolClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool answered by `handler`.
    #[must_use]
    pub fn with_tool<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> AgentResult<Value> + Send + Sync + 'static,
    {
        self.tools.push((ToolInfo::new(name), Arc::new(handler)));
        self
    }

    /// Tool names and arguments received so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls
            .lock()
            .expect("fake tool client calls mutex poisoned")
            .clone()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self
            .closed
            .lock()
            .expect("fake tool client closed flag poisoned")
    }

    /// Call counts keyed by tool name.
    #[must_use]
    pub fn call_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for (name, _) in self.calls() {
            *counts.entry(name).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl ToolClient for FakeToolClient {
    async fn list_tools(&self) -> AgentResult<Vec<ToolInfo>> {
        Ok(self.tools.iter().map(|(info, _)| info.clone()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> AgentResult<Value> {
        let handler = self
            .tools
            .iter()
            .find(|(info, _)| info.name == name)
            .map(|(_, handler)| handler.clone())
            .ok_or_else(|| AgentError::ToolNotFound {
                tool_name: name.to_string(),
            })?;
        self.calls
            .lock()
            .expect("fake tool client calls mutex poisoned")
            .push((name.to_string(), arguments.clone()));
        handler(arguments)
    }

    async fn close(&self) {
        *self
            .closed
            .lock()
            .expect("fake tool client closed flag poisoned") = true;
    }
}
