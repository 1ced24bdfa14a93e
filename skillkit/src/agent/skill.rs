//! Skill definitions, parameters, and outputs.
//!
//! A skill is a named async handler. It declares up front which collaborators
//! it needs ([`SkillNeeds`]) and whether its output is a stream. The runtime
//! uses those declarations, never the handler's shape, to decide what to
//! inject and how to emit the result.

use crate::compat::{MaybeSend, MaybeSendBoxStream, MaybeSync};
use crate::errors::{AgentError, AgentResult};
use crate::runtime::auth::AuthResult;
use crate::runtime::task_manager::TaskContext;
use crate::tools::ToolClient;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

pub const DEFAULT_TASK_PARAM: &str = "task";
pub const DEFAULT_IDENTITY_PARAM: &str = "auth";
pub const DEFAULT_TOOLS_PARAM: &str = "tools";

// ============================================================================
// Handler
// ============================================================================

/// Executes one skill invocation.
///
/// Implemented for any `Fn(SkillParams) -> impl Future<Output = AgentResult<SkillOutput>>`,
/// so plain async closures can be registered directly.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait SkillHandler: MaybeSend + MaybeSync {
    async fn invoke(&self, params: SkillParams) -> AgentResult<SkillOutput>;
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl<F, Fut> SkillHandler for F
where
    F: Fn(SkillParams) -> Fut + MaybeSend + MaybeSync,
    Fut: Future<Output = AgentResult<SkillOutput>> + MaybeSend + 'static,
{
    async fn invoke(&self, params: SkillParams) -> AgentResult<SkillOutput> {
        (self)(params).await
    }
}

// ============================================================================
// Needs
// ============================================================================

/// Collaborators a skill wants injected, keyed by the parameter name it
/// expects each one under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillNeeds {
    pub task: Option<String>,
    pub identity: Option<String>,
    pub tools: Option<String>,
}

impl SkillNeeds {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.task.is_none() && self.identity.is_none() && self.tools.is_none()
    }
}

// ============================================================================
// Definition
// ============================================================================

/// An immutable, registered skill.
#[derive(Clone)]
pub struct SkillDefinition {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) is_streaming: bool,
    pub(crate) needs: SkillNeeds,
    pub(crate) handler: Arc<dyn SkillHandler>,
}

impl std::fmt::Debug for SkillDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillDefinition")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("is_streaming", &self.is_streaming)
            .field("needs", &self.needs)
            .finish_non_exhaustive()
    }
}

impl SkillDefinition {
    /// Creates a non-streaming skill with no declared needs.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use skillkit::agent::{SkillDefinition, SkillOutput};
    ///
    /// let greet = SkillDefinition::new("greet", |params| async move {
    ///     let name = params.require_str("name")?;
    ///     Ok(SkillOutput::from(format!("Hello, {name}!")))
    /// });
    /// ```
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(SkillParams) -> Fut + MaybeSend + MaybeSync + 'static,
        Fut: Future<Output = AgentResult<SkillOutput>> + MaybeSend + 'static,
    {
        Self::from_handler(name, handler)
    }

    /// Creates a skill from any [`SkillHandler`] implementation.
    pub fn from_handler(name: impl Into<String>, handler: impl SkillHandler + 'static) -> Self {
        Self {
            name: name.into(),
            description: None,
            tags: Vec::new(),
            is_streaming: false,
            needs: SkillNeeds::default(),
            handler: Arc::new(handler),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a tag. Duplicates are ignored and insertion order is kept.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Marks the skill as streaming: each element of its output is emitted
    /// as its own event.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.is_streaming = true;
        self
    }

    /// Requests a task handle under the `task` parameter.
    #[must_use]
    pub fn needs_task(self) -> Self {
        self.needs_task_as(DEFAULT_TASK_PARAM)
    }

    #[must_use]
    pub fn needs_task_as(mut self, param: impl Into<String>) -> Self {
        self.needs.task = Some(param.into());
        self
    }

    /// Requests the caller's [`AuthResult`] under the `auth` parameter.
    #[must_use]
    pub fn needs_identity(self) -> Self {
        self.needs_identity_as(DEFAULT_IDENTITY_PARAM)
    }

    #[must_use]
    pub fn needs_identity_as(mut self, param: impl Into<String>) -> Self {
        self.needs.identity = Some(param.into());
        self
    }

    /// Requests the agent's tool client under the `tools` parameter.
    #[must_use]
    pub fn needs_tools(self) -> Self {
        self.needs_tools_as(DEFAULT_TOOLS_PARAM)
    }

    #[must_use]
    pub fn needs_tools_as(mut self, param: impl Into<String>) -> Self {
        self.needs.tools = Some(param.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    #[must_use]
    pub const fn needs(&self) -> &SkillNeeds {
        &self.needs
    }

    pub(crate) fn handler(&self) -> &Arc<dyn SkillHandler> {
        &self.handler
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// A collaborator placed into a skill's parameters by the runtime.
#[derive(Clone)]
pub enum Injected {
    Task(TaskContext),
    Identity(AuthResult),
    Tools(Arc<dyn ToolClient>),
}

impl std::fmt::Debug for Injected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task(task) => f.debug_tuple("Task").field(task).finish(),
            Self::Identity(auth) => f.debug_tuple("Identity").field(auth).finish(),
            Self::Tools(_) => f.write_str("Tools(..)"),
        }
    }
}

/// The final parameter set passed to a skill handler.
///
/// Caller-supplied JSON values and injected collaborators live side by side.
/// An injected name shadows a caller value of the same name.
#[derive(Debug, Clone, Default)]
pub struct SkillParams {
    values: Map<String, Value>,
    injected: BTreeMap<String, Injected>,
}

impl SkillParams {
    #[must_use]
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            injected: BTreeMap::new(),
        }
    }

    pub(crate) fn inject(&mut self, name: &str, collaborator: Injected) {
        self.values.remove(name);
        self.injected.insert(name.to_string(), collaborator);
    }

    #[must_use]
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// # Errors
    ///
    /// Returns [`AgentError::MissingInput`] if the key is absent and
    /// [`AgentError::Validation`] if it is not a string.
    pub fn require_str(&self, key: &str) -> AgentResult<&str> {
        match self.values.get(key) {
            None => Err(AgentError::MissingInput(key.to_string())),
            Some(value) => value.as_str().ok_or_else(|| AgentError::Validation {
                field: key.to_string(),
                reason: "expected a string".to_string(),
            }),
        }
    }

    /// Deserializes the caller-supplied values into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Validation`] when the values do not match `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> AgentResult<T> {
        serde_json::from_value(Value::Object(self.values.clone())).map_err(|e| {
            AgentError::Validation {
                field: "params".to_string(),
                reason: e.to_string(),
            }
        })
    }

    #[must_use]
    pub fn injected(&self, name: &str) -> Option<&Injected> {
        self.injected.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name) || self.injected.contains_key(name)
    }

    /// The injected task handle, if one was requested and created.
    #[must_use]
    pub fn task(&self) -> Option<&TaskContext> {
        self.injected.values().find_map(|i| match i {
            Injected::Task(task) => Some(task),
            _ => None,
        })
    }

    #[must_use]
    pub fn identity(&self) -> Option<&AuthResult> {
        self.injected.values().find_map(|i| match i {
            Injected::Identity(auth) => Some(auth),
            _ => None,
        })
    }

    #[must_use]
    pub fn tools(&self) -> Option<&Arc<dyn ToolClient>> {
        self.injected.values().find_map(|i| match i {
            Injected::Tools(tools) => Some(tools),
            _ => None,
        })
    }
}

// ============================================================================
// Output
// ============================================================================

/// What a skill handler returns: one value or a finite lazy sequence.
pub enum SkillOutput {
    Single(Value),
    Stream(MaybeSendBoxStream<'static, AgentResult<Value>>),
}

impl SkillOutput {
    /// Serializes any value into a single output.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Serialization`] if `value` cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(value: &T) -> AgentResult<Self> {
        Ok(Self::Single(serde_json::to_value(value)?))
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = AgentResult<Value>> + MaybeSend + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    /// Streams a fixed list of values.
    pub fn iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: MaybeSend + 'static,
    {
        Self::stream(futures::stream::iter(items.into_iter().map(Ok)))
    }

    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl std::fmt::Debug for SkillOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(value) => f.debug_tuple("Single").field(value).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Value> for SkillOutput {
    fn from(value: Value) -> Self {
        Self::Single(value)
    }
}

impl From<String> for SkillOutput {
    fn from(value: String) -> Self {
        Self::Single(Value::String(value))
    }
}

impl From<&str> for SkillOutput {
    fn from(value: &str) -> Self {
        Self::Single(Value::String(value.to_string()))
    }
}

/// What flows back out through the middleware chain.
///
/// Streamed chunks have already been emitted by the time the reply exists, so
/// only their count travels back through the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillReply {
    Value(Value),
    Streamed { chunks: usize },
}

impl SkillReply {
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Streamed { .. } => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Streamed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn params(value: Value) -> SkillParams {
        match value {
            Value::Object(map) => SkillParams::new(map),
            _ => SkillParams::default(),
        }
    }

    #[test]
    fn builder_records_needs_and_flags() {
        let skill = SkillDefinition::new("report", |_p| async {
            Ok(SkillOutput::from("ok"))
        })
        .with_description("Builds a report")
        .with_tag("reports")
        .with_tag("reports")
        .with_tag("pdf")
        .streaming()
        .needs_task_as("progress")
        .needs_identity();

        assert_eq!(skill.name(), "report");
        assert_eq!(skill.tags(), ["reports", "pdf"]);
        assert!(skill.is_streaming());
        assert_eq!(skill.needs().task.as_deref(), Some("progress"));
        assert_eq!(skill.needs().identity.as_deref(), Some("auth"));
        assert!(skill.needs().tools.is_none());
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let skill = SkillDefinition::new("greet", |p| async move {
            let name = p.require_str("name")?;
            Ok(SkillOutput::from(format!("Hello, {name}!")))
        });
        let out = skill
            .handler()
            .invoke(params(json!({"name": "World"})))
            .await
            .unwrap();
        assert!(matches!(out, SkillOutput::Single(v) if v == json!("Hello, World!")));
    }

    #[test]
    fn typed_access_and_validation() {
        #[derive(Deserialize)]
        struct Args {
            count: u32,
        }

        let p = params(json!({"count": 3, "label": 7}));
        assert_eq!(p.parse::<Args>().unwrap().count, 3);
        assert!(matches!(p.require_str("label"), Err(AgentError::Validation { .. })));
        assert!(matches!(p.require_str("missing"), Err(AgentError::MissingInput(_))));

        let bad = params(json!({"count": "three"}));
        assert!(matches!(bad.parse::<Args>(), Err(AgentError::Validation { .. })));
    }

    #[test]
    fn injection_shadows_caller_values() {
        let mut p = params(json!({"auth": "spoofed", "x": 1}));
        p.inject("auth", Injected::Identity(AuthResult::anonymous()));

        assert!(p.get("auth").is_none());
        assert!(p.contains("auth"));
        assert_eq!(p.identity().and_then(AuthResult::identity), Some("anonymous"));
        assert_eq!(p.get("x"), Some(&json!(1)));
        assert!(p.task().is_none());
    }
}
