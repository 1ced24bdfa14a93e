//! Agent builder and definition types.
//!
//! This module provides a fluent builder API for assembling everything one
//! agent needs at request time: its skills, middleware, authentication
//! policy, task store, tool client, and lifecycle hooks.
//!
//! # Overview
//!
//! - [`Agent`]: Entry point for the builder API
//! - [`AgentBuilder`]: Fluent builder for agent definitions
//! - [`AgentDefinition`]: Complete, immutable agent specification
//!
//! # Examples
//!
//! ```ignore
//! use skillkit::agent::{Agent, SkillDefinition, SkillOutput};
//! use skillkit::runtime::middleware::LoggingMiddleware;
//!
//! let agent = Agent::builder()
//!     .with_name("Greeter")
//!     .with_skill(SkillDefinition::new("greet", |p| async move {
//!         Ok(SkillOutput::from(format!("Hello, {}!", p.require_str("name")?)))
//!     }))
//!     .with_middleware(LoggingMiddleware::new())
//!     .build();
//! ```

use crate::agent::skill::{SkillDefinition, SkillReply};
use crate::errors::{AgentError, AgentResult};
use crate::runtime::auth::{AuthProvider, NoAuth};
use crate::runtime::core::error_mapper::ErrorEnvelope;
use crate::runtime::middleware::{Middleware, MiddlewareChain};
use crate::runtime::task_manager::{InMemoryTaskStore, TaskManager, TaskStore};
use crate::tools::ToolClient;
use std::sync::Arc;

const DEFAULT_AGENT_VERSION: &str = "0.0.1";

/// Called with the skill name and reply after every successful invocation.
pub type CompletionHook = Arc<dyn Fn(&str, &SkillReply) -> AgentResult<()> + Send + Sync>;

/// Turns an execution error into the envelope emitted to the caller.
pub type ErrorFormatter = Arc<dyn Fn(&AgentError) -> ErrorEnvelope + Send + Sync>;

/// Declarative definition of an agent.
///
/// Immutable once built. Use [`Agent::builder()`] to construct one and
/// [`SkillExecutor`](crate::runtime::core::SkillExecutor) to run requests
/// against it.
pub struct AgentDefinition {
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) description: Option<String>,
    pub(crate) skills: Vec<SkillDefinition>,
    pub(crate) middleware: MiddlewareChain,
    pub(crate) auth: Arc<dyn AuthProvider>,
    pub(crate) task_manager: Option<TaskManager>,
    pub(crate) tools: Option<Arc<dyn ToolClient>>,
    pub(crate) completion_hooks: Vec<CompletionHook>,
    pub(crate) error_formatter: Option<ErrorFormatter>,
}

/// Fluent builder for constructing [`AgentDefinition`] instances.
///
/// Obtain a builder through [`Agent::builder()`].
pub struct AgentBuilder {
    inner: AgentDefinition,
}

/// Marker struct providing the [`Agent::builder()`] entry point.
pub struct Agent;

impl Agent {
    /// Creates a new agent builder with open access and no task store.
    #[must_use]
    pub fn builder() -> AgentBuilder {
        AgentBuilder {
            inner: AgentDefinition {
                name: String::new(),
                version: DEFAULT_AGENT_VERSION.to_string(),
                description: None,
                skills: Vec::new(),
                middleware: MiddlewareChain::new(),
                auth: Arc::new(NoAuth),
                task_manager: None,
                tools: None,
                completion_hooks: Vec::new(),
                error_formatter: None,
            },
        }
    }
}

impl AgentBuilder {
    /// Sets the agent display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.inner.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.inner.description = Some(description.into());
        self
    }

    /// Registers a skill.
    ///
    /// Registering a name that already exists replaces the earlier skill in
    /// place, so every name appears once and keeps its original position.
    pub fn with_skill(mut self, skill: SkillDefinition) -> Self {
        match self
            .inner
            .skills
            .iter_mut()
            .find(|existing| existing.name() == skill.name())
        {
            Some(existing) => *existing = skill,
            None => self.inner.skills.push(skill),
        }
        self
    }

    /// Appends a middleware layer. Layers run in the order they are added.
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.inner.middleware.push(Arc::new(middleware));
        self
    }

    pub fn with_shared_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.inner.middleware.push(middleware);
        self
    }

    /// Sets the authentication policy. Defaults to [`NoAuth`].
    pub fn with_auth(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.inner.auth = Arc::new(auth);
        self
    }

    pub fn with_shared_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.inner.auth = auth;
        self
    }

    /// Enables task tracking backed by `store`.
    pub fn with_task_store(mut self, store: impl TaskStore + 'static) -> Self {
        self.inner.task_manager = Some(TaskManager::new(store));
        self
    }

    /// Enables task tracking with the in-memory store.
    pub fn with_memory_task_store(self) -> Self {
        self.with_task_store(InMemoryTaskStore::new())
    }

    pub fn with_task_manager(mut self, manager: TaskManager) -> Self {
        self.inner.task_manager = Some(manager);
        self
    }

    /// Sets the tool client injected into skills that need tools.
    pub fn with_tool_client(mut self, client: Arc<dyn ToolClient>) -> Self {
        self.inner.tools = Some(client);
        self
    }

    /// Adds a hook run after every successful invocation. Hook failures are
    /// logged and otherwise ignored.
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &SkillReply) -> AgentResult<()> + Send + Sync + 'static,
    {
        self.inner.completion_hooks.push(Arc::new(hook));
        self
    }

    /// Replaces the default `{error, type}` envelope for execution errors.
    pub fn with_error_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&AgentError) -> ErrorEnvelope + Send + Sync + 'static,
    {
        self.inner.error_formatter = Some(Arc::new(formatter));
        self
    }

    /// Finalizes and returns the agent definition.
    #[must_use]
    pub fn build(mut self) -> AgentDefinition {
        if self.inner.version.trim().is_empty() {
            self.inner.version = DEFAULT_AGENT_VERSION.to_string();
        }
        self.inner
    }
}

impl AgentDefinition {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Registered skills, in registration order.
    #[must_use]
    pub fn skills(&self) -> &[SkillDefinition] {
        &self.skills
    }

    #[must_use]
    pub fn skill(&self, name: &str) -> Option<&SkillDefinition> {
        self.skills.iter().find(|skill| skill.name() == name)
    }

    #[must_use]
    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// The task manager, if task tracking is enabled.
    #[must_use]
    pub fn task_manager(&self) -> Option<&TaskManager> {
        self.task_manager.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::skill::SkillOutput;
    use crate::runtime::middleware::{LoggingMiddleware, TimingMiddleware};

    fn constant(name: &str, value: &'static str) -> SkillDefinition {
        SkillDefinition::new(name, move |_p| async move { Ok(SkillOutput::from(value)) })
    }

    #[test]
    fn re_registration_replaces_in_place() {
        let agent = Agent::builder()
            .with_skill(constant("a", "first"))
            .with_skill(constant("b", "b"))
            .with_skill(constant("a", "second").with_tag("v2"))
            .build();

        let names: Vec<_> = agent.skills().iter().map(SkillDefinition::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(agent.skill("a").unwrap().tags(), ["v2"]);
    }

    #[test]
    fn defaults() {
        let agent = Agent::builder()
            .with_name("demo")
            .with_version("  ")
            .with_middleware(LoggingMiddleware::new())
            .with_middleware(TimingMiddleware::new())
            .build();

        assert_eq!(agent.name(), "demo");
        assert_eq!(agent.version(), DEFAULT_AGENT_VERSION);
        assert!(agent.task_manager().is_none());
        assert_eq!(agent.middleware().len(), 2);
        assert!(agent.description().is_none());
    }

    #[test]
    fn memory_task_store_enables_tracking() {
        let agent = Agent::builder().with_memory_task_store().build();
        assert!(agent.task_manager().is_some());
    }
}
