//! Per-request skill execution.
//!
//! [`SkillExecutor::execute`] runs one invocation end to end:
//!
//! 1. resolve the skill (a lone registered skill is the default)
//! 2. authenticate the caller; on failure emit an error and stop
//! 3. create a task if the skill needs one and a store is configured
//! 4. select collaborators to inject
//! 5. run the middleware chain around the handler and streaming adapter
//! 6. emit the reply and run completion hooks
//! 7. format and emit any error from steps 3 to 6
//!
//! Nothing is returned to the caller: every outcome, including failure, is
//! delivered through the [`EventSink`].

use crate::agent::{AgentDefinition, SkillDefinition, SkillReply};
use crate::errors::{AgentError, AgentResult};
use crate::runtime::auth::{AuthRequest, AuthResult};
use crate::runtime::core::error_mapper::ErrorEnvelope;
use crate::runtime::core::injector::{Injections, ParameterInjector};
use crate::runtime::core::sink::{DispatchEvent, EventSink};
use crate::runtime::core::streaming::StreamingAdapter;
use crate::runtime::middleware::{MiddlewareContext, TerminalHandler};
use crate::runtime::task_manager::TaskContext;
use serde::{Deserialize, Serialize};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A decoded request from the transport adapter.
#[derive(Debug, Clone, Default)]
pub struct IncomingInvocation {
    pub skill: Option<String>,
    pub params: Map<String, Value>,
    pub message: String,
    pub credentials: AuthRequest,
}

#[derive(Deserialize)]
struct SkillCallMessage {
    skill: String,
    #[serde(default)]
    params: Map<String, Value>,
}

impl IncomingInvocation {
    pub fn new(skill: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            skill: Some(skill.into()),
            params,
            message: String::new(),
            credentials: AuthRequest::default(),
        }
    }

    /// Parses message text.
    ///
    /// `{"skill": "name", "params": {...}}` names a skill. Anything else,
    /// including JSON without a `skill` field, becomes `{"message": text}`
    /// with no skill named.
    pub fn from_message(text: impl Into<String>, credentials: AuthRequest) -> Self {
        let message = text.into();
        let (skill, params) = match serde_json::from_str::<SkillCallMessage>(&message) {
            Ok(call) => (Some(call.skill), call.params),
            Err(_) => {
                debug!("message is not a skill call, treating as plain text");
                let mut params = Map::new();
                params.insert("message".into(), Value::String(message.clone()));
                (None, params)
            }
        };
        Self {
            skill,
            params,
            message,
            credentials,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: AuthRequest) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Introspection view of a registered skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescription {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub is_streaming: bool,
}

/// Runs invocations against one agent definition. Cheap to clone.
#[derive(Clone)]
pub struct SkillExecutor {
    agent: Arc<AgentDefinition>,
}

impl SkillExecutor {
    #[must_use]
    pub fn new(agent: AgentDefinition) -> Self {
        Self {
            agent: Arc::new(agent),
        }
    }

    #[must_use]
    pub fn agent(&self) -> &AgentDefinition {
        &self.agent
    }

    /// Registered skill names, in registration order.
    #[must_use]
    pub fn list_operations(&self) -> Vec<String> {
        self.agent
            .skills
            .iter()
            .map(|skill| skill.name().to_string())
            .collect()
    }

    #[must_use]
    pub fn describe_operation(&self, name: &str) -> Option<OperationDescription> {
        self.agent.skill(name).map(|skill| OperationDescription {
            name: skill.name().to_string(),
            description: skill.description().map(str::to_string),
            tags: skill.tags().to_vec(),
            is_streaming: skill.is_streaming(),
        })
    }

    /// Finds the skill an invocation targets.
    ///
    /// # Errors
    ///
    /// Returns a resolution error listing the available skills when `name`
    /// is unknown, or when it is absent and more than one skill is registered.
    pub fn resolve(&self, name: Option<&str>) -> AgentResult<&SkillDefinition> {
        let skills = &self.agent.skills;
        match name {
            Some(name) => self
                .agent
                .skill(name)
                .ok_or_else(|| AgentError::SkillNotFound {
                    skill_id: name.to_string(),
                    available: self.list_operations(),
                }),
            None => match skills.as_slice() {
                [] => Err(AgentError::NoSkillsRegistered),
                [only] => Ok(only),
                _ => Err(AgentError::NoSkillSpecified {
                    available: self.list_operations(),
                }),
            },
        }
    }

    /// Runs one invocation, delivering every outcome to `sink`.
    pub async fn execute(&self, invocation: IncomingInvocation, sink: &dyn EventSink) {
        let IncomingInvocation {
            skill,
            params,
            message,
            credentials,
        } = invocation;

        let skill = match self.resolve(skill.as_deref()) {
            Ok(skill) => skill,
            Err(err) => {
                warn!(error = %err, "could not resolve skill");
                sink.emit(DispatchEvent::Error(ErrorEnvelope::from(&err)))
                    .await;
                return;
            }
        };

        let auth = self.agent.auth.authenticate(&credentials).await;
        if !auth.authenticated {
            let err = AgentError::AuthenticationFailed {
                reason: auth
                    .error
                    .unwrap_or_else(|| "Authentication failed".to_string()),
            };
            warn!(skill = %skill.name(), error = %err, "rejected unauthenticated request");
            sink.emit(DispatchEvent::Error(ErrorEnvelope::from(&err)))
                .await;
            return;
        }

        debug!(skill = %skill.name(), identity = ?auth.identity(), "dispatching skill");
        match self.run(skill, params, message, &auth, sink).await {
            Ok(reply) => {
                if let SkillReply::Value(value) = &reply {
                    if !sink.emit(DispatchEvent::Result(value.clone())).await {
                        debug!(skill = %skill.name(), "event sink closed before result");
                    }
                }
                info!(skill = %skill.name(), "skill completed");
                self.run_completion_hooks(skill.name(), &reply);
            }
            Err(AgentError::Cancelled { reason }) => {
                debug!(skill = %skill.name(), %reason, "invocation cancelled");
            }
            Err(err) => {
                error!(skill = %skill.name(), error = %err, "skill execution failed");
                let envelope = match &self.agent.error_formatter {
                    Some(formatter) => formatter(&err),
                    None => ErrorEnvelope::from(&err),
                };
                sink.emit(DispatchEvent::Error(envelope)).await;
            }
        }
    }

    async fn run(
        &self,
        skill: &SkillDefinition,
        params: Map<String, Value>,
        message: String,
        auth: &AuthResult,
        sink: &dyn EventSink,
    ) -> AgentResult<SkillReply> {
        let task = match (&skill.needs().task, &self.agent.task_manager) {
            (Some(_), Some(manager)) => Some(manager.start(skill.name(), params.clone()).await?),
            _ => None,
        };

        let injections =
            ParameterInjector::prepare(skill.needs(), task.as_ref(), auth, self.agent.tools.as_ref());

        let terminal = HandlerCall {
            skill,
            injections,
            task: task.clone(),
            sink,
        };
        let mut ctx = MiddlewareContext::new(skill.name(), params, message);
        let result = AssertUnwindSafe(self.agent.middleware.run(&mut ctx, &terminal))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error("middleware", payload.as_ref())));

        // Errors raised outside the handler (deadlines, rate limits) still
        // have to close the task.
        if let (Err(err), Some(task)) = (&result, &task) {
            record_failure(task, err).await;
        }
        result
    }

    fn run_completion_hooks(&self, skill: &str, reply: &SkillReply) {
        for (index, hook) in self.agent.completion_hooks.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| hook(skill, reply))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(skill, hook = index, error = %err, "completion hook failed");
                }
                Err(_) => warn!(skill, hook = index, "completion hook panicked"),
            }
        }
    }
}

/// The innermost layer: invoke the handler, then deliver its output.
struct HandlerCall<'a> {
    skill: &'a SkillDefinition,
    injections: Injections,
    task: Option<TaskContext>,
    sink: &'a dyn EventSink,
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl TerminalHandler for HandlerCall<'_> {
    async fn call(&self, ctx: &mut MiddlewareContext) -> AgentResult<SkillReply> {
        let params = self.injections.apply(ctx.params.clone());
        let invocation = async {
            let output = self.skill.handler().invoke(params).await?;
            StreamingAdapter::deliver(self.skill.is_streaming(), output, self.sink).await
        };
        let result = AssertUnwindSafe(invocation)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error("skill", payload.as_ref())));

        if let (Err(err), Some(task)) = (&result, &self.task) {
            record_failure(task, err).await;
        }
        result
    }
}

/// Marks `task` failed unless it already finished or the caller went away.
async fn record_failure(task: &TaskContext, err: &AgentError) {
    if matches!(err, AgentError::Cancelled { .. }) || task.state().await.is_terminal() {
        return;
    }
    if let Err(store_err) = task.fail(err.to_string()).await {
        warn!(task_id = %task.id(), error = %store_err, "could not record task failure");
    }
}

fn panic_error(component: &str, payload: &(dyn Any + Send)) -> AgentError {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(component, %reason, "caught panic during invocation");
    AgentError::Internal {
        component: component.to_string(),
        reason: format!("panicked: {reason}"),
    }
}
