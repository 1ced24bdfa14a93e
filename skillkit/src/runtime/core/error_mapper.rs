//! Helpers for translating execution errors into emitted payloads.

use crate::errors::{AgentError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Protocol-neutral error payload handed to the transport adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            details: Map::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Renders `{"error": message, "type": kind}` followed by any details.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("error".into(), Value::String(self.message.clone()));
        object.insert("type".into(), Value::String(self.kind.as_str().to_string()));
        for (key, value) in &self.details {
            object.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(object)
    }
}

impl From<&AgentError> for ErrorEnvelope {
    fn from(error: &AgentError) -> Self {
        use AgentError::{
            InsufficientScopes, NoSkillSpecified, RateLimitExceeded, SkillNotFound, TaskNotFound,
            Timeout, ToolExecutionFailed, ToolNotFound, Validation,
        };

        let envelope = Self::new(error.kind(), error.to_string());
        let details = match error {
            SkillNotFound {
                skill_id,
                available,
            } => json!({ "skill": skill_id, "available_skills": available }),
            NoSkillSpecified { available } => json!({ "available_skills": available }),
            InsufficientScopes { required } => json!({ "required_scopes": required }),
            Validation { field, .. } => json!({ "field": field }),
            RateLimitExceeded {
                max_requests,
                window_secs,
            } => json!({ "max_requests": max_requests, "window_secs": window_secs }),
            Timeout { duration_ms, .. } => json!({ "timeout_ms": duration_ms }),
            TaskNotFound { task_id } => json!({ "task_id": task_id }),
            ToolNotFound { tool_name } | ToolExecutionFailed { tool_name, .. } => {
                json!({ "tool": tool_name })
            }
            _ => return envelope,
        };

        match details {
            Value::Object(details) => Self { details, ..envelope },
            _ => envelope,
        }
    }
}

impl From<AgentError> for ErrorEnvelope {
    fn from(error: AgentError) -> Self {
        Self::from(&error)
    }
}
