use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for skill execution
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // === Authentication Errors ===
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Insufficient permissions: requires {required:?}")]
    InsufficientScopes { required: Vec<String> },

    // === Resolution Errors ===
    #[error("Unknown skill '{skill_id}'. Available skills: {}", available.join(", "))]
    SkillNotFound {
        skill_id: String,
        available: Vec<String>,
    },

    #[error("No skill specified. Available skills: {}", available.join(", "))]
    NoSkillSpecified { available: Vec<String> },

    #[error("No skills registered")]
    NoSkillsRegistered,

    // === Validation Errors ===
    #[error("Validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    // === Skill Execution Errors ===
    #[error("{message}")]
    SkillFailed { message: String },

    #[error("Rate limit exceeded: {max_requests} requests per {window_secs}s")]
    RateLimitExceeded { max_requests: usize, window_secs: u64 },

    #[error("Operation timed out: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Request cancelled: {reason}")]
    Cancelled { reason: String },

    // === Task Management Errors ===
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("Status observer failed for task {task_id}: {reason}")]
    ObserverFailed { task_id: String, reason: String },

    // === Tool Errors ===
    #[error("Tool not found: {tool_name}")]
    ToolNotFound { tool_name: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ToolExecutionFailed { tool_name: String, reason: String },

    // === Configuration Errors ===
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Missing configuration: {field}")]
    MissingConfiguration { field: String },

    // === General System Errors ===
    #[error("Serialization error: {format}: {reason}")]
    Serialization { format: String, reason: String },

    #[error("Internal error: {component}: {reason}")]
    Internal { component: String, reason: String },
}

/// Convenience type alias
pub type AgentResult<T> = std::result::Result<T, AgentError>;

/// Coarse classification of failures reported back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AuthenticationFailure,
    ResolutionFailure,
    ValidationFailure,
    OperationFailure,
    RateLimited,
    ObserverFailure,
    Cancelled,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthenticationFailure => "AuthenticationFailure",
            Self::ResolutionFailure => "ResolutionFailure",
            Self::ValidationFailure => "ValidationFailure",
            Self::OperationFailure => "OperationFailure",
            Self::RateLimited => "RateLimited",
            Self::ObserverFailure => "ObserverFailure",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AgentError {
    /// Builds the error a skill body returns when its own logic fails.
    pub fn skill_failed(message: impl Into<String>) -> Self {
        Self::SkillFailed {
            message: message.into(),
        }
    }

    /// Maps the error onto the caller-facing taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationFailed { .. } | Self::InsufficientScopes { .. } => {
                ErrorKind::AuthenticationFailure
            }
            Self::SkillNotFound { .. } | Self::NoSkillSpecified { .. } | Self::NoSkillsRegistered => {
                ErrorKind::ResolutionFailure
            }
            Self::Validation { .. } | Self::InvalidInput(..) | Self::MissingInput(..) => {
                ErrorKind::ValidationFailure
            }
            Self::RateLimitExceeded { .. } => ErrorKind::RateLimited,
            Self::ObserverFailed { .. } => ErrorKind::ObserverFailure,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            _ => ErrorKind::OperationFailure,
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            format: "json".to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for AgentError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            format: "yaml".to_string(),
            reason: error.to_string(),
        }
    }
}
