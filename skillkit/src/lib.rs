//! Per-request execution core for skill-serving agents.
//!
//! An agent is a set of named skills plus the machinery around each call:
//! credential checks, middleware, task tracking, collaborator injection and
//! streamed delivery. Build one with [`agent::Agent::builder`] (or load the
//! ambient parts from YAML via [`config::AgentLoader`]) and run requests with
//! [`runtime::SkillExecutor`].

pub mod agent;
pub mod compat;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod test_support;
pub mod tools;

// Re-export key types for easier access
pub use agent::{Agent, AgentBuilder, AgentDefinition, SkillDefinition, SkillOutput, SkillParams};
pub use compat::{MaybeSend, MaybeSync};
pub use errors::{AgentError, AgentResult, ErrorKind};
pub use runtime::{DispatchEvent, EventSink, IncomingInvocation, SkillExecutor};
