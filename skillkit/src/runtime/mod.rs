//! Per-request execution runtime.
//!
//! - [`auth`] - Credential policies run before any skill code
//! - [`task_manager`] - Task records and the handles skills report progress through
//! - [`middleware`] - Onion-model layers around skill calls
//! - [`core`] - Execution machinery (advanced API)
//! - [`logging`] - Subscriber setup

pub mod auth;
pub mod logging;
pub mod middleware;
pub mod task_manager;

// Core framework components (advanced API)
pub mod core;

pub use auth::{AuthProvider, AuthRequest, AuthResult};
pub use core::{
    CollectingSink, DispatchEvent, ErrorEnvelope, EventSink, IncomingInvocation, SkillExecutor,
};
pub use logging::{init_logging, LogLevel};
pub use middleware::{Middleware, MiddlewareChain, MiddlewareContext, Next};
pub use task_manager::{
    InMemoryTaskStore, ListTasksFilter, Task, TaskContext, TaskManager, TaskState, TaskStatus,
    TaskStore,
};
