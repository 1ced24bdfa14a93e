//! Onion-model middleware around skill invocation.
//!
//! Middleware runs in registration order. Each layer receives the shared
//! [`MiddlewareContext`] and a [`Next`] handle for the rest of the chain,
//! ending with the skill call itself. For `[A, B]` around skill `T` the trace
//! is `A.before, B.before, T, B.after, A.after`.
//!
//! An error returned from `next.run` propagates outward through every layer
//! that does not handle it. A layer may instead convert it into a reply (see
//! [`ErrorHandlingMiddleware`]).
//!
//! # Examples
//!
//! ```ignore
//! use skillkit::runtime::middleware::{Middleware, MiddlewareContext, Next};
//!
//! struct Audit;
//!
//! #[async_trait::async_trait]
//! impl Middleware for Audit {
//!     async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
//!         ctx.metadata.insert("audited".into(), true.into());
//!         next.run(ctx).await
//!     }
//! }
//! ```

pub mod cors;
pub mod error_handling;
pub mod logging;
pub mod rate_limit;
pub mod request_id;
pub mod retry;
pub mod timeout;
pub mod timing;

pub use cors::CorsMiddleware;
pub use error_handling::ErrorHandlingMiddleware;
pub use logging::LoggingMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use request_id::RequestIdMiddleware;
pub use retry::RetryMiddleware;
pub use timeout::TimeoutMiddleware;
pub use timing::TimingMiddleware;

use crate::agent::SkillReply;
use crate::compat::{MaybeSend, MaybeSync};
use crate::errors::AgentResult;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-request state shared by every middleware layer.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareContext {
    /// Resolved skill name.
    pub skill: String,
    /// Caller parameters. Edits made here reach the skill.
    pub params: Map<String, Value>,
    /// Raw message text the invocation was parsed from.
    pub message: String,
    /// Open scratch space for cross-middleware communication.
    pub metadata: HashMap<String, Value>,
}

impl MiddlewareContext {
    pub fn new(skill: impl Into<String>, params: Map<String, Value>, message: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            params,
            message: message.into(),
            metadata: HashMap::new(),
        }
    }
}

/// One layer of the chain.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait Middleware: MaybeSend + MaybeSync {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply>;
}

/// The innermost call the chain wraps.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait TerminalHandler: MaybeSend + MaybeSync {
    async fn call(&self, ctx: &mut MiddlewareContext) -> AgentResult<SkillReply>;
}

/// The remainder of the chain from one layer's point of view.
///
/// `Next` is `Copy`: a layer may run the rest of the chain more than once.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn TerminalHandler,
}

impl<'a> Next<'a> {
    /// Runs the next layer, or the terminal call when no layers remain.
    ///
    /// # Errors
    ///
    /// Returns whatever error the rest of the chain produces.
    pub async fn run(self, ctx: &mut MiddlewareContext) -> AgentResult<SkillReply> {
        match self.remaining.split_first() {
            Some((layer, rest)) => {
                let next = Next {
                    remaining: rest,
                    terminal: self.terminal,
                };
                layer.handle(ctx, next).await
            }
            None => self.terminal.call(ctx).await,
        }
    }

    /// Number of layers still ahead of the terminal call.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

/// Ordered, append-only list of middleware.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Runs the full chain around `terminal`.
    ///
    /// # Errors
    ///
    /// Returns the first error no layer handled.
    pub async fn run(
        &self,
        ctx: &mut MiddlewareContext,
        terminal: &dyn TerminalHandler,
    ) -> AgentResult<SkillReply> {
        Next {
            remaining: &self.layers,
            terminal,
        }
        .run(ctx)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentError;
    use serde_json::json;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: String,
        trace: Trace,
    }

    #[async_trait::async_trait]
    impl Middleware for Recording {
        async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
            self.trace.lock().unwrap().push(format!("{}-before", self.name));
            let result = next.run(ctx).await;
            self.trace.lock().unwrap().push(format!("{}-after", self.name));
            result
        }
    }

    struct Terminal {
        trace: Trace,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl TerminalHandler for Terminal {
        async fn call(&self, ctx: &mut MiddlewareContext) -> AgentResult<SkillReply> {
            self.trace.lock().unwrap().push("call".to_string());
            if self.fail {
                return Err(AgentError::skill_failed("boom"));
            }
            Ok(SkillReply::Value(Value::Object(ctx.params.clone())))
        }
    }

    fn chain(k: usize, trace: &Trace) -> MiddlewareChain {
        let mut chain = MiddlewareChain::new();
        for i in 1..=k {
            chain.push(Arc::new(Recording {
                name: i.to_string(),
                trace: trace.clone(),
            }));
        }
        chain
    }

    #[tokio::test]
    async fn layers_nest_in_registration_order_for_any_length() {
        for k in 0..6 {
            let trace = Trace::default();
            let terminal = Terminal {
                trace: trace.clone(),
                fail: false,
            };
            let mut ctx = MiddlewareContext::default();
            chain(k, &trace).run(&mut ctx, &terminal).await.unwrap();

            let mut expected: Vec<String> = (1..=k).map(|i| format!("{i}-before")).collect();
            expected.push("call".into());
            expected.extend((1..=k).rev().map(|i| format!("{i}-after")));
            assert_eq!(*trace.lock().unwrap(), expected, "k = {k}");
        }
    }

    #[tokio::test]
    async fn unhandled_error_propagates_unchanged() {
        let trace = Trace::default();
        let terminal = Terminal {
            trace: trace.clone(),
            fail: true,
        };
        let mut ctx = MiddlewareContext::default();
        let err = chain(3, &trace).run(&mut ctx, &terminal).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    struct Rewrite;

    #[async_trait::async_trait]
    impl Middleware for Rewrite {
        async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
            ctx.params.insert("name".into(), json!("rewritten"));
            ctx.metadata.insert("seen".into(), json!(next.remaining()));
            next.run(ctx).await
        }
    }

    #[tokio::test]
    async fn parameter_edits_reach_the_terminal() {
        let mut chain = MiddlewareChain::new();
        chain.push(Arc::new(Rewrite));
        let terminal = Terminal {
            trace: Trace::default(),
            fail: false,
        };
        let mut ctx = MiddlewareContext::new("greet", Map::new(), "");
        let reply = chain.run(&mut ctx, &terminal).await.unwrap();
        assert_eq!(reply, SkillReply::Value(json!({"name": "rewritten"})));
        assert_eq!(ctx.metadata["seen"], json!(0));
    }
}
