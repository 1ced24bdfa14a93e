use crate::agent::SkillReply;
use crate::errors::AgentResult;
use crate::runtime::middleware::{Middleware, MiddlewareContext, Next};
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

/// Logs each call and records `started_at`, `finished_at`, and on failure
/// `error` into the context metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
        let started = Utc::now();
        ctx.metadata
            .insert("started_at".into(), Value::String(started.to_rfc3339()));
        info!(skill = %ctx.skill, params = ctx.params.len(), "calling skill");

        let result = next.run(ctx).await;

        let finished = Utc::now();
        let elapsed_ms = (finished - started).num_milliseconds();
        ctx.metadata
            .insert("finished_at".into(), Value::String(finished.to_rfc3339()));
        match &result {
            Ok(_) => info!(skill = %ctx.skill, elapsed_ms, "skill completed"),
            Err(err) => {
                ctx.metadata
                    .insert("error".into(), Value::String(err.to_string()));
                error!(skill = %ctx.skill, elapsed_ms, error = %err, "skill failed");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentError;
    use crate::runtime::middleware::{MiddlewareChain, TerminalHandler};
    use std::sync::Arc;

    struct Failing;

    #[async_trait::async_trait]
    impl TerminalHandler for Failing {
        async fn call(&self, _ctx: &mut MiddlewareContext) -> AgentResult<SkillReply> {
            Err(AgentError::skill_failed("disk full"))
        }
    }

    #[tokio::test]
    async fn records_timestamps_and_error() {
        let mut chain = MiddlewareChain::new();
        chain.push(Arc::new(LoggingMiddleware::new()));
        let mut ctx = MiddlewareContext::default();

        let err = chain.run(&mut ctx, &Failing).await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(ctx.metadata.contains_key("started_at"));
        assert!(ctx.metadata.contains_key("finished_at"));
        assert_eq!(ctx.metadata["error"], Value::String("disk full".into()));
    }
}
