use crate::agent::SkillReply;
use crate::errors::{AgentError, AgentResult};
use crate::runtime::middleware::{Middleware, MiddlewareContext, Next};
use std::time::Duration;

/// Fails the request with [`AgentError::Timeout`] if the rest of the chain
/// does not finish within `duration`. The in-flight call is dropped.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutMiddleware {
    duration: Duration,
}

impl TimeoutMiddleware {
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl Middleware for TimeoutMiddleware {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
        let operation = ctx.skill.clone();
        tokio::time::timeout(self.duration, next.run(ctx))
            .await
            .map_err(|_| AgentError::Timeout {
                operation,
                duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::middleware::{MiddlewareChain, TerminalHandler};
    use serde_json::json;
    use std::sync::Arc;

    struct Sleeps(Duration);

    #[async_trait::async_trait]
    impl TerminalHandler for Sleeps {
        async fn call(&self, _ctx: &mut MiddlewareContext) -> AgentResult<SkillReply> {
            tokio::time::sleep(self.0).await;
            Ok(SkillReply::Value(json!("late")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let mut chain = MiddlewareChain::new();
        chain.push(Arc::new(TimeoutMiddleware::new(Duration::from_secs(1))));

        let mut ctx = MiddlewareContext::new("slow", Default::default(), "");
        let err = chain
            .run(&mut ctx, &Sleeps(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout { ref operation, duration_ms: 1000 } if operation == "slow"));

        let mut ctx = MiddlewareContext::default();
        assert!(chain
            .run(&mut ctx, &Sleeps(Duration::from_millis(10)))
            .await
            .is_ok());
    }
}
