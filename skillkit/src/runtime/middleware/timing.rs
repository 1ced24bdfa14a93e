use crate::agent::SkillReply;
use crate::errors::AgentResult;
use crate::runtime::middleware::{Middleware, MiddlewareContext, Next};
use serde_json::json;
use tokio::time::Instant;

/// Records the wall time of the rest of the chain as `execution_time_ms`.
///
/// Nothing is recorded when the chain fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingMiddleware;

impl TimingMiddleware {
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
impl Middleware for TimingMiddleware {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
        let start = Instant::now();
        let reply = next.run(ctx).await?;
        let elapsed = start.elapsed().as_secs_f64() * 1000.0;
        ctx.metadata.insert(
            "execution_time_ms".into(),
            json!((elapsed * 100.0).round() / 100.0),
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::middleware::{MiddlewareChain, TerminalHandler};
    use std::sync::Arc;
    use std::time::Duration;

    struct Slow;

    #[async_trait::async_trait]
    impl TerminalHandler for Slow {
        async fn call(&self, _ctx: &mut MiddlewareContext) -> AgentResult<SkillReply> {
            tokio::time::sleep(Duration::from_millis(250)).await;
            Ok(SkillReply::Value(json!("done")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn measures_elapsed_time() {
        let mut chain = MiddlewareChain::new();
        chain.push(Arc::new(TimingMiddleware::new()));
        let mut ctx = MiddlewareContext::default();

        chain.run(&mut ctx, &Slow).await.unwrap();
        let ms = ctx.metadata["execution_time_ms"].as_f64().unwrap();
        assert!((250.0..260.0).contains(&ms), "{ms}");
    }
}
