use crate::agent::SkillReply;
use crate::errors::{AgentError, AgentResult};
use crate::runtime::middleware::{Middleware, MiddlewareContext, Next};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Sliding-window request limiter, shared by every request through one
/// instance.
///
/// Each admitted request leaves a timestamp. Before admitting another,
/// timestamps older than `now - window` are discarded; if `max_requests`
/// remain, the request is rejected with [`AgentError::RateLimitExceeded`]
/// and leaves no timestamp.
#[derive(Debug)]
pub struct RateLimitMiddleware {
    max_requests: usize,
    window: Duration,
    hits: Mutex<VecDeque<Instant>>,
}

impl RateLimitMiddleware {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    #[must_use]
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    fn admit(&self) -> AgentResult<()> {
        let mut hits = self.hits.lock().map_err(|_| AgentError::Internal {
            component: "rate_limit".to_string(),
            reason: "timestamp ring lock poisoned".to_string(),
        })?;

        let now = Instant::now();
        if let Some(cutoff) = now.checked_sub(self.window) {
            while hits.front().is_some_and(|t| *t < cutoff) {
                hits.pop_front();
            }
        }

        if hits.len() >= self.max_requests {
            return Err(AgentError::RateLimitExceeded {
                max_requests: self.max_requests,
                window_secs: self.window.as_secs(),
            });
        }
        hits.push_back(now);
        Ok(())
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl Middleware for RateLimitMiddleware {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
        if let Err(err) = self.admit() {
            warn!(skill = %ctx.skill, error = %err, "request rejected by rate limiter");
            return Err(err);
        }
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::middleware::{MiddlewareChain, TerminalHandler};
    use serde_json::json;
    use std::sync::Arc;

    struct Ok200;

    #[async_trait::async_trait]
    impl TerminalHandler for Ok200 {
        async fn call(&self, _ctx: &mut MiddlewareContext) -> AgentResult<SkillReply> {
            Ok(SkillReply::Value(json!("ok")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ceiling_then_recovery_after_window() {
        let mut chain = MiddlewareChain::new();
        chain.push(Arc::new(RateLimitMiddleware::new(3, Duration::from_secs(10))));

        for _ in 0..3 {
            let mut ctx = MiddlewareContext::default();
            chain.run(&mut ctx, &Ok200).await.unwrap();
        }

        let mut ctx = MiddlewareContext::default();
        let err = chain.run(&mut ctx, &Ok200).await.unwrap_err();
        assert!(err.to_string().contains("Rate limit exceeded"), "{err}");

        tokio::time::advance(Duration::from_secs(10) + Duration::from_millis(1)).await;
        let mut ctx = MiddlewareContext::default();
        assert!(chain.run(&mut ctx, &Ok200).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_one_entry_at_a_time() {
        let limiter = RateLimitMiddleware::new(2, Duration::from_secs(10));
        limiter.admit().unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        limiter.admit().unwrap();
        assert!(limiter.admit().is_err());

        // Only the first entry has aged out.
        tokio::time::advance(Duration::from_secs(6)).await;
        limiter.admit().unwrap();
        assert!(limiter.admit().is_err());
    }

    #[test]
    fn zero_ceiling_rejects_everything() {
        let limiter = RateLimitMiddleware::per_minute(0);
        assert!(matches!(
            limiter.admit(),
            Err(AgentError::RateLimitExceeded { max_requests: 0, window_secs: 60 })
        ));
    }
}
