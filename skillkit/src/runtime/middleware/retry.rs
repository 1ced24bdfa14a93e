use crate::agent::SkillReply;
use crate::errors::{AgentError, AgentResult};
use crate::runtime::middleware::{Middleware, MiddlewareContext, Next};
use std::time::Duration;
use tracing::warn;

/// Re-runs the rest of the chain on failure, with linear backoff.
///
/// Attempt `n` (1-based) that fails is followed by a sleep of `delay * n`.
/// Cancellation and validation errors are returned immediately. Chunks a
/// streaming skill emitted before failing are emitted again on retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryMiddleware {
    max_attempts: u32,
    delay: Duration,
}

impl RetryMiddleware {
    /// `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryMiddleware {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

fn retryable(err: &AgentError) -> bool {
    !matches!(
        err,
        AgentError::Cancelled { .. }
            | AgentError::Validation { .. }
            | AgentError::InvalidInput(_)
            | AgentError::MissingInput(_)
    )
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl Middleware for RetryMiddleware {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
        let mut attempt = 1;
        loop {
            match next.run(ctx).await {
                Err(err) if attempt < self.max_attempts && retryable(&err) => {
                    warn!(skill = %ctx.skill, attempt, error = %err, "skill failed, retrying");
                    tokio::time::sleep(self.delay * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
