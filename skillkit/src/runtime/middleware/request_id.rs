use crate::agent::SkillReply;
use crate::errors::AgentResult;
use crate::runtime::middleware::{Middleware, MiddlewareContext, Next};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

/// Tags each request with a fresh `request_id` in the context metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdMiddleware;

impl RequestIdMiddleware {
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
impl Middleware for RequestIdMiddleware {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::debug_span!("request", request_id = %request_id, skill = %ctx.skill);
        ctx.metadata
            .insert("request_id".into(), Value::String(request_id));
        next.run(ctx).instrument(span).await
    }
}
