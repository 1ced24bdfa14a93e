use crate::agent::SkillReply;
use crate::errors::{AgentError, AgentResult};
use crate::runtime::core::error_mapper::ErrorEnvelope;
use crate::runtime::middleware::{Middleware, MiddlewareContext, Next};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Formats a caught error into a reply value.
pub type ErrorReplyFn = Arc<dyn Fn(&AgentError, &MiddlewareContext) -> Value + Send + Sync>;

/// Converts errors from the rest of the chain into an ordinary reply.
///
/// The default reply is `{"error": <message>, "type": <kind>}` plus any
/// structured details. Cancellation is never converted.
#[derive(Clone, Default)]
pub struct ErrorHandlingMiddleware {
    formatter: Option<ErrorReplyFn>,
}

impl ErrorHandlingMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom formatter for the reply value.
    pub fn with_formatter<F>(formatter: F) -> Self
    where
        F: Fn(&AgentError, &MiddlewareContext) -> Value + Send + Sync + 'static,
    {
        Self {
            formatter: Some(Arc::new(formatter)),
        }
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl Middleware for ErrorHandlingMiddleware {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
        match next.run(ctx).await {
            Err(err @ AgentError::Cancelled { .. }) => Err(err),
            Err(err) => {
                debug!(skill = %ctx.skill, error = %err, "converting error into reply");
                let value = match &self.formatter {
                    Some(formatter) => formatter(&err, ctx),
                    None => ErrorEnvelope::from(&err).to_value(),
                };
                Ok(SkillReply::Value(value))
            }
            ok => ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::middleware::{MiddlewareChain, TerminalHandler};
    use serde_json::json;

    struct Fails(fn() -> AgentError);

    #[async_trait::async_trait]
    impl TerminalHandler for Fails {
        async fn call(&self, _ctx: &mut MiddlewareContext) -> AgentResult<SkillReply> {
            Err((self.0)())
        }
    }

    fn chain(middleware: ErrorHandlingMiddleware) -> MiddlewareChain {
        let mut chain = MiddlewareChain::new();
        chain.push(Arc::new(middleware));
        chain
    }

    #[tokio::test]
    async fn error_becomes_structured_reply() {
        let mut ctx = MiddlewareContext::default();
        let reply = chain(ErrorHandlingMiddleware::new())
            .run(&mut ctx, &Fails(|| AgentError::skill_failed("Something went wrong")))
            .await
            .unwrap();
        assert_eq!(
            reply,
            SkillReply::Value(json!({"error": "Something went wrong", "type": "OperationFailure"}))
        );
    }

    #[tokio::test]
    async fn custom_formatter_sees_context() {
        let handler = ErrorHandlingMiddleware::with_formatter(|err, ctx| {
            json!({"skill": ctx.skill, "message": err.to_string()})
        });
        let mut ctx = MiddlewareContext::new("divide", Default::default(), "");
        let reply = chain(handler)
            .run(&mut ctx, &Fails(|| AgentError::InvalidInput("b must be non-zero".into())))
            .await
            .unwrap();
        assert_eq!(reply.as_value().unwrap()["skill"], json!("divide"));
    }

    #[tokio::test]
    async fn cancellation_passes_through() {
        let mut ctx = MiddlewareContext::default();
        let err = chain(ErrorHandlingMiddleware::new())
            .run(&mut ctx, &Fails(|| AgentError::Cancelled { reason: "client left".into() }))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Cancelled { .. }));
    }
}
