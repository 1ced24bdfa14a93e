use crate::agent::SkillReply;
use crate::errors::AgentResult;
use crate::runtime::middleware::{Middleware, MiddlewareContext, Next};
use serde::Serialize;

/// Publishes a CORS policy under `cors` in the context metadata.
///
/// The core never applies the policy itself; the transport layer reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorsMiddleware {
    origins: Vec<String>,
    methods: Vec<String>,
    headers: Vec<String>,
}

impl CorsMiddleware {
    /// Allows `origins` with the `GET`, `POST`, and `OPTIONS` methods.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: origins.into_iter().map(Into::into).collect(),
            methods: vec!["GET".into(), "POST".into(), "OPTIONS".into()],
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl Middleware for CorsMiddleware {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
        ctx.metadata
            .insert("cors".into(), serde_json::to_value(self)?);
        next.run(ctx).await
    }
}
