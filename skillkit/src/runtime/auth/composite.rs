//! Ordered combination of authentication policies.

use crate::runtime::auth::{AuthProvider, AuthRequest, AuthResult};
use std::sync::Arc;
use tracing::debug;

/// Tries each policy in order and returns the first success.
///
/// When every policy rejects the request the result carries a generic
/// `"Authentication failed"` error rather than any single policy's reason.
#[derive(Clone, Default)]
pub struct CompositeAuth {
    providers: Vec<Arc<dyn AuthProvider>>,
}

impl CompositeAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn with_shared(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl AuthProvider for CompositeAuth {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        for (index, provider) in self.providers.iter().enumerate() {
            let result = provider.authenticate(request).await;
            if result.authenticated {
                return result;
            }
            debug!(policy = index, error = ?result.error, "composite auth policy rejected request");
        }
        AuthResult::failure("Authentication failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::auth::{ApiKeyAuth, BearerAuth};

    fn composite() -> CompositeAuth {
        CompositeAuth::new()
            .with(ApiKeyAuth::new(["admin-key"]))
            .with(BearerAuth::new(|t| (t == "tok").then(|| "bob".to_string())))
    }

    #[tokio::test]
    async fn first_success_wins() {
        let by_key = AuthRequest::new().with_header("X-API-Key", "admin-key");
        let result = composite().authenticate(&by_key).await;
        assert!(result.identity().unwrap().starts_with("secret:"));

        let by_token = AuthRequest::new().with_header("Authorization", "Bearer tok");
        let result = composite().authenticate(&by_token).await;
        assert_eq!(result.identity(), Some("bob"));
    }

    #[tokio::test]
    async fn failure_is_generic() {
        let request = AuthRequest::new().with_header("X-API-Key", "wrong");
        let result = composite().authenticate(&request).await;
        assert!(!result.authenticated);
        assert_eq!(result.error.as_deref(), Some("Authentication failed"));
    }

    #[tokio::test]
    async fn empty_composite_rejects() {
        let result = CompositeAuth::new().authenticate(&AuthRequest::new()).await;
        assert!(!result.authenticated);
    }
}
