//! Bearer token authentication with a caller-supplied validator.

use crate::runtime::auth::{bearer_token, AuthProvider, AuthRequest, AuthResult};
use std::sync::Arc;

/// Resolves a bearer token to an identity, or `None` when the token is rejected.
pub type TokenValidatorFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Requires an `Authorization: Bearer <token>` header and delegates the token
/// check to a validator function.
#[derive(Clone)]
pub struct BearerAuth {
    validator: TokenValidatorFn,
    header: String,
}

impl BearerAuth {
    pub fn new<F>(validator: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            validator: Arc::new(validator),
            header: "Authorization".to_string(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl AuthProvider for BearerAuth {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        let Some(token) = bearer_token(request, &self.header) else {
            return AuthResult::failure("Bearer token required");
        };

        match (self.validator)(token) {
            Some(identity) => AuthResult::success(identity, std::iter::empty::<String>()),
            None => AuthResult::failure("Invalid token"),
        }
    }
}
