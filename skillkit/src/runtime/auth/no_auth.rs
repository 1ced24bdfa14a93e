//! Open-access authentication policy.

use crate::runtime::auth::{AuthProvider, AuthRequest, AuthResult};

/// Accepts every request as the `anonymous` identity with the `*` scope.
///
/// This is the default policy of an agent built without
/// [`AgentBuilder::with_auth`](crate::agent::AgentBuilder::with_auth).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl AuthProvider for NoAuth {
    async fn authenticate(&self, _request: &AuthRequest) -> AuthResult {
        AuthResult::anonymous()
    }
}
