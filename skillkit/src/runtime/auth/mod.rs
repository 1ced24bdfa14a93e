//! Authentication policies.
//!
//! This module provides the credential checks that gate every skill
//! invocation. The [`AuthProvider`] trait defines the interface; concrete
//! policies cover open access, shared API keys, bearer tokens, federated
//! (issuer/audience) tokens, and ordered combinations of those.
//!
//! Authentication runs before any middleware. A failed [`AuthResult`] stops
//! the request before the skill or its middleware chain is touched.
//!
//! # Examples
//!
//! ```ignore
//! use skillkit::runtime::auth::{ApiKeyAuth, AuthProvider, AuthRequest};
//!
//! let auth = ApiKeyAuth::new(["secret-key-123"]);
//! let request = AuthRequest::new().with_header("X-API-Key", "secret-key-123");
//! let result = auth.authenticate(&request).await;
//! assert!(result.authenticated);
//! ```

pub mod api_key;
pub mod bearer;
pub mod composite;
pub mod no_auth;
pub mod oauth2;

pub use api_key::ApiKeyAuth;
pub use bearer::BearerAuth;
pub use composite::CompositeAuth;
pub use no_auth::NoAuth;
pub use oauth2::{OAuth2Auth, TokenVerifier};

use crate::compat::{MaybeSend, MaybeSync};
use crate::errors::{AgentError, AgentResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Scope granted to callers of open agents.
pub const WILDCARD_SCOPE: &str = "*";

/// A credential policy consulted once per request.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait AuthProvider: MaybeSend + MaybeSync {
    /// Checks the credentials carried by `request`.
    ///
    /// Implementations never fail with an error; a rejected request is an
    /// [`AuthResult`] with `authenticated == false` and a reason in `error`.
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult;
}

/// Transport-neutral credential bundle.
///
/// The transport adapter copies whatever header-like and query-like pairs it
/// received; header lookup is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query_params: HashMap<String, String>,
}

impl AuthRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Returns a header value, matching the name case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value.as_str());
        }
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }
}

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub authenticated: bool,
    /// Caller identity; present only when authenticated.
    pub identity: Option<String>,
    pub scopes: BTreeSet<String>,
    /// Failure reason; present only when not authenticated.
    pub error: Option<String>,
}

impl AuthResult {
    pub fn success<I, S>(identity: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authenticated: true,
            identity: Some(identity.into()),
            scopes: scopes.into_iter().map(Into::into).collect(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            identity: None,
            scopes: BTreeSet::new(),
            error: Some(error.into()),
        }
    }

    /// The result produced when no authentication is configured.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::success("anonymous", [WILDCARD_SCOPE])
    }

    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Whether the caller holds `scope`, either directly or through `*`.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.authenticated && (self.scopes.contains(WILDCARD_SCOPE) || self.scopes.contains(scope))
    }

    /// Fails unless the caller is authenticated and holds every listed scope.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AuthenticationFailed`] for unauthenticated callers
    /// and [`AgentError::InsufficientScopes`] when a scope is missing.
    pub fn require_scopes(&self, required: &[&str]) -> AgentResult<()> {
        if !self.authenticated {
            return Err(AgentError::AuthenticationFailed {
                reason: "Authentication required".to_string(),
            });
        }
        if required.iter().all(|scope| self.has_scope(scope)) {
            Ok(())
        } else {
            Err(AgentError::InsufficientScopes {
                required: required.iter().map(|s| (*s).to_string()).collect(),
            })
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` style header.
pub(crate) fn bearer_token<'a>(request: &'a AuthRequest, header: &str) -> Option<&'a str> {
    request
        .header(header)
        .and_then(|value| value.strip_prefix("Bearer "))
}
