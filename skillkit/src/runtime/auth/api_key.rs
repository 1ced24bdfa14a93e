//! Shared-secret (API key) authentication.

use crate::runtime::auth::{AuthProvider, AuthRequest, AuthResult};
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use tracing::debug;

const DEFAULT_HEADER: &str = "X-API-Key";
const IDENTITY_PREFIX_LEN: usize = 16;

/// Validates a shared secret carried in a header or query parameter.
///
/// Only SHA-256 digests of the configured keys are kept. A candidate key is
/// hashed and compared against every stored digest in constant time, so the
/// check takes the same path whether or not (and wherever) a match occurs.
#[derive(Clone)]
pub struct ApiKeyAuth {
    key_hashes: Vec<[u8; 32]>,
    header: String,
    query_param: Option<String>,
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("keys", &self.key_hashes.len())
            .field("header", &self.header)
            .field("query_param", &self.query_param)
            .finish()
    }
}

impl ApiKeyAuth {
    /// Creates a policy accepting any of `keys` in the `X-API-Key` header.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            key_hashes: keys.into_iter().map(|k| digest(k.as_ref())).collect(),
            header: DEFAULT_HEADER.to_string(),
            query_param: None,
        }
    }

    /// Reads the key from a different header.
    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Also accepts the key as a query parameter when the header is absent.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>) -> Self {
        self.query_param = Some(name.into());
        self
    }

    fn candidate<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        request
            .header(&self.header)
            .filter(|key| !key.is_empty())
            .or_else(|| {
                self.query_param
                    .as_deref()
                    .and_then(|name| request.query_param(name))
                    .filter(|key| !key.is_empty())
            })
    }

    fn matches(&self, candidate: &[u8; 32]) -> bool {
        let found = self
            .key_hashes
            .iter()
            .fold(Choice::from(0u8), |acc, stored| {
                acc | stored.as_slice().ct_eq(candidate.as_slice())
            });
        bool::from(found)
    }
}

fn digest(key: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(key.as_bytes()));
    out
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl AuthProvider for ApiKeyAuth {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        let Some(key) = self.candidate(request) else {
            return AuthResult::failure("API key required");
        };

        let key_hash = digest(key);
        if !self.matches(&key_hash) {
            debug!("rejected API key");
            return AuthResult::failure("Invalid API key");
        }

        let hex_hash = hex::encode(key_hash);
        AuthResult::success(
            format!("secret:{}", &hex_hash[..IDENTITY_PREFIX_LEN]),
            std::iter::empty::<String>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_configured_key() {
        let auth = ApiKeyAuth::new(["secret-key-123", "other"]);
        let request = AuthRequest::new().with_header("x-api-key", "secret-key-123");

        let result = auth.authenticate(&request).await;
        assert!(result.authenticated);
        let identity = result.identity().unwrap();
        assert!(identity.starts_with("secret:"));
        assert_eq!(identity.len(), "secret:".len() + IDENTITY_PREFIX_LEN);
    }

    #[tokio::test]
    async fn flipped_bit_is_rejected_as_invalid() {
        let auth = ApiKeyAuth::new(["secret-key-123"]);
        // '3' is 0x33, '2' is 0x32: one bit apart.
        let request = AuthRequest::new().with_header("X-API-Key", "secret-key-122");

        let result = auth.authenticate(&request).await;
        assert!(!result.authenticated);
        assert_eq!(result.error.as_deref(), Some("Invalid API key"));
        assert!(result.identity.is_none());
    }

    #[tokio::test]
    async fn missing_key_is_reported_as_required() {
        let auth = ApiKeyAuth::new(["secret-key-123"]);

        let result = auth.authenticate(&AuthRequest::new()).await;
        assert_eq!(result.error.as_deref(), Some("API key required"));

        let empty = AuthRequest::new().with_header("X-API-Key", "");
        let result = auth.authenticate(&empty).await;
        assert_eq!(result.error.as_deref(), Some("API key required"));
    }

    #[tokio::test]
    async fn query_parameter_is_a_fallback() {
        let auth = ApiKeyAuth::new(["k1"]).with_query_param("api_key");
        let request = AuthRequest::new().with_query_param("api_key", "k1");
        assert!(auth.authenticate(&request).await.authenticated);

        let header_only = ApiKeyAuth::new(["k1"]);
        assert!(!header_only.authenticate(&request).await.authenticated);
    }

    #[tokio::test]
    async fn custom_header_name() {
        let auth = ApiKeyAuth::new(["k1"]).with_header("X-Agent-Token");
        let request = AuthRequest::new().with_header("X-Agent-Token", "k1");
        assert!(auth.authenticate(&request).await.authenticated);
    }

    #[test]
    fn debug_output_hides_key_material() {
        let auth = ApiKeyAuth::new(["super-secret"]);
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
