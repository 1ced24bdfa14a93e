//! Federated (issuer/audience) token authentication.
//!
//! Tokens are JWTs in compact form. This policy checks structure, issuer,
//! audience, and expiry. Signature verification against the issuer's key set
//! is delegated to an optional [`TokenVerifier`]; without one only the claims
//! are validated.

use crate::runtime::auth::{bearer_token, AuthProvider, AuthRequest, AuthResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Verifies the signature of a compact JWT.
pub trait TokenVerifier: Send + Sync {
    /// `signing_input` is `"<header>.<payload>"` exactly as received.
    fn verify(&self, header: &Value, signing_input: &str, signature: &[u8]) -> bool;
}

#[derive(Clone)]
pub struct OAuth2Auth {
    issuer: String,
    audience: Option<String>,
    verifier: Option<Arc<dyn TokenVerifier>>,
}

impl OAuth2Auth {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: Some(audience.into()),
            verifier: None,
        }
    }

    /// Accepts tokens for any audience.
    #[must_use]
    pub fn without_audience(mut self) -> Self {
        self.audience = None;
        self
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: impl TokenVerifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    fn validate(&self, token: &str) -> Result<AuthResult, String> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header, payload, signature] = segments.as_slice() else {
            return Err("Invalid JWT format".to_string());
        };

        let header_json = decode_segment(header)?;
        let claims = decode_segment(payload)?;

        if let Some(verifier) = &self.verifier {
            let signature = URL_SAFE_NO_PAD
                .decode(signature.trim_end_matches('='))
                .map_err(|e| format!("Failed to parse JWT: {e}"))?;
            let signing_input = &token[..header.len() + 1 + payload.len()];
            if !verifier.verify(&header_json, signing_input, &signature) {
                return Err("Invalid token signature".to_string());
            }
        }

        let iss = claims.get("iss").and_then(Value::as_str);
        if iss != Some(self.issuer.as_str()) {
            return Err(format!("Invalid issuer: {}", iss.unwrap_or("none")));
        }

        if let Some(audience) = &self.audience {
            let matched = match claims.get("aud") {
                None => return Err("Missing audience".to_string()),
                Some(Value::Array(values)) => values
                    .iter()
                    .any(|v| v.as_str() == Some(audience.as_str())),
                Some(value) => value.as_str() == Some(audience.as_str()),
            };
            if !matched {
                return Err("Invalid audience".to_string());
            }
        }

        if let Some(exp) = claims.get("exp").and_then(Value::as_i64) {
            if Utc::now().timestamp() > exp {
                return Err("Token expired".to_string());
            }
        }

        let identity = claims
            .get("sub")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let scopes = claims
            .get("scope")
            .and_then(Value::as_str)
            .map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default();

        Ok(AuthResult::success(identity, scopes))
    }
}

fn decode_segment(segment: &str) -> Result<Value, String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| format!("Failed to parse JWT: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("Failed to parse JWT: {e}"))
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl AuthProvider for OAuth2Auth {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResult {
        let Some(token) = bearer_token(request, "Authorization") else {
            return AuthResult::failure("Bearer token required");
        };

        self.validate(token).unwrap_or_else(|reason| {
            debug!(issuer = %self.issuer, %reason, "rejected federated token");
            AuthResult::failure(reason)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    fn token(claims: Value) -> String {
        format!(
            "{}.{}.{}",
            encode(&json!({"alg": "RS256", "typ": "JWT"})),
            encode(&claims),
            URL_SAFE_NO_PAD.encode(b"sig")
        )
    }

    fn request(token: &str) -> AuthRequest {
        AuthRequest::new().with_header("Authorization", format!("Bearer {token}"))
    }

    fn auth() -> OAuth2Auth {
        OAuth2Auth::new("https://auth.example.com", "my-agent")
    }

    #[tokio::test]
    async fn valid_claims_yield_subject_and_scopes() {
        let exp = Utc::now().timestamp() + 3600;
        let jwt = token(json!({
            "iss": "https://auth.example.com",
            "aud": ["other", "my-agent"],
            "sub": "alice",
            "scope": "read  write",
            "exp": exp,
        }));

        let result = auth().authenticate(&request(&jwt)).await;
        assert!(result.authenticated, "{:?}", result.error);
        assert_eq!(result.identity(), Some("alice"));
        assert!(result.scopes.contains("read"));
        assert!(result.scopes.contains("write"));
        assert_eq!(result.scopes.len(), 2);
    }

    #[tokio::test]
    async fn missing_subject_defaults_to_unknown() {
        let jwt = token(json!({"iss": "https://auth.example.com", "aud": "my-agent"}));
        let result = auth().authenticate(&request(&jwt)).await;
        assert_eq!(result.identity(), Some("unknown"));
        assert!(result.scopes.is_empty());
    }

    #[tokio::test]
    async fn rejects_wrong_issuer_audience_and_expiry() {
        let wrong_iss = token(json!({"iss": "https://evil.example.com", "aud": "my-agent"}));
        let result = auth().authenticate(&request(&wrong_iss)).await;
        assert!(result.error.unwrap().starts_with("Invalid issuer"));

        let wrong_aud = token(json!({"iss": "https://auth.example.com", "aud": "else"}));
        let result = auth().authenticate(&request(&wrong_aud)).await;
        assert_eq!(result.error.as_deref(), Some("Invalid audience"));

        let no_aud = token(json!({"iss": "https://auth.example.com"}));
        let result = auth().authenticate(&request(&no_aud)).await;
        assert_eq!(result.error.as_deref(), Some("Missing audience"));

        let expired = token(json!({
            "iss": "https://auth.example.com",
            "aud": "my-agent",
            "exp": Utc::now().timestamp() - 10,
        }));
        let result = auth().authenticate(&request(&expired)).await;
        assert_eq!(result.error.as_deref(), Some("Token expired"));
    }

    #[tokio::test]
    async fn rejects_malformed_tokens() {
        let result = auth().authenticate(&request("not-a-jwt")).await;
        assert_eq!(result.error.as_deref(), Some("Invalid JWT format"));

        let result = auth().authenticate(&request("a.b!.c")).await;
        assert!(result.error.unwrap().starts_with("Failed to parse JWT"));

        let result = auth().authenticate(&AuthRequest::new()).await;
        assert_eq!(result.error.as_deref(), Some("Bearer token required"));
    }

    struct RejectAll;

    impl TokenVerifier for RejectAll {
        fn verify(&self, _header: &Value, _signing_input: &str, _signature: &[u8]) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn verifier_can_reject_signature() {
        let jwt = token(json!({"iss": "https://auth.example.com", "aud": "my-agent"}));
        let result = auth()
            .with_verifier(RejectAll)
            .authenticate(&request(&jwt))
            .await;
        assert_eq!(result.error.as_deref(), Some("Invalid token signature"));
    }
}
