//! Indirect secret references.
//!
//! Configuration files never carry API keys in plain text. They name the
//! environment variable holding the key instead, and the loader resolves the
//! name when the agent is assembled.
//!
//! # Examples
//!
//! ```ignore
//! use skillkit::config::{EnvKey, EnvResolverFn};
//! use std::sync::Arc;
//!
//! let key = EnvKey::new("GREETER_API_KEY");
//! let vault: EnvResolverFn = Arc::new(|name| lookup_in_vault(name));
//! let secret = key.resolve_with(Some(&vault))?;
//! ```

use crate::errors::AgentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Resolves a variable name to its secret value.
pub type EnvResolverFn = Arc<dyn Fn(&str) -> Result<String, AgentError> + Send + Sync>;

/// Name of the environment variable that holds a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvKey(String);

impl EnvKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.0
    }

    /// Reads the variable from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::MissingConfiguration`] if the variable is unset
    /// or empty.
    pub fn resolve(&self) -> Result<String, AgentError> {
        default_env_resolver(&self.0)
    }

    /// Resolves through `resolver`, falling back to the process environment.
    ///
    /// # Errors
    ///
    /// Returns whatever the resolver reports, or
    /// [`AgentError::MissingConfiguration`] for an empty value.
    pub fn resolve_with(&self, resolver: Option<&EnvResolverFn>) -> Result<String, AgentError> {
        let value = match resolver {
            Some(resolve) => resolve(&self.0)?,
            None => return self.resolve(),
        };
        if value.is_empty() {
            return Err(AgentError::MissingConfiguration {
                field: self.0.clone(),
            });
        }
        Ok(value)
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl From<&str> for EnvKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for EnvKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Looks `name` up with [`std::env::var`].
///
/// # Errors
///
/// Returns [`AgentError::MissingConfiguration`] when the variable is unset,
/// not valid unicode, or empty.
pub fn default_env_resolver(name: &str) -> Result<String, AgentError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AgentError::MissingConfiguration {
            field: name.to_string(),
        }),
    }
}
