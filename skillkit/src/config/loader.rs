use crate::agent::{Agent, AgentBuilder};
use crate::config::{AgentConfig, AuthConfig, EnvResolverFn, TaskStoreConfig};
use crate::errors::{AgentError, AgentResult};
use crate::runtime::auth::{ApiKeyAuth, OAuth2Auth};
use crate::runtime::logging::init_logging;
use crate::runtime::middleware::{RateLimitMiddleware, TimeoutMiddleware};
use std::time::Duration;
use tracing::debug;

/// Builds agents from YAML/JSON configuration.
///
/// **Note on secrets:** API keys are referenced by environment variable name
/// and resolved while loading. Use [`with_resolver`](Self::with_resolver) to
/// resolve them from somewhere other than the process environment.
///
/// The returned builder has auth, task storage and middleware configured;
/// skills are added by the caller. `log_level` only takes effect when
/// [`with_logging`](Self::with_logging) is set.
#[derive(Default, Clone)]
pub struct AgentLoader {
    resolver: Option<EnvResolverFn>,
    install_logging: bool,
}

impl AgentLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: EnvResolverFn) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Installs the global log subscriber at the configured `log_level`
    /// while loading. An already installed subscriber is kept.
    #[must_use]
    pub fn with_logging(mut self) -> Self {
        self.install_logging = true;
        self
    }

    /// Loads an agent from a YAML string using the process environment.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn from_yaml(yaml: &str) -> AgentResult<AgentBuilder> {
        Self::new().load_yaml(yaml)
    }

    /// Loads an agent from a JSON string using the process environment.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn from_json(json: &str) -> AgentResult<AgentBuilder> {
        Self::new().load_json(json)
    }

    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_yaml(&self, yaml: &str) -> AgentResult<AgentBuilder> {
        self.load(&AgentConfig::from_yaml(yaml)?)
    }

    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_json(&self, json: &str) -> AgentResult<AgentBuilder> {
        self.load(&AgentConfig::from_json(json)?)
    }

    /// Validates `config` and turns it into a pre-configured builder.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfiguration`] for an empty name, a zero
    /// rate-limit ceiling or timeout, or an API key policy without keys, and
    /// [`AgentError::MissingConfiguration`] when a key variable cannot be
    /// resolved.
    pub fn load(&self, config: &AgentConfig) -> AgentResult<AgentBuilder> {
        Self::validate(config)?;

        if self.install_logging {
            match init_logging(config.log_level) {
                Ok(()) => debug!(level = %config.log_level, "installed log subscriber"),
                Err(err) => debug!(error = %err, "keeping existing log subscriber"),
            }
        }

        let mut builder = Agent::builder().with_name(config.name.trim());
        if let Some(description) = &config.description {
            builder = builder.with_description(description.clone());
        }
        if let Some(version) = &config.version {
            builder = builder.with_version(version.clone());
        }

        builder = match &config.auth {
            AuthConfig::None => builder,
            AuthConfig::ApiKey {
                keys_env,
                header,
                query_param,
            } => {
                let keys = keys_env
                    .iter()
                    .map(|key| key.resolve_with(self.resolver.as_ref()))
                    .collect::<AgentResult<Vec<_>>>()?;
                let mut auth = ApiKeyAuth::new(keys).with_header(header.clone());
                if let Some(param) = query_param {
                    auth = auth.with_query_param(param.clone());
                }
                builder.with_auth(auth)
            }
            AuthConfig::OAuth2 { issuer, audience } => {
                let auth = match audience {
                    Some(audience) => OAuth2Auth::new(issuer.clone(), audience.clone()),
                    None => OAuth2Auth::new(issuer.clone(), String::new()).without_audience(),
                };
                builder.with_auth(auth)
            }
        };

        if config.task_store == TaskStoreConfig::Memory {
            builder = builder.with_memory_task_store();
        }

        // Rate limiting rejects before the deadline starts counting.
        if let Some(limit) = config.rate_limit {
            builder = builder.with_middleware(RateLimitMiddleware::new(
                limit.max_requests,
                Duration::from_secs(limit.window_secs),
            ));
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.with_middleware(TimeoutMiddleware::new(Duration::from_secs(secs)));
        }

        debug!(agent = %config.name, "loaded agent configuration");
        Ok(builder)
    }

    fn validate(config: &AgentConfig) -> AgentResult<()> {
        if config.name.trim().is_empty() {
            return Err(invalid("name", "agent name cannot be empty"));
        }
        if let Some(limit) = config.rate_limit {
            if limit.max_requests == 0 {
                return Err(invalid(
                    "rate_limit.max_requests",
                    "must be greater than 0",
                ));
            }
            if limit.window_secs == 0 {
                return Err(invalid("rate_limit.window_secs", "must be greater than 0"));
            }
        }
        if config.timeout_secs == Some(0) {
            return Err(invalid("timeout_secs", "must be greater than 0"));
        }
        if let AuthConfig::ApiKey { keys_env, .. } = &config.auth {
            if keys_env.is_empty() {
                return Err(invalid("auth.keys_env", "at least one API key is required"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> AgentError {
    AgentError::InvalidConfiguration {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
