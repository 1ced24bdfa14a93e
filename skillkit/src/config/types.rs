use crate::config::EnvKey;
use crate::errors::AgentResult;
use crate::runtime::logging::LogLevel;
use serde::{Deserialize, Serialize};

/// Declarative agent configuration loaded from YAML or JSON.
///
/// Skills are code and cannot be configured; they are added to the builder
/// returned by [`AgentLoader`](crate::config::AgentLoader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub task_store: TaskStoreConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,

    /// Per-invocation deadline enforced by middleware.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub log_level: LogLevel,
}

/// Task persistence backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStoreConfig {
    /// Skills that need a task run without one.
    #[default]
    None,
    Memory,
}

/// Authentication policy.
///
/// **Note**: `keys_env` lists environment variable **names**, e.g.
/// `GREETER_API_KEY`, never the keys themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    #[default]
    None,
    ApiKey {
        keys_env: Vec<EnvKey>,
        #[serde(default = "default_api_key_header")]
        header: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query_param: Option<String>,
    },
    #[serde(rename = "oauth2")]
    OAuth2 {
        issuer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audience: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

const fn default_window_secs() -> u64 {
    60
}

impl AgentConfig {
    /// Parses a config without validating or resolving it.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed YAML.
    pub fn from_yaml(yaml: &str) -> AgentResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON.
    pub fn from_json(json: &str) -> AgentResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns a serialization error if the config cannot be rendered.
    pub fn to_yaml(&self) -> AgentResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// # Errors
    ///
    /// Returns a serialization error if the config cannot be rendered.
    pub fn to_json(&self) -> AgentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let config: AgentConfig = serde_yaml::from_str("name: Greeter\n").unwrap();
        assert_eq!(config.name, "Greeter");
        assert_eq!(config.task_store, TaskStoreConfig::None);
        assert_eq!(config.auth, AuthConfig::None);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.rate_limit.is_none());
    }

    #[test]
    fn tagged_auth_variants() {
        let yaml = r"
name: Secure
auth:
  type: api_key
  keys_env: [PRIMARY_KEY, BACKUP_KEY]
rate_limit:
  max_requests: 10
";
        let config: AgentConfig = serde_yaml::from_str(yaml).unwrap();
        match &config.auth {
            AuthConfig::ApiKey {
                keys_env,
                header,
                query_param,
            } => {
                assert_eq!(keys_env.len(), 2);
                assert_eq!(keys_env[1].key(), "BACKUP_KEY");
                assert_eq!(header, "X-API-Key");
                assert!(query_param.is_none());
            }
            other => panic!("unexpected auth: {other:?}"),
        }
        assert_eq!(config.rate_limit.unwrap().window_secs, 60);

        let json = r#"{"name": "Fed", "auth": {"type": "oauth2", "issuer": "https://id.example"}}"#;
        let config: AgentConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.auth, AuthConfig::OAuth2 { audience: None, .. }));
    }

    #[test]
    fn renders_back_to_yaml() {
        let config: AgentConfig =
            serde_yaml::from_str("name: Echo\ntask_store: memory\ntimeout_secs: 5\n").unwrap();
        let rendered = config.to_yaml().unwrap();
        let reparsed: AgentConfig = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }
}
