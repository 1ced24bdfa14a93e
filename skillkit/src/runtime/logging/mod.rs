//! Log subscriber setup.
//!
//! The crate logs through `tracing` macros. Applications that do not install
//! their own subscriber can call [`init_logging`] once at startup.
//!
//! # Examples
//!
//! ```ignore
//! use skillkit::runtime::logging::{init_logging, LogLevel};
//!
//! init_logging(LogLevel::Info)?;
//! ```

use crate::errors::{AgentError, AgentResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log severity levels.
#[non_exhaustive]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(AgentError::InvalidConfiguration {
                field: "log_level".to_string(),
                reason: format!("unknown level '{other}'"),
            }),
        }
    }
}

/// Builds the filter used by [`init_logging`]: `RUST_LOG` when set and valid,
/// otherwise `level` for every target.
#[must_use]
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Installs a global `fmt` subscriber.
///
/// # Errors
///
/// Returns [`AgentError::Internal`] if a global subscriber is already set.
pub fn init_logging(level: LogLevel) -> AgentResult<()> {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
        .map_err(|e| AgentError::Internal {
            component: "logging".to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn levels_deserialize_from_config() {
        let level: LogLevel = serde_yaml::from_str("debug").unwrap();
        assert_eq!(level, LogLevel::Debug);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn second_init_is_an_error() {
        let _ = init_logging(LogLevel::Debug);
        assert!(init_logging(LogLevel::Debug).is_err());
    }
}
