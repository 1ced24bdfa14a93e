//! YAML/JSON configuration for skillkit agents.
//!
//! A config file describes the ambient parts of an agent: identity, auth
//! policy, task storage, rate limiting and timeouts. Skills are registered in
//! code on the builder the loader returns.
//!
//! ```ignore
//! let agent = AgentLoader::from_yaml(include_str!("agent.yaml"))?
//!     .with_skill(greet)
//!     .build();
//! ```

pub mod env_resolver;
pub mod loader;
pub mod types;

pub use env_resolver::{default_env_resolver, EnvKey, EnvResolverFn};
pub use loader::AgentLoader;
pub use types::{AgentConfig, AuthConfig, RateLimitConfig, TaskStoreConfig};
