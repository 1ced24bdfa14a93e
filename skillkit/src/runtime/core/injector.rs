//! Merges declared collaborators into a skill's parameters.
//!
//! Injection is driven only by [`SkillNeeds`]. A declared need whose
//! collaborator is unavailable (no task store, no tool client) is skipped
//! without error and the skill runs without it.

use crate::agent::{Injected, SkillNeeds, SkillParams};
use crate::runtime::auth::AuthResult;
use crate::runtime::task_manager::TaskContext;
use crate::tools::ToolClient;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Collaborators selected for one invocation, ready to merge into the
/// parameters the middleware chain finally settles on.
#[derive(Debug, Clone, Default)]
pub struct Injections {
    entries: Vec<(String, Injected)>,
}

impl Injections {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Produces the handler's parameters. Caller values under an injected
    /// name are replaced; every other caller value is kept as is.
    #[must_use]
    pub fn apply(&self, values: Map<String, Value>) -> SkillParams {
        let mut params = SkillParams::new(values);
        for (name, collaborator) in &self.entries {
            params.inject(name, collaborator.clone());
        }
        params
    }
}

pub struct ParameterInjector;

impl ParameterInjector {
    pub fn prepare(
        needs: &SkillNeeds,
        task: Option<&TaskContext>,
        auth: &AuthResult,
        tools: Option<&Arc<dyn ToolClient>>,
    ) -> Injections {
        let mut entries = Vec::new();

        if let Some(name) = &needs.task {
            match task {
                Some(task) => entries.push((name.clone(), Injected::Task(task.clone()))),
                None => debug!(param = %name, "no task store configured, skipping task injection"),
            }
        }

        if let Some(name) = &needs.identity {
            entries.push((name.clone(), Injected::Identity(auth.clone())));
        }

        if let Some(name) = &needs.tools {
            match tools {
                Some(tools) => entries.push((name.clone(), Injected::Tools(tools.clone()))),
                None => debug!(param = %name, "no tool client configured, skipping tool injection"),
            }
        }

        Injections { entries }
    }
}
