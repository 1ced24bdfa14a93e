//! Common test utilities and setup

#![allow(dead_code)]

use skillkit::agent::{SkillDefinition, SkillOutput};
use skillkit::errors::AgentResult;
use skillkit::runtime::middleware::{Middleware, MiddlewareContext, Next};
use skillkit::agent::SkillReply;
use std::sync::{Arc, Mutex};

pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

/// `greet(name) -> "Hello, {name}!"`
pub fn greet() -> SkillDefinition {
    SkillDefinition::new("greet", |params| async move {
        let name = params.require_str("name")?;
        Ok(SkillOutput::from(format!("Hello, {name}!")))
    })
    .with_description("Greets someone by name")
    .with_tag("demo")
}

/// Records `<name>-before` and `<name>-after` around the rest of the chain.
pub struct Recording {
    pub name: &'static str,
    pub trace: Trace,
}

impl Recording {
    pub fn new(name: &'static str, trace: &Trace) -> Self {
        Self {
            name,
            trace: trace.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for Recording {
    async fn handle(&self, ctx: &mut MiddlewareContext, next: Next<'_>) -> AgentResult<SkillReply> {
        self.trace
            .lock()
            .unwrap()
            .push(format!("{}-before", self.name));
        let result = next.run(ctx).await;
        self.trace
            .lock()
            .unwrap()
            .push(format!("{}-after", self.name));
        result
    }
}

/// A skill that appends `"handler"` to `trace` and returns `"done"`.
pub fn tracing_skill(name: &str, trace: &Trace) -> SkillDefinition {
    let trace = trace.clone();
    SkillDefinition::new(name, move |_params| {
        let trace = trace.clone();
        async move {
            trace.lock().unwrap().push("handler".to_string());
            Ok(SkillOutput::from("done"))
        }
    })
}
