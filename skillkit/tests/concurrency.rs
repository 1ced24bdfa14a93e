//! Many invocations in flight against one shared agent.

mod common;

use common::greet;
use futures::future::join_all;
use serde_json::{json, Value};
use skillkit::agent::{Agent, SkillDefinition, SkillOutput};
use skillkit::errors::{AgentError, ErrorKind};
use skillkit::runtime::middleware::RateLimitMiddleware;
use skillkit::runtime::task_manager::{ListTasksFilter, TaskState};
use skillkit::test_support::{AgentTestClient, TestResult};
use std::collections::HashSet;
use std::time::Duration;

async fn fan_out(client: &AgentTestClient, skill: &'static str, calls: usize) -> Vec<TestResult> {
    let handles: Vec<_> = (0..calls)
        .map(|n| {
            let client = client.clone();
            tokio::spawn(async move { client.call(skill, json!({"name": "N", "n": n})).await })
        })
        .collect();
    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_task_skills_get_distinct_terminal_tasks() {
    const CALLS: usize = 32;
    let skill = SkillDefinition::new("report", |params| async move {
        let task = params
            .task()
            .cloned()
            .ok_or_else(|| AgentError::skill_failed("no task handle"))?;
        task.working("started", Some(0.5)).await?;
        tokio::task::yield_now().await;
        task.complete(None).await?;
        Ok(SkillOutput::from(task.id().to_string()))
    })
    .needs_task();
    let client = AgentTestClient::new(
        Agent::builder()
            .with_memory_task_store()
            .with_skill(skill)
            .build(),
    );

    let results = fan_out(&client, "report", CALLS).await;
    let ids: HashSet<String> = results
        .iter()
        .map(|r| r.value().and_then(Value::as_str).unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), CALLS);

    let manager = client.executor().agent().task_manager().unwrap();
    let tasks = manager.list(&ListTasksFilter::default()).await.unwrap();
    assert_eq!(tasks.len(), CALLS);
    assert!(tasks.iter().all(|t| ids.contains(&t.id)));
    for task in &tasks {
        assert_eq!(task.status.state, TaskState::Completed, "{}", task.id);
        assert_eq!(task.history.len(), 2);
    }
    let inputs: HashSet<u64> = tasks
        .iter()
        .filter_map(|t| t.params["n"].as_u64())
        .collect();
    assert_eq!(inputs.len(), CALLS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rate_limit_admits_exactly_the_ceiling_under_contention() {
    const CEILING: usize = 5;
    const CALLS: usize = 40;
    let client = AgentTestClient::new(
        Agent::builder()
            .with_middleware(RateLimitMiddleware::new(CEILING, Duration::from_secs(60)))
            .with_skill(greet())
            .build(),
    );

    let results = fan_out(&client, "greet", CALLS).await;

    let admitted = results.iter().filter(|r| r.is_success()).count();
    let rejected = results
        .iter()
        .filter_map(TestResult::error)
        .filter(|e| e.kind == ErrorKind::RateLimited)
        .count();
    assert_eq!(admitted, CEILING);
    assert_eq!(rejected, CALLS - CEILING);
}
