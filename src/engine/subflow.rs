// src/engine/subflow.rs

//! Runs a nested flow over the value its flow-task is bound to.
//!
//! An array runs one child execution per element, concurrently, and yields
//! the child results in source order. Any other value runs a single child
//! whose result object is used directly.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::engine::runtime::{Execution, ExecutionEnv};
use crate::errors::FlowError;
use crate::exec::Job;
use crate::plan::FlowPlan;
use crate::types::TaskName;

/// Everything a flow-task needs to start its children.
#[derive(Debug)]
pub struct Fanout {
    pub task: TaskName,
    pub context_name: String,
    pub plan: Arc<FlowPlan>,
    /// Resolved, non-null value of the data source.
    pub value: Value,
    /// Parent results at launch time.
    pub parent: Map<String, Value>,
    pub env: Arc<ExecutionEnv>,
}

pub fn expand(fanout: Fanout) -> Job {
    Box::pin(async move {
        let Fanout {
            task,
            context_name,
            plan,
            value,
            parent,
            env,
        } = fanout;

        match value {
            Value::Array(items) => {
                debug!(task = %task, children = items.len(), "starting subflow fan-out");
                run_each(&task, &context_name, plan, items, &parent, env).await
            }
            single => {
                debug!(task = %task, "starting single subflow");
                let seed = child_seed(&parent, &context_name, single, &plan);
                let outcome = Execution::nested(plan, seed, env).run().await;
                match outcome.error {
                    Some(err) => Err(err),
                    None => Ok(Value::Object(outcome.results)),
                }
            }
        }
    })
}

async fn run_each(
    task: &str,
    context_name: &str,
    plan: Arc<FlowPlan>,
    items: Vec<Value>,
    parent: &Map<String, Value>,
    env: Arc<ExecutionEnv>,
) -> Result<Value, FlowError> {
    let limit = env
        .config()
        .max_parallel_subflows()
        .map(|n| Arc::new(Semaphore::new(n)));

    let mut handles = Vec::with_capacity(items.len());
    for item in items {
        let seed = child_seed(parent, context_name, item, &plan);
        let execution = Execution::nested(Arc::clone(&plan), seed, Arc::clone(&env));
        let limit = limit.clone();
        handles.push(tokio::spawn(async move {
            let _permit = match limit {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            execution.run().await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    let mut first_error = None;
    for handle in handles {
        let outcome = handle.await.map_err(|e| {
            FlowError::task(task, format!("Subflow execution did not complete: {e}"))
        })?;
        if let Some(err) = outcome.error {
            first_error.get_or_insert(err);
        }
        results.push(Value::Object(outcome.results));
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(Value::Array(results)),
    }
}

/// Input of one child: the parent's results, overlaid with the members of an
/// object `element` (except those naming the nested flow's own tasks), with
/// the context key bound to `element` last.
pub fn child_seed(
    parent: &Map<String, Value>,
    context_name: &str,
    element: Value,
    plan: &FlowPlan,
) -> Map<String, Value> {
    let mut seed = parent.clone();
    if let Value::Object(members) = &element {
        for (key, value) in members {
            if !plan.is_task(key) {
                seed.insert(key.clone(), value.clone());
            }
        }
    }
    seed.insert(context_name.to_string(), element);
    seed
}
