// src/engine/mod.rs

//! Execution engine for fnflow.
//!
//! This module ties together:
//! - the per-execution scheduler (pure state machine, [`crate::dag`])
//! - the event loop that owns the results map and reacts to task
//!   completions ([`runtime`])
//! - subflow fan-out ([`subflow`])
//! - "Not Found" diagnostics ([`describe`])
//!
//! [`execute_flow`] is the entry point behind `Flow::execute*`: it plans the
//! flow, fans array input out to one execution per element, and aggregates
//! the outcome.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use crate::config::EngineConfig;
use crate::errors::{FlowError, Result};
use crate::exec::backend::SharedBackend;
use crate::flow::Flow;
use crate::plan::builder::check_shape;
use crate::types::TaskName;

pub mod describe;
pub mod runtime;
pub mod subflow;

pub use runtime::{Execution, ExecutionEnv, RunOutcome};

/// Outcome of a task for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

/// Events flowing into an execution's event loop.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A dispatched task finished with a value or an error.
    TaskCompleted {
        task: TaskName,
        result: std::result::Result<Value, FlowError>,
    },
}

/// Result of running a flow: the results (an object, or an array of objects
/// for array input) and the first run-time error, if any.
///
/// Results are kept on failure: whatever was recorded before (and while)
/// the execution halted is still there.
#[derive(Debug)]
pub struct FlowOutcome {
    pub results: Value,
    pub error: Option<FlowError>,
}

impl FlowOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The results, or the run-time error.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}

/// Run `flow` on `data` with the default Tokio backend.
pub async fn execute_flow(flow: &Flow, data: Value, config: &EngineConfig) -> Result<FlowOutcome> {
    let env = Arc::new(ExecutionEnv::new(config.clone()));
    run_with_env(flow, data, env).await
}

/// Run `flow` on `data`, dispatching tasks through `backend`.
pub async fn execute_with_backend(
    flow: &Flow,
    data: Value,
    config: &EngineConfig,
    backend: SharedBackend,
) -> Result<FlowOutcome> {
    let env = Arc::new(ExecutionEnv::with_backend(config.clone(), backend));
    run_with_env(flow, data, env).await
}

async fn run_with_env(flow: &Flow, data: Value, env: Arc<ExecutionEnv>) -> Result<FlowOutcome> {
    match data {
        Value::Array(items) => {
            let inputs = items
                .into_iter()
                .map(input_object)
                .collect::<Result<Vec<_>>>()?;
            // Plan everything first so structural errors surface before any task runs.
            let plans = inputs
                .iter()
                .map(|input| flow.plan(&keys_of(input)))
                .collect::<Result<Vec<_>>>()?;
            if plans.is_empty() {
                check_shape(flow)?;
            }

            info!(executions = inputs.len(), "executing flow over array input");
            let handles: Vec<_> = plans
                .into_iter()
                .zip(inputs)
                .map(|(plan, input)| {
                    tokio::spawn(Execution::new(plan, input, Arc::clone(&env)).run())
                })
                .collect();

            let mut results = Vec::with_capacity(handles.len());
            let mut first_error = None;
            for handle in handles {
                let outcome = handle.await.map_err(anyhow::Error::from)?;
                if let Some(err) = outcome.error {
                    first_error.get_or_insert(err);
                }
                results.push(Value::Object(outcome.results));
            }

            Ok(FlowOutcome {
                results: Value::Array(results),
                error: first_error,
            })
        }
        other => {
            let input = input_object(other)?;
            let plan = flow.plan(&keys_of(&input))?;
            let outcome = Execution::new(plan, input, env).run().await;
            Ok(FlowOutcome {
                results: Value::Object(outcome.results),
                error: outcome.error,
            })
        }
    }
}

fn input_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(FlowError::InvalidData(format!(
            "expected an object, an array of objects or null, got {other}"
        ))),
    }
}

fn keys_of(input: &Map<String, Value>) -> Vec<String> {
    input.keys().cloned().collect()
}
