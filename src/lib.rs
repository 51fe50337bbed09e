// src/lib.rs

//! fnflow: declarative orchestration of interdependent functions.
//!
//! A [`Flow`] is a set of named tasks. Each task names the function to call
//! and the values to pass it: input data, results of other tasks, or paths
//! into either. fnflow works out the dependency graph, runs every task as
//! soon as its inputs exist, and collects all results into one object.
//! Nested flows run once per element of an array result.

pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod flow;
pub mod logging;
pub mod plan;
pub mod resolve;
pub mod types;

use serde_json::Value;

pub use config::EngineConfig;
pub use engine::FlowOutcome;
pub use errors::{FlowError, Result, TaskError};
pub use flow::{Callable, Flow, Method, Task, Token};

/// Run `tasks` on `data` in one call.
///
/// Structural problems are returned as `Err` before anything runs; run-time
/// failures arrive in [`FlowOutcome::error`] next to the partial results.
pub async fn execute<I, S, T>(data: Value, tasks: I) -> Result<FlowOutcome>
where
    I: IntoIterator<Item = (S, T)>,
    S: Into<String>,
    T: Into<Task>,
{
    Flow::from_tasks(tasks).execute(data).await
}

/// Like [`execute`], reporting through `callback` exactly once.
pub async fn execute_with_callback<I, S, T, F>(data: Value, tasks: I, callback: F)
where
    I: IntoIterator<Item = (S, T)>,
    S: Into<String>,
    T: Into<Task>,
    F: FnOnce(Option<FlowError>, Value),
{
    Flow::from_tasks(tasks)
        .execute_with_callback(data, callback)
        .await
}
