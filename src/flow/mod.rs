// src/flow/mod.rs

//! Flow declarations: the builder surface of the crate.
//!
//! - [`task`] holds task declarations and their token model.
//! - [`callable`] wraps task bodies and receiver-bound methods.
//! - [`hooks`] implements `default_to` / `assert_exists`.
//!
//! A [`Flow`] is a plain value. Planning happens lazily, once per input
//! key-set, and the resulting plans are cached alongside the flow until the
//! declaration is modified.

pub mod callable;
pub mod hooks;
pub mod task;

use std::sync::Arc;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::engine::{self, FlowOutcome};
use crate::errors::{FlowError, Result};
use crate::plan::{FlowPlan, PlanCache, builder};
use crate::types::TaskName;

pub use callable::{Callable, Method, MethodRegistry, TaskFuture};
pub use hooks::CompletionHook;
pub use task::{IntoNames, Task, Token};

/// A named collection of tasks and nested flows.
#[derive(Debug, Clone, Default)]
pub struct Flow {
    pub(crate) context_name: Option<String>,
    pub(crate) tasks: Vec<(TaskName, Task)>,
    pub(crate) methods: MethodRegistry,
    pub(crate) requires: Vec<String>,
    cache: PlanCache,
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    /// A nested flow run once per element of `source` (or once, if the
    /// value of `source` is not an array).
    pub fn bound_to(source: impl Into<String>) -> Self {
        Self {
            context_name: Some(source.into()),
            ..Self::default()
        }
    }

    /// Build a flow from `(name, task)` pairs.
    pub fn from_tasks<I, S, T>(tasks: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<Task>,
    {
        tasks
            .into_iter()
            .fold(Self::new(), |flow, (name, task)| flow.task(name, task))
    }

    pub fn task(mut self, name: impl Into<String>, task: impl Into<Task>) -> Self {
        self.tasks.push((name.into(), task.into()));
        self.modified()
    }

    /// Add a nested flow as a task named `name`.
    pub fn add_flow(self, name: impl Into<String>, flow: Flow) -> Self {
        self.task(name, Task::from(flow))
    }

    /// Extra prerequisites of the task this flow becomes when nested.
    pub fn requires(mut self, names: impl IntoNames) -> Self {
        self.requires.extend(names.into_names());
        self.modified()
    }

    /// Register a method for method-form tasks of this flow and the flows
    /// nested in it.
    pub fn method(mut self, name: impl Into<String>, method: Method) -> Self {
        self.methods.register(name, method);
        self.modified()
    }

    pub fn context_name(&self) -> Option<&str> {
        self.context_name.as_deref()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|(name, _)| name.as_str())
    }

    /// The plan for an input with the given top-level keys.
    ///
    /// Structural problems are reported here, before anything runs.
    pub fn plan(&self, data_keys: &[String]) -> Result<Arc<FlowPlan>> {
        let mut key: Vec<String> = data_keys.to_vec();
        key.sort();
        key.dedup();
        self.cache
            .get_or_build(key, || builder::build_plan(self, data_keys))
    }

    /// Run the flow with the default engine configuration.
    pub async fn execute(&self, data: Value) -> Result<FlowOutcome> {
        self.execute_with_config(data, &EngineConfig::default())
            .await
    }

    pub async fn execute_with_config(
        &self,
        data: Value,
        config: &EngineConfig,
    ) -> Result<FlowOutcome> {
        engine::execute_flow(self, data, config).await
    }

    /// Run the flow and hand `(error, results)` to `callback` exactly once.
    ///
    /// Structural errors arrive with `Value::Null` results.
    pub async fn execute_with_callback<F>(&self, data: Value, callback: F)
    where
        F: FnOnce(Option<FlowError>, Value),
    {
        match self.execute(data).await {
            Ok(outcome) => callback(outcome.error, outcome.results),
            Err(err) => callback(Some(err), Value::Null),
        }
    }

    fn modified(mut self) -> Self {
        self.cache = PlanCache::default();
        self
    }
}
