// src/engine/runtime.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dag::{ScheduledTask, Scheduler};
use crate::engine::describe::not_found;
use crate::engine::subflow::{self, Fanout};
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::{FlowError, TaskError};
use crate::exec::Job;
use crate::exec::backend::{SharedBackend, TokioBackend};
use crate::flow::Method;
use crate::flow::hooks::{HookFailure, apply_hooks};
use crate::plan::{Action, FlowPlan, TaskPlan};
use crate::resolve::{RefPath, resolve};

static EXECUTION_IDS: AtomicU64 = AtomicU64::new(1);

/// What every execution of one `execute` call shares: the executor backend
/// and the engine configuration.
#[derive(Clone)]
pub struct ExecutionEnv {
    backend: SharedBackend,
    config: EngineConfig,
}

impl ExecutionEnv {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, Arc::new(TokioBackend))
    }

    pub fn with_backend(config: EngineConfig, backend: SharedBackend) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl fmt::Debug for ExecutionEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEnv")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Final state of one execution.
#[derive(Debug)]
pub struct RunOutcome {
    pub results: Map<String, Value>,
    pub error: Option<FlowError>,
}

/// One run of a flow plan against one input object.
///
/// The event loop is the only writer of the results map: it seeds it,
/// resolves arguments for tasks as they become ready, and records each
/// completion. Task bodies run on the executor backend and report back over
/// an mpsc channel.
pub struct Execution {
    id: u64,
    plan: Arc<FlowPlan>,
    results: Map<String, Value>,
    scheduler: Scheduler,
    env: Arc<ExecutionEnv>,
    /// Nested executions only report their own tasks.
    nested: bool,
    error: Option<FlowError>,
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("id", &self.id)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Execution {
    /// A top-level execution seeded with the input object.
    pub fn new(plan: Arc<FlowPlan>, seed: Map<String, Value>, env: Arc<ExecutionEnv>) -> Self {
        Self::build(plan, seed, env, false)
    }

    /// A subflow execution seeded from its parent.
    pub fn nested(plan: Arc<FlowPlan>, seed: Map<String, Value>, env: Arc<ExecutionEnv>) -> Self {
        Self::build(plan, seed, env, true)
    }

    fn build(
        plan: Arc<FlowPlan>,
        seed: Map<String, Value>,
        env: Arc<ExecutionEnv>,
        nested: bool,
    ) -> Self {
        let scheduler = Scheduler::from_plan(&plan);
        Self {
            id: EXECUTION_IDS.fetch_add(1, Ordering::Relaxed),
            plan,
            results: seed,
            scheduler,
            env,
            nested,
            error: None,
        }
    }

    /// Run to completion.
    ///
    /// Boxed so that subflow tasks can start executions of their own.
    pub fn run(self) -> Pin<Box<dyn Future<Output = RunOutcome> + Send>> {
        Box::pin(self.run_loop())
    }

    /// Main event loop.
    ///
    /// - Dispatches the tasks the scheduler reports as ready.
    /// - Records each `TaskCompleted` and dispatches whatever it unblocks.
    /// - Returns once nothing is running.
    async fn run_loop(mut self) -> RunOutcome {
        let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(self.env.config.event_buffer());
        debug!(
            execution = self.id,
            tasks = self.plan.tasks.len(),
            nested = self.nested,
            "execution started"
        );

        let ready = self.scheduler.start();
        self.dispatch(ready, &tx);

        while self.scheduler.has_running() {
            let event = match rx.recv().await {
                Some(e) => e,
                None => {
                    warn!(execution = self.id, "event channel closed with tasks running");
                    break;
                }
            };

            match event {
                RuntimeEvent::TaskCompleted { task, result } => {
                    let ready = self.record(&task, result);
                    self.dispatch(ready, &tx);
                }
            }
        }

        if self.error.is_none() {
            let pending = self.scheduler.pending_tasks();
            if !pending.is_empty() {
                warn!(execution = self.id, ?pending, "execution stalled");
                self.error = Some(FlowError::Stalled(pending));
            }
        }

        match &self.error {
            Some(err) => info!(execution = self.id, error = %err, "execution failed"),
            None => debug!(execution = self.id, "execution finished"),
        }

        self.finish()
    }

    /// Hand ready tasks to the backend. Tasks that fail before they can be
    /// invoked are recorded immediately.
    fn dispatch(&mut self, mut ready: Vec<ScheduledTask>, tx: &mpsc::Sender<RuntimeEvent>) {
        while !ready.is_empty() {
            let mut unblocked = Vec::new();
            for task in ready {
                match self.prepare(&task.name) {
                    Ok(job) => {
                        debug!(execution = self.id, task = %task.name, "dispatching task");
                        self.env.backend.dispatch(task, job, tx.clone());
                    }
                    Err(err) => unblocked.extend(self.record(&task.name, Err(err))),
                }
            }
            ready = unblocked;
        }
    }

    /// Resolve everything a task needs from the current results and build
    /// its job.
    fn prepare(&self, name: &str) -> Result<Job, FlowError> {
        let task = self
            .plan
            .task(name)
            .ok_or_else(|| FlowError::task(name, "task is not part of this flow"))?;
        let args = self.resolve_args(task)?;

        match &task.action {
            Action::Call(callable) => {
                let callable = callable.clone();
                let name = task.name.clone();
                Ok(Box::pin(async move {
                    callable
                        .call(args)
                        .await
                        .map_err(|source| FlowError::Execution { task: name, source })
                }))
            }

            Action::Method {
                receiver,
                name: method,
            } => {
                let value = self.resolve_receiver(task, receiver)?;
                let method = self.lookup_method(task, receiver, method, &value)?;
                let name = task.name.clone();
                Ok(Box::pin(async move {
                    method
                        .call(value, args)
                        .await
                        .map_err(|source| FlowError::Execution { task: name, source })
                }))
            }

            Action::SubFlow { source, plan } => {
                let value = self.results.get(source).cloned().unwrap_or(Value::Null);
                if value.is_null() {
                    return Err(FlowError::task(
                        name,
                        format!("Result of '{source}' returned no data. Could not start SubFlow."),
                    ));
                }
                Ok(subflow::expand(Fanout {
                    task: task.name.clone(),
                    context_name: source.clone(),
                    plan: Arc::clone(plan),
                    value,
                    parent: self.results.clone(),
                    env: Arc::clone(&self.env),
                }))
            }
        }
    }

    fn resolve_args(&self, task: &TaskPlan) -> Result<Vec<Value>, FlowError> {
        task.args
            .iter()
            .map(|path| {
                resolve(&self.results, path, &task.name)
                    .map_err(|missing| not_found(task, &missing.traversed, &self.results))
            })
            .collect()
    }

    fn resolve_receiver(&self, task: &TaskPlan, receiver: &RefPath) -> Result<Value, FlowError> {
        let value = resolve(&self.results, receiver, &task.name)
            .map_err(|missing| not_found(task, &missing.traversed, &self.results))?;
        if !value.is_null() {
            return Ok(value);
        }

        let label = receiver.to_string();
        let described = self.plan.task(receiver.root()).unwrap_or(task);
        Err(not_found(described, &label, &self.results))
    }

    fn lookup_method(
        &self,
        task: &TaskPlan,
        receiver: &RefPath,
        method: &str,
        value: &Value,
    ) -> Result<Method, FlowError> {
        if let Some(found) = self.plan.methods.get(method) {
            return Ok(found.clone());
        }
        let message = if value.get(method).is_some() {
            format!("Not a function: {receiver}.{method}")
        } else {
            format!(
                "Unknown symbol '{method}' must be either the name of a task, the name of \
                 data, or the name of a function on '{receiver}'"
            )
        };
        Err(FlowError::task(&task.name, message))
    }

    /// Record a completion and return the tasks it unblocks.
    fn record(&mut self, name: &str, result: Result<Value, FlowError>) -> Vec<ScheduledTask> {
        let result = match result {
            Ok(value) => self.apply_hooks(name, value),
            Err(err) => Err(self.normalize(err)),
        };

        match result {
            Ok(value) => {
                debug!(execution = self.id, task = %name, "task succeeded");
                self.results.insert(name.to_string(), value);
                self.scheduler.handle_completion(name, TaskOutcome::Success)
            }
            Err(err) => {
                warn!(execution = self.id, task = %name, error = %err, "task failed");
                if self.error.is_none() {
                    self.error = Some(err);
                }
                self.scheduler.handle_completion(name, TaskOutcome::Failed)
            }
        }
    }

    fn apply_hooks(&self, name: &str, value: Value) -> Result<Value, FlowError> {
        let Some(task) = self.plan.task(name) else {
            return Ok(value);
        };
        apply_hooks(&task.hooks, value)
            .map_err(|HookFailure::Missing| not_found(task, name, &self.results))
    }

    /// A body reporting a missing argument is described from the sibling
    /// task of that name, when there is one.
    fn normalize(&self, err: FlowError) -> FlowError {
        match err {
            FlowError::Execution {
                source: TaskError::ArgumentNull(argument),
                ..
            } => match self.plan.task(&argument) {
                Some(sibling) => not_found(sibling, &argument, &self.results),
                None => FlowError::ArgumentNull {
                    message: format!("Missing argument: {argument}"),
                    argument,
                },
            },
            other => other,
        }
    }

    fn finish(self) -> RunOutcome {
        let results = if self.nested {
            let mut results = self.results;
            results.retain(|key, _| self.plan.is_task(key));
            results
        } else {
            self.results
        };

        RunOutcome {
            results,
            error: self.error,
        }
    }
}
