// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning directly.
//! This makes it easy to swap in a recording or fake executor in tests.
//!
//! - `TokioBackend` is the default: one Tokio task per job.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were dispatched before delegating.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::Job;
use crate::exec::task_runner::run_task;

/// Trait abstracting how ready tasks are executed.
///
/// Implementations must eventually send exactly one
/// `RuntimeEvent::TaskCompleted` for `task` on `runtime_tx`, and must not
/// block the caller.
pub trait ExecutorBackend: Send + Sync {
    fn dispatch(&self, task: ScheduledTask, job: Job, runtime_tx: mpsc::Sender<RuntimeEvent>);
}

/// Default backend: each job runs on its own Tokio task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioBackend;

impl ExecutorBackend for TokioBackend {
    fn dispatch(&self, task: ScheduledTask, job: Job, runtime_tx: mpsc::Sender<RuntimeEvent>) {
        tokio::spawn(run_task(task, job, runtime_tx));
    }
}

/// Shared handle used by executions and their nested executions.
pub type SharedBackend = Arc<dyn ExecutorBackend>;
