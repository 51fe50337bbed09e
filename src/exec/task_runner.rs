// src/exec/task_runner.rs

//! Individual task runner.

use std::any::Any;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{FlowError, TaskError};
use crate::exec::Job;

/// Run a single job and emit its `TaskCompleted` event.
///
/// The job runs in its own Tokio task so a panicking body fails only its
/// task; the panic payload becomes [`TaskError::Panicked`].
pub async fn run_task(task: ScheduledTask, job: Job, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    debug!(task = %task.name, "starting task");

    let result = match tokio::spawn(job).await {
        Ok(result) => result,
        Err(join_err) => {
            let reason = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                "task was cancelled".to_string()
            };
            error!(task = %task.name, %reason, "task panicked");
            Err(FlowError::Execution {
                task: task.name.clone(),
                source: TaskError::Panicked(reason),
            })
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            result,
        })
        .await
        .is_err()
    {
        debug!(task = %task.name, "execution loop gone; dropping completion");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
