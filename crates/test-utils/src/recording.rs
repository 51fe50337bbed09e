use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use fnflow::dag::ScheduledTask;
use fnflow::engine::RuntimeEvent;
use fnflow::exec::backend::SharedBackend;
use fnflow::exec::{ExecutorBackend, Job, TokioBackend};

/// A backend that:
/// - records the name of every dispatched task (nested executions included)
/// - delegates the actual run to [`TokioBackend`].
#[derive(Debug, Default, Clone)]
pub struct RecordingBackend {
    dispatched: Arc<Mutex<Vec<String>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> SharedBackend {
        Arc::new(self.clone())
    }

    /// Names in dispatch order.
    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, name: &str) -> usize {
        self.dispatched().iter().filter(|n| *n == name).count()
    }
}

impl ExecutorBackend for RecordingBackend {
    fn dispatch(&self, task: ScheduledTask, job: Job, runtime_tx: mpsc::Sender<RuntimeEvent>) {
        if let Ok(mut guard) = self.dispatched.lock() {
            guard.push(task.name.clone());
        }
        TokioBackend.dispatch(task, job, runtime_tx);
    }
}
