// src/dag/task_info.rs

//! Task metadata and per-execution state.

use crate::plan::TaskPlan;
use crate::types::TaskName;

/// Per-execution state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on sibling prerequisites.
    Pending,
    /// Dispatched to the executor.
    Running,
    /// Completed and recorded in the results map.
    DoneSuccess,
    /// Completed with an error.
    DoneFailed,
    /// Never started because the execution failed first.
    Abandoned,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Pending | RunState::Running)
    }
}

/// Static task information derived from a plan, plus per-execution state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    /// Declaration order; ties between ready tasks launch in this order.
    pub index: usize,
    /// Direct sibling dependencies.
    pub deps: Vec<TaskName>,
    pub run_state: RunState,
}

impl TaskInfo {
    pub fn from_plan(plan: &TaskPlan, deps: Vec<TaskName>) -> Self {
        Self {
            name: plan.name.clone(),
            index: plan.index,
            deps,
            run_state: RunState::Pending,
        }
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub index: usize,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo) -> Self {
        Self {
            name: info.name.clone(),
            index: info.index,
        }
    }
}
