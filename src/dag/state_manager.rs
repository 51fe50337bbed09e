// src/dag/state_manager.rs

//! Per-execution state transitions for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::types::TaskName;

/// Manages per-execution state transitions for tasks.
pub struct StateManager<'a> {
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
}

impl<'a> StateManager<'a> {
    pub fn new(tasks: &'a mut HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Determine whether all sibling dependencies of the given task have
    /// succeeded.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        let ro = ReadOnlyStateManager::new(self.tasks);
        ro.deps_satisfied_for_info(info)
    }

    /// Collect tasks that are `Pending` and whose dependencies are satisfied,
    /// mark them as `Running`, and return them in declaration order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        // Decide first, then mutate to avoid borrowing issues.
        let mut candidates: Vec<(usize, TaskName)> = self
            .tasks
            .values()
            .filter(|info| {
                info.run_state == RunState::Pending && self.deps_satisfied_for_info(info)
            })
            .map(|info| (info.index, info.name.clone()))
            .collect();
        candidates.sort();

        let mut ready = Vec::with_capacity(candidates.len());
        for (_, name) in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                debug!(task = %info.name, "dependencies satisfied; marking Running");
                info.run_state = RunState::Running;
                ready.push(ScheduledTask::from_task_info(info));
            }
        }

        ready
    }

    /// Give up on every task that has not started yet.
    ///
    /// Returns the abandoned task names in declaration order.
    pub fn abandon_pending(&mut self) -> Vec<TaskName> {
        let mut abandoned: Vec<(usize, TaskName)> = Vec::new();
        for info in self.tasks.values_mut() {
            if info.run_state == RunState::Pending {
                info.run_state = RunState::Abandoned;
                abandoned.push((info.index, info.name.clone()));
            }
        }
        abandoned.sort();
        let abandoned: Vec<TaskName> = abandoned.into_iter().map(|(_, name)| name).collect();
        if !abandoned.is_empty() {
            debug!(?abandoned, "abandoning pending tasks after failure");
        }
        abandoned
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.values().all(|info| info.run_state.is_terminal())
    }
}

/// A read-only view of the state manager for checking dependency satisfaction.
///
/// This is used when we only have shared access to the tasks map (e.g. in `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        for dep_name in &info.deps {
            let dep = match self.tasks.get(dep_name) {
                Some(d) => d,
                None => {
                    warn!(
                        task = %info.name,
                        dep = %dep_name,
                        "dependency missing from tasks map"
                    );
                    return false;
                }
            };

            if dep.run_state != RunState::DoneSuccess {
                return false;
            }
        }

        true
    }

    /// Names of tasks still waiting, in declaration order.
    pub fn pending(&self) -> Vec<TaskName> {
        let mut pending: Vec<&TaskInfo> = self
            .tasks
            .values()
            .filter(|info| info.run_state == RunState::Pending)
            .collect();
        pending.sort_by_key(|info| info.index);
        pending.into_iter().map(|info| info.name.clone()).collect()
    }

    pub fn running_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|info| info.run_state == RunState::Running)
            .count()
    }
}
