// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskOutcome;
use crate::plan::FlowPlan;
use crate::types::TaskName;

/// Scheduler holds the sibling graph of one flow plus the per-execution state
/// of every task.
///
/// It is responsible for:
/// - deciding when a task is "ready" to run (sibling deps succeeded)
/// - marking tasks as succeeded/failed
/// - scheduling dependents when appropriate
/// - halting the execution on the first failure
///
/// It never runs anything itself; the runtime feeds it completions and
/// dispatches what it returns.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    /// Set by the first failure; nothing is launched afterwards.
    halted: bool,
}

impl Scheduler {
    /// Construct a scheduler for one execution of `plan`.
    pub fn from_plan(plan: &FlowPlan) -> Self {
        let graph = plan.graph.clone();

        let tasks = plan
            .tasks
            .iter()
            .map(|task| {
                let deps = graph.dependencies_of(&task.name).to_vec();
                (task.name.clone(), TaskInfo::from_plan(task, deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            halted: false,
        }
    }

    /// Whether a failure has stopped new launches.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<RunState> {
        self.tasks.get(task).map(|info| info.run_state)
    }

    /// Whether the dependencies of `task` have all succeeded.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        let mgr = ReadOnlyStateManager::new(&self.tasks);
        Some(mgr.deps_satisfied_for_info(info))
    }

    /// Whether any dispatched task has not reported back yet.
    pub fn has_running(&self) -> bool {
        ReadOnlyStateManager::new(&self.tasks).running_count() > 0
    }

    /// Tasks that never became ready.
    pub fn pending_tasks(&self) -> Vec<TaskName> {
        ReadOnlyStateManager::new(&self.tasks).pending()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Start the execution: every task without sibling dependencies.
    pub fn start(&mut self) -> Vec<ScheduledTask> {
        self.step_start().newly_scheduled
    }

    /// Handle completion of a task with a concrete outcome (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome)
            .newly_scheduled
    }

    /// Manual-step variant of `start` that returns a rich [`SchedulerStep`].
    pub fn step_start(&mut self) -> SchedulerStep {
        debug!(tasks = self.tasks.len(), "scheduler: starting execution");
        let mut manager = StateManager::new(&mut self.tasks);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = manager.all_tasks_terminal();

        SchedulerStep {
            newly_scheduled,
            newly_abandoned: Vec::new(),
            run_just_finished,
        }
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// Internal implementation of `handle_completion` / `step_completion`.
    fn completion_step_internal(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state == RunState::Running => match outcome {
                TaskOutcome::Success => {
                    info.run_state = RunState::DoneSuccess;
                    debug!(task = %info.name, "task completed successfully");
                    if !self.halted {
                        let mut manager = StateManager::new(&mut self.tasks);
                        step.newly_scheduled = manager.collect_new_ready_tasks();
                    }
                }
                TaskOutcome::Failed => {
                    info.run_state = RunState::DoneFailed;
                    if !self.halted {
                        warn!(task = %info.name, "task failed; halting execution");
                        self.halted = true;
                        let mut manager = StateManager::new(&mut self.tasks);
                        step.newly_abandoned = manager.abandon_pending();
                    } else {
                        debug!(task = %info.name, "task failed after execution halted");
                    }
                }
            },
            Some(info) => {
                warn!(
                    task = %task,
                    state = ?info.run_state,
                    "completion for task that is not running; ignoring"
                );
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        step.run_just_finished = StateManager::new(&mut self.tasks).all_tasks_terminal();
        step
    }
}
