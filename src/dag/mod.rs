// src/dag/mod.rs

//! Dependency graph and scheduling.
//!
//! - [`graph`] holds the sibling dependency graph of one flow.
//! - [`scheduler`] contains the per-execution state machine that decides
//!   which tasks are ready to run, and when the execution halts.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-execution state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{RunState, ScheduledTask};
