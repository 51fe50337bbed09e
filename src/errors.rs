// src/errors.rs

//! Crate-wide error types.
//!
//! [`FlowError`] covers both channels the engine reports through:
//! structural problems found while planning a flow (returned as `Err` before
//! anything runs) and run-time task failures (carried by
//! [`crate::engine::FlowOutcome`]). [`TaskError`] is what task bodies return.

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum FlowError {
    /// A task-scoped problem: bad declaration, unknown method, missing
    /// subflow data.
    #[error("Flow error in '{task}': {message}")]
    Task { task: TaskName, message: String },

    /// A required value was null: unresolvable argument or receiver path,
    /// an asserted result, or a task body reporting a missing argument.
    #[error("{message}")]
    ArgumentNull { argument: String, message: String },

    /// The task body itself failed.
    #[error("Flow error in '{task}': {source}")]
    Execution {
        task: TaskName,
        #[source]
        source: TaskError,
    },

    #[error("No tasks given for Flow.")]
    EmptyFlow,

    #[error("Duplicate task or flow name: {0}")]
    DuplicateName(String),

    #[error("Cycle detected in flow: {0}")]
    DagCycle(String),

    #[error("Invalid input data: {0}")]
    InvalidData(String),

    #[error("Execution stalled with pending tasks: {}", .0.join(", "))]
    Stalled(Vec<TaskName>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlowError {
    pub(crate) fn task(task: impl Into<TaskName>, message: impl Into<String>) -> Self {
        FlowError::Task {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Name of the missing argument for null-argument failures.
    pub fn argument_name(&self) -> Option<&str> {
        match self {
            FlowError::ArgumentNull { argument, .. } => Some(argument),
            _ => None,
        }
    }

    /// Name of the task a failure is attributed to, when there is one.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            FlowError::Task { task, .. } | FlowError::Execution { task, .. } => Some(task),
            _ => None,
        }
    }
}

/// Failure reported by a task body.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The body could not proceed because the named argument was null.
    #[error("Missing argument: {0}")]
    ArgumentNull(String),

    #[error("{0}")]
    Message(String),

    /// The body panicked; carries the panic description.
    #[error("Error during execution of function: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    pub fn msg(message: impl Into<String>) -> Self {
        TaskError::Message(message.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlowError>;
