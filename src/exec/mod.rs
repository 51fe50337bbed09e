// src/exec/mod.rs

//! Task execution layer.
//!
//! The runtime hands each ready task to an [`ExecutorBackend`] as a boxed
//! [`Job`]; the backend runs it and reports back with a
//! `RuntimeEvent::TaskCompleted` on the execution's channel.
//!
//! - [`task_runner`] runs one job, turning panics into task failures.
//! - [`backend`] provides the `ExecutorBackend` trait and the default
//!   `TokioBackend`; tests can wrap or replace it.

pub mod backend;
pub mod task_runner;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::errors::FlowError;

pub use backend::{ExecutorBackend, TokioBackend};
pub use task_runner::run_task;

/// A fully prepared task invocation.
pub type Job = Pin<Box<dyn Future<Output = Result<Value, FlowError>> + Send>>;
