// src/plan/mod.rs

//! Execution plans.
//!
//! A [`FlowPlan`] is the immutable, interpreted form of a [`crate::Flow`]
//! for one input key-set: every task reduced to an [`Action`], its argument
//! paths and its classified prerequisites, plus the sibling dependency graph.
//!
//! - [`interpreter`] turns one task's token list into an action and
//!   arguments.
//! - [`builder`] plans a whole flow (recursively for nested flows) and
//!   computes requirement closures used in diagnostics.
//! - [`cache`] memoizes plans per input key-set.

pub mod builder;
pub mod cache;
pub mod interpreter;

use std::collections::HashMap;
use std::sync::Arc;

use crate::dag::DagGraph;
use crate::flow::{Callable, CompletionHook, MethodRegistry};
use crate::resolve::RefPath;
use crate::types::{RefKind, TaskName};

pub use cache::PlanCache;

/// A direct prerequisite of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: RefKind,
    pub name: String,
}

/// What a task does once its prerequisites are available.
#[derive(Debug, Clone)]
pub enum Action {
    /// Invoke a callable with the resolved arguments.
    Call(Callable),
    /// Invoke the registered method `name` on the value at `receiver`.
    Method { receiver: RefPath, name: String },
    /// Run a nested flow over the value of `source`.
    SubFlow {
        source: String,
        plan: Arc<FlowPlan>,
    },
}

/// Transitive requirements of a task, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    pub tasks: Vec<String>,
    pub data: Vec<String>,
}

impl Requirements {
    /// Returns `false` if the task was already listed.
    pub fn push_task(&mut self, name: &str) -> bool {
        if self.tasks.iter().any(|t| t == name) {
            return false;
        }
        self.tasks.push(name.to_string());
        true
    }

    pub fn push_data(&mut self, name: &str) {
        if !self.data.iter().any(|d| d == name) {
            self.data.push(name.to_string());
        }
    }

    pub fn extend(&mut self, other: &Requirements) {
        for task in &other.tasks {
            self.push_task(task);
        }
        for data in &other.data {
            self.push_data(data);
        }
    }
}

/// Interpreted form of one task.
#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub name: TaskName,
    /// Declaration order within the flow.
    pub index: usize,
    pub action: Action,
    pub args: Vec<RefPath>,
    pub prerequisites: Vec<Reference>,
    pub requirements: Requirements,
    pub hooks: Vec<CompletionHook>,
}

impl TaskPlan {
    /// Prerequisites produced by other tasks of the same flow.
    pub fn sibling_prerequisites(&self) -> impl Iterator<Item = &str> {
        self.prerequisites
            .iter()
            .filter(|r| r.kind.is_sibling())
            .map(|r| r.name.as_str())
    }

    pub fn prerequisite_names(&self) -> Vec<&str> {
        self.prerequisites.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Record `name` as a prerequisite unless it is already listed.
pub(crate) fn add_prerequisite(list: &mut Vec<Reference>, kind: RefKind, name: &str) {
    if !list.iter().any(|r| r.name == name) {
        list.push(Reference {
            kind,
            name: name.to_string(),
        });
    }
}

/// Interpreted form of one flow.
#[derive(Debug, Clone)]
pub struct FlowPlan {
    pub context_name: Option<String>,
    pub tasks: Vec<TaskPlan>,
    pub graph: DagGraph,
    /// Names this flow needs from the enclosing scope.
    pub external: Vec<String>,
    pub methods: Arc<MethodRegistry>,
    index: HashMap<TaskName, usize>,
}

impl FlowPlan {
    pub(crate) fn new(
        context_name: Option<String>,
        tasks: Vec<TaskPlan>,
        graph: DagGraph,
        external: Vec<String>,
        methods: Arc<MethodRegistry>,
    ) -> Self {
        let index = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Self {
            context_name,
            tasks,
            graph,
            external,
            methods,
            index,
        }
    }

    pub fn task(&self, name: &str) -> Option<&TaskPlan> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn is_task(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }
}
