// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{FlowError, Result};
use crate::plan::TaskPlan;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: sibling tasks that must succeed before this one
    /// can run.
    deps: Vec<String>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<String>,
}

/// Sibling dependency graph of one flow, keyed by task name.
///
/// Only task and nested-flow prerequisites become edges; data and context
/// prerequisites are satisfied by seeding and never block.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: HashMap<String, DagNode>,
    /// Task names in declaration order.
    order: Vec<String>,
}

impl DagGraph {
    /// Build the graph from interpreted task plans.
    pub fn from_plans(tasks: &[TaskPlan]) -> Self {
        let edges = tasks.iter().map(|t| {
            (
                t.name.clone(),
                t.sibling_prerequisites().map(str::to_string).collect(),
            )
        });
        Self::from_edges(edges)
    }

    /// Build the graph from `(task, direct dependencies)` pairs.
    ///
    /// Dependencies naming tasks that are not part of the graph are kept on
    /// the dependent but get no reverse edge.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut nodes: HashMap<String, DagNode> = HashMap::new();
        let mut order = Vec::new();

        // First pass: create nodes with their dependency lists.
        for (name, deps) in edges {
            order.push(name.clone());
            nodes.insert(
                name,
                DagNode {
                    deps,
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: populate dependents based on deps.
        for task_name in &order {
            let deps = nodes
                .get(task_name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(task_name.clone());
                }
            }
        }

        Self { nodes, order }
    }

    /// Reject dependency cycles with a topological sort.
    pub fn ensure_acyclic(&self) -> Result<()> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in &self.order {
            graph.add_node(name.as_str());
        }
        for name in &self.order {
            for dep in self.dependencies_of(name) {
                if self.nodes.contains_key(dep) {
                    graph.add_edge(dep.as_str(), name.as_str(), ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(FlowError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// All task names, in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks with no sibling dependencies.
    pub fn roots(&self) -> Vec<&str> {
        self.tasks()
            .filter(|name| self.dependencies_of(name).is_empty())
            .collect()
    }
}
