// src/plan/builder.rs

//! Plans a whole flow.
//!
//! Planning is two passes. [`build_flow`] interprets every task (recursing
//! into nested flows), adds explicit requirements, builds the sibling graph
//! and rejects cycles. [`fill_requirements`] then computes, top-down, the
//! transitive requirement closure of every task; a nested flow's closures
//! fold in the closure of the parent task it is bound to.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::dag::DagGraph;
use crate::errors::{FlowError, Result};
use crate::flow::{Flow, MethodRegistry};
use crate::plan::interpreter::{FlowScope, interpret};
use crate::plan::{Action, FlowPlan, Reference, Requirements, TaskPlan, add_prerequisite};
use crate::types::RefKind;

/// Plan a top-level flow for input data with the given keys.
pub fn build_plan(flow: &Flow, data_keys: &[String]) -> Result<FlowPlan> {
    let methods = Arc::new(flow.methods.clone());
    let mut plan = build_flow(flow, data_keys, methods)?;
    fill_requirements(&mut plan, &Requirements::default());
    debug!(
        tasks = plan.tasks.len(),
        external = ?plan.external,
        "flow planned"
    );
    Ok(plan)
}

/// First pass: interpret, classify and check one flow.
pub(crate) fn build_flow(
    flow: &Flow,
    data: &[String],
    methods: Arc<MethodRegistry>,
) -> Result<FlowPlan> {
    if flow.tasks.is_empty() {
        return Err(FlowError::EmptyFlow);
    }
    ensure_unique_names(flow)?;

    let scope = FlowScope::new(flow, data, &methods);
    let mut tasks = Vec::with_capacity(flow.tasks.len());

    for (index, (name, task)) in flow.tasks.iter().enumerate() {
        let interpreted = interpret(name, task, &scope)?;
        let mut prerequisites = interpreted.prerequisites;

        for required in &task.requires {
            add_explicit_requirement(name, required, &scope, &mut prerequisites)?;
        }

        trace!(
            task = %name,
            prerequisites = ?prerequisites.iter().map(|r| &r.name).collect::<Vec<_>>(),
            "task interpreted"
        );

        tasks.push(TaskPlan {
            name: name.clone(),
            index,
            action: interpreted.action,
            args: interpreted.args,
            prerequisites,
            requirements: Requirements::default(),
            hooks: task.hooks.clone(),
        });
    }

    let graph = DagGraph::from_plans(&tasks);
    graph.ensure_acyclic()?;

    let external = external_requirements(&tasks);
    Ok(FlowPlan::new(
        flow.context_name.clone(),
        tasks,
        graph,
        external,
        methods,
    ))
}

/// Checks that need no input keys: every flow, nested ones included, has
/// tasks and unique names.
pub(crate) fn check_shape(flow: &Flow) -> Result<()> {
    if flow.tasks.is_empty() {
        return Err(FlowError::EmptyFlow);
    }
    ensure_unique_names(flow)?;
    flow.tasks
        .iter()
        .filter_map(|(_, task)| task.subflow())
        .try_for_each(check_shape)
}

fn ensure_unique_names(flow: &Flow) -> Result<()> {
    let mut seen = HashSet::new();
    for (name, _) in &flow.tasks {
        if !seen.insert(name.as_str()) {
            return Err(FlowError::DuplicateName(name.clone()));
        }
    }
    Ok(())
}

fn add_explicit_requirement(
    name: &str,
    required: &str,
    scope: &FlowScope<'_>,
    prerequisites: &mut Vec<Reference>,
) -> Result<()> {
    if required == name {
        return Err(FlowError::task(name, "A task cannot require itself"));
    }
    let kind = scope.classify(required, name).ok_or_else(|| {
        FlowError::task(
            name,
            format!(
                "Unknown requirement '{required}' must be either the name of a task or the \
                 name of data"
            ),
        )
    })?;
    add_prerequisite(prerequisites, kind, required);
    Ok(())
}

/// Data-kind prerequisites: names the enclosing scope must provide.
fn external_requirements(tasks: &[TaskPlan]) -> Vec<String> {
    let mut external: Vec<String> = Vec::new();
    for reference in tasks.iter().flat_map(|t| &t.prerequisites) {
        if reference.kind == RefKind::Data && !external.contains(&reference.name) {
            external.push(reference.name.clone());
        }
    }
    external
}

/// Second pass: requirement closures, top-down through nested flows.
pub(crate) fn fill_requirements(plan: &mut FlowPlan, inherited: &Requirements) {
    let view: &FlowPlan = plan;
    let closures: Vec<Requirements> = view
        .tasks
        .iter()
        .map(|task| closure_of(view, task, inherited))
        .collect();
    for (task, closure) in plan.tasks.iter_mut().zip(closures) {
        task.requirements = closure;
    }

    for i in 0..plan.tasks.len() {
        let bound = match &plan.tasks[i].action {
            Action::SubFlow { source, .. } => match plan.task(source) {
                Some(source_task) => {
                    let mut bound = Requirements::default();
                    bound.push_task(source);
                    bound.extend(&source_task.requirements);
                    bound
                }
                None => Requirements::default(),
            },
            _ => continue,
        };
        if let Action::SubFlow { plan: nested, .. } = &mut plan.tasks[i].action {
            fill_requirements(Arc::make_mut(nested), &bound);
        }
    }
}

fn closure_of(plan: &FlowPlan, task: &TaskPlan, inherited: &Requirements) -> Requirements {
    let mut requirements = Requirements::default();
    collect(plan, task, &mut requirements);
    requirements.extend(inherited);
    requirements
}

fn collect(plan: &FlowPlan, task: &TaskPlan, requirements: &mut Requirements) {
    for reference in &task.prerequisites {
        match reference.kind {
            RefKind::Task | RefKind::Flow => {
                if requirements.push_task(&reference.name) {
                    if let Some(dep) = plan.task(&reference.name) {
                        collect(plan, dep, requirements);
                    }
                }
            }
            RefKind::Data => requirements.push_data(&reference.name),
            RefKind::Context => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::flow::{Callable, Task};

    fn noop() -> Callable {
        Callable::sync(|_| Ok(json!(null)))
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn genre_flow() -> Flow {
        Flow::new()
            .task("getAuthor", Task::call(noop()).arg("authorName"))
            .task("getGenre", Task::call(noop()).arg("genreName"))
            .task("assertGenreExistence", Task::call(noop()).arg("getGenre"))
            .task(
                "getBooks",
                Task::call(noop())
                    .args(["getGenre", "getAuthor"])
                    .requires("assertGenreExistence"),
            )
    }

    #[test]
    fn closures_walk_sibling_prerequisites_depth_first() {
        let plan = build_plan(&genre_flow(), &keys(&["authorName", "genreName"])).unwrap();
        let books = plan.task("getBooks").unwrap();
        assert_eq!(
            books.requirements.tasks,
            ["getGenre", "getAuthor", "assertGenreExistence"]
        );
        assert_eq!(books.requirements.data, ["genreName", "authorName"]);
        assert_eq!(
            plan.graph.dependencies_of("getBooks"),
            ["getGenre", "getAuthor", "assertGenreExistence"]
        );
        assert_eq!(plan.external, ["authorName", "genreName"]);
    }

    #[test]
    fn planning_is_deterministic() {
        let flow = genre_flow();
        let data = keys(&["authorName", "genreName"]);
        let a = build_plan(&flow, &data).unwrap();
        let b = build_plan(&flow, &data).unwrap();
        for (x, y) in a.tasks.iter().zip(&b.tasks) {
            let xs: HashSet<_> = x.prerequisite_names().into_iter().collect();
            let ys: HashSet<_> = y.prerequisite_names().into_iter().collect();
            assert_eq!(xs, ys);
        }
    }

    #[test]
    fn empty_and_duplicate_flows_are_rejected() {
        let err = build_plan(&Flow::new(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "No tasks given for Flow.");

        let flow = Flow::new()
            .task("a", Task::call(noop()))
            .task("a", Task::call(noop()));
        assert!(matches!(build_plan(&flow, &[]), Err(FlowError::DuplicateName(n)) if n == "a"));

        let flow = Flow::new().add_flow("nested", Flow::bound_to("x"));
        let err = build_plan(&flow, &keys(&["x"])).unwrap_err();
        assert!(matches!(err, FlowError::EmptyFlow));
    }

    #[test]
    fn shape_checks_reach_nested_flows() {
        let flow = genre_flow();
        assert!(check_shape(&flow).is_ok());

        let nested = genre_flow().add_flow("each", Flow::bound_to("getBooks"));
        assert!(matches!(check_shape(&nested), Err(FlowError::EmptyFlow)));
    }

    #[test]
    fn cycles_are_rejected() {
        let flow = Flow::new()
            .task("a", Task::call(noop()).arg("b"))
            .task("b", Task::call(noop()).arg("c"))
            .task("c", Task::call(noop()).requires("a"));
        assert!(matches!(build_plan(&flow, &[]), Err(FlowError::DagCycle(_))));
    }

    #[test]
    fn explicit_requirements_are_checked() {
        let flow = Flow::new().task("a", Task::call(noop()).requires("missing"));
        let err = build_plan(&flow, &[]).unwrap_err();
        assert!(err.to_string().contains("Unknown requirement 'missing'"));

        let flow = Flow::new().task("a", Task::call(noop()).requires("a"));
        let err = build_plan(&flow, &[]).unwrap_err();
        assert_eq!(err.task_name(), Some("a"));
    }

    #[test]
    fn nested_closures_fold_in_the_bound_parent_task() {
        let flow = Flow::new()
            .task("getGenre", Task::call(noop()).arg("genreName"))
            .task("getBooksByGenre", Task::method("getGenre.getBooks"))
            .add_flow(
                "getAuthors",
                Flow::bound_to("getBooksByGenre")
                    .task("author", Task::call(noop()).arg("test_null")),
            );
        let plan = build_plan(&flow, &keys(&["genreName"])).unwrap();
        let Action::SubFlow { plan: nested, source } = &plan.task("getAuthors").unwrap().action
        else {
            panic!("getAuthors should be a subflow");
        };
        assert_eq!(source, "getBooksByGenre");

        let author = nested.task("author").unwrap();
        assert_eq!(author.requirements.tasks, ["getBooksByGenre", "getGenre"]);
        assert_eq!(author.requirements.data, ["genreName"]);
    }

    #[test]
    fn nested_flows_inherit_methods() {
        let flow = Flow::new()
            .task("items", Task::call(noop()))
            .method("name", crate::flow::Method::sync(|_, _| Ok(json!("n"))))
            .add_flow(
                "each",
                Flow::bound_to("items").task("n", Task::method("items.name")),
            );
        let plan = build_plan(&flow, &[]).unwrap();
        let Action::SubFlow { plan: nested, .. } = &plan.task("each").unwrap().action else {
            panic!("each should be a subflow");
        };
        assert!(nested.methods.get("name").is_some());
    }
}
