// src/plan/interpreter.rs

//! Turns a task's token list into an [`Action`], argument paths and direct
//! prerequisites.
//!
//! Each `Ref` token is classified by its first segment, in this order:
//! sibling task, sibling nested flow, data visible to the flow, and (only in
//! a flow bound to a context) a property of the context value. The task's
//! own name never classifies. What a classified token means depends on its
//! position:
//!
//! | position            | single segment          | dotted                   |
//! |---------------------|-------------------------|--------------------------|
//! | after the function  | argument                | argument                 |
//! | before the function | prerequisite / receiver | `receiver.method` call   |
//!
//! An unclassified token is a method name when it directly follows a
//! single-segment reference and no function has been seen yet.

use std::sync::Arc;

use crate::errors::{FlowError, Result};
use crate::flow::{Flow, MethodRegistry, Task, Token};
use crate::plan::{Action, Reference, add_prerequisite, builder};
use crate::resolve::RefPath;
use crate::types::RefKind;

/// Names visible while planning one flow.
#[derive(Debug)]
pub struct FlowScope<'a> {
    flow: &'a Flow,
    data: &'a [String],
    methods: &'a Arc<MethodRegistry>,
}

impl<'a> FlowScope<'a> {
    pub fn new(flow: &'a Flow, data: &'a [String], methods: &'a Arc<MethodRegistry>) -> Self {
        Self {
            flow,
            data,
            methods,
        }
    }

    pub fn context_name(&self) -> Option<&str> {
        self.flow.context_name.as_deref()
    }

    /// Classify the first segment of a reference made by task `own`.
    pub fn classify(&self, root: &str, own: &str) -> Option<RefKind> {
        if root == own {
            return None;
        }
        if let Some((_, task)) = self.flow.tasks.iter().find(|(name, _)| name == root) {
            return Some(if task.subflow().is_some() {
                RefKind::Flow
            } else {
                RefKind::Task
            });
        }
        if self.data.iter().any(|d| d == root) {
            return Some(RefKind::Data);
        }
        self.context_name().map(|_| RefKind::Context)
    }

    /// Sibling or data name other than `own`.
    fn is_visible(&self, name: &str, own: &str) -> bool {
        name != own && self.visible_names(own).iter().any(|n| n == name)
    }

    /// Data names followed by sibling names, excluding `own`. This is the
    /// data scope of a flow nested in task `own`.
    pub fn visible_names(&self, own: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let siblings = self.flow.tasks.iter().map(|(name, _)| name);
        for name in self.data.iter().chain(siblings) {
            if name != own && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Interpreted form of one task declaration.
#[derive(Debug)]
pub struct Interpreted {
    pub action: Action,
    pub args: Vec<RefPath>,
    pub prerequisites: Vec<Reference>,
}

pub fn interpret(name: &str, task: &Task, scope: &FlowScope<'_>) -> Result<Interpreted> {
    let mut action: Option<Action> = None;
    let mut args = Vec::new();
    let mut prerequisites = Vec::new();
    // Single-segment reference seen before any function.
    let mut receiver: Option<RefPath> = None;
    let last = task.tokens.len().saturating_sub(1);

    for (i, token) in task.tokens.iter().enumerate() {
        match token {
            Token::Callable(callable) => {
                if action.is_some() {
                    return Err(more_than_one_function(name));
                }
                action = Some(Action::Call(callable.clone()));
                receiver = None;
            }

            Token::SubFlow(flow) => {
                if i != last {
                    return Err(FlowError::task(name, "SubFlow must be the last token"));
                }
                if action.is_some() {
                    return Err(more_than_one_function(name));
                }
                let (source, plan) = plan_subflow(name, flow, scope)?;
                if let Some(kind) = scope.classify(&source, name) {
                    add_prerequisite(&mut prerequisites, kind, &source);
                }
                for external in &plan.external {
                    if let Some(kind) = scope.classify(external, name) {
                        add_prerequisite(&mut prerequisites, kind, external);
                    }
                }
                action = Some(Action::SubFlow {
                    source,
                    plan: Arc::new(plan),
                });
            }

            Token::Ref(raw) => {
                let path = RefPath::parse(raw);
                let Some(kind) = scope.classify(path.root(), name) else {
                    if action.is_some() {
                        return Err(more_than_one_function(name));
                    }
                    match receiver.take() {
                        Some(recv) if path.len() == 1 => {
                            action = Some(Action::Method {
                                receiver: recv,
                                name: raw.clone(),
                            });
                            continue;
                        }
                        _ => return Err(unknown_string(name, path.root())),
                    }
                };

                let path = match scope.context_name() {
                    Some(ctx) if kind == RefKind::Context && path.root() != ctx => {
                        path.prefixed(ctx)
                    }
                    _ => path,
                };
                add_prerequisite(&mut prerequisites, kind, path.root());

                if action.is_some() {
                    args.push(path);
                    receiver = None;
                } else if path.len() > 1 {
                    let (recv, method) = path.split_last();
                    action = Some(Action::Method {
                        receiver: recv,
                        name: method,
                    });
                    receiver = None;
                } else {
                    receiver = Some(path);
                }
            }
        }
    }

    let action = action.ok_or_else(|| {
        FlowError::task(name, format!("Function required for flow call of '{name}'"))
    })?;

    Ok(Interpreted {
        action,
        args,
        prerequisites,
    })
}

fn plan_subflow(
    name: &str,
    flow: &Flow,
    scope: &FlowScope<'_>,
) -> Result<(String, crate::plan::FlowPlan)> {
    let source = match flow.context_name.as_deref() {
        Some(source) if !source.is_empty() => source.to_string(),
        _ => {
            return Err(FlowError::ArgumentNull {
                argument: "context_name".to_string(),
                message: "Missing argument: context_name".to_string(),
            });
        }
    };

    if !scope.is_visible(&source, name) {
        return Err(FlowError::task(
            name,
            format!(
                "Subflow data '{source}' does not exist. Provide the name of a flow, task or \
                 data from the parent flow.  Possible values include: {}",
                scope.visible_names(name).join(", ")
            ),
        ));
    }

    let nested_scope = scope.visible_names(name);
    let methods = Arc::new(scope.methods.inherited_by(&flow.methods));
    let plan = builder::build_flow(flow, &nested_scope, methods)?;
    Ok((source, plan))
}

fn more_than_one_function(name: &str) -> FlowError {
    FlowError::task(name, format!("Flow task '{name}' has more than one function specified."))
}

fn unknown_string(name: &str, token: &str) -> FlowError {
    FlowError::task(
        name,
        format!("Unknown string '{token}' must be either the name of a task or the name of data"),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::flow::Callable;

    fn noop() -> Callable {
        Callable::sync(|_| Ok(json!(null)))
    }

    fn library() -> Flow {
        Flow::new()
            .task("getBook", Task::call(noop()).arg("bookId"))
            .task("getAuthor", Task::call(noop()).arg("authorName"))
    }

    fn run(flow: &Flow, data: &[&str], name: &str, task: Task) -> Result<Interpreted> {
        let data: Vec<String> = data.iter().map(|s| s.to_string()).collect();
        let methods = Arc::new(MethodRegistry::new());
        let scope = FlowScope::new(flow, &data, &methods);
        interpret(name, &task, &scope)
    }

    fn kinds(plan: &Interpreted) -> Vec<(RefKind, &str)> {
        plan.prerequisites
            .iter()
            .map(|r| (r.kind, r.name.as_str()))
            .collect()
    }

    #[test]
    fn callable_with_arguments() {
        let flow = library();
        let task = Task::call(noop()).args(["getBook.authorId", "bookId"]);
        let plan = run(&flow, &["bookId"], "x", task).unwrap();
        assert!(matches!(plan.action, Action::Call(_)));
        assert_eq!(
            plan.args,
            [RefPath::parse("getBook.authorId"), RefPath::parse("bookId")]
        );
        assert_eq!(
            kinds(&plan),
            [(RefKind::Task, "getBook"), (RefKind::Data, "bookId")]
        );
    }

    #[test]
    fn dotted_reference_before_function_is_a_method_call() {
        let flow = library();
        let plan = run(
            &flow,
            &["bookId"],
            "x",
            Task::method("getBook.getAuthor").arg("getAuthor"),
        )
        .unwrap();
        match &plan.action {
            Action::Method { receiver, name } => {
                assert_eq!(receiver, &RefPath::parse("getBook"));
                assert_eq!(name, "getAuthor");
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert_eq!(plan.args, [RefPath::parse("getAuthor")]);
    }

    #[test]
    fn unknown_token_after_single_reference_names_a_method() {
        let flow = library();
        let task = Task::tokens(["getBook", "getBookSeries", "getAuthor"]);
        let plan = run(&flow, &[], "x", task).unwrap();
        match &plan.action {
            Action::Method { receiver, name } => {
                assert_eq!(receiver.to_string(), "getBook");
                assert_eq!(name, "getBookSeries");
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert_eq!(plan.args, [RefPath::parse("getAuthor")]);
    }

    #[test]
    fn leading_single_references_are_prerequisites_only() {
        let flow = library();
        let task = Task::tokens([Token::from("getAuthor"), Token::from(noop()), "bookId".into()]);
        let plan = run(&flow, &["bookId"], "x", task).unwrap();
        assert_eq!(plan.args, [RefPath::parse("bookId")]);
        assert_eq!(
            kinds(&plan),
            [(RefKind::Task, "getAuthor"), (RefKind::Data, "bookId")]
        );
    }

    #[test]
    fn two_functions_are_rejected() {
        let flow = library();
        let task = Task::tokens([Token::from(noop()), Token::from(noop()), "bookId".into()]);
        let err = run(&flow, &["bookId"], "x", task).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Flow error in 'x': Flow task 'x' has more than one function specified."
        );

        let task = Task::call(noop()).arg("notAThing");
        let err = run(&flow, &[], "x", task).unwrap_err();
        assert!(err.to_string().contains("more than one function specified"));
    }

    #[test]
    fn unknown_leading_string_is_rejected() {
        let flow = library();
        let err = run(&flow, &["bookId"], "getAuthor2", Task::method("notafunction")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Flow error in 'getAuthor2': Unknown string 'notafunction' must be either the name \
             of a task or the name of data"
        );
    }

    #[test]
    fn own_name_is_never_a_reference() {
        let flow = library();
        let err = run(&flow, &[], "getBook", Task::method("getBook.getAuthor")).unwrap_err();
        assert!(err.to_string().contains("Unknown string 'getBook'"));
    }

    #[test]
    fn bare_reference_requires_a_function() {
        let flow = library();
        let err = run(&flow, &[], "x", Task::method("getBook")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Flow error in 'x': Function required for flow call of 'x'"
        );
    }

    #[test]
    fn context_properties_are_rewritten_under_the_context_name() {
        let flow = Flow::bound_to("books").task("inner", Task::call(noop()).arg("authorId"));
        let plan = run(&flow, &["books"], "inner", Task::call(noop()).arg("authorId")).unwrap();
        assert_eq!(plan.args, [RefPath::parse("books.authorId")]);
        assert_eq!(kinds(&plan), [(RefKind::Context, "books")]);

        // Unknown single names become methods on the context value.
        let plan = run(&flow, &["books"], "inner", Task::method("getAuthor")).unwrap();
        match &plan.action {
            Action::Method { receiver, name } => {
                assert_eq!(receiver.to_string(), "books");
                assert_eq!(name, "getAuthor");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn subflow_must_be_last() {
        let flow = library();
        let nested = Flow::bound_to("getBook").task("t", Task::call(noop()));
        let task = Task::tokens([Token::SubFlow(nested), Token::from(noop())]);
        let err = run(&flow, &[], "x", task).unwrap_err();
        assert_eq!(err.to_string(), "Flow error in 'x': SubFlow must be the last token");
    }

    #[test]
    fn subflow_source_must_exist_and_not_be_the_task_itself() {
        let flow = library().add_flow(
            "getAuthors",
            Flow::bound_to("asdf").task("t", Task::call(noop())),
        );
        let nested = Flow::bound_to("asdf").task("t", Task::call(noop()));
        let err = run(&flow, &["genreName"], "getAuthors", Task::from(nested)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Flow error in 'getAuthors': Subflow data 'asdf' does not exist. Provide the name \
             of a flow, task or data from the parent flow.  Possible values include: \
             genreName, getBook, getAuthor"
        );

        let nested = Flow::bound_to("getAuthors").task("t", Task::call(noop()));
        let err = run(&flow, &["genreName"], "getAuthors", Task::from(nested)).unwrap_err();
        assert!(err.to_string().contains("Subflow data 'getAuthors' does not exist"));
    }

    #[test]
    fn subflow_without_source_is_a_missing_argument() {
        let flow = library();
        let nested = Flow::bound_to("").task("t", Task::call(noop()));
        let err = run(&flow, &[], "x", Task::from(nested)).unwrap_err();
        assert_eq!(err.argument_name(), Some("context_name"));
        assert_eq!(err.to_string(), "Missing argument: context_name");
    }

    #[test]
    fn subflow_lifts_external_requirements_of_nested_tasks() {
        let flow = library().task("getHambly", Task::call(noop()).arg("authorName"));
        let nested = Flow::bound_to("getBook")
            .task("hambly2", Task::call(noop()).arg("getHambly.id"))
            .task("local", Task::call(noop()).arg("hambly2"));
        let plan = run(&flow, &["authorName"], "x", Task::from(nested)).unwrap();
        assert_eq!(
            kinds(&plan),
            [(RefKind::Task, "getBook"), (RefKind::Task, "getHambly")]
        );
    }
}
