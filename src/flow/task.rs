// src/flow/task.rs

//! Task declarations.
//!
//! A task is an ordered token list. The planner decides what each token
//! means (function, argument, prerequisite, method name, nested flow)
//! from the names visible to the flow at plan time.

use serde_json::Value;

use crate::flow::Flow;
use crate::flow::callable::Callable;
use crate::flow::hooks::CompletionHook;

/// One element of a task declaration.
#[derive(Debug, Clone)]
pub enum Token {
    /// The function to invoke.
    Callable(Callable),
    /// A (possibly dotted) name: task, nested flow, data, context property
    /// or method name.
    Ref(String),
    /// A nested flow; only legal as the last token.
    SubFlow(Flow),
}

impl From<Callable> for Token {
    fn from(c: Callable) -> Self {
        Token::Callable(c)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::Ref(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token::Ref(s)
    }
}

impl From<Flow> for Token {
    fn from(flow: Flow) -> Self {
        Token::SubFlow(flow)
    }
}

/// Accepts a single name or a list of names.
pub trait IntoNames {
    fn into_names(self) -> Vec<String>;
}

impl IntoNames for &str {
    fn into_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoNames for String {
    fn into_names(self) -> Vec<String> {
        vec![self]
    }
}

impl<S: Into<String>> IntoNames for Vec<S> {
    fn into_names(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: Into<String>, const N: usize> IntoNames for [S; N] {
    fn into_names(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

/// A declared unit of work.
#[derive(Debug, Clone, Default)]
pub struct Task {
    pub(crate) tokens: Vec<Token>,
    pub(crate) requires: Vec<String>,
    pub(crate) hooks: Vec<CompletionHook>,
}

impl Task {
    /// Call `callable`; add arguments with [`Task::arg`] / [`Task::args`].
    pub fn call(callable: Callable) -> Self {
        Self::tokens([Token::Callable(callable)])
    }

    /// Call a registered method on a receiver, e.g. `"getGenre.getBooks"`.
    pub fn method(path: impl Into<String>) -> Self {
        Self::tokens([Token::Ref(path.into())])
    }

    /// Raw token list, e.g. `["getGenre", "findBooksByAuthor", "getAuthor"]`.
    pub fn tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Token>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, reference: impl Into<String>) -> Self {
        self.tokens.push(Token::Ref(reference.into()));
        self
    }

    pub fn args<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens
            .extend(references.into_iter().map(|r| Token::Ref(r.into())));
        self
    }

    /// Extra prerequisites not implied by the arguments.
    pub fn requires(mut self, names: impl IntoNames) -> Self {
        self.requires.extend(names.into_names());
        self
    }

    pub fn default_to(mut self, value: impl Into<Value>) -> Self {
        self.hooks.push(CompletionHook::DefaultTo(value.into()));
        self
    }

    pub fn assert_exists(mut self) -> Self {
        self.hooks.push(CompletionHook::AssertExists);
        self
    }

    /// The nested flow this task runs, if it is a flow-task.
    pub(crate) fn subflow(&self) -> Option<&Flow> {
        match self.tokens.last() {
            Some(Token::SubFlow(flow)) => Some(flow),
            _ => None,
        }
    }
}

impl From<Callable> for Task {
    fn from(c: Callable) -> Self {
        Task::call(c)
    }
}

impl From<&str> for Task {
    fn from(path: &str) -> Self {
        Task::method(path)
    }
}

impl From<Vec<Token>> for Task {
    fn from(tokens: Vec<Token>) -> Self {
        Task::tokens(tokens)
    }
}

impl From<Flow> for Task {
    fn from(flow: Flow) -> Self {
        let requires = flow.requires.clone();
        Task::tokens([Token::SubFlow(flow)]).requires(requires)
    }
}
