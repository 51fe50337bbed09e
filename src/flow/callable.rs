// src/flow/callable.rs

//! Task bodies and receiver-bound methods.
//!
//! A [`Callable`] receives the resolved argument values of a task. A
//! [`Method`] additionally receives the resolved receiver value and is looked
//! up by name in a [`MethodRegistry`] when a task is declared as
//! `"receiver.method"`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::TaskError;

/// Boxed future returned by every task body.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<Value, TaskError>> + Send>>;

type CallFn = dyn Fn(Vec<Value>) -> TaskFuture + Send + Sync;
type MethodFn = dyn Fn(Value, Vec<Value>) -> TaskFuture + Send + Sync;

/// A task body: resolved arguments in, one value (or a failure) out.
#[derive(Clone)]
pub struct Callable(Arc<CallFn>);

impl Callable {
    /// Wrap an asynchronous function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
    {
        Self(Arc::new(move |args| Box::pin(f(args))))
    }

    /// Wrap a synchronous function. It still runs on the executor, so a
    /// panic is reported as a task failure.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, TaskError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self(Arc::new(move |args| {
            let f = Arc::clone(&f);
            Box::pin(async move { f(args) })
        }))
    }

    pub fn call(&self, args: Vec<Value>) -> TaskFuture {
        (self.0)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// A function invoked on a receiver value, e.g. `getGenre.getBooks`.
#[derive(Clone)]
pub struct Method(Arc<MethodFn>);

impl Method {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
    {
        Self(Arc::new(move |receiver, args| Box::pin(f(receiver, args))))
    }

    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value, Vec<Value>) -> Result<Value, TaskError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self(Arc::new(move |receiver, args| {
            let f = Arc::clone(&f);
            Box::pin(async move { f(receiver, args) })
        }))
    }

    pub fn call(&self, receiver: Value, args: Vec<Value>) -> TaskFuture {
        (self.0)(receiver, args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Method(..)")
    }
}

/// Named methods available to method-form tasks of a flow.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Method>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, method: Method) {
        self.methods.insert(name.into(), method);
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Registry seen by a nested flow: everything inherited from `self`,
    /// with the nested flow's own registrations taking precedence.
    pub fn inherited_by(&self, own: &MethodRegistry) -> MethodRegistry {
        let mut methods = self.methods.clone();
        methods.extend(own.methods.iter().map(|(k, v)| (k.clone(), v.clone())));
        MethodRegistry { methods }
    }
}
