// src/engine/describe.rs

//! Human-readable "Not Found" diagnostics.
//!
//! A task is described by its requirement closure and the data values it was
//! given:
//!
//! ```text
//! Not Found: "getBooks" for getGenre, getAuthor and assertGenreExistence with genreName "Yourmom" and authorName "Dan Brown"
//! ```

use serde_json::{Map, Value};

use crate::errors::FlowError;
use crate::plan::TaskPlan;

/// Describe `task` under the label `display`, quoting data values from
/// `results`.
pub fn describe(task: &TaskPlan, display: &str, results: &Map<String, Value>) -> String {
    let mut out = format!("\"{display}\"");
    let reqs = &task.requirements;

    for (i, name) in reqs.tasks.iter().enumerate() {
        out.push_str(joiner(i, reqs.tasks.len(), " for "));
        out.push_str(name);
    }

    let data: Vec<&String> = reqs
        .data
        .iter()
        .filter(|name| !reqs.tasks.contains(*name))
        .collect();
    for (i, name) in data.iter().enumerate() {
        out.push_str(joiner(i, data.len(), " with "));
        out.push_str(name);
        out.push(' ');
        out.push_str(&render_value(results.get(name.as_str())));
    }

    out
}

/// Null-argument failure for `task`, labelled `argument`.
pub fn not_found(task: &TaskPlan, argument: &str, results: &Map<String, Value>) -> FlowError {
    FlowError::ArgumentNull {
        argument: argument.to_string(),
        message: format!("Not Found: {}", describe(task, argument, results)),
    }
}

fn joiner(i: usize, len: usize, first: &'static str) -> &'static str {
    if i == 0 {
        first
    } else if i == len - 1 {
        " and "
    } else {
        ", "
    }
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(v) => v.to_string(),
    }
}
