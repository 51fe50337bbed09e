use std::str::FromStr;
use serde::Deserialize;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Log verbosity, as accepted by [`crate::logging::init_logging`] and the
/// `[logging]` configuration section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[serde(alias = "warning")]
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "invalid log level: {other} (expected error, warn, info, debug or trace)"
            )),
        }
    }
}

/// How a direct prerequisite of a task is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// A key of the input data (or, inside a subflow, of the parent scope).
    Data,
    /// A sibling task.
    Task,
    /// A sibling nested flow.
    Flow,
    /// A property of the value a subflow is bound to.
    Context,
}

impl RefKind {
    /// Whether the prerequisite is produced by a sibling in the same flow.
    pub fn is_sibling(self) -> bool {
        matches!(self, RefKind::Task | RefKind::Flow)
    }
}
