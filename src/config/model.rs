// src/config/model.rs

use serde::Deserialize;

use crate::types::LogLevel;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// event_buffer = 64
/// max_parallel_subflows = 0
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Capacity of the completion-event channel of each execution.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Maximum number of subflow child executions running at once for a
    /// single fan-out. `0` means unbounded.
    #[serde(default)]
    pub max_parallel_subflows: usize,
}

fn default_event_buffer() -> usize {
    64
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            max_parallel_subflows: 0,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    /// If `None`, `FNFLOW_LOG` (or `info`) decides.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawEngineConfig>` or `Default`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    engine: EngineSection,
    logging: LoggingSection,
}

impl EngineConfig {
    pub(crate) fn new_unchecked(engine: EngineSection, logging: LoggingSection) -> Self {
        Self { engine, logging }
    }

    pub fn event_buffer(&self) -> usize {
        self.engine.event_buffer
    }

    /// `None` when fan-out is unbounded.
    pub fn max_parallel_subflows(&self) -> Option<usize> {
        match self.engine.max_parallel_subflows {
            0 => None,
            n => Some(n),
        }
    }

    pub fn log_level(&self) -> Option<LogLevel> {
        self.logging.level
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new_unchecked(EngineSection::default(), LoggingSection::default())
    }
}
