// src/config/validate.rs

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{FlowError, Result};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = FlowError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(EngineConfig::new_unchecked(raw.engine, raw.logging))
    }
}

fn validate_raw_config(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.engine.event_buffer == 0 {
        return Err(FlowError::ConfigError(
            "[engine].event_buffer must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_event_buffer_is_rejected() {
        let raw: RawEngineConfig = toml::from_str("[engine]\nevent_buffer = 0\n").unwrap();
        match EngineConfig::try_from(raw) {
            Err(FlowError::ConfigError(msg)) => assert!(msg.contains("event_buffer")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn empty_document_uses_defaults() {
        let raw: RawEngineConfig = toml::from_str("").unwrap();
        let cfg = EngineConfig::try_from(raw).unwrap();
        assert_eq!(cfg.event_buffer(), 64);
        assert_eq!(cfg.max_parallel_subflows(), None);
        assert_eq!(cfg.log_level(), None);
    }
}
