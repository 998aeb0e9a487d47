//! Runtime configuration
//!
//! JSON-backed settings for the scheduler hosts and the message bus. Every
//! field has a default, so a partial (or empty) document is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RfError, RfResult};

/// Scheduler host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Multiplier applied to every host delta (1.0 = real time)
    pub time_scale: f64,
    /// Upper bound for a single host delta in seconds (stall protection).
    /// `None` disables clamping.
    pub max_delta_secs: Option<f64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            max_delta_secs: Some(0.25),
        }
    }
}

impl SchedulerConfig {
    /// Apply scaling and clamping to a raw host delta
    #[inline]
    pub fn effective_delta(&self, raw_delta_secs: f64) -> f64 {
        let delta = raw_delta_secs.max(0.0) * self.time_scale;
        match self.max_delta_secs {
            Some(max) => delta.min(max),
            None => delta,
        }
    }
}

/// Message bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Log every send, flush and dispatch at trace level
    pub trace_traffic: bool,
    /// Pre-allocated mailbox slots per channel
    pub initial_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            trace_traffic: false,
            initial_capacity: 64,
        }
    }
}

/// Top-level runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub scheduler: SchedulerConfig,
    pub bus: BusConfig,
}

impl RuntimeConfig {
    /// Parse from a JSON document and validate
    pub fn from_json_str(json: &str) -> RfResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file and validate
    pub fn load(path: impl AsRef<Path>) -> RfResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::debug!("Loaded runtime config from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> RfResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values no host can run with
    pub fn validate(&self) -> RfResult<()> {
        let scale = self.scheduler.time_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(RfError::InvalidConfig(format!(
                "scheduler.time_scale must be finite and >= 0, got {scale}"
            )));
        }
        if let Some(max) = self.scheduler.max_delta_secs {
            if !max.is_finite() || max <= 0.0 {
                return Err(RfError::InvalidConfig(format!(
                    "scheduler.max_delta_secs must be finite and > 0, got {max}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RuntimeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config =
            RuntimeConfig::from_json_str(r#"{ "bus": { "trace_traffic": true } }"#).unwrap();
        assert!(config.bus.trace_traffic);
        assert_eq!(config.bus.initial_capacity, 64);
        assert_relative_eq!(config.scheduler.time_scale, 1.0);
    }

    #[test]
    fn test_invalid_time_scale_rejected() {
        let err = RuntimeConfig::from_json_str(r#"{ "scheduler": { "time_scale": -1.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_max_delta_rejected() {
        let err = RuntimeConfig::from_json_str(r#"{ "scheduler": { "max_delta_secs": 0.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = RuntimeConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, RfError::Serialization(_)));
    }

    #[test]
    fn test_effective_delta() {
        let config = SchedulerConfig {
            time_scale: 2.0,
            max_delta_secs: Some(0.1),
        };
        assert_relative_eq!(config.effective_delta(0.02), 0.04);
        assert_relative_eq!(config.effective_delta(1.0), 0.1);
        assert_relative_eq!(config.effective_delta(-1.0), 0.0);

        let unclamped = SchedulerConfig {
            time_scale: 1.0,
            max_delta_secs: None,
        };
        assert_relative_eq!(unclamped.effective_delta(5.0), 5.0);
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let mut config = RuntimeConfig::default();
        config.bus.trace_traffic = true;
        config.scheduler.time_scale = 0.5;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        let loaded = RuntimeConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RuntimeConfig::load("/nonexistent/reelforge/runtime.json").unwrap_err();
        assert!(matches!(err, RfError::Io(_)));
    }
}
