//! Engine configuration.
//!
//! Every field has a default matching the reference thresholds, so a JS
//! caller can pass `undefined`, `{}`, or a partial object.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::{Result, RiskError};

/// Nominal maximum risk score of the check catalogue.
///
/// Individual check maximums sum to more than this; scores above it are
/// reported as-is, never clamped.
pub const NOMINAL_MAX_RISK: u32 = 10;

/// Top-level configuration for both engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub checker: CheckerConfig,
    pub tracker: TrackerConfig,
    /// One of `error`, `warn`, `info`, `debug`, `trace`, `off`.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            checker: CheckerConfig::default(),
            tracker: TrackerConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Read a config from a JS options object, falling back to defaults
    /// when the value is absent or malformed.
    pub fn from_js(options: JsValue) -> Self {
        if options.is_undefined() || options.is_null() {
            return Self::default();
        }
        serde_wasm_bindgen::from_value::<Self>(options)
            .unwrap_or_else(|e| {
                log::warn!("⚠️ Ignoring malformed engine config: {}", e);
                Self::default()
            })
            .validated()
    }

    /// Replace an inconsistent tracker section with its defaults.
    pub fn validated(mut self) -> Self {
        if let Err(e) = self.tracker.validate() {
            log::warn!("⚠️ Ignoring tracker config: {}", e);
            self.tracker = TrackerConfig::default();
        }
        self
    }

    /// Parsed log level filter; unknown names map to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}

/// Check registry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Denominator for risk tier percentages.
    pub max_risk: u32,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_risk: NOMINAL_MAX_RISK,
        }
    }
}

/// Activity tracker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Idle time after which the session is marked inactive.
    pub inactivity_threshold_ms: u64,
    /// Cadence of the idle poll.
    pub idle_poll_interval_ms: u32,
    /// Cadence of the periodic behavior report.
    pub report_interval_ms: u32,
    /// Log length that triggers eviction.
    pub log_capacity: usize,
    /// Records kept after eviction.
    pub log_retain: usize,
    /// Recent records inspected by pattern analysis.
    pub pattern_window: usize,
    /// Records included in the behavior export.
    pub export_log_tail: usize,
    /// Records listed in the periodic report.
    pub recent_events: usize,
}

impl TrackerConfig {
    /// Eviction must not keep more than the ceiling, and timers need a
    /// non-zero period.
    pub fn validate(&self) -> Result<()> {
        if self.log_retain > self.log_capacity {
            return Err(RiskError::InvalidConfig(format!(
                "log_retain ({}) exceeds log_capacity ({})",
                self.log_retain, self.log_capacity
            )));
        }
        if self.idle_poll_interval_ms == 0 || self.report_interval_ms == 0 {
            return Err(RiskError::InvalidConfig("timer intervals must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_ms: 10_000,
            idle_poll_interval_ms: 1_000,
            report_interval_ms: 5_000,
            log_capacity: 1_000,
            log_retain: 500,
            pattern_window: 20,
            export_log_tail: 100,
            recent_events: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.checker.max_risk, 10);
        assert_eq!(config.tracker.inactivity_threshold_ms, 10_000);
        assert_eq!(config.tracker.log_capacity, 1_000);
        assert_eq!(config.tracker.log_retain, 500);
        assert_eq!(config.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"tracker": {"inactivity_threshold_ms": 3000}, "log_level": "debug"}"#)
                .unwrap();
        assert_eq!(config.tracker.inactivity_threshold_ms, 3_000);
        assert_eq!(config.tracker.pattern_window, 20);
        assert_eq!(config.checker.max_risk, NOMINAL_MAX_RISK);
        assert_eq!(config.level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_retain_above_capacity_is_rejected() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"tracker": {"log_capacity": 10, "log_retain": 20}, "checker": {"max_risk": 20}}"#,
        )
        .unwrap();
        assert!(matches!(
            config.tracker.validate(),
            Err(RiskError::InvalidConfig(_))
        ));

        let config = config.validated();
        assert_eq!(config.tracker, TrackerConfig::default());
        // Other sections survive.
        assert_eq!(config.checker.max_risk, 20);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let tracker = TrackerConfig {
            idle_poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(tracker.validate().is_err());
        assert!(TrackerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_level_is_info() {
        let config = EngineConfig {
            log_level: "loud".into(),
            ..Default::default()
        };
        assert_eq!(config.level_filter(), log::LevelFilter::Info);
    }
}
