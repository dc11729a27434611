//! Error types for the risk engine
//!
//! Probe failures are never fatal. Every check converts them into a
//! suspicious result with its fallback risk, so these errors only travel
//! as far as the check boundary (or the binding layer for config/serde).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, RiskError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Probe errors (1xx)
    ProbeUnavailable = 100,
    ProbeException = 101,
    AsyncProbeFailure = 102,

    // Data errors (2xx)
    SerializationFailed = 200,
    InvalidConfig = 201,
}

/// Main error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    // ===== Probe Errors =====
    /// The environment feature a check depends on does not exist.
    #[error("Probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// Reading the feature threw.
    #[error("Probe exception: {0}")]
    ProbeException(String),

    /// The batch permission query rejected.
    #[error("Async probe failed: {0}")]
    AsyncProbeFailure(String),

    // ===== Data Errors =====
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl RiskError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            RiskError::ProbeUnavailable(_) => ErrorCode::ProbeUnavailable,
            RiskError::ProbeException(_) => ErrorCode::ProbeException,
            RiskError::AsyncProbeFailure(_) => ErrorCode::AsyncProbeFailure,
            RiskError::Serialization(_) => ErrorCode::SerializationFailed,
            RiskError::InvalidConfig(_) => ErrorCode::InvalidConfig,
        }
    }

    /// Whether this error came out of an environment probe.
    ///
    /// Probe failures are evidence of an anomalous environment and are
    /// scored, never surfaced to the user.
    pub fn is_probe_failure(&self) -> bool {
        matches!(
            self,
            RiskError::ProbeUnavailable(_)
                | RiskError::ProbeException(_)
                | RiskError::AsyncProbeFailure(_)
        )
    }

    /// Convert a thrown JS value into a probe exception.
    pub fn from_js(context: &str, err: JsValue) -> Self {
        let detail = err
            .as_string()
            .or_else(|| {
                js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", err));
        RiskError::ProbeException(format!("{}: {}", context, detail))
    }

    /// Shorthand for a missing feature.
    pub fn unavailable(feature: &str) -> Self {
        RiskError::ProbeUnavailable(feature.to_string())
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::Serialization(err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for RiskError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        RiskError::Serialization(err.to_string())
    }
}

impl From<RiskError> for JsValue {
    fn from(err: RiskError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Error information for JavaScript consumption
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u32,
    pub message: String,
    pub is_probe_failure: bool,
}

impl From<&RiskError> for ErrorInfo {
    fn from(err: &RiskError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            message: err.to_string(),
            is_probe_failure: err.is_probe_failure(),
        }
    }
}
