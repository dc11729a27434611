//! # Browser Risk WASM
//!
//! Client-side environment risk scoring and session activity tracking,
//! compiled to WebAssembly.
//!
//! ## Architecture
//!
//! ```text
//! SpoofChecker (JS)            BehaviorTracker (JS)
//!   ↓                            ↓
//! checker::SpoofChecker        activity::ActivityTracker
//!   ↓                            ↓
//! checks::* (16 probes)        patterns / idle state machine
//!   ↓                            ↓
//! Environment (browser or snapshot)   Clock (system or manual)
//! ```
//!
//! ## Features
//!
//! - **Isolated probes**: a missing or throwing browser feature scores its
//!   fallback risk and never aborts the pass
//! - **Async merge**: the offline audio render and the permission-state
//!   query resolve after the synchronous pass and are each folded into
//!   the same report exactly once
//! - **Deterministic core**: engines run against `EnvironmentSnapshot` and
//!   `ManualClock` natively, no browser required

use wasm_bindgen::prelude::*;

pub mod activity;
pub mod bindings;
pub mod checker;
pub mod checks;
pub mod clock;
pub mod config;
pub mod environment;
pub mod error;
pub mod report;

pub use activity::{
    ActivityEvent, ActivityLevel, ActivityObserver, ActivityTracker, BehaviorExport,
    BehaviorPattern, BehaviorReport, EventCategory, EventRecord, SessionStats,
};
pub use checker::SpoofChecker;
pub use checks::{CheckDetail, CheckId, CheckResult, CATALOGUE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CheckerConfig, EngineConfig, TrackerConfig, NOMINAL_MAX_RISK};
pub use environment::{BrowserEnvironment, Environment, EnvironmentSnapshot, PermissionState};
pub use error::{ErrorCode, ErrorInfo, Result, RiskError};
pub use report::{CheckSlot, RiskAssessment, RiskLevel, RiskReport, RiskReportExport};

/// Initialize logging for the module.
///
/// Engines lower or raise the level from their `logLevel` option.
#[wasm_bindgen(start)]
pub fn init() {
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&JsValue::from_str(&format!("logger already set: {}", e)));
    }

    log::info!("Browser risk engine initialized");
}
