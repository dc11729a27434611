//! Check catalogue.
//!
//! Each check is one probe plus a fixed rule turning the reading into a
//! [`CheckResult`]. Checks are independent: none reads another's result.
//! A probe error never escapes a check; it becomes a suspicious result
//! carrying the check's fallback risk.
//!
//! ## Catalogue (in evaluation order)
//!
//! | Check | Max risk |
//! |-------|----------|
//! | userAgent | 3 |
//! | webDriver | 4 |
//! | languages | 2 |
//! | hardware | 2 |
//! | touchSupport | 0 (informational) |
//! | evalFunction | 2 |
//! | plugins | 1 |
//! | screen | 1 |
//! | timezone | 1 |
//! | webgl | 2 |
//! | permissions | 1 |
//! | battery | 0 (informational) |
//! | canvas | 3 |
//! | audio | 2 (async) |
//! | permissionStates | 2 (async) |
//! | navigatorAnomalies | 2 |

use serde::{Deserialize, Serialize};

use crate::environment::{Environment, PermissionState, TouchInfo};
use crate::error::{Result, RiskError};

pub mod navigator;
pub mod permissions;
pub mod rendering;
pub mod runtime;

/// Identity of one catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckId {
    UserAgent,
    WebDriver,
    Languages,
    Hardware,
    TouchSupport,
    EvalFunction,
    Plugins,
    Screen,
    Timezone,
    Webgl,
    Permissions,
    Battery,
    Canvas,
    Audio,
    PermissionStates,
    NavigatorAnomalies,
}

/// Every check, in the order the registry runs them.
pub const CATALOGUE: [CheckId; 16] = [
    CheckId::UserAgent,
    CheckId::WebDriver,
    CheckId::Languages,
    CheckId::Hardware,
    CheckId::TouchSupport,
    CheckId::EvalFunction,
    CheckId::Plugins,
    CheckId::Screen,
    CheckId::Timezone,
    CheckId::Webgl,
    CheckId::Permissions,
    CheckId::Battery,
    CheckId::Canvas,
    CheckId::Audio,
    CheckId::PermissionStates,
    CheckId::NavigatorAnomalies,
];

impl CheckId {
    /// Stable key used in reports.
    pub fn key(self) -> &'static str {
        match self {
            CheckId::UserAgent => "userAgent",
            CheckId::WebDriver => "webDriver",
            CheckId::Languages => "languages",
            CheckId::Hardware => "hardware",
            CheckId::TouchSupport => "touchSupport",
            CheckId::EvalFunction => "evalFunction",
            CheckId::Plugins => "plugins",
            CheckId::Screen => "screen",
            CheckId::Timezone => "timezone",
            CheckId::Webgl => "webgl",
            CheckId::Permissions => "permissions",
            CheckId::Battery => "battery",
            CheckId::Canvas => "canvas",
            CheckId::Audio => "audio",
            CheckId::PermissionStates => "permissionStates",
            CheckId::NavigatorAnomalies => "navigatorAnomalies",
        }
    }

    /// Human-readable name for tables and summaries.
    pub fn label(self) -> &'static str {
        match self {
            CheckId::UserAgent => "User Agent",
            CheckId::WebDriver => "WebDriver Detection",
            CheckId::Languages => "Browser Languages",
            CheckId::Hardware => "Hardware Info",
            CheckId::TouchSupport => "Touch Support",
            CheckId::EvalFunction => "Eval Function",
            CheckId::Plugins => "Browser Plugins",
            CheckId::Screen => "Screen Properties",
            CheckId::Timezone => "Timezone",
            CheckId::Webgl => "WebGL Support",
            CheckId::Permissions => "Permissions API",
            CheckId::Battery => "Battery API",
            CheckId::Canvas => "Canvas Fingerprint",
            CheckId::Audio => "Audio Fingerprint",
            CheckId::PermissionStates => "Permission States",
            CheckId::NavigatorAnomalies => "Navigator Anomalies",
        }
    }

    /// Risk assigned when the probe is missing or throws.
    pub fn fallback_risk(self) -> u32 {
        match self {
            CheckId::UserAgent => 3,
            CheckId::WebDriver => 4,
            CheckId::Languages => 2,
            CheckId::Hardware => 2,
            CheckId::TouchSupport => 0,
            CheckId::EvalFunction => 2,
            CheckId::Plugins => 1,
            CheckId::Screen => 1,
            CheckId::Timezone => 1,
            CheckId::Webgl => 1,
            CheckId::Permissions => 1,
            CheckId::Battery => 0,
            CheckId::Canvas => 2,
            CheckId::Audio => 1,
            CheckId::PermissionStates => 2,
            CheckId::NavigatorAnomalies => 2,
        }
    }

    /// Informational checks always score zero.
    pub fn is_informational(self) -> bool {
        matches!(self, CheckId::TouchSupport | CheckId::Battery)
    }

    /// Checks whose result arrives after the synchronous pass.
    pub fn is_async(self) -> bool {
        matches!(self, CheckId::Audio | CheckId::PermissionStates)
    }
}

/// Check-specific reading attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CheckDetail {
    UserAgent {
        value: String,
        /// Automation substrings found in the string.
        matched: Vec<String>,
    },
    WebDriver {
        value: bool,
    },
    Languages {
        value: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Hardware {
        memory_gb: Option<f64>,
        cores: Option<u32>,
    },
    TouchSupport {
        value: TouchInfo,
    },
    EvalFunction {
        blocked: bool,
        source: String,
    },
    Plugins {
        count: u32,
    },
    #[serde(rename_all = "camelCase")]
    Screen {
        resolution: String,
        color_depth: u32,
        pixel_depth: u32,
    },
    #[serde(rename_all = "camelCase")]
    Timezone {
        timezone: String,
        offset_minutes: i32,
    },
    Webgl {
        supported: bool,
        renderer: String,
    },
    #[serde(rename_all = "camelCase")]
    Permissions {
        has_api: bool,
    },
    #[serde(rename_all = "camelCase")]
    Battery {
        has_api: bool,
    },
    #[serde(rename_all = "camelCase")]
    Canvas {
        hash: String,
        data_url_length: usize,
        known_bad: bool,
        too_short: bool,
    },
    #[serde(rename_all = "camelCase")]
    Audio {
        hash: String,
        bin_count: usize,
        sum: u64,
        degenerate: bool,
    },
    PermissionStates {
        states: Vec<(String, PermissionState)>,
    },
    NavigatorAnomalies {
        /// Names of the flags that looked off.
        flagged: Vec<String>,
    },
    ProbeFailed {
        reason: String,
    },
}

/// One check's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub suspicious: bool,
    pub risk: u32,
    pub detail: CheckDetail,
}

impl CheckResult {
    /// A scored result; suspicious exactly when risk is non-zero.
    pub fn scored(risk: u32, detail: CheckDetail) -> Self {
        Self {
            suspicious: risk > 0,
            risk,
            detail,
        }
    }

    /// A zero-risk result that is never suspicious.
    pub fn informational(detail: CheckDetail) -> Self {
        Self {
            suspicious: false,
            risk: 0,
            detail,
        }
    }

    /// The result recorded when a check's probe failed.
    pub fn fallback(id: CheckId, err: &RiskError) -> Self {
        let detail = CheckDetail::ProbeFailed {
            reason: err.to_string(),
        };
        if id.is_informational() {
            Self::informational(detail)
        } else {
            Self::scored(id.fallback_risk(), detail)
        }
    }
}

/// Run one synchronous check, converting probe errors into its fallback.
///
/// Returns `None` for async checks; those are scored by
/// [`rendering::evaluate_audio`] and [`permissions::evaluate_states`]
/// once their probe settles.
pub fn evaluate<E: Environment + ?Sized>(id: CheckId, env: &E) -> Option<CheckResult> {
    let result = match run(id, env)? {
        Ok(result) => {
            log::debug!("  {} -> risk {}", id.key(), result.risk);
            result
        }
        Err(err) => {
            log::warn!("⚠️ Check {} failed: {}", id.key(), err);
            CheckResult::fallback(id, &err)
        }
    };
    Some(result)
}

fn run<E: Environment + ?Sized>(id: CheckId, env: &E) -> Option<Result<CheckResult>> {
    let result = match id {
        CheckId::UserAgent => navigator::check_user_agent(env),
        CheckId::WebDriver => navigator::check_webdriver(env),
        CheckId::Languages => navigator::check_languages(env),
        CheckId::Hardware => navigator::check_hardware(env),
        CheckId::TouchSupport => navigator::check_touch_support(env),
        CheckId::EvalFunction => runtime::check_eval_function(env),
        CheckId::Plugins => navigator::check_plugins(env),
        CheckId::Screen => rendering::check_screen(env),
        CheckId::Timezone => runtime::check_timezone(env),
        CheckId::Webgl => rendering::check_webgl(env),
        CheckId::Permissions => permissions::check_permissions_api(env),
        CheckId::Battery => navigator::check_battery(env),
        CheckId::Canvas => rendering::check_canvas(env),
        CheckId::NavigatorAnomalies => navigator::check_navigator_anomalies(env),
        CheckId::Audio | CheckId::PermissionStates => return None,
    };
    Some(result)
}
