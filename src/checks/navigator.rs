//! Navigator-level checks: identity string, automation flag, locale,
//! hardware hints, plugins and the weak boolean flags.

use super::{CheckDetail, CheckResult};
use crate::environment::Environment;
use crate::error::Result;

/// Case-sensitive substrings left in the user agent by automation tools.
pub const AUTOMATION_MARKERS: &[&str] = &[
    "HeadlessChrome",
    "PhantomJS",
    "SlimerJS",
    "HtmlUnit",
    "bot",
    "crawler",
    "spider",
];

/// The lone locale a default headless profile reports.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Memory (GiB) and core counts at or below this are low-end.
pub const LOW_HARDWARE_THRESHOLD: f64 = 2.0;

/// Navigator anomaly count that becomes suspicious.
pub const NAVIGATOR_ANOMALY_THRESHOLD: usize = 3;

pub fn check_user_agent<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let ua = env.user_agent()?;
    let matched: Vec<String> = AUTOMATION_MARKERS
        .iter()
        .filter(|marker| ua.contains(*marker))
        .map(|marker| marker.to_string())
        .collect();
    let risk = if matched.is_empty() { 0 } else { 3 };
    Ok(CheckResult::scored(
        risk,
        CheckDetail::UserAgent { value: ua, matched },
    ))
}

pub fn check_webdriver<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let value = env.webdriver()?;
    Ok(CheckResult::scored(
        if value { 4 } else { 0 },
        CheckDetail::WebDriver { value },
    ))
}

pub fn check_languages<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let languages = env.languages()?;
    let risk = match languages.as_slice() {
        [] => 2,
        [only] if only == DEFAULT_LOCALE => 1,
        _ => 0,
    };
    Ok(CheckResult::scored(
        risk,
        CheckDetail::Languages { value: languages },
    ))
}

/// Low memory and low core count score independently.
pub fn check_hardware<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let memory = env.device_memory()?;
    let cores = env.hardware_concurrency()?;

    let low_memory = memory.map_or(false, |m| m <= LOW_HARDWARE_THRESHOLD);
    let low_cores = cores.map_or(false, |c| f64::from(c) <= LOW_HARDWARE_THRESHOLD);

    Ok(CheckResult::scored(
        u32::from(low_memory) + u32::from(low_cores),
        CheckDetail::Hardware {
            memory_gb: memory,
            cores,
        },
    ))
}

pub fn check_touch_support<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let value = env.touch()?;
    Ok(CheckResult::informational(CheckDetail::TouchSupport {
        value,
    }))
}

pub fn check_plugins<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let count = env.plugin_count()?;
    Ok(CheckResult::scored(
        if count == 0 { 1 } else { 0 },
        CheckDetail::Plugins { count },
    ))
}

pub fn check_battery<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let has_api = env.has_battery_api()?;
    Ok(CheckResult::informational(CheckDetail::Battery { has_api }))
}

/// Counts weak navigator flags; three or more together score 2.
pub fn check_navigator_anomalies<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let flags = env.navigator_flags()?;

    let checks = [
        ("cookiesDisabled", !flags.cookie_enabled),
        ("offline", !flags.on_line),
        ("doNotTrack", flags.do_not_track.as_deref() == Some("1")),
        ("noTouchPoints", flags.max_touch_points == 0),
        ("noPdfViewer", !flags.pdf_viewer_enabled),
    ];
    let flagged: Vec<String> = checks
        .iter()
        .filter(|(_, hit)| *hit)
        .map(|(name, _)| name.to_string())
        .collect();

    let risk = if flagged.len() >= NAVIGATOR_ANOMALY_THRESHOLD { 2 } else { 0 };
    Ok(CheckResult::scored(
        risk,
        CheckDetail::NavigatorAnomalies { flagged },
    ))
}
