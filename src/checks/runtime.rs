//! Script-runtime checks.

use super::{CheckDetail, CheckResult};
use crate::environment::Environment;
use crate::error::Result;

/// Present in the string form of every built-in function.
pub const NATIVE_CODE_MARKER: &str = "[native code]";

/// Zones a default container or VM reports.
pub const SUSPICIOUS_TIMEZONES: &[&str] = &["UTC", "GMT"];

/// A patched `eval` no longer prints as native code.
///
/// A throwing `toString` is handled by the caller's fallback, which
/// carries the same risk.
pub fn check_eval_function<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let source = env.eval_source()?;
    let blocked = !source.contains(NATIVE_CODE_MARKER);
    Ok(CheckResult::scored(
        if blocked { 2 } else { 0 },
        CheckDetail::EvalFunction { blocked, source },
    ))
}

pub fn check_timezone<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let tz = env.timezone()?;
    let suspicious = SUSPICIOUS_TIMEZONES.contains(&tz.name.as_str());
    Ok(CheckResult::scored(
        if suspicious { 1 } else { 0 },
        CheckDetail::Timezone {
            timezone: tz.name,
            offset_minutes: tz.offset_minutes,
        },
    ))
}
