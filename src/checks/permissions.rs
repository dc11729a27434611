//! Permissions API checks.
//!
//! `permissions` is the synchronous presence check. `permissionStates`
//! queries a fixed batch of permissions and resolves after the
//! synchronous pass has returned.

use super::{CheckDetail, CheckId, CheckResult};
use crate::environment::{Environment, PermissionState};
use crate::error::{Result, RiskError};

/// Permissions queried by the async check.
pub const QUERIED_PERMISSIONS: &[&str] = &["notifications", "geolocation", "camera", "microphone"];

pub fn check_permissions_api<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let has_api = env.has_permissions_api()?;
    Ok(CheckResult::scored(
        if has_api { 0 } else { 1 },
        CheckDetail::Permissions { has_api },
    ))
}

/// Score the settled batch query.
///
/// Every permission denied or erroring scores 2. A missing API scores 1.
/// A rejected batch counts as every permission erroring.
pub fn evaluate_states(outcome: Result<Vec<PermissionState>>) -> CheckResult {
    match outcome {
        Ok(states) => {
            let all_blocked = !states.is_empty() && states.iter().all(|s| s.is_blocked());
            let states = QUERIED_PERMISSIONS
                .iter()
                .map(|name| name.to_string())
                .zip(states)
                .collect();
            CheckResult::scored(
                if all_blocked { 2 } else { 0 },
                CheckDetail::PermissionStates { states },
            )
        }
        Err(err @ RiskError::ProbeUnavailable(_)) => {
            log::warn!("⚠️ Permission query unavailable: {}", err);
            CheckResult::scored(
                1,
                CheckDetail::ProbeFailed {
                    reason: err.to_string(),
                },
            )
        }
        Err(err) => {
            log::warn!("⚠️ Permission query failed: {}", err);
            CheckResult::fallback(CheckId::PermissionStates, &err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentSnapshot;
    use crate::environment::PermissionState::*;

    #[test]
    fn test_permissions_api_presence() {
        let env = EnvironmentSnapshot {
            has_permissions_api: false,
            ..Default::default()
        };
        assert_eq!(check_permissions_api(&env).unwrap().risk, 1);
        assert_eq!(
            check_permissions_api(&EnvironmentSnapshot::default()).unwrap().risk,
            0
        );
    }

    #[test]
    fn test_all_blocked_scores_two() {
        let result = evaluate_states(Ok(vec![Denied, Error, Denied, Denied]));
        assert_eq!(result.risk, 2);
        match result.detail {
            CheckDetail::PermissionStates { states } => {
                assert_eq!(states[0], ("notifications".to_string(), Denied));
                assert_eq!(states[1], ("geolocation".to_string(), Error));
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_one_prompt_is_clean() {
        let result = evaluate_states(Ok(vec![Denied, Denied, Prompt, Denied]));
        assert_eq!(result.risk, 0);
        assert!(!result.suspicious);
    }

    #[test]
    fn test_unavailable_scores_one() {
        let result = evaluate_states(Err(RiskError::unavailable("navigator.permissions")));
        assert_eq!(result.risk, 1);
        assert!(result.suspicious);
    }

    #[test]
    fn test_rejected_batch_scores_two() {
        let result = evaluate_states(Err(RiskError::AsyncProbeFailure("rejected".into())));
        assert_eq!(result.risk, 2);
        assert!(result.suspicious);
    }
}
