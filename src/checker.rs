//! Check registry.
//!
//! Runs the catalogue once against an [`Environment`], synchronously for
//! every check except the audio render and the permission-state batch.
//! Those get pending slots and are merged in by
//! [`SpoofChecker::resolve_pending`] once their probes settle. The report
//! handle is shared, so readers holding a [`SpoofChecker`] see the late
//! merges.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::checks::{self, permissions, rendering, CheckId, CheckResult, CATALOGUE};
use crate::clock::{artifact_name, iso_timestamp, Clock};
use crate::config::CheckerConfig;
use crate::environment::Environment;
use crate::error::Result;
use crate::report::{RiskLevel, RiskReport, RiskReportExport};

/// Artifact prefix for exported reports.
pub const REPORT_ARTIFACT_PREFIX: &str = "spoof-analysis";

/// Registry of spoofing checks plus the report they produce.
#[derive(Debug, Clone)]
pub struct SpoofChecker {
    report: Rc<RefCell<RiskReport>>,
}

impl SpoofChecker {
    /// Run the synchronous pass. The returned checker has the async slots
    /// pending; drive [`Self::resolve_pending`] to fill them.
    pub fn run_all_checks<E: Environment + ?Sized>(env: &E, config: &CheckerConfig) -> Self {
        log::info!("🔍 Running {} environment checks", CATALOGUE.len());

        let mut report = RiskReport::new(config.max_risk);
        for id in CATALOGUE {
            match checks::evaluate(id, env) {
                Some(result) => report.record(id, result),
                None => report.mark_pending(id),
            }
        }

        log::info!(
            "📊 Synchronous pass done: score {}/{} ({})",
            report.risk_score(),
            report.max_risk(),
            report.risk_level()
        );

        Self {
            report: Rc::new(RefCell::new(report)),
        }
    }

    /// Settle every async slot. Both probes start before either is awaited.
    pub fn resolve_pending<E: Environment + ?Sized>(&self, env: &E) -> LocalBoxFuture<'static, ()> {
        future::join(self.resolve_audio(env), self.resolve_permissions(env))
            .map(|_| ())
            .boxed_local()
    }

    /// Render the audio pipeline and merge its score into the report.
    pub fn resolve_audio<E: Environment + ?Sized>(&self, env: &E) -> LocalBoxFuture<'static, ()> {
        let render = env.audio_frequency_data();
        self.merge(CheckId::Audio, async move { rendering::evaluate_audio(render.await) })
    }

    /// Query permission states and merge the outcome into the report.
    pub fn resolve_permissions<E: Environment + ?Sized>(
        &self,
        env: &E,
    ) -> LocalBoxFuture<'static, ()> {
        let query = env.query_permissions(permissions::QUERIED_PERMISSIONS);
        self.merge(CheckId::PermissionStates, async move {
            permissions::evaluate_states(query.await)
        })
    }

    /// The returned future owns everything it touches, so it can be handed
    /// to `spawn_local`. Only the first resolution of a slot counts.
    fn merge(
        &self,
        id: CheckId,
        result: impl std::future::Future<Output = CheckResult> + 'static,
    ) -> LocalBoxFuture<'static, ()> {
        let report = Rc::clone(&self.report);

        async move {
            let result = result.await;
            let mut report = report.borrow_mut();
            if report.resolve(id, result) {
                log::info!(
                    "📊 {} merged: score {}/{} ({})",
                    id.label(),
                    report.risk_score(),
                    report.max_risk(),
                    report.risk_level()
                );
            }
        }
        .boxed_local()
    }

    /// A copy of the current report.
    pub fn report(&self) -> RiskReport {
        self.report.borrow().clone()
    }

    pub fn risk_score(&self) -> u32 {
        self.report.borrow().risk_score()
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.report.borrow().risk_level()
    }

    pub fn is_complete(&self) -> bool {
        self.report.borrow().is_complete()
    }

    /// Run `f` against the live report without cloning it.
    pub fn with_report<T>(&self, f: impl FnOnce(&RiskReport) -> T) -> T {
        f(&self.report.borrow())
    }

    /// Build the downloadable report and its artifact name.
    ///
    /// Identity fields that cannot be read are exported empty.
    pub fn export_report<E: Environment + ?Sized, C: Clock + ?Sized>(
        &self,
        env: &E,
        clock: &C,
    ) -> Result<(String, RiskReportExport)> {
        let now = clock.now_ms();
        let report = self.report.borrow();
        let mut serialized = serde_json::to_value(&*report)?;

        let export = RiskReportExport {
            timestamp: iso_timestamp(now),
            risk_score: report.risk_score(),
            max_risk: report.max_risk(),
            risk_level: report.assessment(),
            complete: report.is_complete(),
            results: serialized["results"].take(),
            user_agent: env.user_agent().unwrap_or_default(),
            url: env.location_href().unwrap_or_default(),
        };

        Ok((artifact_name(REPORT_ARTIFACT_PREFIX, now), export))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::environment::snapshot::probe;
    use crate::environment::{EnvironmentSnapshot, PermissionState};
    use crate::report::CheckSlot;
    use futures::executor::block_on;

    #[test]
    fn test_clean_environment_scores_zero() {
        let env = EnvironmentSnapshot::default();
        let checker = SpoofChecker::run_all_checks(&env, &CheckerConfig::default());
        assert_eq!(checker.risk_score(), 0);
        assert_eq!(checker.risk_level(), RiskLevel::Low);
        assert!(!checker.is_complete());

        block_on(checker.resolve_permissions(&env));
        assert!(!checker.is_complete());
        block_on(checker.resolve_audio(&env));
        assert!(checker.is_complete());
        assert_eq!(checker.risk_score(), 0);
    }

    #[test]
    fn test_results_follow_catalogue_order() {
        let env = EnvironmentSnapshot::default();
        let checker = SpoofChecker::run_all_checks(&env, &CheckerConfig::default());
        let ids: Vec<CheckId> = checker
            .with_report(|r| r.results().iter().map(|(id, _)| *id).collect());
        assert_eq!(ids, CATALOGUE.to_vec());
    }

    #[test]
    fn test_async_merge_updates_tier() {
        let env = EnvironmentSnapshot {
            webdriver: true,
            plugin_count: 0,
            permission_states: vec![PermissionState::Denied; 4],
            ..Default::default()
        };
        let checker = SpoofChecker::run_all_checks(&env, &CheckerConfig::default());
        assert_eq!(checker.risk_score(), 5);
        assert_eq!(checker.risk_level(), RiskLevel::Medium);

        block_on(checker.resolve_permissions(&env));
        assert_eq!(checker.risk_score(), 7);
        assert_eq!(checker.risk_level(), RiskLevel::High);

        // Resolving again does not double count.
        block_on(checker.resolve_permissions(&env));
        assert_eq!(checker.risk_score(), 7);
    }

    #[test]
    fn test_clones_share_report() {
        let env = EnvironmentSnapshot::default().with_failure(probe::PERMISSION_QUERY, "rejected");
        let checker = SpoofChecker::run_all_checks(&env, &CheckerConfig::default());
        let reader = checker.clone();

        block_on(checker.resolve_pending(&env));
        assert!(reader.is_complete());
        assert_eq!(reader.risk_score(), 2);
        assert!(matches!(
            reader.report().get(CheckId::PermissionStates),
            Some(CheckSlot::Resolved(r)) if r.suspicious
        ));
    }

    #[test]
    fn test_silent_audio_merges_late() {
        let env = EnvironmentSnapshot {
            audio_frequency_data: vec![0; 1024],
            ..Default::default()
        };
        let checker = SpoofChecker::run_all_checks(&env, &CheckerConfig::default());
        assert_eq!(checker.risk_score(), 0);
        assert_eq!(
            checker.report().get(CheckId::Audio),
            Some(&CheckSlot::Pending)
        );

        block_on(checker.resolve_pending(&env));
        assert!(checker.is_complete());
        assert_eq!(checker.risk_score(), 2);

        block_on(checker.resolve_audio(&env));
        assert_eq!(checker.risk_score(), 2);
    }

    #[test]
    fn test_export_report() {
        let env = EnvironmentSnapshot {
            languages: vec![],
            ..Default::default()
        };
        let checker = SpoofChecker::run_all_checks(&env, &CheckerConfig::default());
        let clock = ManualClock::new(1_714_521_600_000);

        let (name, export) = checker.export_report(&env, &clock).unwrap();
        assert_eq!(name, "spoof-analysis-2024-05-01.json");
        assert_eq!(export.timestamp, "2024-05-01T00:00:00.000Z");
        assert_eq!(export.risk_score, 2);
        assert_eq!(export.max_risk, 10);
        assert!(!export.complete);
        assert_eq!(export.url, "https://example.com/");
        assert_eq!(export.results["languages"]["risk"], 2);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["riskLevel"]["percentage"], 20);
        assert!(json["userAgent"].as_str().unwrap().contains("Chrome"));
    }

    #[test]
    fn test_export_with_unreadable_identity() {
        let env = EnvironmentSnapshot::default()
            .with_failure(probe::LOCATION, "denied")
            .with_unavailable(probe::USER_AGENT);
        let checker = SpoofChecker::run_all_checks(&env, &CheckerConfig::default());
        let (_, export) = checker.export_report(&env, &ManualClock::new(0)).unwrap();
        assert_eq!(export.url, "");
        assert_eq!(export.user_agent, "");
        // User agent fallback.
        assert_eq!(export.risk_score, 3);
    }
}
