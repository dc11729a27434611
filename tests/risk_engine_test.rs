//! Risk engine scenarios against recorded environments.
//!
//! Run with: cargo test --test risk_engine_test

use browser_risk_wasm::environment::snapshot::probe;
use browser_risk_wasm::{
    CheckId, CheckResult, CheckSlot, CheckerConfig, EnvironmentSnapshot, ManualClock,
    PermissionState, RiskLevel, RiskReport, SpoofChecker, CATALOGUE,
};
use futures::executor::block_on;

fn run(env: &EnvironmentSnapshot) -> SpoofChecker {
    SpoofChecker::run_all_checks(env, &CheckerConfig::default())
}

fn resolved_risk(report: &RiskReport, id: CheckId) -> u32 {
    match report.get(id) {
        Some(CheckSlot::Resolved(result)) => result.risk,
        other => panic!("{} not resolved: {:?}", id.key(), other),
    }
}

fn sum_of_resolved(report: &RiskReport) -> u32 {
    report
        .results()
        .iter()
        .filter_map(|(_, slot)| slot.result())
        .map(|r| r.risk)
        .sum()
}

#[test]
fn score_equals_sum_of_results() {
    let envs = [
        EnvironmentSnapshot::default(),
        EnvironmentSnapshot {
            webdriver: true,
            languages: vec!["en-US".into()],
            device_memory: Some(1.0),
            hardware_concurrency: Some(2),
            plugin_count: 0,
            ..Default::default()
        },
        EnvironmentSnapshot::default()
            .with_failure(probe::CANVAS, "SecurityError")
            .with_unavailable(probe::AUDIO)
            .with_unavailable(probe::PERMISSION_QUERY),
    ];

    for env in &envs {
        let checker = run(env);
        checker.with_report(|r| assert_eq!(r.risk_score(), sum_of_resolved(r)));

        block_on(checker.resolve_pending(env));
        checker.with_report(|r| assert_eq!(r.risk_score(), sum_of_resolved(r)));
    }
}

#[test]
fn throwing_probe_does_not_abort_pass() {
    // Every probe throws at once.
    let mut env = EnvironmentSnapshot::default();
    for name in [
        probe::USER_AGENT,
        probe::WEBDRIVER,
        probe::LANGUAGES,
        probe::DEVICE_MEMORY,
        probe::TOUCH,
        probe::EVAL,
        probe::PLUGINS,
        probe::SCREEN,
        probe::TIMEZONE,
        probe::WEBGL,
        probe::PERMISSIONS_API,
        probe::BATTERY_API,
        probe::CANVAS,
        probe::AUDIO,
        probe::NAVIGATOR_FLAGS,
        probe::PERMISSION_QUERY,
    ] {
        env = env.with_failure(name, "boom");
    }

    let checker = run(&env);
    block_on(checker.resolve_pending(&env));
    let report = checker.report();

    assert_eq!(report.results().len(), CATALOGUE.len());
    for id in CATALOGUE {
        assert_eq!(resolved_risk(&report, id), id.fallback_risk(), "{}", id.key());
    }
    // Fallbacks sum past the nominal maximum and are not clamped.
    assert_eq!(report.risk_score(), 25);
    assert_eq!(report.risk_level(), RiskLevel::High);
}

#[test]
fn single_throwing_probe_is_isolated() {
    let env = EnvironmentSnapshot::default().with_failure(probe::SCREEN, "boom");
    let report = run(&env).report();

    assert_eq!(report.results().len(), CATALOGUE.len());
    assert_eq!(resolved_risk(&report, CheckId::Screen), 1);
    assert_eq!(report.risk_score(), 1);
    assert_eq!(report.anomalies().len(), 1);
}

#[test]
fn headless_automation_scenario() {
    let env = EnvironmentSnapshot {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) HeadlessChrome/124.0.0.0".into(),
        webdriver: true,
        languages: vec![],
        ..Default::default()
    };
    let checker = run(&env);
    let report = checker.report();

    assert_eq!(resolved_risk(&report, CheckId::UserAgent), 3);
    assert_eq!(resolved_risk(&report, CheckId::WebDriver), 4);
    assert_eq!(resolved_risk(&report, CheckId::Languages), 2);
    assert!(report.risk_score() >= 9);
    assert_eq!(
        report.risk_level(),
        RiskLevel::from_score(report.risk_score(), report.max_risk())
    );
    assert_eq!(report.risk_level(), RiskLevel::High);
}

#[test]
fn typical_headless_container() {
    let env = EnvironmentSnapshot {
        languages: vec!["en-US".into()],
        plugin_count: 0,
        screen: browser_risk_wasm::environment::ScreenInfo {
            width: 800,
            height: 600,
            color_depth: 24,
            pixel_depth: 24,
        },
        timezone: browser_risk_wasm::environment::TimezoneInfo {
            name: "UTC".into(),
            offset_minutes: 0,
        },
        ..Default::default()
    };
    let checker = run(&env);

    // languages 1 + plugins 1 + screen 1 + timezone 1
    assert_eq!(checker.risk_score(), 4);
    assert_eq!(checker.risk_level(), RiskLevel::Medium);
}

#[test]
fn pending_slots_until_async_probes_settle() {
    let env = EnvironmentSnapshot {
        permission_states: vec![
            PermissionState::Denied,
            PermissionState::Denied,
            PermissionState::Error,
            PermissionState::Denied,
        ],
        ..Default::default()
    };
    let checker = run(&env);

    let before = checker.report();
    assert!(!before.is_complete());
    assert_eq!(
        before.pending_checks(),
        vec![CheckId::Audio, CheckId::PermissionStates]
    );
    assert_eq!(before.get(CheckId::PermissionStates), Some(&CheckSlot::Pending));

    block_on(checker.resolve_pending(&env));

    let after = checker.report();
    assert!(after.is_complete());
    assert!(after.pending_checks().is_empty());
    assert_eq!(resolved_risk(&after, CheckId::PermissionStates), 2);
    assert_eq!(after.risk_score(), before.risk_score() + 2);
    // The earlier copy is a snapshot and under-reports.
    assert_eq!(before.risk_score(), 0);
}

#[test]
fn missing_permissions_api_scores_both_checks() {
    let env = EnvironmentSnapshot {
        has_permissions_api: false,
        ..Default::default()
    }
    .with_unavailable(probe::PERMISSION_QUERY);

    let checker = run(&env);
    block_on(checker.resolve_pending(&env));
    let report = checker.report();

    assert_eq!(resolved_risk(&report, CheckId::Permissions), 1);
    assert_eq!(resolved_risk(&report, CheckId::PermissionStates), 1);
    assert_eq!(report.risk_score(), 2);
}

#[test]
fn tier_is_pure_function_of_score() {
    let max = 10;
    assert_eq!(RiskLevel::from_score(0, max), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(4, max), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_score(7, max), RiskLevel::High);

    let mut report = RiskReport::new(max);
    let ids = [CheckId::UserAgent, CheckId::Plugins, CheckId::Screen];
    for id in ids.iter().rev() {
        report.record(
            *id,
            CheckResult::scored(2, browser_risk_wasm::CheckDetail::Plugins { count: 0 }),
        );
    }
    assert_eq!(report.risk_score(), 6);
    assert_eq!(report.risk_level(), RiskLevel::Medium);
}

#[test]
fn export_is_read_only() {
    let env = EnvironmentSnapshot {
        webdriver: true,
        ..Default::default()
    };
    let checker = run(&env);
    let clock = ManualClock::new(1_714_521_600_000);

    let before = checker.report();
    let (name_a, first) = checker.export_report(&env, &clock).unwrap();
    let (name_b, second) = checker.export_report(&env, &clock).unwrap();

    assert_eq!(checker.report(), before);
    assert_eq!(name_a, name_b);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );

    clock.advance(5_000);
    let (_, later) = checker.export_report(&env, &clock).unwrap();
    let mut later = serde_json::to_value(&later).unwrap();
    let mut first = serde_json::to_value(&first).unwrap();
    assert_ne!(later["timestamp"], first["timestamp"]);
    later["timestamp"] = serde_json::Value::Null;
    first["timestamp"] = serde_json::Value::Null;
    assert_eq!(later, first);
}

#[test]
fn custom_max_risk() {
    let env = EnvironmentSnapshot {
        webdriver: true,
        ..Default::default()
    };
    let checker = SpoofChecker::run_all_checks(&env, &CheckerConfig { max_risk: 20 });
    assert_eq!(checker.risk_score(), 4);
    assert_eq!(checker.risk_level(), RiskLevel::Low);
    checker.with_report(|r| assert_eq!(r.percentage(), 20));
}
