//! JavaScript-facing classes.
//!
//! Each class owns one engine instance; the host constructs them and
//! passes them around explicitly. Engine state lives behind
//! `Rc<RefCell<_>>` so timer and promise callbacks can reach it. JS
//! callbacks are invoked with no borrow held, neither on the engine nor on
//! the callback slot, so a callback may call back into the class or
//! replace itself.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Interval;
use js_sys::Function;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::console;

use crate::activity::{ActivityEvent, ActivityTracker};
use crate::checker::SpoofChecker;
use crate::clock::SystemClock;
use crate::config::EngineConfig;
use crate::environment::{BrowserEnvironment, Environment, EnvironmentSnapshot};
use crate::error::{ErrorInfo, RiskError};
use crate::report::CheckSlot;

/// Serialize to plain JS objects (maps become objects, not `Map`s).
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| RiskError::from(e).into())
}

/// Structured `{ code, message, is_probe_failure }` error for JS callers.
fn js_error(err: RiskError) -> JsValue {
    to_js(&ErrorInfo::from(&err)).unwrap_or_else(|_| err.into())
}

/// `{ fileName, data }` pair handed to the host's download helper.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Artifact<'a, T> {
    file_name: &'a str,
    data: &'a T,
}

fn apply_log_level(config: &EngineConfig) {
    log::set_max_level(config.level_filter());
}

type Callback = Rc<RefCell<Option<Function>>>;

/// Invoke the registered callback, if any. The slot is released before
/// the call so the callback can re-register.
fn call_js(slot: &Callback, arg: &JsValue) {
    let callback = slot.borrow().clone();
    if let Some(callback) = callback {
        if let Err(e) = callback.call1(&JsValue::NULL, arg) {
            log::warn!("⚠️ JS callback threw: {:?}", e);
        }
    }
}

/// One row of the console summary table.
#[derive(Serialize)]
struct SummaryRow<'a> {
    check: &'a str,
    status: &'a str,
    suspicious: bool,
    risk: u32,
}

/// Browser spoofing detector.
#[wasm_bindgen(js_name = SpoofChecker)]
pub struct WasmSpoofChecker {
    checker: SpoofChecker,
    env: Rc<dyn Environment>,
}

#[wasm_bindgen(js_class = SpoofChecker)]
impl WasmSpoofChecker {
    /// Run every check against the live page.
    ///
    /// The audio and permission-state checks finish in the background;
    /// poll `isComplete()` or re-read the score later.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> WasmSpoofChecker {
        let config = EngineConfig::from_js(options);
        apply_log_level(&config);
        Self::run(Rc::new(BrowserEnvironment::new()), &config)
    }

    /// Run every check against recorded signals instead of the live page.
    #[wasm_bindgen(js_name = fromSnapshot)]
    pub fn from_snapshot(snapshot: JsValue, options: JsValue) -> Result<WasmSpoofChecker, JsValue> {
        let config = EngineConfig::from_js(options);
        apply_log_level(&config);
        let env = EnvironmentSnapshot::from_js(snapshot).map_err(js_error)?;
        Ok(Self::run(Rc::new(env), &config))
    }

    /// Print the results table and the current score to the console.
    #[wasm_bindgen(js_name = logSummary)]
    pub fn log_summary(&self) {
        let rows: Vec<SummaryRow> = self.checker.with_report(|report| {
            report
                .results()
                .iter()
                .map(|(id, slot)| match slot {
                    CheckSlot::Resolved(result) => SummaryRow {
                        check: id.label(),
                        status: "resolved",
                        suspicious: result.suspicious,
                        risk: result.risk,
                    },
                    CheckSlot::Pending => SummaryRow {
                        check: id.label(),
                        status: "pending",
                        suspicious: false,
                        risk: 0,
                    },
                })
                .collect()
        });
        match to_js(&rows) {
            Ok(table) => console::table_1(&table),
            Err(e) => log::warn!("⚠️ Could not render summary table: {:?}", e),
        }

        self.checker.with_report(|report| {
            for (id, result) in report.anomalies() {
                log::warn!("🚩 {}: risk {}", id.label(), result.risk);
            }
            log::info!(
                "🎯 Risk score: {}/{} ({})",
                report.risk_score(),
                report.max_risk(),
                report.risk_level()
            );
        });
    }

    #[wasm_bindgen(js_name = riskScore)]
    pub fn risk_score(&self) -> u32 {
        self.checker.risk_score()
    }

    #[wasm_bindgen(js_name = maxRisk)]
    pub fn max_risk(&self) -> u32 {
        self.checker.with_report(|r| r.max_risk())
    }

    /// `{ level, percentage }`, recomputed from the current score.
    #[wasm_bindgen(js_name = riskLevel)]
    pub fn risk_level(&self) -> Result<JsValue, JsValue> {
        let assessment = self.checker.with_report(|r| r.assessment());
        to_js(&assessment)
    }

    #[wasm_bindgen(js_name = isComplete)]
    pub fn is_complete(&self) -> bool {
        self.checker.is_complete()
    }

    /// Keys of checks still waiting on an async probe.
    #[wasm_bindgen(js_name = pendingChecks)]
    pub fn pending_checks(&self) -> Result<JsValue, JsValue> {
        let pending = self.checker.with_report(|r| r.pending_checks());
        to_js(&pending)
    }

    /// `{ results, riskScore, maxRisk, riskLevel, complete }`
    pub fn report(&self) -> Result<JsValue, JsValue> {
        self.checker.with_report(|r| to_js(r))
    }

    /// Suspicious checks as `[{ check, risk }]`.
    pub fn anomalies(&self) -> Result<JsValue, JsValue> {
        #[derive(Serialize)]
        struct Anomaly {
            check: &'static str,
            risk: u32,
        }
        let anomalies: Vec<Anomaly> = self.checker.with_report(|r| {
            r.anomalies()
                .into_iter()
                .map(|(id, result)| Anomaly {
                    check: id.key(),
                    risk: result.risk,
                })
                .collect()
        });
        to_js(&anomalies)
    }

    /// `{ fileName, data }` for the downloadable report.
    #[wasm_bindgen(js_name = exportReport)]
    pub fn export_report(&self) -> Result<JsValue, JsValue> {
        let (file_name, data) = self
            .checker
            .export_report(&*self.env, &SystemClock)
            .map_err(js_error)?;
        log::info!("📄 Spoof analysis report exported as {}", file_name);
        to_js(&Artifact {
            file_name: &file_name,
            data: &data,
        })
    }
}

impl WasmSpoofChecker {
    fn run(env: Rc<dyn Environment>, config: &EngineConfig) -> WasmSpoofChecker {
        let checker = SpoofChecker::run_all_checks(&*env, &config.checker);
        spawn_local(checker.resolve_pending(&*env));

        let this = WasmSpoofChecker { checker, env };
        this.log_summary();
        this
    }
}

/// Session activity tracker.
#[wasm_bindgen(js_name = BehaviorTracker)]
pub struct WasmBehaviorTracker {
    tracker: Rc<RefCell<ActivityTracker>>,
    env: BrowserEnvironment,
    on_activity_change: Callback,
    on_report: Callback,
    /// Dropping an `Interval` cancels it.
    timers: Vec<Interval>,
}

#[wasm_bindgen(js_class = BehaviorTracker)]
impl WasmBehaviorTracker {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> WasmBehaviorTracker {
        let config = EngineConfig::from_js(options);
        apply_log_level(&config);

        WasmBehaviorTracker {
            tracker: Rc::new(RefCell::new(ActivityTracker::new(config.tracker))),
            env: BrowserEnvironment::new(),
            on_activity_change: Rc::new(RefCell::new(None)),
            on_report: Rc::new(RefCell::new(None)),
            timers: Vec::new(),
        }
    }

    /// Feed one interaction, e.g. `{ type: "mouse", x: 10, y: 20 }`.
    ///
    /// Returns `true` if the event reactivated an inactive session.
    #[wasm_bindgen(js_name = recordEvent)]
    pub fn record_event(&self, event: JsValue) -> Result<bool, JsValue> {
        let event: ActivityEvent = serde_wasm_bindgen::from_value(event)
            .map_err(|e| js_error(RiskError::from(e)))?;
        let reactivated = self.tracker.borrow_mut().observe(event);
        if reactivated {
            call_js(&self.on_activity_change, &JsValue::TRUE);
        }
        Ok(reactivated)
    }

    /// Start the idle poll and the periodic report. No-op if running.
    pub fn start(&mut self) {
        if !self.timers.is_empty() {
            return;
        }
        let (poll_ms, report_ms) = {
            let tracker = self.tracker.borrow();
            let config = tracker.config();
            (config.idle_poll_interval_ms, config.report_interval_ms)
        };

        let tracker = Rc::clone(&self.tracker);
        let on_change = Rc::clone(&self.on_activity_change);
        self.timers.push(Interval::new(poll_ms, move || {
            let went_idle = tracker.borrow_mut().poll_idle();
            if went_idle {
                call_js(&on_change, &JsValue::FALSE);
            }
        }));

        let tracker = Rc::clone(&self.tracker);
        let on_report = Rc::clone(&self.on_report);
        self.timers.push(Interval::new(report_ms, move || {
            let text = tracker.borrow().generate_report().to_string();
            log::debug!("{}", text);
            call_js(&on_report, &JsValue::from_str(&text));
        }));

        log::info!("⏱️ Behavior timers started ({}ms idle poll, {}ms report)", poll_ms, report_ms);
    }

    /// Cancel both timers.
    pub fn stop(&mut self) {
        self.timers.clear();
    }

    /// Run one idle check now. Returns `true` if the session went idle.
    #[wasm_bindgen(js_name = pollIdle)]
    pub fn poll_idle(&self) -> bool {
        let went_idle = self.tracker.borrow_mut().poll_idle();
        if went_idle {
            call_js(&self.on_activity_change, &JsValue::FALSE);
        }
        went_idle
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.tracker.borrow().is_active()
    }

    /// `(active: boolean) => void`
    #[wasm_bindgen(js_name = onActivityChange)]
    pub fn on_activity_change(&self, callback: Option<Function>) {
        *self.on_activity_change.borrow_mut() = callback;
    }

    /// `(report: string) => void`, called on the report cadence.
    #[wasm_bindgen(js_name = onReport)]
    pub fn on_report(&self, callback: Option<Function>) {
        *self.on_report.borrow_mut() = callback;
    }

    #[wasm_bindgen(js_name = sessionStats)]
    pub fn session_stats(&self) -> Result<JsValue, JsValue> {
        let stats = self.tracker.borrow().session_stats();
        to_js(&stats)
    }

    pub fn patterns(&self) -> Result<JsValue, JsValue> {
        let patterns = self.tracker.borrow().patterns();
        to_js(&patterns)
    }

    /// The periodic report, rendered as text.
    #[wasm_bindgen(js_name = generateReport)]
    pub fn generate_report(&self) -> String {
        self.tracker.borrow().generate_report().to_string()
    }

    /// `{ fileName, data }` for the downloadable behavior export.
    #[wasm_bindgen(js_name = exportBehaviorData)]
    pub fn export_behavior_data(&self) -> Result<JsValue, JsValue> {
        let url = self.env.location_href().ok();
        let (file_name, data) = self.tracker.borrow().export_behavior_data(url);
        log::info!("📊 Behavior analysis exported as {}", file_name);
        to_js(&Artifact {
            file_name: &file_name,
            data: &data,
        })
    }
}
