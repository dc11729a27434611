//! Session activity state machine.
//!
//! The tracker is active until the idle poll finds more than
//! `inactivity_threshold_ms` since the last activity. That transition fires
//! once per idle period; only a later interaction flips it back.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::Serialize;

use super::event::{ActivityEvent, EventCategory, EventRecord};
use super::patterns::{self, ActivityLevel, BehaviorPattern};
use crate::clock::{artifact_name, iso_timestamp, Clock, SystemClock};
use crate::config::TrackerConfig;

/// Artifact prefix for exported behavior data.
pub const BEHAVIOR_ARTIFACT_PREFIX: &str = "behavior-analysis";

/// Receives tracker notifications (the dashboard, in the browser).
pub trait ActivityObserver {
    /// Active flag flipped.
    fn on_activity_change(&mut self, _active: bool) {}

    /// An event was logged.
    fn on_counters_updated(&mut self, _stats: &SessionStats) {}
}

/// Live dashboard projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub duration_ms: u64,
    pub events: BTreeMap<EventCategory, u64>,
    pub is_active: bool,
    /// Epoch milliseconds.
    pub last_activity: u64,
    pub total_events: u64,
}

/// One line of the periodic report's recent-events list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEvent {
    pub category: EventCategory,
    pub age_ms: u64,
}

/// Periodic behavior report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorReport {
    pub generated_at: String,
    pub session_duration_ms: u64,
    pub since_last_activity_ms: u64,
    pub is_active: bool,
    pub total_events: u64,
    pub events_per_minute: f64,
    pub activity_level: ActivityLevel,
    pub patterns: Vec<BehaviorPattern>,
    /// Oldest first.
    pub recent_events: Vec<RecentEvent>,
}

impl fmt::Display for BehaviorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "👁️‍🗨️ BEHAVIOR ANALYSIS REPORT")?;
        writeln!(f, "{}", "═".repeat(40))?;
        writeln!(f)?;

        writeln!(f, "📊 SESSION STATISTICS:")?;
        writeln!(f, "   Duration: {}s", secs(self.session_duration_ms))?;
        writeln!(f, "   Last Activity: {}s ago", secs(self.since_last_activity_ms))?;
        writeln!(
            f,
            "   Status: {}",
            if self.is_active { "ACTIVE" } else { "INACTIVE" }
        )?;
        writeln!(f)?;

        writeln!(f, "📈 ACTIVITY ANALYSIS:")?;
        writeln!(f, "   Total Events: {}", self.total_events)?;
        writeln!(f, "   Events/Minute: {:.1}", self.events_per_minute)?;
        writeln!(f, "   Activity Level: {}", self.activity_level)?;
        writeln!(f)?;

        writeln!(f, "🧠 BEHAVIOR PATTERNS:")?;
        for pattern in &self.patterns {
            writeln!(f, "   {}", pattern)?;
        }

        if !self.recent_events.is_empty() {
            writeln!(f)?;
            writeln!(f, "🕒 RECENT EVENTS:")?;
            for event in &self.recent_events {
                writeln!(
                    f,
                    "   {} {} ({}s ago)",
                    event.category.icon(),
                    event.category,
                    secs(event.age_ms)
                )?;
            }
        }

        writeln!(f)?;
        write!(f, "⏱️ Updated: {}", self.generated_at)
    }
}

fn secs(ms: u64) -> u64 {
    (ms + 500) / 1000
}

/// Downloadable behavior snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorExport {
    pub timestamp: String,
    pub session_start: u64,
    pub session_duration: u64,
    pub events: BTreeMap<EventCategory, u64>,
    pub total_events: u64,
    pub events_per_minute: f64,
    pub activity_level: ActivityLevel,
    pub is_active: bool,
    pub last_activity: u64,
    pub behavior_patterns: Vec<BehaviorPattern>,
    /// Most recent records, oldest first.
    pub behavior_log: Vec<EventRecord>,
    pub stats: SessionStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Per-session activity state.
pub struct ActivityTracker<C: Clock = SystemClock> {
    config: TrackerConfig,
    clock: C,
    counters: BTreeMap<EventCategory, u64>,
    log: VecDeque<EventRecord>,
    session_start_ms: u64,
    last_activity_ms: u64,
    active: bool,
    observers: Vec<Box<dyn ActivityObserver>>,
}

impl ActivityTracker<SystemClock> {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ActivityTracker<C> {
    /// Start a session at the clock's current instant.
    pub fn with_clock(config: TrackerConfig, clock: C) -> Self {
        let now = clock.now_ms();
        log::info!("👁️‍🗨️ Behavior tracking started");

        Self {
            counters: EventCategory::ALL.iter().map(|c| (*c, 0)).collect(),
            log: VecDeque::with_capacity(config.log_capacity + 1),
            session_start_ms: now,
            last_activity_ms: now,
            active: true,
            observers: Vec::new(),
            config,
            clock,
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn ActivityObserver>) {
        self.observers.push(observer);
    }

    /// Count and append an event. The only mutator of counters and log.
    ///
    /// Once the log grows past `log_capacity`, only the newest
    /// `log_retain` records are kept (never more than `log_capacity`).
    pub fn log_event(&mut self, event: ActivityEvent) {
        let now = self.clock.now_ms();
        *self.counters.entry(event.category()).or_insert(0) += 1;

        self.log.push_back(EventRecord {
            event,
            session_time_ms: now.saturating_sub(self.session_start_ms),
        });

        if self.log.len() > self.config.log_capacity {
            let retain = self.config.log_retain.min(self.config.log_capacity);
            let excess = self.log.len().saturating_sub(retain);
            self.log.drain(..excess);
            log::debug!("Behavior log trimmed to {} records", self.log.len());
        }

        if !self.observers.is_empty() {
            let stats = self.session_stats();
            for observer in self.observers.iter_mut() {
                observer.on_counters_updated(&stats);
            }
        }
    }

    /// Record activity now. Returns `true` if this reactivated the session.
    pub fn update_activity(&mut self) -> bool {
        self.last_activity_ms = self.clock.now_ms();
        if self.active {
            return false;
        }

        self.active = true;
        log::info!("✅ User active again");
        self.notify_activity_change();
        true
    }

    /// Log an interaction and update activity when it counts as one.
    ///
    /// Returns `true` if the session went from inactive to active.
    pub fn observe(&mut self, event: ActivityEvent) -> bool {
        let counts = event.counts_as_activity();
        self.log_event(event);
        counts && self.update_activity()
    }

    /// Idle check, run on the poll cadence.
    ///
    /// Returns `true` if this poll marked the session inactive, in which
    /// case a synthetic inactivity event carrying the idle time was logged.
    pub fn poll_idle(&mut self) -> bool {
        let idle_ms = self.clock.now_ms().saturating_sub(self.last_activity_ms);
        if !self.active || idle_ms <= self.config.inactivity_threshold_ms {
            return false;
        }

        self.active = false;
        log::info!("⚠️ Passive behavior detected after {}ms idle", idle_ms);
        self.notify_activity_change();
        self.log_event(ActivityEvent::Inactivity {
            duration_ms: idle_ms,
        });
        true
    }

    fn notify_activity_change(&mut self) {
        let active = self.active;
        for observer in self.observers.iter_mut() {
            observer.on_activity_change(active);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn session_start_ms(&self) -> u64 {
        self.session_start_ms
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    pub fn counters(&self) -> &BTreeMap<EventCategory, u64> {
        &self.counters
    }

    pub fn count(&self, category: EventCategory) -> u64 {
        self.counters.get(&category).copied().unwrap_or(0)
    }

    /// Logged records, oldest first.
    pub fn log(&self) -> &VecDeque<EventRecord> {
        &self.log
    }

    pub fn total_events(&self) -> u64 {
        self.counters.values().sum()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn session_duration_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.session_start_ms)
    }

    fn tail(&self, n: usize) -> impl Iterator<Item = &EventRecord> {
        self.log.iter().skip(self.log.len().saturating_sub(n))
    }

    pub fn session_stats(&self) -> SessionStats {
        let now = self.clock.now_ms();
        SessionStats {
            duration_ms: self.session_duration_ms(now),
            events: self.counters.clone(),
            is_active: self.active,
            last_activity: self.last_activity_ms,
            total_events: self.total_events(),
        }
    }

    pub fn patterns(&self) -> Vec<BehaviorPattern> {
        patterns::analyze(
            &self.counters,
            self.tail(self.config.pattern_window).map(EventRecord::category),
        )
    }

    pub fn generate_report(&self) -> BehaviorReport {
        let now = self.clock.now_ms();
        let duration = self.session_duration_ms(now);
        let total = self.total_events();
        let rate = patterns::events_per_minute(total, duration);

        let recent_events = self
            .tail(self.config.recent_events)
            .map(|record| RecentEvent {
                category: record.category(),
                age_ms: duration.saturating_sub(record.session_time_ms),
            })
            .collect();

        BehaviorReport {
            generated_at: iso_timestamp(now),
            session_duration_ms: duration,
            since_last_activity_ms: now.saturating_sub(self.last_activity_ms),
            is_active: self.active,
            total_events: total,
            events_per_minute: rate,
            activity_level: ActivityLevel::from_rate(rate),
            patterns: self.patterns(),
            recent_events,
        }
    }

    /// Build the behavior export and its artifact name. Read-only.
    pub fn export_behavior_data(&self, url: Option<String>) -> (String, BehaviorExport) {
        let now = self.clock.now_ms();
        let duration = self.session_duration_ms(now);
        let total = self.total_events();
        let rate = patterns::events_per_minute(total, duration);

        let export = BehaviorExport {
            timestamp: iso_timestamp(now),
            session_start: self.session_start_ms,
            session_duration: duration,
            events: self.counters.clone(),
            total_events: total,
            events_per_minute: rate,
            activity_level: ActivityLevel::from_rate(rate),
            is_active: self.active,
            last_activity: self.last_activity_ms,
            behavior_patterns: self.patterns(),
            behavior_log: self.tail(self.config.export_log_tail).cloned().collect(),
            stats: self.session_stats(),
            url,
        };

        (artifact_name(BEHAVIOR_ARTIFACT_PREFIX, now), export)
    }
}

impl<C: Clock> fmt::Debug for ActivityTracker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityTracker")
            .field("active", &self.active)
            .field("session_start_ms", &self.session_start_ms)
            .field("last_activity_ms", &self.last_activity_ms)
            .field("total_events", &self.total_events())
            .field("log_len", &self.log.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    const START: u64 = 1_714_521_600_000;

    fn tracker() -> (ActivityTracker<ManualClock>, ManualClock) {
        let clock = ManualClock::new(START);
        (
            ActivityTracker::with_clock(TrackerConfig::default(), clock.clone()),
            clock,
        )
    }

    #[derive(Default)]
    struct Recorder {
        changes: Rc<RefCell<Vec<bool>>>,
        updates: Rc<RefCell<u64>>,
    }

    impl ActivityObserver for Recorder {
        fn on_activity_change(&mut self, active: bool) {
            self.changes.borrow_mut().push(active);
        }

        fn on_counters_updated(&mut self, stats: &SessionStats) {
            *self.updates.borrow_mut() = stats.total_events;
        }
    }

    #[test]
    fn test_new_session_is_active() {
        let (tracker, _) = tracker();
        assert!(tracker.is_active());
        assert_eq!(tracker.total_events(), 0);
        assert_eq!(tracker.session_start_ms(), START);
        assert_eq!(tracker.counters().len(), EventCategory::ALL.len());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let (mut tracker, clock) = tracker();
        clock.advance(10_000);
        assert!(!tracker.poll_idle());
        assert!(tracker.is_active());

        clock.advance(1);
        assert!(tracker.poll_idle());
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_blur_does_not_reset_idle_timer() {
        let (mut tracker, clock) = tracker();
        clock.advance(9_000);
        tracker.observe(ActivityEvent::Focus { gained: false });
        tracker.observe(ActivityEvent::Resize {
            width: 1024,
            height: 768,
        });
        assert_eq!(tracker.last_activity_ms(), START);

        clock.advance(2_000);
        assert!(tracker.poll_idle());
    }

    #[test]
    fn test_observers_notified() {
        let (mut tracker, clock) = tracker();
        let recorder = Recorder::default();
        let changes = Rc::clone(&recorder.changes);
        let updates = Rc::clone(&recorder.updates);
        tracker.add_observer(Box::new(recorder));

        tracker.observe(ActivityEvent::Mouse { x: 1, y: 2 });
        assert_eq!(*updates.borrow(), 1);

        clock.advance(12_000);
        tracker.poll_idle();
        assert!(tracker.observe(ActivityEvent::Keyboard {
            key: "a".into(),
            code: "KeyA".into()
        }));

        assert_eq!(*changes.borrow(), vec![false, true]);
        // mouse, inactivity, keyboard
        assert_eq!(*updates.borrow(), 3);
    }

    #[test]
    fn test_report_recent_events_and_display() {
        let (mut tracker, clock) = tracker();
        tracker.observe(ActivityEvent::Mouse { x: 0, y: 0 });
        clock.advance(2_000);
        tracker.observe(ActivityEvent::Click {
            x: 5,
            y: 5,
            target: "BUTTON".into(),
        });
        clock.advance(1_000);
        tracker.observe(ActivityEvent::Scroll {
            scroll_x: 0.0,
            scroll_y: 300.0,
        });
        tracker.observe(ActivityEvent::Keyboard {
            key: "Enter".into(),
            code: "Enter".into(),
        });
        clock.advance(1_000);

        let report = tracker.generate_report();
        assert_eq!(report.session_duration_ms, 4_000);
        assert_eq!(report.since_last_activity_ms, 1_000);
        assert_eq!(report.total_events, 4);
        assert_eq!(report.events_per_minute, 60.0);
        assert_eq!(report.activity_level, ActivityLevel::VeryHigh);
        let recent: Vec<(EventCategory, u64)> = report
            .recent_events
            .iter()
            .map(|e| (e.category, e.age_ms))
            .collect();
        assert_eq!(
            recent,
            vec![
                (EventCategory::Click, 2_000),
                (EventCategory::Scroll, 1_000),
                (EventCategory::Keyboard, 1_000),
            ]
        );

        let text = report.to_string();
        assert!(text.contains("Duration: 4s"));
        assert!(text.contains("Status: ACTIVE"));
        assert!(text.contains("Events/Minute: 60.0"));
        assert!(text.contains("👆 click (2s ago)"));
        assert!(text.ends_with("2024-05-01T00:00:04.000Z"));
    }

    #[test]
    fn test_zero_duration_rate() {
        let (mut tracker, _) = tracker();
        tracker.observe(ActivityEvent::Mouse { x: 0, y: 0 });
        let report = tracker.generate_report();
        assert_eq!(report.events_per_minute, 0.0);
        assert_eq!(report.activity_level, ActivityLevel::VeryLow);
    }

    #[test]
    fn test_export_tail_and_url() {
        let (mut tracker, clock) = tracker();
        for i in 0..150 {
            tracker.observe(ActivityEvent::Mouse { x: i, y: i });
        }
        clock.advance(60_000);

        let (name, export) = tracker.export_behavior_data(Some("https://example.com/".into()));
        assert_eq!(name, "behavior-analysis-2024-05-01.json");
        assert_eq!(export.behavior_log.len(), 100);
        assert_eq!(
            export.behavior_log[0].event,
            ActivityEvent::Mouse { x: 50, y: 50 }
        );
        assert_eq!(export.total_events, 150);
        assert_eq!(export.events_per_minute, 150.0);
        assert_eq!(export.stats.total_events, 150);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["events"]["mouse"], 150);
        assert_eq!(json["url"], "https://example.com/");
        assert_eq!(json["activityLevel"], "veryHigh");

        let (_, export) = tracker.export_behavior_data(None);
        let json = serde_json::to_value(&export).unwrap();
        assert!(json.get("url").is_none());
    }
}
