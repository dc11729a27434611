//! Advisory behavior heuristics. Nothing here feeds the idle state machine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::event::EventCategory;

/// Scroll count above which scrolling is intensive.
pub const INTENSIVE_SCROLL_COUNT: u64 = 50;

/// Focus changes above which switching is frequent.
pub const FREQUENT_FOCUS_COUNT: u64 = 10;

/// Pointer events per keyboard event that make a session pointer-driven.
pub const POINTER_DOMINANCE_RATIO: u64 = 10;

/// Keyboard events per pointer event that indicate text entry.
pub const TYPING_DOMINANCE_RATIO: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BehaviorPattern {
    /// Mostly pointer movement, likely passive browsing.
    PointerDominant,
    ActiveTyping,
    IntensiveScrolling,
    /// Every recent event is pointer movement.
    PointerOnly,
    FrequentFocusSwitching,
    /// None of the above.
    Normal,
}

impl BehaviorPattern {
    pub fn description(self) -> &'static str {
        match self {
            BehaviorPattern::PointerDominant => "Predominantly pointer (likely browsing)",
            BehaviorPattern::ActiveTyping => "Active text entry",
            BehaviorPattern::IntensiveScrolling => "Intensive scrolling",
            BehaviorPattern::PointerOnly => "Suspicious: pointer movement only",
            BehaviorPattern::FrequentFocusSwitching => "Frequent focus switching",
            BehaviorPattern::Normal => "Normal behavior patterns",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            BehaviorPattern::PointerDominant => "🖱️",
            BehaviorPattern::ActiveTyping => "⌨️",
            BehaviorPattern::IntensiveScrolling => "📜",
            BehaviorPattern::PointerOnly => "🤖",
            BehaviorPattern::FrequentFocusSwitching => "🔄",
            BehaviorPattern::Normal => "✅",
        }
    }
}

impl std::fmt::Display for BehaviorPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.icon(), self.description())
    }
}

/// Flag patterns from session counters and the categories of the most
/// recent log window (oldest first).
///
/// Flags are independent and concatenated; an empty result becomes
/// `[Normal]`.
pub fn analyze<I>(counters: &BTreeMap<EventCategory, u64>, recent: I) -> Vec<BehaviorPattern>
where
    I: IntoIterator<Item = EventCategory>,
{
    let count = |category| counters.get(&category).copied().unwrap_or(0);
    let pointer = count(EventCategory::Mouse);
    let keyboard = count(EventCategory::Keyboard);

    let mut patterns = Vec::new();

    if pointer > keyboard * POINTER_DOMINANCE_RATIO {
        patterns.push(BehaviorPattern::PointerDominant);
    } else if keyboard > pointer * TYPING_DOMINANCE_RATIO {
        patterns.push(BehaviorPattern::ActiveTyping);
    }

    if count(EventCategory::Scroll) > INTENSIVE_SCROLL_COUNT {
        patterns.push(BehaviorPattern::IntensiveScrolling);
    }

    let mut recent = recent.into_iter().peekable();
    if recent.peek().is_some() && recent.all(|c| c == EventCategory::Mouse) {
        patterns.push(BehaviorPattern::PointerOnly);
    }

    if count(EventCategory::Focus) > FREQUENT_FOCUS_COUNT {
        patterns.push(BehaviorPattern::FrequentFocusSwitching);
    }

    if patterns.is_empty() {
        patterns.push(BehaviorPattern::Normal);
    }
    patterns
}

/// Five-tier label for an event rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ActivityLevel {
    /// >50/min very high, >20 high, >10 medium, >5 low, else very low.
    pub fn from_rate(events_per_minute: f64) -> Self {
        if events_per_minute > 50.0 {
            ActivityLevel::VeryHigh
        } else if events_per_minute > 20.0 {
            ActivityLevel::High
        } else if events_per_minute > 10.0 {
            ActivityLevel::Medium
        } else if events_per_minute > 5.0 {
            ActivityLevel::Low
        } else {
            ActivityLevel::VeryLow
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActivityLevel::VeryHigh => "VERY HIGH 🔥",
            ActivityLevel::High => "HIGH ⚡",
            ActivityLevel::Medium => "MEDIUM 📊",
            ActivityLevel::Low => "LOW 📉",
            ActivityLevel::VeryLow => "VERY LOW 😴",
        }
    }
}

impl std::fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// `total / minutes`, or 0 for an empty session duration.
pub fn events_per_minute(total_events: u64, session_duration_ms: u64) -> f64 {
    if session_duration_ms == 0 {
        return 0.0;
    }
    total_events as f64 * 60_000.0 / session_duration_ms as f64
}
