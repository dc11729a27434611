//! Interaction events and log records.

use serde::{Deserialize, Serialize};

/// Counter bucket for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Pointer movement.
    Mouse,
    Click,
    Scroll,
    Keyboard,
    Focus,
    Visibility,
    Resize,
    ContextMenu,
    /// Synthetic, emitted by the idle poller.
    Inactivity,
}

impl EventCategory {
    pub const ALL: [EventCategory; 9] = [
        EventCategory::Mouse,
        EventCategory::Click,
        EventCategory::Scroll,
        EventCategory::Keyboard,
        EventCategory::Focus,
        EventCategory::Visibility,
        EventCategory::Resize,
        EventCategory::ContextMenu,
        EventCategory::Inactivity,
    ];

    pub fn key(self) -> &'static str {
        match self {
            EventCategory::Mouse => "mouse",
            EventCategory::Click => "click",
            EventCategory::Scroll => "scroll",
            EventCategory::Keyboard => "keyboard",
            EventCategory::Focus => "focus",
            EventCategory::Visibility => "visibility",
            EventCategory::Resize => "resize",
            EventCategory::ContextMenu => "contextmenu",
            EventCategory::Inactivity => "inactivity",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            EventCategory::Mouse => "🖱️",
            EventCategory::Click => "👆",
            EventCategory::Scroll => "📜",
            EventCategory::Keyboard => "⌨️",
            EventCategory::Focus => "👁️",
            EventCategory::Visibility => "👀",
            EventCategory::Resize => "📐",
            EventCategory::ContextMenu => "📋",
            EventCategory::Inactivity => "😴",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// One observed interaction with its category-specific payload.
///
/// The JS shape is `{ type: "<category>", ...fields }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivityEvent {
    Mouse {
        x: i32,
        y: i32,
    },
    Click {
        x: i32,
        y: i32,
        /// Tag name of the clicked element.
        #[serde(default)]
        target: String,
    },
    #[serde(rename_all = "camelCase")]
    Scroll {
        scroll_x: f64,
        scroll_y: f64,
    },
    Keyboard {
        key: String,
        #[serde(default)]
        code: String,
    },
    /// Window focus gained (`true`) or lost.
    Focus {
        gained: bool,
    },
    Visibility {
        visible: bool,
    },
    Resize {
        width: u32,
        height: u32,
    },
    ContextMenu {
        x: i32,
        y: i32,
    },
    #[serde(rename_all = "camelCase")]
    Inactivity {
        duration_ms: u64,
    },
}

impl ActivityEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            ActivityEvent::Mouse { .. } => EventCategory::Mouse,
            ActivityEvent::Click { .. } => EventCategory::Click,
            ActivityEvent::Scroll { .. } => EventCategory::Scroll,
            ActivityEvent::Keyboard { .. } => EventCategory::Keyboard,
            ActivityEvent::Focus { .. } => EventCategory::Focus,
            ActivityEvent::Visibility { .. } => EventCategory::Visibility,
            ActivityEvent::Resize { .. } => EventCategory::Resize,
            ActivityEvent::ContextMenu { .. } => EventCategory::ContextMenu,
            ActivityEvent::Inactivity { .. } => EventCategory::Inactivity,
        }
    }

    /// Whether observing this event marks the user as active.
    ///
    /// Losing focus, hiding the page, resizing and opening the context
    /// menu are logged but are not activity. Inactivity is never activity.
    pub fn counts_as_activity(&self) -> bool {
        match self {
            ActivityEvent::Mouse { .. }
            | ActivityEvent::Click { .. }
            | ActivityEvent::Scroll { .. }
            | ActivityEvent::Keyboard { .. } => true,
            ActivityEvent::Focus { gained } => *gained,
            ActivityEvent::Visibility { visible } => *visible,
            ActivityEvent::Resize { .. }
            | ActivityEvent::ContextMenu { .. }
            | ActivityEvent::Inactivity { .. } => false,
        }
    }
}

/// A logged event. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(flatten)]
    pub event: ActivityEvent,
    /// Milliseconds since session start.
    pub session_time_ms: u64,
}

impl EventRecord {
    pub fn category(&self) -> EventCategory {
        self.event.category()
    }
}
