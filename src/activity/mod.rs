//! Session activity tracking.
//!
//! - `event`: interaction categories, payloads and log records
//! - `patterns`: advisory heuristics and the activity-rate tiers
//! - `tracker`: the active/inactive state machine and its projections

pub mod event;
pub mod patterns;
pub mod tracker;

pub use event::{ActivityEvent, EventCategory, EventRecord};
pub use patterns::{ActivityLevel, BehaviorPattern};
pub use tracker::{
    ActivityObserver, ActivityTracker, BehaviorExport, BehaviorReport, RecentEvent, SessionStats,
};
