//! Ambient environment probes.
//!
//! Every signal the check registry reads goes through [`Environment`].
//! Each method is a single read of one browser feature; it returns
//! `ProbeUnavailable` when the feature is missing and `ProbeException`
//! when touching it threw. Decision rules live in `checks`, never here.
//!
//! ## Implementations
//!
//! - [`BrowserEnvironment`]: live reads through web-sys / js-sys
//! - [`EnvironmentSnapshot`]: plain data, deserializable from JSON or a JS object

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod browser;
pub mod snapshot;
pub mod spectrum;

pub use browser::BrowserEnvironment;
pub use snapshot::EnvironmentSnapshot;

/// Touch capability as exposed by the window and navigator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchInfo {
    /// `'ontouchstart' in window`
    pub has_touch_events: bool,
    pub max_touch_points: u32,
}

impl TouchInfo {
    pub fn supported(&self) -> bool {
        self.has_touch_events || self.max_touch_points > 0
    }
}

/// `window.screen` dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    pub pixel_depth: u32,
}

impl ScreenInfo {
    /// `WIDTHxHEIGHT`
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Resolved IANA zone and current UTC offset in minutes
/// (`Date.prototype.getTimezoneOffset` sign convention).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneInfo {
    pub name: String,
    pub offset_minutes: i32,
}

/// An obtainable WebGL context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicsInfo {
    /// Unmasked renderer, or `unknown` when the debug extension is hidden.
    pub renderer: String,
}

/// Boolean navigator properties that are individually weak signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorFlags {
    pub cookie_enabled: bool,
    pub on_line: bool,
    pub do_not_track: Option<String>,
    pub max_touch_points: u32,
    pub pdf_viewer_enabled: bool,
}

impl Default for NavigatorFlags {
    fn default() -> Self {
        Self {
            cookie_enabled: true,
            on_line: true,
            do_not_track: None,
            max_touch_points: 0,
            pdf_viewer_enabled: true,
        }
    }
}

/// Outcome of one `navigator.permissions.query()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    /// The query rejected or returned something unreadable.
    Error,
}

impl PermissionState {
    pub fn from_state_str(state: &str) -> Self {
        match state {
            "granted" => PermissionState::Granted,
            "denied" => PermissionState::Denied,
            "prompt" => PermissionState::Prompt,
            _ => PermissionState::Error,
        }
    }

    /// Denied or unreadable.
    pub fn is_blocked(self) -> bool {
        matches!(self, PermissionState::Denied | PermissionState::Error)
    }
}

/// Read-only access to the browser environment.
pub trait Environment {
    /// `navigator.userAgent`
    fn user_agent(&self) -> Result<String>;

    /// `navigator.webdriver === true`
    fn webdriver(&self) -> Result<bool>;

    /// `navigator.languages`; a missing list reads as empty.
    fn languages(&self) -> Result<Vec<String>>;

    /// `navigator.deviceMemory` in GiB, `None` when not exposed.
    fn device_memory(&self) -> Result<Option<f64>>;

    /// `navigator.hardwareConcurrency`, `None` when not exposed.
    fn hardware_concurrency(&self) -> Result<Option<u32>>;

    fn touch(&self) -> Result<TouchInfo>;

    /// `eval.toString()`
    fn eval_source(&self) -> Result<String>;

    /// `navigator.plugins.length`; a missing list reads as zero.
    fn plugin_count(&self) -> Result<u32>;

    fn screen(&self) -> Result<ScreenInfo>;

    fn timezone(&self) -> Result<TimezoneInfo>;

    /// `None` when no WebGL context can be created.
    fn webgl(&self) -> Result<Option<GraphicsInfo>>;

    /// `'permissions' in navigator`
    fn has_permissions_api(&self) -> Result<bool>;

    /// `'getBattery' in navigator`
    fn has_battery_api(&self) -> Result<bool>;

    /// Data URL of the fixed canvas drawing.
    fn canvas_data_url(&self) -> Result<String>;

    /// Data URL of an untouched canvas with the drawing's dimensions.
    fn blank_canvas_data_url(&self) -> Result<String>;

    /// Byte frequency bins of the rendered audio pipeline.
    ///
    /// Rendering is asynchronous, so this resolves after the synchronous
    /// pass like [`Environment::query_permissions`].
    fn audio_frequency_data(&self) -> LocalBoxFuture<'static, Result<Vec<u8>>>;

    fn navigator_flags(&self) -> Result<NavigatorFlags>;

    /// `window.location.href`
    fn location_href(&self) -> Result<String>;

    /// Query each named permission. Resolves to one state per name, in order.
    ///
    /// Returns `ProbeUnavailable` when the Permissions API is missing and
    /// `AsyncProbeFailure` when the batch as a whole cannot be issued.
    fn query_permissions(
        &self,
        names: &'static [&'static str],
    ) -> LocalBoxFuture<'static, Result<Vec<PermissionState>>>;
}
