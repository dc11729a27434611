//! Plain-data environment.
//!
//! Lets a host that already collected its signals (or a test) run the
//! registry without a live page. Individual probes can be marked as
//! missing or throwing by name.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::{self, FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use super::{
    Environment, GraphicsInfo, NavigatorFlags, PermissionState, ScreenInfo, TimezoneInfo,
    TouchInfo,
};
use crate::error::{Result, RiskError};

/// Probe names accepted in `unavailable` and `failures`.
pub mod probe {
    pub const USER_AGENT: &str = "userAgent";
    pub const WEBDRIVER: &str = "webdriver";
    pub const LANGUAGES: &str = "languages";
    pub const DEVICE_MEMORY: &str = "deviceMemory";
    pub const HARDWARE_CONCURRENCY: &str = "hardwareConcurrency";
    pub const TOUCH: &str = "touch";
    pub const EVAL: &str = "eval";
    pub const PLUGINS: &str = "plugins";
    pub const SCREEN: &str = "screen";
    pub const TIMEZONE: &str = "timezone";
    pub const WEBGL: &str = "webgl";
    pub const PERMISSIONS_API: &str = "permissionsApi";
    pub const BATTERY_API: &str = "batteryApi";
    pub const CANVAS: &str = "canvas";
    pub const BLANK_CANVAS: &str = "blankCanvas";
    pub const AUDIO: &str = "audio";
    pub const NAVIGATOR_FLAGS: &str = "navigatorFlags";
    pub const LOCATION: &str = "location";
    pub const PERMISSION_QUERY: &str = "permissionQuery";
}

/// A recorded (or hand-written) set of environment readings.
///
/// Defaults describe an ordinary desktop browser that scores zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    pub user_agent: String,
    pub webdriver: bool,
    pub languages: Vec<String>,
    pub device_memory: Option<f64>,
    pub hardware_concurrency: Option<u32>,
    pub touch: TouchInfo,
    pub eval_source: String,
    pub plugin_count: u32,
    pub screen: ScreenInfo,
    pub timezone: TimezoneInfo,
    pub webgl: Option<GraphicsInfo>,
    pub has_permissions_api: bool,
    pub has_battery_api: bool,
    pub canvas_data_url: String,
    pub blank_canvas_data_url: String,
    pub audio_frequency_data: Vec<u8>,
    pub navigator_flags: NavigatorFlags,
    pub location_href: String,
    pub permission_states: Vec<PermissionState>,
    /// Probes whose feature is missing.
    pub unavailable: BTreeSet<String>,
    /// Probes that throw, with the thrown message.
    pub failures: BTreeMap<String, String>,
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            webdriver: false,
            languages: vec!["en-US".to_string(), "en".to_string()],
            device_memory: Some(8.0),
            hardware_concurrency: Some(8),
            touch: TouchInfo::default(),
            eval_source: "function eval() { [native code] }".to_string(),
            plugin_count: 5,
            screen: ScreenInfo {
                width: 1920,
                height: 1080,
                color_depth: 24,
                pixel_depth: 24,
            },
            timezone: TimezoneInfo {
                name: "Europe/Berlin".to_string(),
                offset_minutes: -60,
            },
            webgl: Some(GraphicsInfo {
                renderer: "ANGLE (NVIDIA, NVIDIA GeForce GTX 1060 Direct3D11 vs_5_0 ps_5_0, D3D11)"
                    .to_string(),
            }),
            has_permissions_api: true,
            has_battery_api: true,
            canvas_data_url: format!("data:image/png;base64,iVBORw0KGgo{}", "Qm9yZGVyQ2FudmFz".repeat(24)),
            blank_canvas_data_url: format!("data:image/png;base64,iVBORw0KGgo{}", "QmxhbmtDYW52YXM".repeat(16)),
            audio_frequency_data: (0..64u32).map(|i| ((i * 37) % 251) as u8).collect(),
            navigator_flags: NavigatorFlags::default(),
            location_href: "https://example.com/".to_string(),
            permission_states: vec![PermissionState::Prompt; 4],
            unavailable: BTreeSet::new(),
            failures: BTreeMap::new(),
        }
    }
}

impl EnvironmentSnapshot {
    /// Build a snapshot from a JS object; missing fields take defaults.
    pub fn from_js(value: JsValue) -> Result<Self> {
        Ok(serde_wasm_bindgen::from_value(value)?)
    }

    /// Mark a probe as missing.
    pub fn with_unavailable(mut self, probe: &str) -> Self {
        self.unavailable.insert(probe.to_string());
        self
    }

    /// Mark a probe as throwing `message`.
    pub fn with_failure(mut self, probe: &str, message: &str) -> Self {
        self.failures.insert(probe.to_string(), message.to_string());
        self
    }

    fn read<T: Clone>(&self, probe: &str, value: &T) -> Result<T> {
        if let Some(message) = self.failures.get(probe) {
            return Err(RiskError::ProbeException(format!("{}: {}", probe, message)));
        }
        if self.unavailable.contains(probe) {
            return Err(RiskError::unavailable(probe));
        }
        Ok(value.clone())
    }
}

impl Environment for EnvironmentSnapshot {
    fn user_agent(&self) -> Result<String> {
        self.read(probe::USER_AGENT, &self.user_agent)
    }

    fn webdriver(&self) -> Result<bool> {
        self.read(probe::WEBDRIVER, &self.webdriver)
    }

    fn languages(&self) -> Result<Vec<String>> {
        self.read(probe::LANGUAGES, &self.languages)
    }

    fn device_memory(&self) -> Result<Option<f64>> {
        self.read(probe::DEVICE_MEMORY, &self.device_memory)
    }

    fn hardware_concurrency(&self) -> Result<Option<u32>> {
        self.read(probe::HARDWARE_CONCURRENCY, &self.hardware_concurrency)
    }

    fn touch(&self) -> Result<TouchInfo> {
        self.read(probe::TOUCH, &self.touch)
    }

    fn eval_source(&self) -> Result<String> {
        self.read(probe::EVAL, &self.eval_source)
    }

    fn plugin_count(&self) -> Result<u32> {
        self.read(probe::PLUGINS, &self.plugin_count)
    }

    fn screen(&self) -> Result<ScreenInfo> {
        self.read(probe::SCREEN, &self.screen)
    }

    fn timezone(&self) -> Result<TimezoneInfo> {
        self.read(probe::TIMEZONE, &self.timezone)
    }

    fn webgl(&self) -> Result<Option<GraphicsInfo>> {
        self.read(probe::WEBGL, &self.webgl)
    }

    fn has_permissions_api(&self) -> Result<bool> {
        self.read(probe::PERMISSIONS_API, &self.has_permissions_api)
    }

    fn has_battery_api(&self) -> Result<bool> {
        self.read(probe::BATTERY_API, &self.has_battery_api)
    }

    fn canvas_data_url(&self) -> Result<String> {
        self.read(probe::CANVAS, &self.canvas_data_url)
    }

    fn blank_canvas_data_url(&self) -> Result<String> {
        self.read(probe::BLANK_CANVAS, &self.blank_canvas_data_url)
    }

    fn audio_frequency_data(&self) -> LocalBoxFuture<'static, Result<Vec<u8>>> {
        future::ready(self.read(probe::AUDIO, &self.audio_frequency_data)).boxed_local()
    }

    fn navigator_flags(&self) -> Result<NavigatorFlags> {
        self.read(probe::NAVIGATOR_FLAGS, &self.navigator_flags)
    }

    fn location_href(&self) -> Result<String> {
        self.read(probe::LOCATION, &self.location_href)
    }

    fn query_permissions(
        &self,
        names: &'static [&'static str],
    ) -> LocalBoxFuture<'static, Result<Vec<PermissionState>>> {
        let outcome = if let Some(message) = self.failures.get(probe::PERMISSION_QUERY) {
            Err(RiskError::AsyncProbeFailure(message.clone()))
        } else if self.unavailable.contains(probe::PERMISSION_QUERY) {
            Err(RiskError::unavailable("navigator.permissions"))
        } else {
            // Names beyond the recorded states read as errors.
            Ok((0..names.len())
                .map(|i| {
                    self.permission_states
                        .get(i)
                        .copied()
                        .unwrap_or(PermissionState::Error)
                })
                .collect())
        };
        future::ready(outcome).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_wins_over_value() {
        let env = EnvironmentSnapshot::default().with_failure(probe::CANVAS, "SecurityError");
        match env.canvas_data_url() {
            Err(RiskError::ProbeException(msg)) => assert!(msg.contains("SecurityError")),
            other => panic!("expected exception, got {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_probe() {
        let env = EnvironmentSnapshot::default().with_unavailable(probe::SCREEN);
        assert_eq!(env.screen(), Err(RiskError::unavailable(probe::SCREEN)));
        assert!(env.user_agent().is_ok());
    }

    #[test]
    fn test_permission_query_pads_with_errors() {
        let env = EnvironmentSnapshot {
            permission_states: vec![PermissionState::Granted],
            ..Default::default()
        };
        let states = futures::executor::block_on(env.query_permissions(&["a", "b"])).unwrap();
        assert_eq!(states, vec![PermissionState::Granted, PermissionState::Error]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let env: EnvironmentSnapshot =
            serde_json::from_str(r#"{"webdriver": true, "languages": []}"#).unwrap();
        assert!(env.webdriver);
        assert!(env.languages.is_empty());
        assert_eq!(env.plugin_count, 5);
    }
}
