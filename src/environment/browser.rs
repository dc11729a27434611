//! Live browser probes.
//!
//! Reads go through `Reflect` wherever the property is non-standard or
//! missing from some engines (deviceMemory, webdriver, pdfViewerEnabled),
//! and through typed web-sys bindings otherwise. Nothing here decides
//! whether a value is suspicious.

use futures::future::{self, FutureExt, LocalBoxFuture};
use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioBuffer, CanvasRenderingContext2d, Document, HtmlCanvasElement, Navigator,
    OfflineAudioContext, OscillatorType, WebGlRenderingContext, Window,
};

use super::spectrum;
use super::{
    Environment, GraphicsInfo, NavigatorFlags, PermissionState, ScreenInfo, TimezoneInfo,
    TouchInfo,
};
use crate::error::{Result, RiskError};

/// `WEBGL_debug_renderer_info.UNMASKED_RENDERER_WEBGL`
const UNMASKED_RENDERER_WEBGL: u32 = 0x9246;

/// Text drawn into the fingerprint canvas.
const CANVAS_TEXT: &str = "Cwm fjordbank glyphs vext quiz, \u{1F603}";

const CANVAS_WIDTH: u32 = 200;
const CANVAS_HEIGHT: u32 = 50;

const AUDIO_SAMPLE_RATE: f32 = 44_100.0;

/// Two analyser frames of rendered output.
const AUDIO_RENDER_FRAMES: u32 = 2 * spectrum::FFT_SIZE as u32;

/// Environment backed by the page's `window`.
#[derive(Debug, Clone, Default)]
pub struct BrowserEnvironment;

impl BrowserEnvironment {
    pub fn new() -> Self {
        Self
    }

    fn window(&self) -> Result<Window> {
        web_sys::window().ok_or_else(|| RiskError::unavailable("window"))
    }

    fn navigator(&self) -> Result<Navigator> {
        Ok(self.window()?.navigator())
    }

    fn document(&self) -> Result<Document> {
        self.window()?
            .document()
            .ok_or_else(|| RiskError::unavailable("document"))
    }

    fn navigator_prop(&self, prop: &str) -> Result<JsValue> {
        let navigator = self.navigator()?;
        Reflect::get(&navigator, &JsValue::from_str(prop))
            .map_err(|e| RiskError::from_js(&format!("navigator.{}", prop), e))
    }

    fn navigator_has(&self, prop: &str) -> Result<bool> {
        let navigator = self.navigator()?;
        Reflect::has(&navigator, &JsValue::from_str(prop))
            .map_err(|e| RiskError::from_js(&format!("'{}' in navigator", prop), e))
    }

    fn create_canvas(&self) -> Result<HtmlCanvasElement> {
        self.document()?
            .create_element("canvas")
            .map_err(|e| RiskError::from_js("createElement(canvas)", e))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| RiskError::ProbeException("canvas element has wrong type".into()))
    }

    fn sized_canvas(&self) -> Result<HtmlCanvasElement> {
        let canvas = self.create_canvas()?;
        canvas.set_width(CANVAS_WIDTH);
        canvas.set_height(CANVAS_HEIGHT);
        Ok(canvas)
    }

    fn webgl_context(&self, canvas: &HtmlCanvasElement) -> Result<Option<WebGlRenderingContext>> {
        for kind in ["webgl", "experimental-webgl"] {
            let ctx = canvas
                .get_context(kind)
                .map_err(|e| RiskError::from_js("getContext(webgl)", e))?;
            if let Some(ctx) = ctx {
                return Ok(ctx.dyn_into::<WebGlRenderingContext>().ok());
            }
        }
        Ok(None)
    }
}

impl Environment for BrowserEnvironment {
    fn user_agent(&self) -> Result<String> {
        self.navigator()?
            .user_agent()
            .map_err(|e| RiskError::from_js("navigator.userAgent", e))
    }

    fn webdriver(&self) -> Result<bool> {
        Ok(self.navigator_prop("webdriver")?.as_bool() == Some(true))
    }

    fn languages(&self) -> Result<Vec<String>> {
        let value = self.navigator_prop("languages")?;
        if value.is_undefined() || value.is_null() {
            return Ok(Vec::new());
        }
        let list = Array::from(&value);
        Ok(list.iter().filter_map(|v| v.as_string()).collect())
    }

    fn device_memory(&self) -> Result<Option<f64>> {
        // `deviceMemory || 'unknown'`: zero counts as not exposed.
        Ok(self
            .navigator_prop("deviceMemory")?
            .as_f64()
            .filter(|m| *m > 0.0))
    }

    fn hardware_concurrency(&self) -> Result<Option<u32>> {
        let cores = self.navigator()?.hardware_concurrency();
        Ok(if cores > 0.0 { Some(cores as u32) } else { None })
    }

    fn touch(&self) -> Result<TouchInfo> {
        let window = self.window()?;
        let has_touch_events = Reflect::has(&window, &JsValue::from_str("ontouchstart"))
            .map_err(|e| RiskError::from_js("'ontouchstart' in window", e))?;
        let max_touch_points = self
            .navigator_prop("maxTouchPoints")?
            .as_f64()
            .unwrap_or(0.0) as u32;
        Ok(TouchInfo {
            has_touch_events,
            max_touch_points,
        })
    }

    fn eval_source(&self) -> Result<String> {
        let eval_fn = Reflect::get(&js_sys::global(), &JsValue::from_str("eval"))
            .map_err(|e| RiskError::from_js("eval", e))?;
        if !eval_fn.is_function() {
            return Err(RiskError::unavailable("eval"));
        }
        // Call toString through Reflect so an overridden, throwing toString
        // surfaces as an error instead of a trap.
        let to_string: Function = Reflect::get(&eval_fn, &JsValue::from_str("toString"))
            .map_err(|e| RiskError::from_js("eval.toString", e))?
            .dyn_into()
            .map_err(|_| RiskError::ProbeException("eval.toString is not callable".into()))?;
        Reflect::apply(&to_string, &eval_fn, &Array::new())
            .map_err(|e| RiskError::from_js("eval.toString()", e))?
            .as_string()
            .ok_or_else(|| RiskError::ProbeException("eval.toString() returned a non-string".into()))
    }

    fn plugin_count(&self) -> Result<u32> {
        let plugins = self.navigator_prop("plugins")?;
        if plugins.is_undefined() || plugins.is_null() {
            return Ok(0);
        }
        let length = Reflect::get(&plugins, &JsValue::from_str("length"))
            .map_err(|e| RiskError::from_js("navigator.plugins.length", e))?;
        Ok(length.as_f64().unwrap_or(0.0) as u32)
    }

    fn screen(&self) -> Result<ScreenInfo> {
        let screen = self
            .window()?
            .screen()
            .map_err(|e| RiskError::from_js("window.screen", e))?;
        let read = |v: std::result::Result<i32, JsValue>, name: &str| {
            v.map(|n| n.max(0) as u32)
                .map_err(|e| RiskError::from_js(name, e))
        };
        Ok(ScreenInfo {
            width: read(screen.width(), "screen.width")?,
            height: read(screen.height(), "screen.height")?,
            color_depth: read(screen.color_depth(), "screen.colorDepth")?,
            pixel_depth: read(screen.pixel_depth(), "screen.pixelDepth")?,
        })
    }

    fn timezone(&self) -> Result<TimezoneInfo> {
        let format = js_sys::Intl::DateTimeFormat::new(&Array::new(), &Object::new());
        let options = format.resolved_options();
        let name = Reflect::get(&options, &JsValue::from_str("timeZone"))
            .map_err(|e| RiskError::from_js("resolvedOptions().timeZone", e))?
            .as_string()
            .unwrap_or_default();
        let offset_minutes = js_sys::Date::new_0().get_timezone_offset() as i32;
        Ok(TimezoneInfo {
            name,
            offset_minutes,
        })
    }

    fn webgl(&self) -> Result<Option<GraphicsInfo>> {
        let canvas = self.create_canvas()?;
        let gl = match self.webgl_context(&canvas)? {
            Some(gl) => gl,
            None => return Ok(None),
        };

        let debug_info = gl
            .get_extension("WEBGL_debug_renderer_info")
            .map_err(|e| RiskError::from_js("getExtension(WEBGL_debug_renderer_info)", e))?;
        let renderer = match debug_info {
            Some(_) => gl
                .get_parameter(UNMASKED_RENDERER_WEBGL)
                .map_err(|e| RiskError::from_js("getParameter(UNMASKED_RENDERER_WEBGL)", e))?
                .as_string()
                .unwrap_or_else(|| "unknown".to_string()),
            None => "unknown".to_string(),
        };
        Ok(Some(GraphicsInfo { renderer }))
    }

    fn has_permissions_api(&self) -> Result<bool> {
        self.navigator_has("permissions")
    }

    fn has_battery_api(&self) -> Result<bool> {
        self.navigator_has("getBattery")
    }

    fn canvas_data_url(&self) -> Result<String> {
        let canvas = self.sized_canvas()?;

        let ctx = canvas
            .get_context("2d")
            .map_err(|e| RiskError::from_js("getContext(2d)", e))?
            .ok_or_else(|| RiskError::unavailable("CanvasRenderingContext2D"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RiskError::ProbeException("2d context has wrong type".into()))?;

        let set_fill = |style: &str| {
            Reflect::set(&ctx, &JsValue::from_str("fillStyle"), &JsValue::from_str(style))
                .map_err(|e| RiskError::from_js("fillStyle", e))
        };

        ctx.set_text_baseline("top");
        ctx.set_font("14px 'Arial'");
        set_fill("#f60")?;
        ctx.fill_rect(125.0, 1.0, 62.0, 20.0);
        set_fill("#069")?;
        ctx.fill_text(CANVAS_TEXT, 2.0, 15.0)
            .map_err(|e| RiskError::from_js("fillText", e))?;
        set_fill("rgba(102, 204, 0, 0.7)")?;
        ctx.fill_text(CANVAS_TEXT, 4.0, 17.0)
            .map_err(|e| RiskError::from_js("fillText", e))?;

        canvas
            .to_data_url()
            .map_err(|e| RiskError::from_js("toDataURL", e))
    }

    fn blank_canvas_data_url(&self) -> Result<String> {
        self.sized_canvas()?
            .to_data_url()
            .map_err(|e| RiskError::from_js("toDataURL", e))
    }

    fn audio_frequency_data(&self) -> LocalBoxFuture<'static, Result<Vec<u8>>> {
        let rendering = match start_audio_render() {
            Ok(promise) => JsFuture::from(promise),
            Err(e) => return future::ready(Err(e)).boxed_local(),
        };

        async move {
            let buffer: AudioBuffer = rendering
                .await
                .map_err(|e| RiskError::from_js("startRendering", e))?
                .dyn_into()
                .map_err(|_| RiskError::ProbeException("rendered output is not an AudioBuffer".into()))?;
            let samples = buffer
                .get_channel_data(0)
                .map_err(|e| RiskError::from_js("getChannelData", e))?;
            Ok(spectrum::byte_frequency_data(&samples))
        }
        .boxed_local()
    }

    fn navigator_flags(&self) -> Result<NavigatorFlags> {
        let navigator = self.navigator()?;
        Ok(NavigatorFlags {
            cookie_enabled: self.navigator_prop("cookieEnabled")?.as_bool().unwrap_or(false),
            on_line: navigator.on_line(),
            do_not_track: self.navigator_prop("doNotTrack")?.as_string(),
            max_touch_points: self
                .navigator_prop("maxTouchPoints")?
                .as_f64()
                .unwrap_or(0.0) as u32,
            pdf_viewer_enabled: self
                .navigator_prop("pdfViewerEnabled")?
                .as_bool()
                .unwrap_or(false),
        })
    }

    fn location_href(&self) -> Result<String> {
        self.window()?
            .location()
            .href()
            .map_err(|e| RiskError::from_js("location.href", e))
    }

    fn query_permissions(
        &self,
        names: &'static [&'static str],
    ) -> LocalBoxFuture<'static, Result<Vec<PermissionState>>> {
        let permissions = match self.navigator_prop("permissions") {
            Ok(p) if !p.is_undefined() && !p.is_null() => p,
            Ok(_) => {
                return future::ready(Err(RiskError::unavailable("navigator.permissions")))
                    .boxed_local()
            }
            Err(e) => return future::ready(Err(e)).boxed_local(),
        };
        let query: Function = match Reflect::get(&permissions, &JsValue::from_str("query"))
            .ok()
            .and_then(|q| q.dyn_into().ok())
        {
            Some(q) => q,
            None => {
                return future::ready(Err(RiskError::AsyncProbeFailure(
                    "navigator.permissions.query is not callable".into(),
                )))
                .boxed_local()
            }
        };

        // Issue every query up front; each one settles independently.
        let pending: Vec<Option<JsFuture>> = names
            .iter()
            .map(|name| {
                let descriptor = Object::new();
                Reflect::set(&descriptor, &JsValue::from_str("name"), &JsValue::from_str(name))
                    .ok()?;
                let promise = Reflect::apply(&query, &permissions, &Array::of1(&descriptor)).ok()?;
                let promise: js_sys::Promise = promise.dyn_into().ok()?;
                Some(JsFuture::from(promise))
            })
            .collect();

        async move {
            let mut states = Vec::with_capacity(pending.len());
            for query in pending {
                let state = match query {
                    Some(fut) => match fut.await {
                        Ok(status) => Reflect::get(&status, &JsValue::from_str("state"))
                            .ok()
                            .and_then(|s| s.as_string())
                            .map(|s| PermissionState::from_state_str(&s))
                            .unwrap_or(PermissionState::Error),
                        Err(_) => PermissionState::Error,
                    },
                    None => PermissionState::Error,
                };
                states.push(state);
            }
            Ok(states)
        }
        .boxed_local()
    }
}

/// Oscillator -> destination on an offline context.
///
/// Offline rendering needs no user gesture and produces the samples
/// before the returned promise resolves.
fn start_audio_render() -> Result<js_sys::Promise> {
    let ctx = OfflineAudioContext::new_with_number_of_channels_and_length_and_sample_rate(
        1,
        AUDIO_RENDER_FRAMES,
        AUDIO_SAMPLE_RATE,
    )
    .map_err(|e| RiskError::from_js("new OfflineAudioContext", e))?;

    let oscillator = ctx
        .create_oscillator()
        .map_err(|e| RiskError::from_js("createOscillator", e))?;
    oscillator.set_type(OscillatorType::Triangle);
    oscillator.frequency().set_value(10_000.0);
    oscillator
        .connect_with_audio_node(&ctx.destination())
        .map_err(|e| RiskError::from_js("connect(destination)", e))?;
    oscillator
        .start()
        .map_err(|e| RiskError::from_js("oscillator.start", e))?;

    ctx.start_rendering()
        .map_err(|e| RiskError::from_js("startRendering", e))
}
