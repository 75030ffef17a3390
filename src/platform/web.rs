//! Browser bindings
//!
//! The page owns the animation loop: it calls `frame(performance.now())`
//! from `requestAnimationFrame` and draws whatever comes back.

use std::sync::Once;

use js_sys::Float32Array;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use crate::error::SimError;
use crate::runtime::Engine;
use crate::sim::BuffOverlay;
use crate::tuning::Tuning;

static LOGGER: Once = Once::new();

fn init_logging() {
    LOGGER.call_once(|| {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"logger already initialised".into());
        }
    });
}

fn to_js(err: SimError) -> JsValue {
    JsError::new(&err.to_string()).into()
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or_else(js_sys::Date::now, |p| p.now())
}

#[wasm_bindgen]
pub struct WebEngine {
    engine: Engine,
    canvas: HtmlCanvasElement,
    overlays: Vec<BuffOverlay>,
}

#[wasm_bindgen]
impl WebEngine {
    /// Attach to the canvas with id `canvas_id`, optionally overriding tunables
    /// with a JSON object. Fails without starting anything if the canvas is missing.
    pub fn mount(canvas_id: &str, tuning_json: Option<String>) -> Result<WebEngine, JsValue> {
        init_logging();

        let missing = || SimError::MountPointMissing(canvas_id.to_string());
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(missing)
            .map_err(to_js)?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .and_then(|el| el.dyn_into().ok())
            .ok_or_else(missing)
            .map_err(to_js)?;

        let tuning = match tuning_json {
            Some(json) => Tuning::from_json(&json).map_err(to_js)?,
            None => Tuning::default(),
        };

        let width = canvas.client_width().max(1) as f32;
        let height = canvas.client_height().max(1) as f32;
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);

        let seed = js_sys::Date::now() as u64;
        let engine = Engine::new(tuning, width, height, seed, now_ms()).map_err(to_js)?;
        log::info!("Mounted on #{}", canvas_id);

        Ok(WebEngine {
            engine,
            canvas,
            overlays: Vec::new(),
        })
    }

    /// Animation callback. Returns interleaved particle positions on render frames.
    pub fn frame(&mut self, now: f64) -> Option<Float32Array> {
        let frame = self.engine.on_animation_frame(now)?;
        self.overlays = frame.overlays;
        Some(Float32Array::from(frame.particles.as_slice()))
    }

    /// Buff overlays of the last rendered frame as JSON
    pub fn overlays_json(&self) -> String {
        serde_json::to_string(&self.overlays).unwrap_or_else(|e| {
            log::warn!("Overlay serialisation failed: {}", e);
            String::from("[]")
        })
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, now: f64) {
        self.engine.pointer_move(x, y, now);
    }

    pub fn touch_start(&mut self, x: f32, y: f32, now: f64) {
        self.engine.touch_start(x, y, now);
    }

    pub fn touch_move(&mut self, x: f32, y: f32, now: f64) {
        self.engine.touch_move(x, y, now);
    }

    pub fn touch_end(&mut self, now: f64) {
        self.engine.touch_end(now);
    }

    /// Re-read the canvas size and queue a rebuild
    pub fn resize(&mut self, now: f64) {
        let width = self.canvas.client_width().max(1);
        let height = self.canvas.client_height().max(1);
        self.canvas.set_width(width as u32);
        self.canvas.set_height(height as u32);
        self.engine.resize(width as f32, height as f32, now);
    }

    pub fn debug_spawn_outbreak(&mut self) {
        self.engine.debug_spawn_outbreak();
    }

    pub fn debug_spawn_anomaly(&mut self) {
        self.engine.debug_spawn_anomaly();
    }

    pub fn debug_spawn_glyph(&mut self) -> bool {
        self.engine.debug_spawn_glyph()
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }
}
