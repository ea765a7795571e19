#![cfg(target_arch = "wasm32")]

use crate::engine::{Lab, TimeSpeed};
use crate::models::body::{body_catalog, Body, BodyInfo};
use crate::{LabConfig, LabError, PendulumEvent};
use wasm_bindgen::prelude::*;

fn to_js(err: LabError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub fn available_bodies() -> js_sys::Array {
    let out = js_sys::Array::new();
    for info in body_catalog() {
        out.push(&body_info_to_js(info));
    }
    out
}

#[wasm_bindgen]
pub fn lab_config_defaults() -> JsValue {
    serde_wasm_bindgen::to_value(&LabConfig::default()).unwrap_or(JsValue::NULL)
}

fn body_info_to_js(info: &BodyInfo) -> JsValue {
    let obj = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("id"), &JsValue::from_str(info.id));
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("name"), &JsValue::from_str(info.name));
    let gravity = info.gravity.map(JsValue::from_f64).unwrap_or(JsValue::NULL);
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("gravity"), &gravity);
    JsValue::from(obj)
}

#[wasm_bindgen]
pub struct WasmLab {
    lab: Lab,
}

#[wasm_bindgen]
impl WasmLab {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmLab {
        WasmLab { lab: Lab::default() }
    }

    /// Build a lab from a config object:
    /// {
    ///   has_period_timer?: bool,
    ///   ruler_initially_visible?: bool,
    ///   pendula?: [{ length, mass, angle? }, { length, mass, angle? }]
    /// }
    #[wasm_bindgen(js_name = "newFromConfig")]
    pub fn new_from_config(config: JsValue) -> Result<WasmLab, JsValue> {
        let cfg: LabConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("invalid config: {}", e)))?;
        let lab = Lab::new(cfg).map_err(to_js)?;
        Ok(WasmLab { lab })
    }

    pub fn step(&mut self, dt: f64) { self.lab.step(dt); }

    pub fn step_manual(&mut self) { self.lab.step_manual(); }

    pub fn reset(&mut self) { self.lab.reset(); }

    pub fn return_pendula(&mut self) { self.lab.return_pendula(); }

    pub fn set_playing(&mut self, playing: bool) { self.lab.set_playing(playing); }

    pub fn set_slow_motion(&mut self, slow: bool) {
        self.lab.set_time_speed(if slow { TimeSpeed::Slow } else { TimeSpeed::Normal });
    }

    pub fn gravity(&self) -> f64 { self.lab.gravity() }

    pub fn set_gravity(&mut self, gravity: f64) { self.lab.set_gravity(gravity); }

    pub fn set_friction(&mut self, friction: f64) { self.lab.set_friction(friction); }

    pub fn selected_body(&self) -> String { self.lab.selected_body().id().to_string() }

    pub fn select_body(&mut self, id: &str) -> Result<(), JsValue> {
        let body = Body::from_id(id).map_err(to_js)?;
        self.lab.select_body(body);
        Ok(())
    }

    pub fn set_length(&mut self, index: usize, length: f64) -> Result<(), JsValue> {
        self.lab.set_length(index, length).map_err(to_js)
    }

    pub fn set_mass(&mut self, index: usize, mass: f64) -> Result<(), JsValue> {
        self.lab.set_mass(index, mass).map_err(to_js)
    }

    pub fn set_number_of_active_pendula(&mut self, count: usize) -> Result<(), JsValue> {
        self.lab.set_number_of_active_pendula(count).map_err(to_js)
    }

    pub fn grab(&mut self, index: usize) -> Result<(), JsValue> {
        self.lab.set_user_controlled(index, true).map_err(to_js)
    }

    pub fn drag(&mut self, index: usize, angle: f64) -> Result<(), JsValue> {
        self.lab.drag_pendulum(index, angle).map_err(to_js)
    }

    pub fn release(&mut self, index: usize) -> Result<(), JsValue> {
        self.lab.set_user_controlled(index, false).map_err(to_js)
    }

    pub fn set_period_trace_visible(&mut self, visible: bool) {
        self.lab.set_period_trace_visible(visible);
    }

    pub fn period_trace_faded(&mut self, index: usize) -> Result<(), JsValue> {
        self.lab.period_trace_faded(index).map_err(to_js)
    }

    pub fn set_period_timer_visible(&mut self, visible: bool) {
        self.lab.set_period_timer_visible(visible);
    }

    pub fn set_period_timer_running(&mut self, running: bool) {
        self.lab.set_period_timer_running(running);
    }

    pub fn set_timed_pendulum(&mut self, index: usize) -> Result<(), JsValue> {
        self.lab.set_timed_pendulum(index).map_err(to_js)
    }

    pub fn period_timer_elapsed(&self) -> f64 {
        self.lab.period_timer().map(|t| t.elapsed_time()).unwrap_or(0.0)
    }

    pub fn approximate_period(&self, index: usize) -> Result<f64, JsValue> {
        let env = self.lab.environment();
        let pendulum = self.lab.pendulum(index).map_err(to_js)?;
        Ok(pendulum.approximate_period(env))
    }

    /// Per pendulum: [angle, x, y, kinetic, potential, thermal].
    pub fn states(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.lab.pendula().len() * 6);
        for p in self.lab.pendula() {
            out.push(p.angle() as f32);
            out.push(p.position().x as f32);
            out.push(p.position().y as f32);
            out.push(p.kinetic_energy() as f32);
            out.push(p.potential_energy() as f32);
            out.push(p.thermal_energy() as f32);
        }
        out
    }

    pub fn snapshot(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.lab.snapshot()).unwrap_or(JsValue::NULL)
    }

    /// Queued events of one pendulum since the last call.
    pub fn drain_events(&mut self, index: usize) -> Result<JsValue, JsValue> {
        let events: Vec<PendulumEvent> = self.lab.drain_events(index).map_err(to_js)?;
        serde_wasm_bindgen::to_value(&events).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
