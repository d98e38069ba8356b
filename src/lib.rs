pub mod analysis;
pub mod config;
pub mod cues;
pub mod effects;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod oscillator;
pub mod params;
pub mod recorder;
pub mod voice;
pub mod voices;

pub use crate::analysis::AnalysisHandle;
pub use crate::config::{EngineConfig, TriggerMode, VelocityCurve};
pub use crate::cues::CueKit;
pub use crate::engine::{midi_to_frequency, AudioEngine};
pub use crate::error::EngineError;
pub use crate::recorder::RecordedBuffer;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the engine version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed engine handle. Holds the engine and the current patch
/// config; the host pushes config objects and numeric control changes in,
/// and pulls rendered blocks, analysis snapshots, and WAV takes out.
#[wasm_bindgen]
pub struct WasmEngine {
    inner: AudioEngine,
    config: EngineConfig,
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64) -> WasmEngine {
        WasmEngine {
            inner: AudioEngine::new(sample_rate),
            config: EngineConfig::default(),
        }
    }

    pub fn initialize(&mut self) -> Result<(), JsValue> {
        self.inner.initialize().map_err(js_err)
    }

    /// Replace the patch config from a JS object. Missing fields fall back
    /// to their defaults. Output-stage fields take effect immediately; the
    /// rest apply at the next trigger.
    pub fn set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        self.config = serde_wasm_bindgen::from_value(config).map_err(js_err)?;
        self.inner.set_master_volume(self.config.master_volume);
        self.inner
            .update_limiter(self.config.limiter_enabled, self.config.limiter_threshold);
        Ok(())
    }

    pub fn config(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.config).map_err(js_err)
    }

    // ── Notes ──

    pub fn play(&mut self, note: u8, velocity: f64) {
        let config = self.config.clone();
        self.inner
            .play(note, engine::midi_to_frequency(note), velocity, &config);
    }

    /// Trigger the primary voice plus a texture layer; returns the layer
    /// slot that fired.
    pub fn play_multi(&mut self, note: u8, velocity: f64) -> usize {
        let config = self.config.clone();
        self.inner
            .play_multi(note, engine::midi_to_frequency(note), velocity, &config)
    }

    pub fn stop(&mut self, note: u8) {
        self.inner.stop(note);
    }

    pub fn stop_all(&mut self) {
        self.inner.stop_all();
    }

    pub fn set_trigger_mode(&mut self, mode: &str) {
        let mode = match mode {
            "random" => TriggerMode::Random,
            _ => TriggerMode::Cycle,
        };
        self.inner.set_trigger_mode(mode);
    }

    pub fn live_voices(&self) -> usize {
        self.inner.live_voices()
    }

    // ── Rendering ──

    /// Render `frames` stereo frames and return them interleaved L/R for an
    /// AudioWorklet to de-interleave.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut left = vec![0.0_f32; frames];
        let mut right = vec![0.0_f32; frames];
        self.inner.process_block(&mut left, &mut right);
        let mut out = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            out.push(left[i]);
            out.push(right[i]);
        }
        out
    }

    // ── Effect controls ──

    pub fn update_distortion(&mut self, drive: f64, tone: f64, mix: f64, enabled: bool) {
        self.inner.update_distortion(drive, tone, mix, enabled);
    }

    pub fn update_compressor(
        &mut self,
        threshold: f64,
        ratio: f64,
        attack: f64,
        release: f64,
        enabled: bool,
    ) {
        self.inner
            .update_compressor(threshold, ratio, attack, release, enabled);
    }

    pub fn update_chorus(&mut self, rate: f64, depth: f64, mix: f64, enabled: bool) {
        self.inner.update_chorus(rate, depth, mix, enabled);
    }

    pub fn update_delay(&mut self, time: f64, feedback: f64, mix: f64, enabled: bool) {
        self.inner.update_delay(time, feedback, mix, enabled);
    }

    pub fn update_reverb(&mut self, size: f64, damping: f64, mix: f64, enabled: bool) {
        self.inner.update_reverb(size, damping, mix, enabled);
    }

    pub fn update_shimmer(&mut self, size: f64, highpass: f64, mix: f64, enabled: bool) {
        self.inner.update_shimmer(size, highpass, mix, enabled);
    }

    pub fn update_reverse(&mut self, size: f64, mix: f64, enabled: bool) {
        self.inner.update_reverse(size, mix, enabled);
    }

    pub fn update_halftime(&mut self, amount: f64, mix: f64, enabled: bool) {
        self.inner.update_halftime(amount, mix, enabled);
    }

    pub fn set_master_volume(&mut self, value: f64) {
        self.inner.set_master_volume(value);
    }

    pub fn update_limiter(&mut self, enabled: bool, threshold: f64) {
        self.inner.update_limiter(enabled, threshold);
    }

    // ── Recording ──

    pub fn start_recording(&mut self) {
        self.inner.start_recording();
    }

    pub fn stop_recording(&mut self) {
        self.inner.stop_recording();
    }

    pub fn is_recording(&self) -> bool {
        self.inner.is_recording()
    }

    /// The last take as WAV bytes, or `undefined` if nothing was captured.
    pub fn recorded_wav(&self) -> Option<Vec<u8>> {
        self.inner.recorded_wav()
    }

    // ── Analysis ──

    pub fn waveform(&self) -> Vec<f32> {
        self.inner.analysis().waveform()
    }

    pub fn spectrum(&self) -> Vec<f32> {
        self.inner.analysis().spectrum()
    }

    pub fn level(&self) -> f32 {
        self.inner.analysis().level()
    }

    // ── UI cues ──

    pub fn cue_lightning(&self) -> Vec<f32> {
        self.inner.cues().render_lightning()
    }

    pub fn cue_pluck(&self) -> Vec<f32> {
        self.inner.cues().render_pluck()
    }

    pub fn cue_forge(&self) -> Vec<f32> {
        self.inner.cues().render_forge()
    }
}
