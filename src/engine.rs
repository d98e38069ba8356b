//! The audio engine: voice bus → master chain → analysis tap → master gain
//! → limiter → output and record taps.
//!
//! The engine is a plain stateful struct; the host owns it and drives
//! [`AudioEngine::process_block`] from whatever callback or render loop it
//! has. Nothing here spawns threads or touches global state.

use log::{info, warn};
use rand::Rng;

use crate::analysis::AnalysisHandle;
use crate::config::{EngineConfig, TriggerMode};
use crate::cues::CueKit;
use crate::effects::{Compressor, FxChain};
use crate::error::EngineError;
use crate::params;
use crate::recorder::{RecordedBuffer, Recorder};
use crate::voice::Voice;
use crate::voices::{VoiceBank, VoiceKey, DEFAULT_MAX_POLYPHONY};

/// Sample rates the engine will agree to run at.
const MIN_SAMPLE_RATE: f64 = 8_000.0;
const MAX_SAMPLE_RATE: f64 = 192_000.0;

/// Texture layer slots cycled or randomized by [`AudioEngine::play_multi`].
const LAYER_COUNT: usize = 3;

/// Convert a MIDI note number to its equal-tempered frequency.
pub fn midi_to_frequency(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

pub struct AudioEngine {
    sample_rate: f64,
    initialized: bool,

    voices: VoiceBank,
    chain: Option<FxChain>,
    master_gain: f64,
    limiter: Compressor,
    analysis: AnalysisHandle,
    recorder: Recorder,
    cues: CueKit,

    trigger_mode: TriggerMode,
    next_layer: usize,
}

impl AudioEngine {
    /// Build an engine bound to `sample_rate`. No audio resources exist
    /// until [`AudioEngine::initialize`] runs.
    pub fn new(sample_rate: f64) -> Self {
        AudioEngine {
            sample_rate,
            initialized: false,
            voices: VoiceBank::new(DEFAULT_MAX_POLYPHONY),
            chain: None,
            master_gain: params::master_gain(EngineConfig::default().master_volume),
            limiter: Compressor::limiter(sample_rate),
            analysis: AnalysisHandle::new(),
            recorder: Recorder::new(sample_rate as u32),
            cues: CueKit::new(sample_rate),
            trigger_mode: TriggerMode::Cycle,
            next_layer: 0,
        }
    }

    /// Allocate the effects chain and arm the output stages. Idempotent:
    /// calling again on a live engine is a logged no-op.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        if self.initialized {
            info!("engine already initialized");
            return Ok(());
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate)
            || !self.sample_rate.is_finite()
        {
            return Err(EngineError::UnsupportedContext {
                sample_rate: self.sample_rate,
            });
        }

        self.chain = Some(FxChain::new(self.sample_rate));
        let defaults = EngineConfig::default();
        self.limiter
            .configure_limiter(defaults.limiter_enabled, defaults.limiter_threshold);
        self.initialized = true;
        info!("engine initialized at {} Hz", self.sample_rate);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn ready(&self, operation: &str) -> bool {
        if !self.initialized {
            warn!("{operation} ignored: engine not initialized");
        }
        self.initialized
    }

    // ── Note triggering ──

    /// Start the primary voice for a note at an explicit frequency. The
    /// per-note reverb control in the config lands on the standard reverb
    /// stage's wet mix.
    pub fn play(&mut self, note: u8, frequency: f64, velocity: f64, config: &EngineConfig) {
        if !self.ready("play") {
            return;
        }
        self.apply_note_reverb(config);
        let voice = Voice::from_config(self.sample_rate, config, frequency, velocity, true);
        self.voices.insert(VoiceKey::Primary(note), voice);
    }

    /// Start a texture layer under a note in a specific layer slot.
    pub fn play_layer(
        &mut self,
        note: u8,
        layer: usize,
        frequency: f64,
        velocity: f64,
        config: &EngineConfig,
    ) {
        if !self.ready("play_layer") {
            return;
        }
        let voice = Voice::from_config(self.sample_rate, config, frequency, velocity, false);
        self.voices
            .insert(VoiceKey::Layer(note, layer % LAYER_COUNT), voice);
    }

    /// Start the primary voice plus one layer picked by the trigger mode.
    /// Returns the layer slot that fired.
    pub fn play_multi(
        &mut self,
        note: u8,
        frequency: f64,
        velocity: f64,
        config: &EngineConfig,
    ) -> usize {
        if !self.ready("play_multi") {
            return 0;
        }
        self.play(note, frequency, velocity, config);
        let layer = match self.trigger_mode {
            TriggerMode::Cycle => {
                let layer = self.next_layer;
                self.next_layer = (self.next_layer + 1) % LAYER_COUNT;
                layer
            }
            TriggerMode::Random => rand::thread_rng().gen_range(0..LAYER_COUNT),
        };
        self.play_layer(note, layer, frequency, velocity, config);
        layer
    }

    /// Release the primary voice and every layer of a note. Stopping a note
    /// that is not sounding is harmless.
    pub fn stop(&mut self, note: u8) {
        if !self.ready("stop") {
            return;
        }
        self.voices.release(VoiceKey::Primary(note));
        for layer in 0..LAYER_COUNT {
            self.voices.release(VoiceKey::Layer(note, layer));
        }
    }

    pub fn stop_all(&mut self) {
        self.voices.release_all();
    }

    pub fn set_trigger_mode(&mut self, mode: TriggerMode) {
        self.trigger_mode = mode;
    }

    pub fn live_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn set_max_polyphony(&mut self, ceiling: usize) {
        self.voices.set_max_polyphony(ceiling);
    }

    fn apply_note_reverb(&mut self, config: &EngineConfig) {
        if let Some(chain) = &mut self.chain {
            chain.set_reverb_mix(config.reverb);
            if config.reverb > 0.0 && !chain.reverb_enabled() {
                chain.set_reverb_enabled(true);
            }
        }
    }

    // ── Effect parameter updates ──

    pub fn update_distortion(&mut self, drive: f64, tone: f64, mix: f64, enabled: bool) {
        if !self.ready("update_distortion") {
            return;
        }
        if let Some(chain) = &mut self.chain {
            chain.update_distortion(drive, tone, mix, enabled);
        }
    }

    pub fn update_compressor(
        &mut self,
        threshold: f64,
        ratio: f64,
        attack: f64,
        release: f64,
        enabled: bool,
    ) {
        if !self.ready("update_compressor") {
            return;
        }
        if let Some(chain) = &mut self.chain {
            chain.update_compressor(threshold, ratio, attack, release, enabled);
        }
    }

    pub fn update_chorus(&mut self, rate: f64, depth: f64, mix: f64, enabled: bool) {
        if !self.ready("update_chorus") {
            return;
        }
        if let Some(chain) = &mut self.chain {
            chain.update_chorus(rate, depth, mix, enabled);
        }
    }

    pub fn update_delay(&mut self, time: f64, feedback: f64, mix: f64, enabled: bool) {
        if !self.ready("update_delay") {
            return;
        }
        if let Some(chain) = &mut self.chain {
            chain.update_delay(time, feedback, mix, enabled);
        }
    }

    pub fn update_reverb(&mut self, size: f64, damping: f64, mix: f64, enabled: bool) {
        if !self.ready("update_reverb") {
            return;
        }
        if let Some(chain) = &mut self.chain {
            chain.update_reverb(size, damping, mix, enabled);
        }
    }

    pub fn update_shimmer(&mut self, size: f64, highpass: f64, mix: f64, enabled: bool) {
        if !self.ready("update_shimmer") {
            return;
        }
        if let Some(chain) = &mut self.chain {
            chain.update_shimmer(size, highpass, mix, enabled);
        }
    }

    pub fn update_reverse(&mut self, size: f64, mix: f64, enabled: bool) {
        if !self.ready("update_reverse") {
            return;
        }
        if let Some(chain) = &mut self.chain {
            chain.update_reverse(size, mix, enabled);
        }
    }

    pub fn update_halftime(&mut self, amount: f64, mix: f64, enabled: bool) {
        if !self.ready("update_halftime") {
            return;
        }
        if let Some(chain) = &mut self.chain {
            chain.update_halftime(amount, mix, enabled);
        }
    }

    pub fn set_master_volume(&mut self, value: f64) {
        self.master_gain = params::master_gain(value);
    }

    pub fn update_limiter(&mut self, enabled: bool, threshold: f64) {
        self.limiter.configure_limiter(enabled, threshold);
    }

    // ── Transport ──

    pub fn start_recording(&mut self) {
        if !self.ready("start_recording") {
            return;
        }
        self.recorder.start();
    }

    pub fn stop_recording(&mut self) {
        self.recorder.stop();
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn recorded_buffer(&self) -> Option<RecordedBuffer> {
        self.recorder.recorded_buffer()
    }

    pub fn recorded_wav(&self) -> Option<Vec<u8>> {
        self.recorder.recorded_wav()
    }

    // ── Taps ──

    pub fn analysis(&self) -> AnalysisHandle {
        self.analysis.clone()
    }

    pub fn cues(&self) -> &CueKit {
        &self.cues
    }

    // ── Rendering ──

    /// Render one stereo block in place. An uninitialized engine renders
    /// silence.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        if !self.initialized {
            left[..frames].fill(0.0);
            right[..frames].fill(0.0);
            return;
        }

        for i in 0..frames {
            // Soft-clip the summed voice bus so stacked voices saturate
            // instead of wrapping.
            let bus = self.voices.next_sample().tanh() as f32;
            left[i] = bus;
            right[i] = bus;
        }
        self.voices.sweep();

        if let Some(chain) = &mut self.chain {
            chain.process_block(&mut left[..frames], &mut right[..frames]);
        }

        self.analysis.push_block(&left[..frames], &right[..frames]);

        let master = self.master_gain as f32;
        for i in 0..frames {
            left[i] *= master;
            right[i] *= master;
        }

        self.limiter
            .process_block(&mut left[..frames], &mut right[..frames]);

        self.recorder.push_block(&left[..frames], &right[..frames]);
    }
}
