//! Engine configuration — the caller-owned snapshot of synthesis parameters.
//!
//! All knob values are normalized 0–100 as they arrive from the control
//! surface. The engine takes a `&EngineConfig` at every note trigger and
//! effect update; it never stores one, so the caller remains the single
//! source of truth for patch state.

use serde::{Deserialize, Serialize};

/// Velocity response curve applied before sensitivity weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VelocityCurve {
    /// Identity.
    Linear,
    /// v² — soft notes stay quiet longer, hard notes get loud quickly.
    Exponential,
    /// √v — soft notes get louder faster, hard notes plateau.
    Logarithmic,
}

/// How `play_multi` picks the texture layer accompanying each primary voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Round-robin over the three layers.
    Cycle,
    /// Uniformly random layer per trigger.
    Random,
}

/// Snapshot of all synthesis parameters at the moment of a trigger or an
/// effect update. Knob fields are normalized 0–100.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Oscillator shape selector, quantized into four waveforms.
    pub wave: f64,
    /// Voice lowpass cutoff.
    pub filter: f64,
    /// Voice filter resonance.
    pub resonance: f64,
    /// Vibrato depth; 0 disables the LFO entirely.
    pub vibrato: f64,
    /// Pre-velocity output gain.
    pub gain: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    /// Wet mix for the standard reverb stage, applied at trigger time.
    pub reverb: f64,
    pub distortion_drive: f64,
    pub distortion_tone: f64,
    pub distortion_mix: f64,
    pub velocity_curve: VelocityCurve,
    /// How strongly curved velocity scales output gain.
    pub velocity_to_volume: f64,
    /// How strongly curved velocity scales filter cutoff.
    pub velocity_to_filter: f64,
    pub master_volume: f64,
    pub limiter_enabled: bool,
    /// Limiter threshold on the 50–100 UI scale.
    pub limiter_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            wave: 25.0,
            filter: 50.0,
            resonance: 30.0,
            vibrato: 0.0,
            gain: 80.0,
            attack: 5.0,
            decay: 30.0,
            sustain: 70.0,
            release: 20.0,
            reverb: 20.0,
            distortion_drive: 0.0,
            distortion_tone: 50.0,
            distortion_mix: 0.0,
            velocity_curve: VelocityCurve::Linear,
            velocity_to_volume: 80.0,
            velocity_to_filter: 50.0,
            master_volume: 80.0,
            limiter_enabled: true,
            limiter_threshold: 90.0,
        }
    }
}
