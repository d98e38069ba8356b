//! Voice — one sounding note: oscillator → lowpass filter → gain envelope,
//! with optional vibrato and the unconditional note-on pitch drop.

use std::f64::consts::PI;

use crate::config::EngineConfig;
use crate::envelope::Envelope;
use crate::filter::{BiquadFilter, FilterType};
use crate::oscillator::{Oscillator, Waveform};
use crate::params;

/// Duration of the percussive pitch drop at note-on.
const PITCH_DROP_SECONDS: f64 = 0.05;

/// A released voice is force-finished this long after its release ramp
/// should have ended, so a stalled envelope can never leak a voice.
const RELEASE_SAFETY_SECONDS: f64 = 0.25;

/// Texture layers sit under the primary voice at reduced level.
const LAYER_GAIN: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct Voice {
    oscillator: Oscillator,
    envelope: Envelope,
    filter: BiquadFilter,
    /// Raw velocity that produced this voice, kept for introspection.
    pub velocity: f64,

    vibrato_depth_hz: f64,
    vibrato_rate_hz: f64,
    vibrato_phase: f64,

    sample_rate: f64,
    /// Samples elapsed since release, once released.
    released_for: Option<usize>,
    kill_after: usize,
    finished: bool,
}

impl Voice {
    /// Build and start a voice from a config snapshot.
    ///
    /// Primary voices start their pitch drop at 4× the target frequency,
    /// layer voices at 2× and at reduced gain.
    pub fn from_config(
        sample_rate: f64,
        config: &EngineConfig,
        frequency: f64,
        velocity: f64,
        is_primary: bool,
    ) -> Self {
        let curved = params::apply_velocity_curve(velocity, config.velocity_curve);

        let mut oscillator =
            Oscillator::new(Waveform::from_wave_param(config.wave), sample_rate);
        let drop_multiplier = if is_primary { 4.0 } else { 2.0 };
        oscillator.glide(frequency * drop_multiplier, frequency, PITCH_DROP_SECONDS);

        let mut filter = BiquadFilter::new(FilterType::Lowpass, sample_rate);
        let cutoff = params::filter_cutoff_hz(config.filter)
            * params::velocity_scale(curved, params::norm(config.velocity_to_filter));
        filter.set_frequency(cutoff);
        filter.set_q(params::filter_q(config.resonance));

        let mut envelope = Envelope::new(sample_rate);
        envelope.attack = params::attack_seconds(config.attack);
        envelope.decay = params::decay_seconds(config.decay);
        envelope.sustain = params::sustain_level(config.sustain);
        envelope.release = params::release_seconds(config.release);

        let layer_gain = if is_primary { 1.0 } else { LAYER_GAIN };
        let peak = params::master_gain(config.gain)
            * params::velocity_scale(curved, params::norm(config.velocity_to_volume))
            * layer_gain;
        envelope.gate_on(peak);

        Voice {
            oscillator,
            envelope,
            filter,
            velocity,
            vibrato_depth_hz: params::norm(config.vibrato) * 10.0,
            vibrato_rate_hz: 5.0,
            vibrato_phase: 0.0,
            sample_rate,
            released_for: None,
            kill_after: 0,
            finished: false,
        }
    }

    /// Begin the release phase. Idempotent.
    pub fn note_off(&mut self) {
        if self.released_for.is_some() {
            return;
        }
        self.envelope.gate_off();
        let tail = self.envelope.release + RELEASE_SAFETY_SECONDS;
        self.kill_after = (tail * self.sample_rate) as usize;
        self.released_for = Some(0);
    }

    pub fn next_sample(&mut self) -> f64 {
        if self.finished {
            return 0.0;
        }

        let fm = if self.vibrato_depth_hz > 0.0 {
            let fm = self.vibrato_depth_hz * (2.0 * PI * self.vibrato_phase).sin();
            self.vibrato_phase = (self.vibrato_phase + self.vibrato_rate_hz / self.sample_rate) % 1.0;
            fm
        } else {
            0.0
        };

        let osc = self.oscillator.next_sample(fm);
        let filtered = self.filter.process(osc);
        let env = self.envelope.next_sample();

        if self.envelope.is_finished() {
            self.finished = true;
        }
        if let Some(elapsed) = self.released_for.as_mut() {
            *elapsed += 1;
            if *elapsed > self.kill_after {
                self.finished = true;
            }
        }

        filtered * env
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_released(&self) -> bool {
        self.released_for.is_some()
    }
}
