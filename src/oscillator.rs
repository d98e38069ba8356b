//! Anti-aliased oscillator with PolyBLEP and a percussive pitch-drop glide.

use std::f64::consts::PI;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    /// Quantize the 0–100 "wave" control into one of four discrete shapes.
    /// This is a deliberate thresholding, not a continuous morph.
    pub fn from_wave_param(value: f64) -> Self {
        if value > 75.0 {
            Waveform::Sawtooth
        } else if value > 50.0 {
            Waveform::Square
        } else if value > 25.0 {
            Waveform::Triangle
        } else {
            Waveform::Sine
        }
    }
}

/// A band-limited oscillator (PolyBLEP) with an exponential frequency glide.
///
/// The glide implements the note-on pitch drop: frequency starts at a
/// multiple of the target and decays exponentially to the target.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    current_freq: f64,
    target_freq: f64,
    /// Per-sample multiplicative step while gliding.
    glide_ratio: f64,
    glide_remaining: usize,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            current_freq: 440.0,
            target_freq: 440.0,
            glide_ratio: 1.0,
            glide_remaining: 0,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Set a fixed frequency with no glide.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.current_freq = frequency;
        self.target_freq = frequency;
        self.glide_remaining = 0;
        self.glide_ratio = 1.0;
    }

    /// Start at `start_freq` and glide exponentially to `target_freq` over
    /// `seconds`. Used for the unconditional note-on punch.
    pub fn glide(&mut self, start_freq: f64, target_freq: f64, seconds: f64) {
        let samples = ((seconds * self.sample_rate) as usize).max(1);
        self.current_freq = start_freq.max(1e-3);
        self.target_freq = target_freq.max(1e-3);
        self.glide_ratio = (self.target_freq / self.current_freq).powf(1.0 / samples as f64);
        self.glide_remaining = samples;
    }

    pub fn frequency(&self) -> f64 {
        self.current_freq
    }

    /// Generate the next sample. `fm_hz` is an additive frequency offset for
    /// this sample only (vibrato).
    pub fn next_sample(&mut self, fm_hz: f64) -> f64 {
        if self.glide_remaining > 0 {
            self.current_freq *= self.glide_ratio;
            self.glide_remaining -= 1;
            if self.glide_remaining == 0 {
                self.current_freq = self.target_freq;
            }
        }

        let freq = (self.current_freq + fm_hz).max(0.0);
        let inc = freq / self.sample_rate;

        let sample = match self.waveform {
            Waveform::Sine => self.sine(),
            Waveform::Sawtooth => self.sawtooth(inc),
            Waveform::Square => self.square(inc),
            Waveform::Triangle => self.triangle(),
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn sine(&self) -> f64 {
        (2.0 * PI * self.phase).sin()
    }

    /// Naive ramp with a PolyBLEP correction at the wrap discontinuity.
    fn sawtooth(&self, inc: f64) -> f64 {
        let naive = 2.0 * self.phase - 1.0;
        naive - poly_blep(self.phase, inc)
    }

    /// Square via two opposed PolyBLEP step corrections.
    fn square(&self, inc: f64) -> f64 {
        let mut value = if self.phase < 0.5 { 1.0 } else { -1.0 };
        value += poly_blep(self.phase, inc);
        value -= poly_blep((self.phase + 0.5) % 1.0, inc);
        value
    }

    /// Piecewise-linear triangle. Harmonics fall off fast enough that the
    /// naive form aliases far less than saw/square; no correction applied.
    fn triangle(&self) -> f64 {
        if self.phase < 0.5 {
            4.0 * self.phase - 1.0
        } else {
            3.0 - 4.0 * self.phase
        }
    }
}

/// PolyBLEP (polynomial band-limited step) correction.
///
/// `t` is the phase [0, 1), `dt` the phase increment per sample. Returns the
/// correction to subtract from a naive waveform at its discontinuities.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}
