//! Chorus — three modulated delay taps per channel off one shared buffer.
//!
//! Each tap runs its own LFO at a slightly detuned rate and phase so the
//! voices drift against each other instead of beating in lockstep.

use std::f64::consts::PI;

use crate::params;

/// Center delay the modulation swings around.
const BASE_DELAY_SECONDS: f64 = 0.015;

/// Detune multipliers for the three tap LFOs.
const RATE_SPREAD: [f64; 3] = [1.0, 1.13, 0.87];

/// Starting LFO phases, left channel. The right channel adds a quarter turn
/// for stereo width.
const PHASE_SPREAD: [f64; 3] = [0.0, 1.0 / 3.0, 2.0 / 3.0];

#[derive(Debug, Clone)]
pub struct Chorus {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_pos: usize,
    sample_rate: f64,

    phases: [f64; 3],
    rate_hz: f64,
    depth_seconds: f64,
    mix: f64,
    enabled: bool,
}

impl Chorus {
    pub fn new(sample_rate: f64) -> Self {
        // Base delay plus maximum excursion, with headroom for interpolation.
        let capacity = (sample_rate * 0.05) as usize + 2;
        Chorus {
            buffer_l: vec![0.0; capacity],
            buffer_r: vec![0.0; capacity],
            write_pos: 0,
            sample_rate,
            phases: PHASE_SPREAD,
            rate_hz: 1.0,
            depth_seconds: 0.002,
            mix: 0.0,
            enabled: false,
        }
    }

    pub fn update(&mut self, rate: f64, depth: f64, mix: f64, enabled: bool) {
        self.rate_hz = params::chorus_rate_hz(rate);
        self.depth_seconds = params::chorus_depth_seconds(depth);
        self.mix = params::norm(mix);
        self.enabled = enabled;
    }

    fn read_interpolated(buffer: &[f32], write_pos: usize, delay_samples: f64) -> f32 {
        let len = buffer.len() as f64;
        let read_pos = (write_pos as f64 - delay_samples + len) % len;
        let i = read_pos as usize;
        let frac = (read_pos - i as f64) as f32;
        let a = buffer[i];
        let b = buffer[(i + 1) % buffer.len()];
        a + frac * (b - a)
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        if !self.enabled {
            return (left, right);
        }

        self.buffer_l[self.write_pos] = left;
        self.buffer_r[self.write_pos] = right;

        let mut wet_l = 0.0_f32;
        let mut wet_r = 0.0_f32;
        for tap in 0..3 {
            let lfo_l = (2.0 * PI * self.phases[tap]).sin();
            let lfo_r = (2.0 * PI * (self.phases[tap] + 0.25)).sin();
            let delay_l = (BASE_DELAY_SECONDS + self.depth_seconds * lfo_l) * self.sample_rate;
            let delay_r = (BASE_DELAY_SECONDS + self.depth_seconds * lfo_r) * self.sample_rate;
            wet_l += Self::read_interpolated(&self.buffer_l, self.write_pos, delay_l);
            wet_r += Self::read_interpolated(&self.buffer_r, self.write_pos, delay_r);

            let step = self.rate_hz * RATE_SPREAD[tap] / self.sample_rate;
            self.phases[tap] = (self.phases[tap] + step) % 1.0;
        }
        wet_l /= 3.0;
        wet_r /= 3.0;

        self.write_pos = (self.write_pos + 1) % self.buffer_l.len();

        let mix = self.mix as f32;
        (
            left * (1.0 - mix) + wet_l * mix,
            right * (1.0 - mix) + wet_r * mix,
        )
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        for i in 0..left.len().min(right.len()) {
            let (l, r) = self.process(left[i], right[i]);
            left[i] = l;
            right[i] = r;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_is_exact_passthrough() {
        let mut c = Chorus::new(44100.0);
        let (l, r) = c.process(0.4, 0.6);
        assert_eq!(l, 0.4);
        assert_eq!(r, 0.6);
    }

    #[test]
    fn wet_output_stays_bounded() {
        let mut c = Chorus::new(44100.0);
        c.update(80.0, 100.0, 100.0, true);
        for i in 0..44100 {
            let x = (2.0 * PI * 440.0 * i as f64 / 44100.0).sin() as f32;
            let (l, r) = c.process(x, x);
            assert!(l.abs() <= 1.1, "left out of range: {l}");
            assert!(r.abs() <= 1.1, "right out of range: {r}");
        }
    }

    #[test]
    fn channels_decorrelate() {
        let mut c = Chorus::new(44100.0);
        c.update(50.0, 100.0, 100.0, true);
        let mut differs = false;
        for i in 0..8820 {
            let x = (2.0 * PI * 440.0 * i as f64 / 44100.0).sin() as f32;
            let (l, r) = c.process(x, x);
            if (l - r).abs() > 1e-4 {
                differs = true;
            }
        }
        assert!(differs, "stereo taps should diverge on identical input");
    }
}
