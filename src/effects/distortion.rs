//! Distortion — waveshaper with a drive-steepened transfer curve and a
//! post-shaper tone filter.

use crate::filter::{BiquadFilter, FilterType};
use crate::params;

const CURVE_LEN: usize = 2048;

#[derive(Debug, Clone)]
pub struct Distortion {
    /// Transfer curve sampled over x ∈ [-1, 1], regenerated per update.
    curve: Vec<f32>,
    tone_l: BiquadFilter,
    tone_r: BiquadFilter,
    mix: f64,
    enabled: bool,
}

impl Distortion {
    pub fn new(sample_rate: f64) -> Self {
        let mut tone_l = BiquadFilter::new(FilterType::Lowpass, sample_rate);
        let mut tone_r = BiquadFilter::new(FilterType::Lowpass, sample_rate);
        tone_l.set_frequency(params::distortion_tone_hz(50.0));
        tone_r.set_frequency(params::distortion_tone_hz(50.0));
        Distortion {
            curve: params::distortion_curve(0.0, CURVE_LEN),
            tone_l,
            tone_r,
            mix: 0.0,
            enabled: false,
        }
    }

    pub fn update(&mut self, drive: f64, tone: f64, mix: f64, enabled: bool) {
        self.curve = params::distortion_curve(drive, CURVE_LEN);
        let cutoff = params::distortion_tone_hz(tone);
        self.tone_l.set_frequency(cutoff);
        self.tone_r.set_frequency(cutoff);
        self.mix = params::norm(mix);
        self.enabled = enabled;
    }

    /// Look up the transfer curve with linear interpolation.
    #[inline]
    fn shape(&self, x: f32) -> f32 {
        let pos = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * (CURVE_LEN - 1) as f32;
        let i = pos as usize;
        let frac = pos - i as f32;
        let a = self.curve[i];
        let b = self.curve[(i + 1).min(CURVE_LEN - 1)];
        a + frac * (b - a)
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        if !self.enabled {
            return (left, right);
        }
        let wet_l = self.tone_l.process(self.shape(left) as f64) as f32;
        let wet_r = self.tone_r.process(self.shape(right) as f64) as f32;
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
    use std::f32::consts::PI;

    #[test]
    fn disabled_is_exact_passthrough() {
        let mut d = Distortion::new(44100.0);
        let (l, r) = d.process(0.5, -0.5);
        assert_eq!(l, 0.5);
        assert_eq!(r, -0.5);
    }

    #[test]
    fn full_drive_full_mix_stays_bounded_on_sine() {
        let mut d = Distortion::new(44100.0);
        d.update(100.0, 100.0, 100.0, true);
        for i in 0..44100 {
            let x = (2.0 * PI * 220.0 * i as f32 / 44100.0).sin();
            let (l, r) = d.process(x, x);
            assert!((-1.0..=1.0).contains(&l), "left out of range: {l}");
            assert!((-1.0..=1.0).contains(&r), "right out of range: {r}");
        }
    }

    #[test]
    fn shaper_handles_out_of_range_input() {
        let mut d = Distortion::new(44100.0);
        d.update(80.0, 100.0, 100.0, true);
        // Inputs beyond [-1, 1] clamp into the curve domain.
        let (l, _) = d.process(3.0, -3.0);
        assert!(l.is_finite());
        assert!(l.abs() <= 1.0);
    }

    #[test]
    fn update_is_idempotent() {
        let mut a = Distortion::new(44100.0);
        let mut b = Distortion::new(44100.0);
        a.update(60.0, 40.0, 70.0, true);
        b.update(60.0, 40.0, 70.0, true);
        b.update(60.0, 40.0, 70.0, true);
        let (la, _) = a.process(0.3, 0.3);
        let (lb, _) = b.process(0.3, 0.3);
        assert_eq!(la, lb);
    }
}
