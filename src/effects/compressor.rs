//! Feed-forward dynamics compressor with a soft knee, doubling as the
//! output limiter when configured with a steep ratio and hard knee.

use crate::params;

#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f64,

    /// Threshold in dB.
    pub threshold: f64,
    /// Compression ratio (4.0 = 4:1).
    pub ratio: f64,
    /// Knee width in dB (0 = hard knee).
    pub knee: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Release time in seconds.
    pub release: f64,
    /// Makeup gain in dB.
    pub makeup_gain: f64,

    enabled: bool,
    envelope: f64,
}

impl Compressor {
    pub fn new(sample_rate: f64) -> Self {
        Compressor {
            sample_rate,
            threshold: -24.0,
            ratio: 4.0,
            knee: 6.0,
            attack: 0.003,
            release: 0.25,
            makeup_gain: 0.0,
            enabled: false,
            envelope: 0.0,
        }
    }

    /// Hard-knee peak limiter. Starts transparent (1:1 at 0 dB) until
    /// [`Compressor::configure_limiter`] sets a ceiling.
    pub fn limiter(sample_rate: f64) -> Self {
        let mut c = Compressor::new(sample_rate);
        c.threshold = 0.0;
        c.ratio = 1.0;
        c.knee = 0.0;
        c.attack = 0.001;
        c.release = 0.05;
        c.makeup_gain = 0.0;
        c.enabled = true;
        c
    }

    /// Apply 0–100 control values. Makeup gain is derived automatically so
    /// heavier settings do not collapse the output level.
    pub fn update(&mut self, threshold: f64, ratio: f64, attack: f64, release: f64, enabled: bool) {
        self.threshold = params::compressor_threshold_db(threshold);
        self.ratio = params::compressor_ratio(ratio);
        self.attack = params::compressor_attack_seconds(attack);
        self.release = params::compressor_release_seconds(release);
        self.makeup_gain = params::makeup_gain_db(self.threshold, self.ratio);
        self.enabled = enabled;
    }

    /// Set the limiter ceiling from the 50–100 UI threshold range. Disabling
    /// flattens it back to a transparent 1:1 response instead of bypassing,
    /// so the envelope follower keeps tracking.
    pub fn configure_limiter(&mut self, enabled: bool, threshold: f64) {
        if enabled {
            self.threshold = params::limiter_threshold_db(threshold);
            self.ratio = 20.0;
        } else {
            self.threshold = 0.0;
            self.ratio = 1.0;
        }
    }

    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Gain reduction in dB (negative) for an input level in dB.
    #[inline]
    fn compute_gain(&self, input_db: f64) -> f64 {
        if self.knee <= 0.0 {
            if input_db <= self.threshold {
                0.0
            } else {
                (self.threshold - input_db) * (1.0 - 1.0 / self.ratio)
            }
        } else {
            let half_knee = self.knee / 2.0;
            let knee_start = self.threshold - half_knee;
            let knee_end = self.threshold + half_knee;

            if input_db <= knee_start {
                0.0
            } else if input_db >= knee_end {
                (self.threshold - input_db) * (1.0 - 1.0 / self.ratio)
            } else {
                let knee_factor = (input_db - knee_start) / self.knee;
                -knee_factor * knee_factor * (1.0 - 1.0 / self.ratio) * half_knee
            }
        }
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        if !self.enabled {
            return (left, right);
        }

        let input_level = (left.abs()).max(right.abs()) as f64;

        let attack_coef = (-1.0 / (self.attack * self.sample_rate)).exp();
        let release_coef = (-1.0 / (self.release * self.sample_rate)).exp();
        if input_level > self.envelope {
            self.envelope = attack_coef * self.envelope + (1.0 - attack_coef) * input_level;
        } else {
            self.envelope = release_coef * self.envelope + (1.0 - release_coef) * input_level;
        }

        let envelope_db = Self::linear_to_db(self.envelope);
        let total_gain_db = self.compute_gain(envelope_db) + self.makeup_gain;
        let gain = Self::db_to_linear(total_gain_db) as f32;

        (left * gain, right * gain)
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        for i in 0..left.len().min(right.len()) {
            let (out_l, out_r) = self.process(left[i], right[i]);
            left[i] = out_l;
            right[i] = out_r;
        }
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    /// Current gain reduction in dB, for metering.
    pub fn gain_reduction_db(&self) -> f64 {
        -self.compute_gain(Self::linear_to_db(self.envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engaged(threshold: f64, ratio: f64, attack: f64, release: f64) -> Compressor {
        let mut c = Compressor::new(44100.0);
        c.threshold = threshold;
        c.ratio = ratio;
        c.knee = 0.0;
        c.attack = attack;
        c.release = release;
        c.enabled = true;
        c
    }

    #[test]
    fn disabled_is_exact_passthrough() {
        let mut c = Compressor::new(44100.0);
        let (l, r) = c.process(0.9, -0.9);
        assert_eq!(l, 0.9);
        assert_eq!(r, -0.9);
    }

    #[test]
    fn passthrough_below_threshold() {
        let mut c = engaged(-20.0, 4.0, 0.001, 0.1);
        for _ in 0..1000 {
            c.process(0.05, 0.05);
        }
        let (out_l, out_r) = c.process(0.05, 0.05);
        assert!(
            (out_l - 0.05).abs() < 0.01,
            "below threshold output should match input, got {out_l}"
        );
        assert!((out_r - 0.05).abs() < 0.01);
    }

    #[test]
    fn reduces_loud_signals() {
        let mut c = engaged(-12.0, 4.0, 0.001, 0.1);
        for _ in 0..5000 {
            c.process(1.0, 1.0);
        }
        let (out_l, _) = c.process(1.0, 1.0);
        // 4:1 at 12 dB over threshold removes 9 dB.
        assert!(out_l < 0.5, "loud signal should be reduced, got {out_l}");
        assert!(out_l > 0.1, "should not over-compress, got {out_l}");
    }

    #[test]
    fn attack_lets_the_first_samples_through() {
        let mut c = engaged(-20.0, 10.0, 0.01, 0.5);
        let (first, _) = c.process(1.0, 1.0);
        for _ in 0..500 {
            c.process(1.0, 1.0);
        }
        let (later, _) = c.process(1.0, 1.0);
        assert!(
            first > later,
            "gain should fall over the attack: first={first}, later={later}"
        );
    }

    #[test]
    fn gain_recovers_after_release() {
        let mut c = engaged(-20.0, 10.0, 0.001, 0.05);
        for _ in 0..1000 {
            c.process(1.0, 1.0);
        }
        let (compressed, _) = c.process(0.1, 0.1);
        for _ in 0..5000 {
            c.process(0.1, 0.1);
        }
        let (released, _) = c.process(0.1, 0.1);
        assert!(
            released > compressed,
            "gain should recover: compressed={compressed}, released={released}"
        );
    }

    #[test]
    fn update_derives_makeup_gain() {
        let mut c = Compressor::new(44100.0);
        c.update(40.0, 50.0, 20.0, 30.0, true);
        let expected =
            params::makeup_gain_db(params::compressor_threshold_db(40.0), params::compressor_ratio(50.0));
        assert!((c.makeup_gain - expected).abs() < 1e-12);
    }

    #[test]
    fn limiter_clamps_peaks_near_ceiling() {
        let mut lim = Compressor::limiter(44100.0);
        lim.configure_limiter(true, 90.0);
        // -16 dB ceiling ≈ 0.158 linear; 20:1 leaves little overshoot.
        for _ in 0..10000 {
            lim.process(1.0, 1.0);
        }
        let (out, _) = lim.process(1.0, 1.0);
        assert!(out < 0.3, "limited peak should sit near the ceiling, got {out}");
    }

    #[test]
    fn disabled_limiter_is_transparent_after_settling() {
        let mut lim = Compressor::limiter(44100.0);
        lim.configure_limiter(false, 90.0);
        for _ in 0..1000 {
            lim.process(0.8, 0.8);
        }
        let (out, _) = lim.process(0.8, 0.8);
        assert!((out - 0.8).abs() < 1e-3, "1:1 at 0 dB should be unity, got {out}");
    }
}
