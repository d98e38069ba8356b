//! Exponential-ramp ADSR envelope.
//!
//! All ramps are multiplicative per sample, never linear, and never start or
//! end at exactly zero: levels are floored at [`ENVELOPE_FLOOR`] so ramp
//! ratios stay finite and note edges stay click-free. Release always ramps
//! from the *current* level, so releasing mid-decay produces no jump.

use crate::params::{ENVELOPE_FLOOR, MIN_STAGE_SECONDS};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Sustain level as a fraction of the attack peak.
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,

    peak: f64,
    stage: Stage,
    level: f64,
    sample_rate: f64,
    stage_samples: usize,
    stage_counter: usize,
    /// Per-sample multiplier for the current ramp.
    ratio: f64,
    stage_target: f64,
}

impl Envelope {
    pub fn new(sample_rate: f64) -> Self {
        Envelope {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
            peak: 1.0,
            stage: Stage::Idle,
            level: 0.0,
            sample_rate,
            stage_samples: 0,
            stage_counter: 0,
            ratio: 1.0,
            stage_target: 0.0,
        }
    }

    /// Trigger the envelope toward `peak` (velocity-scaled by the caller).
    pub fn gate_on(&mut self, peak: f64) {
        self.peak = peak.max(ENVELOPE_FLOOR);
        let start = self.level.max(ENVELOPE_FLOOR);
        self.level = start;
        self.begin_ramp(Stage::Attack, self.attack, self.peak);
    }

    /// Begin the release phase from whatever level is current.
    pub fn gate_off(&mut self) {
        if self.stage == Stage::Idle {
            return;
        }
        self.level = self.level.max(ENVELOPE_FLOOR);
        self.begin_ramp(Stage::Release, self.release, ENVELOPE_FLOOR);
    }

    /// Generate the next envelope sample in [0, peak].
    pub fn next_sample(&mut self) -> f64 {
        match self.stage {
            Stage::Idle => {
                self.level = 0.0;
            }
            Stage::Sustain => {
                self.level = (self.peak * self.sustain).max(ENVELOPE_FLOOR);
            }
            Stage::Attack | Stage::Decay | Stage::Release => {
                self.level *= self.ratio;
                self.stage_counter += 1;
                if self.stage_counter >= self.stage_samples {
                    self.level = self.stage_target;
                    self.advance_stage();
                }
            }
        }
        self.level
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn is_released(&self) -> bool {
        matches!(self.stage, Stage::Release | Stage::Idle)
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    fn begin_ramp(&mut self, stage: Stage, seconds: f64, target: f64) {
        let seconds = seconds.max(MIN_STAGE_SECONDS);
        let samples = ((seconds * self.sample_rate) as usize).max(1);
        let start = self.level.max(ENVELOPE_FLOOR);
        self.stage = stage;
        self.stage_samples = samples;
        self.stage_counter = 0;
        self.stage_target = target.max(ENVELOPE_FLOOR);
        self.ratio = (self.stage_target / start).powf(1.0 / samples as f64);
    }

    fn advance_stage(&mut self) {
        match self.stage {
            Stage::Attack => {
                let sustain_target = (self.peak * self.sustain).max(ENVELOPE_FLOOR);
                self.begin_ramp(Stage::Decay, self.decay, sustain_target);
            }
            Stage::Decay => {
                self.stage = Stage::Sustain;
            }
            Stage::Release => {
                self.stage = Stage::Idle;
                self.level = 0.0;
            }
            Stage::Idle | Stage::Sustain => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(env: &mut Envelope, samples: usize) {
        for _ in 0..samples {
            env.next_sample();
        }
    }

    #[test]
    fn starts_idle() {
        let env = Envelope::new(44100.0);
        assert!(env.is_finished());
    }

    #[test]
    fn attack_reaches_peak() {
        let mut env = Envelope::new(44100.0);
        env.attack = 0.01;
        env.gate_on(0.8);

        let mut max_level: f64 = 0.0;
        for _ in 0..500 {
            max_level = max_level.max(env.next_sample());
        }
        assert!(
            (max_level - 0.8).abs() < 0.01,
            "attack should reach peak 0.8, got {max_level}"
        );
    }

    #[test]
    fn zero_attack_is_floored_not_degenerate() {
        let mut env = Envelope::new(44100.0);
        env.attack = 0.0;
        env.decay = 0.0;
        env.sustain = 1.0;
        env.gate_on(1.0);

        // Must hit peak within the floored minimum stage time.
        let floor_samples = (MIN_STAGE_SECONDS * 44100.0) as usize + 1;
        settle(&mut env, floor_samples);
        let s = env.next_sample();
        assert!(s.is_finite());
        assert!((s - 1.0).abs() < 0.02, "should hold near peak, got {s}");

        // And keep holding until release is requested.
        settle(&mut env, 44100);
        assert!((env.next_sample() - 1.0).abs() < 0.02);
        assert!(!env.is_finished());
    }

    #[test]
    fn decay_settles_at_sustain_fraction() {
        let mut env = Envelope::new(44100.0);
        env.attack = 0.005;
        env.decay = 0.01;
        env.sustain = 0.5;
        env.gate_on(0.8);

        settle(&mut env, 2000);
        let s = env.next_sample();
        assert!((s - 0.4).abs() < 0.01, "sustain should be 0.4, got {s}");
    }

    #[test]
    fn release_from_current_level_mid_decay() {
        let mut env = Envelope::new(44100.0);
        env.attack = 0.005;
        env.decay = 1.0;
        env.sustain = 0.1;
        env.release = 0.05;
        env.gate_on(1.0);

        // Stop partway through the decay; release must pick up from there.
        settle(&mut env, 4000);
        let before = env.level();
        assert!(before > 0.1, "should still be decaying, got {before}");
        env.gate_off();
        let after = env.next_sample();
        assert!(
            (after - before).abs() < before * 0.01,
            "release must not jump: {before} -> {after}"
        );

        settle(&mut env, 44100 / 10);
        assert!(env.is_finished());
    }

    #[test]
    fn release_never_overshoots_below_zero() {
        let mut env = Envelope::new(44100.0);
        env.release = 0.01;
        env.gate_on(1.0);
        settle(&mut env, 1000);
        env.gate_off();
        for _ in 0..5000 {
            let s = env.next_sample();
            assert!((0.0..=1.0).contains(&s), "envelope out of range: {s}");
        }
        assert!(env.is_finished());
    }

    #[test]
    fn gate_off_when_idle_is_a_no_op() {
        let mut env = Envelope::new(44100.0);
        env.gate_off();
        assert!(env.is_finished());
        assert_eq!(env.next_sample(), 0.0);
    }
}
