//! Master effects chain.
//!
//! Stage order is data, not call-site structure: [`CHAIN_ORDER`] is the
//! single authority on what runs and in what sequence, and
//! [`FxChain::process_block`] dispatches over it. Reordering the chain is a
//! one-line edit.

pub mod chorus;
pub mod compressor;
pub mod convolver;
pub mod delay;
pub mod distortion;
pub mod halftime;

pub use chorus::Chorus;
pub use compressor::Compressor;
pub use convolver::{ConvolverReverb, ImpulseResponse, ImpulseShape};
pub use delay::Delay;
pub use distortion::Distortion;
pub use halftime::HalfTime;

use crate::params;

/// The serial stages of the master chain, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Distortion,
    Compressor,
    Chorus,
    Delay,
    Reverb,
    Shimmer,
    Reverse,
    HalfTime,
}

/// Processing order of the master chain.
pub const CHAIN_ORDER: [StageKind; 8] = [
    StageKind::Distortion,
    StageKind::Compressor,
    StageKind::Chorus,
    StageKind::Delay,
    StageKind::Reverb,
    StageKind::Shimmer,
    StageKind::Reverse,
    StageKind::HalfTime,
];

/// Envelope exponent for the shimmer and reverse impulses; only the
/// standard reverb exposes damping as a control.
const FIXED_IMPULSE_EXPONENT: f64 = 2.0;

#[derive(Debug)]
pub struct FxChain {
    distortion: Distortion,
    compressor: Compressor,
    chorus: Chorus,
    delay: Delay,
    reverb: ConvolverReverb,
    shimmer: ConvolverReverb,
    reverse: ConvolverReverb,
    halftime: HalfTime,
}

impl FxChain {
    /// Build the chain with every stage disabled. Impulse responses are
    /// generated here, once, at their default sizes.
    pub fn new(sample_rate: f64) -> Self {
        let mut shimmer = ConvolverReverb::new(
            sample_rate,
            ImpulseShape::Decay,
            params::shimmer_size_seconds(50.0),
            FIXED_IMPULSE_EXPONENT,
        );
        shimmer.set_highpass(params::shimmer_highpass_hz(50.0));

        FxChain {
            distortion: Distortion::new(sample_rate),
            compressor: Compressor::new(sample_rate),
            chorus: Chorus::new(sample_rate),
            delay: Delay::new(sample_rate),
            reverb: ConvolverReverb::new(
                sample_rate,
                ImpulseShape::Decay,
                params::reverb_size_seconds(50.0),
                params::reverb_damping_exponent(50.0),
            ),
            shimmer,
            reverse: ConvolverReverb::new(
                sample_rate,
                ImpulseShape::Rise,
                params::reverse_size_seconds(50.0),
                FIXED_IMPULSE_EXPONENT,
            ),
            halftime: HalfTime::new(),
        }
    }

    pub fn update_distortion(&mut self, drive: f64, tone: f64, mix: f64, enabled: bool) {
        self.distortion.update(drive, tone, mix, enabled);
    }

    pub fn update_compressor(
        &mut self,
        threshold: f64,
        ratio: f64,
        attack: f64,
        release: f64,
        enabled: bool,
    ) {
        self.compressor.update(threshold, ratio, attack, release, enabled);
    }

    pub fn update_chorus(&mut self, rate: f64, depth: f64, mix: f64, enabled: bool) {
        self.chorus.update(rate, depth, mix, enabled);
    }

    pub fn update_delay(&mut self, time: f64, feedback: f64, mix: f64, enabled: bool) {
        self.delay.update(time, feedback, mix, enabled);
    }

    pub fn update_reverb(&mut self, size: f64, damping: f64, mix: f64, enabled: bool) {
        self.reverb.set_params(
            params::reverb_size_seconds(size),
            params::reverb_damping_exponent(damping),
            params::norm(mix),
            enabled,
        );
    }

    /// Overwrite only the standard reverb's wet mix, used by the per-note
    /// reverb control.
    pub fn set_reverb_mix(&mut self, mix: f64) {
        self.reverb.set_mix(params::norm(mix));
    }

    pub fn reverb_enabled(&self) -> bool {
        self.reverb.is_enabled()
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        self.reverb.set_enabled(enabled);
    }

    pub fn update_shimmer(&mut self, size: f64, highpass: f64, mix: f64, enabled: bool) {
        self.shimmer.set_params(
            params::shimmer_size_seconds(size),
            FIXED_IMPULSE_EXPONENT,
            params::norm(mix),
            enabled,
        );
        self.shimmer.set_highpass(params::shimmer_highpass_hz(highpass));
    }

    pub fn update_reverse(&mut self, size: f64, mix: f64, enabled: bool) {
        self.reverse.set_params(
            params::reverse_size_seconds(size),
            FIXED_IMPULSE_EXPONENT,
            params::norm(mix),
            enabled,
        );
    }

    pub fn update_halftime(&mut self, amount: f64, mix: f64, enabled: bool) {
        self.halftime.update(amount, mix, enabled);
    }

    /// Run one stereo block through every stage in [`CHAIN_ORDER`].
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        for stage in CHAIN_ORDER {
            match stage {
                StageKind::Distortion => self.distortion.process_block(left, right),
                StageKind::Compressor => self.compressor.process_block(left, right),
                StageKind::Chorus => self.chorus.process_block(left, right),
                StageKind::Delay => self.delay.process_block(left, right),
                StageKind::Reverb => self.reverb.process_block(left, right),
                StageKind::Shimmer => self.shimmer.process_block(left, right),
                StageKind::Reverse => self.reverse.process_block(left, right),
                StageKind::HalfTime => self.halftime.process_block(left, right),
            }
        }
    }
}
