//! UI cue sounds — short one-shot renders for interface feedback.
//!
//! The kit is constructed with a sample rate and handed to whoever needs
//! it; nothing here touches global state. Each render returns a mono buffer
//! the host mixes or plays however it likes.

use std::f64::consts::PI;

use rand::Rng;

use crate::envelope::Envelope;
use crate::filter::{BiquadFilter, FilterType};
use crate::oscillator::{Oscillator, Waveform};

/// Output level of every cue, well under the instrument itself.
const CUE_GAIN: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct CueKit {
    sample_rate: f64,
}

impl CueKit {
    pub fn new(sample_rate: f64) -> Self {
        CueKit { sample_rate }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// A 50 ms crack of high-passed noise with an instant decay.
    pub fn render_lightning(&self) -> Vec<f32> {
        let len = (self.sample_rate * 0.05) as usize;
        let mut rng = rand::thread_rng();
        let mut filter = BiquadFilter::new(FilterType::Highpass, self.sample_rate);
        filter.set_frequency(2000.0);

        (0..len)
            .map(|i| {
                let t = i as f64 / len as f64;
                let noise: f64 = rng.gen_range(-1.0..1.0);
                let env = (1.0 - t).powi(2);
                (filter.process(noise) * env * CUE_GAIN) as f32
            })
            .collect()
    }

    /// A plucked string: three decaying harmonics over a fast envelope.
    pub fn render_pluck(&self) -> Vec<f32> {
        let len = (self.sample_rate * 0.4) as usize;
        let fundamental = 660.0;
        let harmonics = [(1.0, 1.0), (2.0, 0.5), (3.0, 0.25)];

        let mut envelope = Envelope::new(self.sample_rate);
        envelope.attack = 0.005;
        envelope.decay = 0.3;
        envelope.sustain = 0.0;
        envelope.gate_on(1.0);

        (0..len)
            .map(|i| {
                let t = i as f64 / self.sample_rate;
                let tone: f64 = harmonics
                    .iter()
                    .map(|&(mult, gain)| gain * (2.0 * PI * fundamental * mult * t).sin())
                    .sum();
                (tone / 1.75 * envelope.next_sample() * CUE_GAIN) as f32
            })
            .collect()
    }

    /// An anvil strike: a sine drop into a short triangle resonance.
    pub fn render_forge(&self) -> Vec<f32> {
        let len = (self.sample_rate * 0.3) as usize;
        let mut strike = Oscillator::new(Waveform::Sine, self.sample_rate);
        strike.glide(400.0, 100.0, 0.08);
        let mut ring = Oscillator::new(Waveform::Triangle, self.sample_rate);
        ring.set_frequency(820.0);

        (0..len)
            .map(|i| {
                let t = i as f64 / len as f64;
                let env = (1.0 - t).powi(3);
                let mixed = strike.next_sample(0.0) * 0.7 + ring.next_sample(0.0) * 0.3;
                (mixed * env * CUE_GAIN) as f32
            })
            .collect()
    }
}
