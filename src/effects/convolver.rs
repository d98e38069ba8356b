//! Convolution reverb built on generated noise impulses.
//!
//! Each reverb stage owns a stereo impulse response, white noise under a
//! power-law envelope, and convolves with it using partitioned overlap-add
//! FFT convolution. Partitions are one block of [`PARTITION`] samples, so
//! the wet path carries a fixed latency of one partition; for a reverb tail
//! that offset is inaudible.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::Rng;
use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::filter::{BiquadFilter, FilterType};

/// Samples per convolution partition.
const PARTITION: usize = 512;
const FFT_LEN: usize = 2 * PARTITION;
const SPECTRUM_LEN: usize = FFT_LEN / 2 + 1;

/// Direction of the impulse envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpulseShape {
    /// Loud onset fading to silence — standard and shimmer reverbs.
    Decay,
    /// Silence swelling to a loud end — reverse reverb.
    Rise,
}

/// A stereo noise impulse under a power-law envelope.
#[derive(Debug, Clone)]
pub struct ImpulseResponse {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl ImpulseResponse {
    /// Generate an impulse of `round(sample_rate * seconds)` samples per
    /// channel. `exponent` controls how sharply the envelope curves; the two
    /// channels use independent noise so the tail stays decorrelated.
    pub fn generate(sample_rate: f64, seconds: f64, exponent: f64, shape: ImpulseShape) -> Self {
        let len = (sample_rate * seconds).round() as usize;
        let mut rng = rand::thread_rng();
        let mut channel = |len: usize| -> Vec<f32> {
            (0..len)
                .map(|i| {
                    let t = i as f64 / len.max(1) as f64;
                    let env = match shape {
                        ImpulseShape::Decay => (1.0 - t).powf(exponent),
                        ImpulseShape::Rise => t.powf(exponent),
                    };
                    (rng.gen_range(-1.0..1.0) * env) as f32
                })
                .collect()
        };
        ImpulseResponse {
            left: channel(len),
            right: channel(len),
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Single-channel partitioned convolver.
struct ChannelConvolver {
    fft: Arc<dyn RealToComplex<f32>>,
    ifft: Arc<dyn ComplexToReal<f32>>,

    /// Impulse partitions, frequency domain, oldest offset last.
    partitions: Vec<Vec<Complex<f32>>>,
    /// Spectra of recent input blocks, newest first, same length as
    /// `partitions`.
    history: VecDeque<Vec<Complex<f32>>>,

    input_fifo: Vec<f32>,
    output_fifo: VecDeque<f32>,
    overlap: Vec<f32>,
}

impl ChannelConvolver {
    fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        ChannelConvolver {
            fft: planner.plan_fft_forward(FFT_LEN),
            ifft: planner.plan_fft_inverse(FFT_LEN),
            partitions: Vec::new(),
            history: VecDeque::new(),
            input_fifo: Vec::with_capacity(PARTITION),
            output_fifo: VecDeque::new(),
            overlap: vec![0.0; PARTITION],
        }
    }

    /// Load an impulse, normalized to unit energy so wet level does not
    /// scale with impulse duration. Clears all running state.
    fn set_impulse(&mut self, impulse: &[f32]) {
        let energy: f32 = impulse.iter().map(|x| x * x).sum();
        let gain = if energy > 0.0 { energy.sqrt().recip() } else { 0.0 };

        self.partitions.clear();
        for chunk in impulse.chunks(PARTITION) {
            let mut time = vec![0.0_f32; FFT_LEN];
            for (dst, &src) in time.iter_mut().zip(chunk) {
                *dst = src * gain;
            }
            let mut spectrum = vec![Complex::default(); SPECTRUM_LEN];
            self.fft
                .process(&mut time, &mut spectrum)
                .expect("forward FFT length invariant");
            self.partitions.push(spectrum);
        }

        self.history.clear();
        for _ in 0..self.partitions.len() {
            self.history.push_back(vec![Complex::default(); SPECTRUM_LEN]);
        }
        self.input_fifo.clear();
        self.output_fifo.clear();
        self.overlap = vec![0.0; PARTITION];
    }

    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        if self.partitions.is_empty() {
            return 0.0;
        }
        self.input_fifo.push(input);
        if self.input_fifo.len() == PARTITION {
            self.process_partition();
        }
        self.output_fifo.pop_front().unwrap_or(0.0)
    }

    fn process_partition(&mut self) {
        let mut time = vec![0.0_f32; FFT_LEN];
        time[..PARTITION].copy_from_slice(&self.input_fifo);
        self.input_fifo.clear();

        let mut spectrum = vec![Complex::default(); SPECTRUM_LEN];
        self.fft
            .process(&mut time, &mut spectrum)
            .expect("forward FFT length invariant");
        self.history.push_front(spectrum);
        self.history.truncate(self.partitions.len());

        // history[j] is the input block j partitions ago, which lines up
        // with the impulse partition at offset j.
        let mut acc = vec![Complex::default(); SPECTRUM_LEN];
        for (part, past) in self.partitions.iter().zip(self.history.iter()) {
            for ((a, h), x) in acc.iter_mut().zip(part).zip(past) {
                *a += h * x;
            }
        }

        // The inverse transform requires purely real DC and Nyquist bins.
        acc[0].im = 0.0;
        acc[SPECTRUM_LEN - 1].im = 0.0;

        let mut out = vec![0.0_f32; FFT_LEN];
        self.ifft
            .process(&mut acc, &mut out)
            .expect("inverse FFT length invariant");

        let scale = 1.0 / FFT_LEN as f32;
        for i in 0..PARTITION {
            self.output_fifo.push_back(out[i] * scale + self.overlap[i]);
            self.overlap[i] = out[PARTITION + i] * scale;
        }
    }
}

impl std::fmt::Debug for ChannelConvolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConvolver")
            .field("partitions", &self.partitions.len())
            .field("pending", &self.input_fifo.len())
            .finish()
    }
}

/// One reverb-family stage: impulse generation, optional high-pass
/// pre-filter on the wet path, stereo convolution, wet/dry blend.
#[derive(Debug)]
pub struct ConvolverReverb {
    left: ChannelConvolver,
    right: ChannelConvolver,
    pre_filter: Option<(BiquadFilter, BiquadFilter)>,

    sample_rate: f64,
    shape: ImpulseShape,
    size_seconds: f64,
    exponent: f64,

    mix: f64,
    enabled: bool,
}

impl ConvolverReverb {
    pub fn new(sample_rate: f64, shape: ImpulseShape, size_seconds: f64, exponent: f64) -> Self {
        let mut reverb = ConvolverReverb {
            left: ChannelConvolver::new(),
            right: ChannelConvolver::new(),
            pre_filter: None,
            sample_rate,
            shape,
            size_seconds,
            exponent,
            mix: 0.0,
            enabled: false,
        };
        reverb.regenerate();
        reverb
    }

    fn regenerate(&mut self) {
        let impulse =
            ImpulseResponse::generate(self.sample_rate, self.size_seconds, self.exponent, self.shape);
        self.left.set_impulse(&impulse.left);
        self.right.set_impulse(&impulse.right);
    }

    /// Apply mapped physical parameters; `mix` is a [0, 1] fraction. The
    /// impulse is only regenerated when its duration or envelope actually
    /// changed; mix and enable changes are free.
    pub fn set_params(&mut self, size_seconds: f64, exponent: f64, mix: f64, enabled: bool) {
        if size_seconds != self.size_seconds || exponent != self.exponent {
            self.size_seconds = size_seconds;
            self.exponent = exponent;
            self.regenerate();
        }
        self.mix = mix.clamp(0.0, 1.0);
        self.enabled = enabled;
    }

    /// Override only the wet/dry mix, leaving the impulse untouched.
    pub fn set_mix(&mut self, mix: f64) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Install or retune a high-pass filter ahead of the convolver.
    pub fn set_highpass(&mut self, cutoff_hz: f64) {
        match &mut self.pre_filter {
            Some((l, r)) => {
                l.set_frequency(cutoff_hz);
                r.set_frequency(cutoff_hz);
            }
            None => {
                let mut l = BiquadFilter::new(FilterType::Highpass, self.sample_rate);
                let mut r = BiquadFilter::new(FilterType::Highpass, self.sample_rate);
                l.set_frequency(cutoff_hz);
                r.set_frequency(cutoff_hz);
                self.pre_filter = Some((l, r));
            }
        }
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        if !self.enabled {
            return (left, right);
        }

        let (mut in_l, mut in_r) = (left, right);
        if let Some((fl, fr)) = &mut self.pre_filter {
            in_l = fl.process(in_l as f64) as f32;
            in_r = fr.process(in_r as f64) as f32;
        }

        let wet_l = self.left.process_sample(in_l);
        let wet_r = self.right.process_sample(in_r);

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
    fn impulse_length_matches_duration() {
        let ir = ImpulseResponse::generate(44100.0, 0.5, 2.0, ImpulseShape::Decay);
        assert_eq!(ir.len(), 22050);
        let ir = ImpulseResponse::generate(48000.0, 1.25, 1.0, ImpulseShape::Rise);
        assert_eq!(ir.len(), 60000);
    }

    fn window_rms(samples: &[f32], windows: usize) -> Vec<f64> {
        let w = samples.len() / windows;
        (0..windows)
            .map(|i| {
                let chunk = &samples[i * w..(i + 1) * w];
                let sum: f64 = chunk.iter().map(|&x| (x as f64) * (x as f64)).sum();
                (sum / w as f64).sqrt()
            })
            .collect()
    }

    #[test]
    fn decay_impulse_envelope_falls() {
        let ir = ImpulseResponse::generate(44100.0, 0.5, 2.0, ImpulseShape::Decay);
        let rms = window_rms(&ir.left, 10);
        for pair in rms.windows(2) {
            assert!(pair[1] < pair[0], "decay envelope must fall: {rms:?}");
        }
    }

    #[test]
    fn rise_impulse_envelope_climbs() {
        let ir = ImpulseResponse::generate(44100.0, 0.5, 2.0, ImpulseShape::Rise);
        let rms = window_rms(&ir.right, 10);
        for pair in rms.windows(2) {
            assert!(pair[1] > pair[0], "rise envelope must climb: {rms:?}");
        }
    }

    #[test]
    fn convolver_reproduces_a_delta_impulse() {
        // A unit-impulse IR makes the convolver a pure delay: the first
        // partition drains as silence, then the block arrives intact.
        let mut conv = ChannelConvolver::new();
        let mut impulse = vec![0.0_f32; PARTITION];
        impulse[0] = 1.0;
        conv.set_impulse(&impulse);

        let mut output = Vec::new();
        output.push(conv.process_sample(1.0));
        for _ in 0..(PARTITION * 3) {
            output.push(conv.process_sample(0.0));
        }

        let latency = PARTITION - 1;
        for (i, &s) in output.iter().enumerate() {
            if i == latency {
                assert!((s - 1.0).abs() < 1e-3, "delta expected at {i}, got {s}");
            } else {
                assert!(s.abs() < 1e-3, "unexpected energy at {i}: {s}");
            }
        }
    }

    #[test]
    fn disabled_reverb_is_exact_passthrough() {
        let mut reverb = ConvolverReverb::new(8000.0, ImpulseShape::Decay, 0.25, 2.0);
        let (l, r) = reverb.process(0.3, -0.3);
        assert_eq!(l, 0.3);
        assert_eq!(r, -0.3);
    }

    #[test]
    fn enabled_reverb_produces_a_tail() {
        let mut reverb = ConvolverReverb::new(8000.0, ImpulseShape::Decay, 0.25, 2.0);
        reverb.set_params(0.25, 2.0, 1.0, true);

        reverb.process(1.0, 1.0);
        let mut tail_energy = 0.0_f64;
        // Feed silence past the partition latency; the impulse must ring.
        for _ in 0..8000 {
            let (l, r) = reverb.process(0.0, 0.0);
            tail_energy += (l as f64) * (l as f64) + (r as f64) * (r as f64);
        }
        assert!(tail_energy > 0.0, "reverb tail should carry energy");
    }

    #[test]
    fn set_params_same_values_keeps_state() {
        let mut reverb = ConvolverReverb::new(8000.0, ImpulseShape::Decay, 0.25, 2.0);
        reverb.set_params(0.25, 2.0, 0.5, true);
        reverb.process(1.0, 1.0);
        let pending_before = reverb.left.input_fifo.len();
        reverb.set_params(0.25, 2.0, 0.8, true);
        assert_eq!(
            reverb.left.input_fifo.len(),
            pending_before,
            "mix-only updates must not reset the convolver"
        );
    }
}
