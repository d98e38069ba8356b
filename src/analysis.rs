//! Analysis tap — a shared window onto the post-chain signal for meters
//! and scopes.
//!
//! The engine pushes mono-summed blocks into a fixed ring; readers pull a
//! time-domain snapshot, a magnitude spectrum, or an RMS level whenever they
//! redraw. The handle is cheaply cloneable and all access goes through one
//! mutex, so readers never observe a half-written window.

use std::sync::{Arc, Mutex};

use realfft::RealFftPlanner;

/// Samples retained in the analysis window. Also the FFT size.
pub const WINDOW_SIZE: usize = 2048;

#[derive(Debug)]
struct AnalysisState {
    ring: Vec<f32>,
    write_pos: usize,
}

#[derive(Debug, Clone)]
pub struct AnalysisHandle {
    state: Arc<Mutex<AnalysisState>>,
}

impl AnalysisHandle {
    pub fn new() -> Self {
        AnalysisHandle {
            state: Arc::new(Mutex::new(AnalysisState {
                ring: vec![0.0; WINDOW_SIZE],
                write_pos: 0,
            })),
        }
    }

    /// Fold a stereo block into the ring as a mono sum.
    pub(crate) fn push_block(&self, left: &[f32], right: &[f32]) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        for i in 0..left.len().min(right.len()) {
            let pos = state.write_pos;
            state.ring[pos] = (left[i] + right[i]) * 0.5;
            state.write_pos = (pos + 1) % WINDOW_SIZE;
        }
    }

    /// The last [`WINDOW_SIZE`] samples, oldest first.
    pub fn waveform(&self) -> Vec<f32> {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut out = Vec::with_capacity(WINDOW_SIZE);
        out.extend_from_slice(&state.ring[state.write_pos..]);
        out.extend_from_slice(&state.ring[..state.write_pos]);
        out
    }

    /// Magnitude spectrum of the current window, `WINDOW_SIZE / 2 + 1` bins.
    pub fn spectrum(&self) -> Vec<f32> {
        let mut window = self.waveform();
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(WINDOW_SIZE);
        let mut spectrum = fft.make_output_vec();
        fft.process(&mut window, &mut spectrum)
            .expect("forward FFT length invariant");
        let scale = 1.0 / WINDOW_SIZE as f32;
        spectrum.iter().map(|bin| bin.norm() * scale).collect()
    }

    /// RMS level of the current window.
    pub fn level(&self) -> f32 {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sum: f64 = state.ring.iter().map(|&x| (x as f64) * (x as f64)).sum();
        (sum / WINDOW_SIZE as f64).sqrt() as f32
    }
}

impl Default for AnalysisHandle {
    fn default() -> Self {
        AnalysisHandle::new()
    }
}
