//! Stereo feedback delay with fractional-sample interpolated taps.

use crate::params;

const MAX_DELAY_SECONDS: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct Delay {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_pos: usize,
    sample_rate: f64,

    delay_seconds: f64,
    feedback: f64,
    mix: f64,
    enabled: bool,
}

impl Delay {
    pub fn new(sample_rate: f64) -> Self {
        let capacity = (sample_rate * MAX_DELAY_SECONDS) as usize + 1;
        Delay {
            buffer_l: vec![0.0; capacity],
            buffer_r: vec![0.0; capacity],
            write_pos: 0,
            sample_rate,
            delay_seconds: 0.25,
            feedback: 0.3,
            mix: 0.0,
            enabled: false,
        }
    }

    pub fn update(&mut self, time: f64, feedback: f64, mix: f64, enabled: bool) {
        self.delay_seconds = params::delay_time_seconds(time);
        self.feedback = params::delay_feedback(feedback);
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

        let delay_samples =
            (self.delay_seconds * self.sample_rate).min(self.buffer_l.len() as f64 - 2.0);
        let tap_l = Self::read_interpolated(&self.buffer_l, self.write_pos, delay_samples);
        let tap_r = Self::read_interpolated(&self.buffer_r, self.write_pos, delay_samples);

        let fb = self.feedback as f32;
        self.buffer_l[self.write_pos] = left + tap_l * fb;
        self.buffer_r[self.write_pos] = right + tap_r * fb;
        self.write_pos = (self.write_pos + 1) % self.buffer_l.len();

        let mix = self.mix as f32;
        (
            left * (1.0 - mix) + tap_l * mix,
            right * (1.0 - mix) + tap_r * mix,
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
