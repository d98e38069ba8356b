//! Half-time stage.
//!
//! The wet path is currently the input itself: no buffering or playback-rate
//! manipulation happens yet, so the stage is audibly transparent at any
//! setting. It still owns its slot in the chain and its amount × mix blend so
//! the control surface behaves consistently.
//! TODO: real half-speed granular playback for the wet path.

use crate::params;

#[derive(Debug, Clone)]
pub struct HalfTime {
    blend: f64,
    enabled: bool,
}

impl HalfTime {
    pub fn new() -> Self {
        HalfTime {
            blend: 0.0,
            enabled: false,
        }
    }

    pub fn update(&mut self, amount: f64, mix: f64, enabled: bool) {
        self.blend = params::halftime_blend(amount, mix);
        self.enabled = enabled;
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        if !self.enabled {
            return (left, right);
        }
        let blend = self.blend as f32;
        let (wet_l, wet_r) = (left, right);
        (
            left * (1.0 - blend) + wet_l * blend,
            right * (1.0 - blend) + wet_r * blend,
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

impl Default for HalfTime {
    fn default() -> Self {
        HalfTime::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_at_any_setting() {
        let mut ht = HalfTime::new();
        ht.update(100.0, 100.0, true);
        let (l, r) = ht.process(0.3, -0.8);
        assert!((l - 0.3).abs() < 1e-7);
        assert!((r + 0.8).abs() < 1e-7);
    }

    #[test]
    fn disabled_is_exact_passthrough() {
        let mut ht = HalfTime::new();
        let (l, r) = ht.process(0.5, 0.5);
        assert_eq!(l, 0.5);
        assert_eq!(r, 0.5);
    }
}
