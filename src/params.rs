//! Parameter mapping — normalized 0–100 control values to physical units.
//!
//! Every function here is pure and idempotent. Inputs outside [0, 100] are
//! clamped rather than left undefined, so a misbehaving control surface can
//! never push an effect into an unstable region.

use std::f64::consts::PI;

use crate::config::VelocityCurve;

/// Normalize a 0–100 control value to [0, 1].
#[inline]
pub fn norm(value: f64) -> f64 {
    (value / 100.0).clamp(0.0, 1.0)
}

// ── Envelope ──

/// Attack/decay/release ramps shorter than this are mathematically degenerate
/// for exponential ramps, so every stage time is floored here.
pub const MIN_STAGE_SECONDS: f64 = 0.005;

/// Exponential ramps can never start or end at exactly zero.
pub const ENVELOPE_FLOOR: f64 = 0.001;

/// Attack: 0–100 ms.
pub fn attack_seconds(value: f64) -> f64 {
    (norm(value) * 0.1).max(MIN_STAGE_SECONDS)
}

/// Decay: 0–2 s.
pub fn decay_seconds(value: f64) -> f64 {
    (norm(value) * 2.0).max(MIN_STAGE_SECONDS)
}

/// Release: 0–2 s.
pub fn release_seconds(value: f64) -> f64 {
    (norm(value) * 2.0).max(MIN_STAGE_SECONDS)
}

/// Sustain level as a fraction of the attack peak.
pub fn sustain_level(value: f64) -> f64 {
    norm(value)
}

// ── Velocity ──

/// Reshape a [0, 1] velocity through the selected response curve.
pub fn apply_velocity_curve(velocity: f64, curve: VelocityCurve) -> f64 {
    let v = velocity.clamp(0.0, 1.0);
    match curve {
        VelocityCurve::Linear => v,
        VelocityCurve::Exponential => v * v,
        VelocityCurve::Logarithmic => v.sqrt(),
    }
}

/// Blend curved velocity into a gain multiplier. `sensitivity` 0 ignores
/// velocity entirely, 1 tracks it fully.
pub fn velocity_scale(curved_velocity: f64, sensitivity: f64) -> f64 {
    let s = sensitivity.clamp(0.0, 1.0);
    1.0 - s + s * curved_velocity.clamp(0.0, 1.0)
}

// ── Voice filter ──

/// Cutoff: 200 Hz at 0 up to 5200 Hz at 100.
pub fn filter_cutoff_hz(value: f64) -> f64 {
    200.0 + value.clamp(0.0, 100.0) * 50.0
}

/// Resonance: Q from 0.1 to 10.
pub fn filter_q(value: f64) -> f64 {
    (value.clamp(0.0, 100.0) / 10.0).max(0.1)
}

// ── Distortion ──

/// Generate the waveshaping transfer curve for a given drive amount.
///
/// The fixed nonlinear formula steepens with drive; the table is sampled
/// uniformly over x ∈ [-1, 1] and clamped so the shaper output can never
/// leave [-1, 1] regardless of drive.
pub fn distortion_curve(drive: f64, len: usize) -> Vec<f32> {
    let k = drive.clamp(0.0, 100.0);
    let deg = PI / 180.0;
    (0..len)
        .map(|i| {
            let x = (i as f64 * 2.0) / len as f64 - 1.0;
            let y = ((3.0 + k) * x * 20.0 * deg) / (PI + k * x.abs());
            y.clamp(-1.0, 1.0) as f32
        })
        .collect()
}

/// Tone: post-shaper lowpass, 500 Hz to 10 kHz on a log scale.
pub fn distortion_tone_hz(value: f64) -> f64 {
    500.0 * (20.0_f64).powf(norm(value))
}

// ── Delay ──

/// Delay time: 0–2000 ms.
pub fn delay_time_seconds(value: f64) -> f64 {
    norm(value) * 2.0
}

/// Feedback gain. Scaled so even a pegged control stays strictly below
/// 0.95, which forbids runaway self-oscillation.
pub fn delay_feedback(value: f64) -> f64 {
    norm(value) * 0.949
}

// ── Chorus ──

/// LFO rate: 0.1–10 Hz.
pub fn chorus_rate_hz(value: f64) -> f64 {
    0.1 + norm(value) * 9.9
}

/// Modulation excursion: 0–5 ms.
pub fn chorus_depth_seconds(value: f64) -> f64 {
    norm(value) * 0.005
}

// ── Reverb family ──

/// Standard reverb impulse duration: 0.5–5 s.
pub fn reverb_size_seconds(value: f64) -> f64 {
    0.5 + norm(value) * 4.5
}

/// Damping maps to the impulse envelope's decay exponent: 0.2–2.8.
pub fn reverb_damping_exponent(value: f64) -> f64 {
    0.2 + norm(value) * 2.6
}

/// Shimmer reverb impulse duration: 1–5 s.
pub fn shimmer_size_seconds(value: f64) -> f64 {
    1.0 + norm(value) * 4.0
}

/// Shimmer high-pass pre-filter cutoff: 500–3000 Hz.
pub fn shimmer_highpass_hz(value: f64) -> f64 {
    500.0 + norm(value) * 2500.0
}

/// Reverse reverb impulse duration: 0.5–3 s.
pub fn reverse_size_seconds(value: f64) -> f64 {
    0.5 + norm(value) * 2.5
}

// ── Half-time ──

/// The half-time stage is a plain wet/dry blend (amount × mix); it does no
/// actual time manipulation.
pub fn halftime_blend(amount: f64, mix: f64) -> f64 {
    norm(amount) * norm(mix)
}

// ── Compressor / limiter ──

/// Threshold: −60..0 dB.
pub fn compressor_threshold_db(value: f64) -> f64 {
    -60.0 + norm(value) * 60.0
}

/// Ratio: 1:1 up to 20:1.
pub fn compressor_ratio(value: f64) -> f64 {
    1.0 + norm(value) * 19.0
}

/// Attack: 0.1–100 ms, mapped logarithmically.
pub fn compressor_attack_seconds(value: f64) -> f64 {
    0.0001 * (1000.0_f64).powf(norm(value))
}

/// Release: 10 ms–1 s, mapped logarithmically.
pub fn compressor_release_seconds(value: f64) -> f64 {
    0.01 * (100.0_f64).powf(norm(value))
}

/// Automatic makeup gain in dB, derived from how much average level the
/// threshold/ratio pair removes.
pub fn makeup_gain_db(threshold_db: f64, ratio: f64) -> f64 {
    -threshold_db * (1.0 - 1.0 / ratio.max(1.0)) / 2.0
}

/// Limiter threshold: the 50–100 UI range maps to −20..0 dB.
pub fn limiter_threshold_db(value: f64) -> f64 {
    (value.clamp(50.0, 100.0) - 50.0) / 50.0 * 20.0 - 20.0
}

/// Master volume is a direct linear gain.
pub fn master_gain(value: f64) -> f64 {
    norm(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_curves_exact() {
        assert_eq!(apply_velocity_curve(0.5, VelocityCurve::Exponential), 0.25);
        assert_eq!(apply_velocity_curve(0.25, VelocityCurve::Logarithmic), 0.5);
        assert_eq!(apply_velocity_curve(0.7, VelocityCurve::Linear), 0.7);
    }

    #[test]
    fn velocity_curve_clamps_input() {
        assert_eq!(apply_velocity_curve(1.5, VelocityCurve::Linear), 1.0);
        assert_eq!(apply_velocity_curve(-0.2, VelocityCurve::Exponential), 0.0);
    }

    #[test]
    fn velocity_scale_sensitivity_extremes() {
        // Sensitivity 0 ignores velocity, 1 tracks it fully.
        assert_eq!(velocity_scale(0.3, 0.0), 1.0);
        assert_eq!(velocity_scale(0.3, 1.0), 0.3);
        assert!((velocity_scale(0.5, 0.5) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn delay_feedback_never_reaches_runaway() {
        assert!(delay_feedback(100.0) < 0.95);
        assert!(delay_feedback(1000.0) < 0.95);
        assert_eq!(delay_feedback(0.0), 0.0);
    }

    #[test]
    fn delay_time_range() {
        assert_eq!(delay_time_seconds(0.0), 0.0);
        assert_eq!(delay_time_seconds(100.0), 2.0);
        assert_eq!(delay_time_seconds(50.0), 1.0);
    }

    #[test]
    fn envelope_times_floored() {
        assert_eq!(attack_seconds(0.0), MIN_STAGE_SECONDS);
        assert_eq!(decay_seconds(0.0), MIN_STAGE_SECONDS);
        assert_eq!(release_seconds(0.0), MIN_STAGE_SECONDS);
        assert!((attack_seconds(100.0) - 0.1).abs() < 1e-12);
        assert!((decay_seconds(100.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn distortion_curve_bounded_at_max_drive() {
        for &drive in &[0.0, 50.0, 100.0, 500.0] {
            let curve = distortion_curve(drive, 2048);
            assert_eq!(curve.len(), 2048);
            assert!(
                curve.iter().all(|&y| (-1.0..=1.0).contains(&y)),
                "curve out of [-1, 1] at drive {drive}"
            );
        }
    }

    #[test]
    fn distortion_curve_is_odd_and_monotone_near_zero() {
        let curve = distortion_curve(50.0, 2048);
        // Positive input shapes positive, negative shapes negative.
        assert!(curve[0] < 0.0);
        assert!(curve[2047] > 0.0);
    }

    #[test]
    fn chorus_ranges() {
        assert!((chorus_rate_hz(0.0) - 0.1).abs() < 1e-12);
        assert!((chorus_rate_hz(100.0) - 10.0).abs() < 1e-12);
        assert_eq!(chorus_depth_seconds(100.0), 0.005);
    }

    #[test]
    fn reverb_family_ranges() {
        assert_eq!(reverb_size_seconds(0.0), 0.5);
        assert_eq!(reverb_size_seconds(100.0), 5.0);
        assert!((reverb_damping_exponent(0.0) - 0.2).abs() < 1e-12);
        assert!((reverb_damping_exponent(100.0) - 2.8).abs() < 1e-12);
        assert_eq!(shimmer_size_seconds(100.0), 5.0);
        assert_eq!(shimmer_highpass_hz(0.0), 500.0);
        assert_eq!(shimmer_highpass_hz(100.0), 3000.0);
        assert_eq!(reverse_size_seconds(100.0), 3.0);
    }

    #[test]
    fn compressor_log_time_mapping() {
        // Endpoints are exact, midpoint is the geometric mean.
        assert!((compressor_attack_seconds(0.0) - 0.0001).abs() < 1e-9);
        assert!((compressor_attack_seconds(100.0) - 0.1).abs() < 1e-9);
        let mid = compressor_attack_seconds(50.0);
        assert!((mid - (0.0001_f64 * 0.1).sqrt()).abs() < 1e-9);
        assert!((compressor_release_seconds(0.0) - 0.01).abs() < 1e-9);
        assert!((compressor_release_seconds(100.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn makeup_gain_tracks_threshold_and_ratio() {
        // 1:1 ratio removes nothing, so no makeup.
        assert_eq!(makeup_gain_db(-24.0, 1.0), 0.0);
        // -24 dB threshold at 4:1 restores half of the 18 dB removed.
        assert!((makeup_gain_db(-24.0, 4.0) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn limiter_threshold_ui_range() {
        assert_eq!(limiter_threshold_db(50.0), -20.0);
        assert_eq!(limiter_threshold_db(100.0), 0.0);
        assert_eq!(limiter_threshold_db(75.0), -10.0);
        // Values below the UI floor clamp to the floor.
        assert_eq!(limiter_threshold_db(0.0), -20.0);
    }

    #[test]
    fn master_gain_linear() {
        assert_eq!(master_gain(80.0), 0.8);
        assert_eq!(master_gain(0.0), 0.0);
        assert_eq!(master_gain(250.0), 1.0);
    }

    #[test]
    fn filter_mapping_matches_control_range() {
        assert_eq!(filter_cutoff_hz(0.0), 200.0);
        assert_eq!(filter_cutoff_hz(100.0), 5200.0);
        assert_eq!(filter_q(50.0), 5.0);
    }

    #[test]
    fn out_of_range_inputs_clamp() {
        assert_eq!(norm(-10.0), 0.0);
        assert_eq!(norm(140.0), 1.0);
        assert_eq!(reverb_size_seconds(-5.0), 0.5);
        assert_eq!(compressor_ratio(1e9), 20.0);
    }
}
