//! # Scenario Generator Module
//!
//! A feed-less stand-in for the live aggregator: synthesizes snapshots as
//! a closed-form function of elapsed time so display logic (bar heights,
//! blink/pulse/solid states, the moving heading dot, age-driven pulse
//! rate) can be validated without a receiver attached.
//!
//! One cycle walks through three equal phases:
//! 1. no fix, low CN0, growing age (HUD blinks)
//! 2. degraded/2D fix, ramping satellites, drifting heading (HUD pulses)
//! 3. valid 3D fix, high CN0, rotating heading, varying speed (HUD solid)
//!
//! Phase 2 is the only producer of the reserved `P=1` wire value; the live
//! aggregator never emits it.
//!
//! The generator publishes through the same
//! [`SharedAggregator`](crate::aggregator::SharedAggregator) /
//! [`StatusSource`](crate::status::StatusSource) surface as the live poll
//! loop, so the two are swappable from the bridge's point of view.

use std::f64::consts::TAU;

use crate::aggregator::{PvtState, Snapshot};

/// Upper bound for synthesized CN0 values in dB-Hz
pub const CN0_MAX: f64 = 55.0;

/// Upper bound for the synthesized satellite count
pub const SAT_MAX: u32 = 63;

/// Upper bound for the synthesized age in seconds
pub const AGE_MAX: f64 = 99.0;

/// Upper bound for the synthesized speed in m/s
pub const SPEED_MAX: f64 = 50.0;

/// Generate a descending CN0 set with a mild per-entry wobble
///
/// The wobble animates bar heights and brightness without breaking the
/// overall high-to-low shape. Values are clamped to [0, CN0_MAX].
fn make_cn0_set(base: f64, spread: f64, n: usize, t: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let wobble = 1.5 * (TAU * (t / 5.0) + i as f64 * 0.9).sin();
            (base - i as f64 * spread + wobble).clamp(0.0, CN0_MAX)
        })
        .collect()
}

/// Evaluate the scenario at elapsed time `t`
///
/// Pure: the same `(t, top_n, period_s)` always yields the same snapshot.
/// All outputs are clamped to the live aggregator's field ranges.
///
/// # Arguments
///
/// * `t` - Seconds since generator start
/// * `top_n` - Number of CN0 bars to synthesize
/// * `period_s` - Full cycle duration; each phase lasts a third of it
pub fn scenario(t: f64, top_n: usize, period_s: f64) -> Snapshot {
    let phase = t.rem_euclid(period_s);
    let third = period_s / 3.0;

    let mut snap = Snapshot::default();

    if phase < third {
        // No fix: stale, searching
        snap.pvt_state = PvtState::NoFix;
        snap.satellite_count = (3.0 + 3.0 * (TAU * phase / third).sin() + 1.5) as i64 as u32;
        snap.age_seconds = 8.0 + 2.0 * (TAU * phase / 3.0).sin();
        snap.heading_degrees = 0.0;
        snap.speed_mps = 0.0;
        snap.signal_strengths = make_cn0_set(26.0, 1.7, top_n, t);
    } else if phase < 2.0 * third {
        // Degraded/2D: ramping in
        let u = (phase - third) / third;
        snap.pvt_state = PvtState::Degraded;
        snap.satellite_count = (6.0 + 10.0 * u) as u32;
        snap.age_seconds = 2.5 + 1.0 * (TAU * phase / 4.0).sin();
        snap.heading_degrees = u * 180.0;
        snap.speed_mps = 0.5 + 1.5 * (TAU * phase / 6.0).sin();
        snap.signal_strengths = make_cn0_set(34.0, 1.4, top_n, t);
    } else {
        // Valid 3D: fresh and dynamic
        let u = (phase - 2.0 * third) / third;
        snap.pvt_state = PvtState::Fix;
        snap.satellite_count = (14.0 + 6.0 * (TAU * u).sin()) as i64 as u32;
        snap.age_seconds = 0.2 + 0.2 * (TAU * phase / 2.5).sin();
        snap.heading_degrees = u * 360.0 + 90.0;
        snap.speed_mps = 2.0 + 3.0 * (TAU * u).sin().abs();
        snap.signal_strengths = make_cn0_set(45.0, 1.2, top_n, t);
    }

    // Clamp to the live aggregator's ranges
    snap.satellite_count = snap.satellite_count.min(SAT_MAX);
    snap.age_seconds = snap.age_seconds.clamp(0.0, AGE_MAX);
    snap.heading_degrees = snap.heading_degrees.rem_euclid(360.0);
    snap.speed_mps = snap.speed_mps.clamp(0.0, SPEED_MAX);

    snap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::SharedAggregator;

    const TOP_N: usize = 6;
    const PERIOD: f64 = 18.0;

    #[test]
    fn test_phase_one_is_stale_no_fix() {
        let snap = scenario(1.0, TOP_N, PERIOD);
        assert_eq!(snap.pvt_state, PvtState::NoFix);
        assert_eq!(snap.heading_degrees, 0.0);
        assert_eq!(snap.speed_mps, 0.0);
        assert!(snap.age_seconds >= 6.0, "phase one must look stale");
    }

    #[test]
    fn test_phase_two_is_degraded() {
        let snap = scenario(7.0, TOP_N, PERIOD);
        assert_eq!(snap.pvt_state, PvtState::Degraded);
        assert!(snap.satellite_count >= 6);
    }

    #[test]
    fn test_phase_three_is_valid_fix() {
        let snap = scenario(13.0, TOP_N, PERIOD);
        assert_eq!(snap.pvt_state, PvtState::Fix);
        assert!(snap.age_seconds <= 0.5, "phase three must look fresh");
        assert!(snap.speed_mps >= 2.0);
    }

    #[test]
    fn test_all_outputs_clamped_across_cycle() {
        let mut t = 0.0;
        while t < PERIOD {
            let snap = scenario(t, TOP_N, PERIOD);

            assert!(snap.satellite_count <= SAT_MAX);
            assert!(snap.age_seconds >= 0.0 && snap.age_seconds <= AGE_MAX);
            assert!(snap.heading_degrees >= 0.0 && snap.heading_degrees < 360.0);
            assert!(snap.speed_mps >= 0.0 && snap.speed_mps <= SPEED_MAX);
            assert_eq!(snap.signal_strengths.len(), TOP_N);
            assert!(snap
                .signal_strengths
                .iter()
                .all(|&v| (0.0..=CN0_MAX).contains(&v)));

            t += 0.1;
        }
    }

    #[test]
    fn test_scenario_is_deterministic() {
        assert_eq!(scenario(4.2, TOP_N, PERIOD), scenario(4.2, TOP_N, PERIOD));
    }

    #[test]
    fn test_scenario_wraps_at_period() {
        let a = scenario(2.0, TOP_N, PERIOD);
        let b = scenario(2.0 + PERIOD, TOP_N, PERIOD);

        // Phase-relative fields repeat; the CN0 wobble runs on absolute
        // time, so compare everything else
        assert_eq!(a.pvt_state, b.pvt_state);
        assert_eq!(a.satellite_count, b.satellite_count);
        assert!((a.age_seconds - b.age_seconds).abs() < 1e-9);
        assert!((a.heading_degrees - b.heading_degrees).abs() < 1e-9);
        assert!((a.speed_mps - b.speed_mps).abs() < 1e-9);
    }

    #[test]
    fn test_cn0_set_descends_overall() {
        let set = make_cn0_set(45.0, 1.2, TOP_N, 0.0);
        assert_eq!(set.len(), TOP_N);
        // Overall shape: first bar well above last, wobble notwithstanding
        assert!(set[0] > set[TOP_N - 1]);
    }

    #[test]
    fn test_cn0_set_respects_requested_length() {
        for n in [1, 4, 8] {
            assert_eq!(make_cn0_set(30.0, 1.5, n, 3.0).len(), n);
        }
    }

    #[test]
    fn test_custom_period_scales_phases() {
        let snap = scenario(3.5, TOP_N, 9.0); // second third of a 9s cycle
        assert_eq!(snap.pvt_state, PvtState::Degraded);

        let snap = scenario(7.0, TOP_N, 9.0);
        assert_eq!(snap.pvt_state, PvtState::Fix);
    }

    #[test]
    fn test_encodes_through_shared_contract() {
        use crate::status::StatusSource;

        let shared = SharedAggregator::new(TOP_N);
        shared.install_snapshot(scenario(7.0, TOP_N, PERIOD));

        let status = shared.status_line();
        assert!(status.starts_with("P=1;"), "degraded phase must encode P=1: {}", status);
    }
}
