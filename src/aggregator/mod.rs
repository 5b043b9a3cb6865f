//! # Telemetry Aggregator Module
//!
//! Merges the two independently-arriving feeds (PVT fixes and per-channel
//! CN0 observations) into one coherent, bounded snapshot.
//!
//! This module handles:
//! - PVT freshness/staleness tracking with wall-clock derived age
//! - Zeroing motion fields when the fix goes stale
//! - Top-N CN0 selection, sorted descending
//! - Satellite-count reconciliation between the fix and the tracked channels
//!
//! The merge methods are plain functions over `(snapshot, input, now)`;
//! [`SharedAggregator`] adds the mutex needed to share the snapshot between
//! the poll loop and the on-demand status path.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::feed::extract::{aliases, float_field, int_field};

/// Minimum solution-status code for a fix to count as valid
pub const FIX_QUALITY_THRESHOLD: i64 = 4;

/// Cap on the satellite count when derived from tracked channels
///
/// Tracked channels overcount usable satellites (one satellite can occupy
/// several channels), so the channel-derived estimate is capped.
pub const CHANNEL_SAT_CAP: u32 = 12;

/// Age reported before any fix has ever been received
pub const STALE_AGE_SENTINEL: f64 = 99.0;

/// PVT solution state as shown on the HUD
///
/// The live aggregator only ever produces `NoFix` or `Fix`. `Degraded` is
/// reserved on the wire and emitted exclusively by the scenario generator;
/// downstream display logic relies on that asymmetry, so it must not be
/// "fixed" here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PvtState {
    /// No valid solution (HUD blinks)
    #[default]
    NoFix,
    /// Degraded/2D solution (HUD pulses) - generator only
    Degraded,
    /// Valid 3D solution (HUD solid)
    Fix,
}

impl PvtState {
    /// Wire code for the status string `P=` field
    pub fn wire_code(self) -> u8 {
        match self {
            PvtState::NoFix => 0,
            PvtState::Degraded => 1,
            PvtState::Fix => 2,
        }
    }
}

/// East-North-Up velocity vector in m/s
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnuVelocity {
    pub north: f64,
    pub east: f64,
    pub up: f64,
}

/// Best known receiver state, mutated in place every poll cycle
///
/// One instance lives for the process lifetime. Cycles that produce no data
/// update only the staleness fields, so fields from earlier cycles are
/// never lost wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Solution state encoded as `P=` on the wire
    pub pvt_state: PvtState,
    /// Best known estimate of tracked/used satellites
    pub satellite_count: u32,
    /// Seconds since the last fix was received, wall-clock derived
    pub age_seconds: f64,
    /// Course over ground, degrees, [0, 360)
    pub heading_degrees: f64,
    /// Ground speed, m/s, >= 0
    pub speed_mps: f64,
    /// High-precision position, console/debug only (not on the wire)
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// ENU velocity, console/debug only
    pub velocity_enu: EnuVelocity,
    /// Top-N CN0 values in dB-Hz, sorted descending, all > 0
    pub signal_strengths: Vec<f64>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            pvt_state: PvtState::NoFix,
            satellite_count: 0,
            age_seconds: STALE_AGE_SENTINEL,
            heading_degrees: 0.0,
            speed_mps: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            velocity_enu: EnuVelocity::default(),
            signal_strengths: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Zero every field that must not outlive a valid fix
    ///
    /// Satellite count and CN0 bars are kept: they are driven by the
    /// observation feed, which has its own lifecycle.
    fn clear_motion_fields(&mut self) {
        self.latitude = 0.0;
        self.longitude = 0.0;
        self.altitude = 0.0;
        self.velocity_enu = EnuVelocity::default();
        self.heading_degrees = 0.0;
        self.speed_mps = 0.0;
    }
}

/// Owns the snapshot and applies the per-cycle merge steps
///
/// Lock-free by itself; wrap in [`SharedAggregator`] to share between tasks.
#[derive(Debug)]
pub struct Aggregator {
    snapshot: Snapshot,
    /// Wall-clock time of the last successful PVT merge
    last_fix_rx: Option<Instant>,
    /// Cap on the encoded CN0 bar count
    max_bars: usize,
}

impl Aggregator {
    /// Create an aggregator with an all-default snapshot
    pub fn new(max_bars: usize) -> Self {
        Self {
            snapshot: Snapshot::default(),
            last_fix_rx: None,
            max_bars,
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Merge one cycle's worth of feed data, PVT first
    ///
    /// Order matters: satellite-count reconciliation in the observation
    /// merge reads the PVT-derived state.
    pub fn apply_cycle(&mut self, pvt: Option<&Value>, observations: Option<&[Value]>, now: Instant) {
        self.merge_pvt(pvt, now);
        self.merge_observations(observations);
    }

    /// Merge the PVT feed result for this cycle
    ///
    /// Present record: extract all fields through the alias lists and mark
    /// the receive time. Absent record: declare no-fix, grow the age from
    /// the last receive time (sentinel if none) and zero the motion fields
    /// so stale data can never be displayed as live.
    ///
    /// This is the only time-dependent transition in the system: repeated
    /// absent cycles keep increasing `age_seconds`.
    pub fn merge_pvt(&mut self, pvt: Option<&Value>, now: Instant) {
        match pvt {
            Some(record) => {
                self.last_fix_rx = Some(now);

                let sol = int_field(record, aliases::SOLUTION_STATUS, 0);
                self.snapshot.pvt_state = if sol >= FIX_QUALITY_THRESHOLD {
                    PvtState::Fix
                } else {
                    PvtState::NoFix
                };

                self.snapshot.satellite_count =
                    int_field(record, aliases::SATELLITES, 0).clamp(0, u32::MAX as i64) as u32;

                // Prefer a feed-provided age; else the merge itself is the
                // freshness event
                self.snapshot.age_seconds = float_field(record, aliases::AGE, 0.0).max(0.0);

                self.snapshot.heading_degrees =
                    float_field(record, aliases::HEADING, 0.0).rem_euclid(360.0);
                self.snapshot.speed_mps = float_field(record, aliases::SPEED, 0.0).max(0.0);

                self.snapshot.latitude = float_field(record, aliases::LATITUDE, 0.0);
                self.snapshot.longitude = float_field(record, aliases::LONGITUDE, 0.0);
                self.snapshot.altitude = float_field(record, aliases::ALTITUDE, 0.0);

                self.snapshot.velocity_enu = EnuVelocity {
                    east: float_field(record, aliases::VEL_EAST, 0.0),
                    north: float_field(record, aliases::VEL_NORTH, 0.0),
                    up: float_field(record, aliases::VEL_UP, 0.0),
                };

                debug!(
                    state = ?self.snapshot.pvt_state,
                    sats = self.snapshot.satellite_count,
                    "merged PVT record"
                );
            }
            None => {
                self.snapshot.pvt_state = PvtState::NoFix;
                self.snapshot.age_seconds = match self.last_fix_rx {
                    Some(rx) => now.duration_since(rx).as_secs_f64(),
                    None => STALE_AGE_SENTINEL,
                };
                self.snapshot.clear_motion_fields();
            }
        }
    }

    /// Merge the observation feed result for this cycle
    ///
    /// Entries need a positive numeric `cn0_db_hz` to count; their
    /// `channel_id`s are de-duplicated into the tracked-channel set.
    /// Satellite reconciliation: without a valid fix the tracked channels
    /// are the best estimate (capped); with a fix the channel-derived count
    /// may only raise, never lower, the reported count - lowering would
    /// flicker the readout during a momentary observation gap.
    pub fn merge_observations(&mut self, observations: Option<&[Value]>) {
        let Some(list) = observations else {
            return;
        };

        let mut strengths: Vec<f64> = Vec::new();
        let mut tracked_channels: HashSet<i64> = HashSet::new();

        for item in list {
            let Some(record) = item.as_object() else {
                continue;
            };

            // Strict here, unlike the PVT path: the observables schema is
            // fixed, a non-numeric CN0 is a bad sample rather than drift
            let cn0 = record.get("cn0_db_hz").and_then(Value::as_f64);

            if let Some(cn0) = cn0 {
                if cn0 > 0.0 && cn0.is_finite() {
                    strengths.push(cn0);
                    if let Some(ch) = record.get("channel_id").and_then(Value::as_i64) {
                        tracked_channels.insert(ch);
                    }
                }
            }
        }

        strengths.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        strengths.truncate(self.max_bars);
        self.snapshot.signal_strengths = strengths;

        let channel_estimate = CHANNEL_SAT_CAP.min(tracked_channels.len() as u32);
        self.snapshot.satellite_count = if self.snapshot.pvt_state == PvtState::Fix {
            self.snapshot.satellite_count.max(channel_estimate)
        } else {
            channel_estimate
        };
    }
}

/// Snapshot shared between the poll loop and the status path
///
/// One mutex guards both the merge-write and the encode-read; it is held
/// only long enough to mutate or copy fields - never across network I/O or
/// sleeps.
#[derive(Debug, Clone)]
pub struct SharedAggregator {
    inner: Arc<Mutex<Aggregator>>,
}

impl SharedAggregator {
    pub fn new(max_bars: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Aggregator::new(max_bars))),
        }
    }

    /// Apply one poll cycle under the lock
    pub fn apply_cycle(&self, pvt: Option<Value>, observations: Option<Vec<Value>>, now: Instant) {
        let mut agg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        agg.apply_cycle(pvt.as_ref(), observations.as_deref(), now);
    }

    /// Read the snapshot under the lock
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        let agg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(agg.snapshot())
    }

    /// Install a complete snapshot, replacing the current one
    ///
    /// Used by the scenario generator, which synthesizes whole snapshots
    /// instead of merging feeds.
    pub fn install_snapshot(&self, snapshot: Snapshot) {
        let mut agg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        agg.snapshot = snapshot;
    }
}
