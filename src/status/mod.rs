//! # Status String Module
//!
//! Renders a [`Snapshot`] into the single-line status string consumed by
//! the microcontroller driving the LED matrix.
//!
//! Wire grammar (field order and decimal precision are the contract; the
//! MCU-side parser depends on both):
//!
//! ```text
//! P=<0|1|2>;S=<int>;A=<age, 1 dec>;H=<heading, 1 dec>;V=<speed, 2 dec>;C=<cn0 csv, 1 dec each>;
//! ```
//!
//! - `P` - PVT state: 0 = no fix (blink), 1 = degraded (pulse, emitted only
//!   by the scenario generator), 2 = valid fix (solid)
//! - `S` - satellite count
//! - `A` - age of the last fix in seconds
//! - `H` - heading in degrees
//! - `V` - ground speed in m/s
//! - `C` - top-N CN0 values in dB-Hz, may be empty while searching
//!
//! Encoding is total: every field is pre-clamped by the merge steps, so no
//! error path exists.

use std::fmt::Write;

use crate::aggregator::{SharedAggregator, Snapshot};

/// Encode a snapshot into the wire status string
///
/// # Examples
///
/// ```
/// use gnss_hud_bridge::aggregator::Snapshot;
/// use gnss_hud_bridge::status::encode_status;
///
/// let status = encode_status(&Snapshot::default());
/// assert_eq!(status, "P=0;S=0;A=99.0;H=0.0;V=0.00;C=;");
/// ```
pub fn encode_status(snapshot: &Snapshot) -> String {
    let mut out = String::with_capacity(64);

    // Infallible: writing to a String cannot fail
    let _ = write!(
        out,
        "P={};S={};A={:.1};H={:.1};V={:.2};C=",
        snapshot.pvt_state.wire_code(),
        snapshot.satellite_count,
        snapshot.age_seconds,
        snapshot.heading_degrees,
        snapshot.speed_mps,
    );

    for (i, cn0) in snapshot.signal_strengths.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{:.1}", cn0);
    }
    out.push(';');

    out
}

/// The entire outbound boundary toward the consuming device
///
/// `status_line` must never fail and never block beyond the in-memory
/// snapshot lock. The bridge/register mechanism calls it on demand,
/// concurrently with poll-loop updates.
pub trait StatusSource: Send + Sync {
    /// Produce the current status string
    fn status_line(&self) -> String;
}

impl StatusSource for SharedAggregator {
    fn status_line(&self) -> String {
        self.with_snapshot(encode_status)
    }
}
