//! # Console Dashboard
//!
//! Rate-limited terminal dashboard mirroring what the HUD shows, plus the
//! high-precision position and ENU velocity that never make it onto the
//! wire. Purely an operator aid; the MCU consumes the status string, not
//! this.

use std::time::{Duration, Instant};

use crate::aggregator::Snapshot;
use crate::config::DisplayConfig;

/// ANSI sequence clearing the terminal before each refresh
const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";

/// Rate-limited dashboard printer
#[derive(Debug)]
pub struct Console {
    enabled: bool,
    every: Duration,
    last_print: Option<Instant>,
}

impl Console {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            enabled: config.console_enabled,
            every: Duration::from_secs_f64(config.print_every_s),
            last_print: None,
        }
    }

    /// Whether a refresh is due at `now`, recording it if so
    fn should_print(&mut self, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_print {
            Some(prev) if now.duration_since(prev) < self.every => false,
            _ => {
                self.last_print = Some(now);
                true
            }
        }
    }

    /// Print the dashboard if the refresh cadence allows it
    ///
    /// The snapshot is a cheap copy taken under the lock by the caller;
    /// printing happens without any lock held.
    pub fn maybe_print(&mut self, snapshot: &Snapshot, now: Instant) {
        if self.should_print(now) {
            let clock = chrono::Local::now().format("%H:%M:%S").to_string();
            print!("{}{}", CLEAR_SCREEN, render_dashboard(snapshot, &clock));
        }
    }
}

/// Render the dashboard text for a snapshot
///
/// Kept separate from the printing so the layout is testable.
pub fn render_dashboard(snapshot: &Snapshot, clock: &str) -> String {
    let cn0 = if snapshot.signal_strengths.is_empty() {
        "(searching...)".to_string()
    } else {
        snapshot
            .signal_strengths
            .iter()
            .map(|v| format!("{:.1}", v))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "=== GNSS MONITOR [{}] ===\n\
         \x20POS: {:>10.6}, {:>10.6} | Alt: {:.1}m\n\
         \x20VEL: N:{:>6.2} E:{:>6.2} U:{:>6.2} m/s\n\
         \x20DASH: P={} S={} Age={:.1}s Hdg={:.1} Spd={:.2}m/s\n\
         \x20CN0: {}\n\
         {}\n",
        clock,
        snapshot.latitude,
        snapshot.longitude,
        snapshot.altitude,
        snapshot.velocity_enu.north,
        snapshot.velocity_enu.east,
        snapshot.velocity_enu.up,
        snapshot.pvt_state.wire_code(),
        snapshot.satellite_count,
        snapshot.age_seconds,
        snapshot.heading_degrees,
        snapshot.speed_mps,
        cn0,
        "=".repeat(60),
    )
}
