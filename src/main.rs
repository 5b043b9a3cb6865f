//! # GNSS HUD Bridge
//!
//! Polls a GNSS receiver node for PVT fixes and per-channel CN0 samples,
//! merges them into one bounded snapshot, and serves the fixed-grammar
//! status string the display microcontroller parses.
//!
//! Two modes share the same snapshot/encoder surface:
//! - **live** (default): poll the node's HTTP API at the configured rate
//! - **generator**: synthesize a three-phase scenario with no hardware,
//!   for validating the LED matrix encodings

use std::time::Instant;

use anyhow::Result;
use tokio::time::interval;
use tracing::{info, warn};
use tracing_subscriber;

mod aggregator;
mod config;
mod console;
mod error;
mod feed;
mod generator;
mod status;

use aggregator::SharedAggregator;
use config::Config;
use console::Console;
use feed::FeedClient;
use status::StatusSource;

/// Config file searched for when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "gnss-hud-bridge.toml";

/// Number of poll cycles between status log messages
const LOG_INTERVAL_CYCLES: u64 = 120;

/// Main entry point for GNSS HUD Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (defaults if no file is present)
///    - Create the shared snapshot
///
/// 2. **Main Loop** (live mode)
///    - Fetch PVT and observations every tick (2Hz default), outside the lock
///    - Merge under the lock, PVT before observations
///    - Refresh the console dashboard at its own cadence
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Generator mode**
///    - Evaluate the scenario function every tick (5Hz default) and install
///      the synthesized snapshot
///
/// # Errors
///
/// Returns error if the configuration is invalid or the HTTP client cannot
/// be constructed. Feed failures at runtime never terminate the loop.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("GNSS HUD Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    let shared = SharedAggregator::new(config.display.max_bars);

    if config.generator.enabled {
        run_generator(&config, shared).await
    } else {
        run_live(&config, shared).await
    }
}

/// Live mode: poll the receiver node and merge each cycle
async fn run_live(config: &Config, shared: SharedAggregator) -> Result<()> {
    let mut client = FeedClient::new(&config.feed)?;
    let mut console = Console::new(&config.display);
    let mut poll_interval = interval(config.poll_period());

    info!(
        "GNSS poller started. Polling {} at {}Hz",
        config.feed.base_url, config.feed.poll_hz
    );
    info!("Press Ctrl+C to exit");

    let mut cycle_count: u64 = 0;

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                // Network I/O happens before the lock is taken
                let pvt = client.fetch_pvt().await.into_option();
                let observations = client.fetch_observations().await.into_option();

                let now = Instant::now();
                shared.apply_cycle(pvt, observations, now);

                cycle_count += 1;
                if cycle_count % LOG_INTERVAL_CYCLES == 0 {
                    info!("Completed {} poll cycles. Status: {}", cycle_count, shared.status_line());
                }

                let snapshot = shared.with_snapshot(|s| s.clone());
                console.maybe_print(&snapshot, now);
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total poll cycles: {}", cycle_count);
                break;
            }
        }
    }

    Ok(())
}

/// Generator mode: synthesize snapshots instead of polling
async fn run_generator(config: &Config, shared: SharedAggregator) -> Result<()> {
    let mut console = Console::new(&config.display);
    let mut tick = interval(config.generator_period());
    let t0 = Instant::now();

    warn!(
        "Scenario generator enabled: synthesizing {}s cycles at {}Hz (no receiver needed)",
        config.generator.period_s, config.generator.update_hz
    );
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let t = t0.elapsed().as_secs_f64();
                let snapshot = generator::scenario(t, config.generator.top_n, config.generator.period_s);
                shared.install_snapshot(snapshot.clone());

                let now = Instant::now();
                console.maybe_print(&snapshot, now);
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "gnss-hud-bridge.toml");
    }

    #[test]
    fn test_log_interval_is_one_minute_at_default_rate() {
        // 120 cycles at 2Hz = 60 seconds between status lines
        let config = Config::default();
        let seconds = LOG_INTERVAL_CYCLES as f64 / config.feed.poll_hz;
        assert_eq!(seconds, 60.0);
    }
}
