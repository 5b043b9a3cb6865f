//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Telemetry feed configuration
///
/// The feed is an HTTP endpoint publishing the latest PVT solution and
/// observable list produced by the receiver's UDP decoder.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Base URL of the telemetry node.
    ///
    /// `http://127.0.0.1:8080` for a local node, `http://172.17.0.1:8080`
    /// when the node runs on the Docker host gateway.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Poll rate in Hz
    #[serde(default = "default_poll_hz")]
    pub poll_hz: f64,

    /// Per-request HTTP timeout in milliseconds
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Maximum observables requested per poll
    #[serde(default = "default_observables_limit")]
    pub observables_limit: u32,
}

/// Display / status string configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// Maximum number of CN0 bars encoded into the status string
    #[serde(default = "default_max_bars")]
    pub max_bars: usize,

    /// Console dashboard refresh period in seconds
    #[serde(default = "default_print_every_s")]
    pub print_every_s: f64,

    /// Whether the console dashboard is printed at all
    #[serde(default = "default_console_enabled")]
    pub console_enabled: bool,
}

/// Scenario generator configuration (no-hardware test mode)
#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    /// Run the deterministic scenario generator instead of polling the feed
    #[serde(default)]
    pub enabled: bool,

    /// Internal model update rate in Hz
    #[serde(default = "default_generator_hz")]
    pub update_hz: f64,

    /// Full scenario cycle duration in seconds
    #[serde(default = "default_scenario_period_s")]
    pub period_s: f64,

    /// Number of CN0 values synthesized per snapshot
    ///
    /// Independent of `display.max_bars`: the generator may deliberately
    /// produce more or fewer bars than the live display cap to exercise
    /// the matrix encodings.
    #[serde(default = "default_generator_top_n")]
    pub top_n: usize,
}

// Default value functions
fn default_base_url() -> String { "http://172.17.0.1:8080".to_string() }
fn default_poll_hz() -> f64 { 2.0 }
fn default_http_timeout_ms() -> u64 { 1000 }
fn default_observables_limit() -> u32 { 64 }

fn default_max_bars() -> usize { 6 }
fn default_print_every_s() -> f64 { 1.0 }
fn default_console_enabled() -> bool { true }

fn default_generator_hz() -> f64 { 5.0 }
fn default_scenario_period_s() -> f64 { 18.0 }
fn default_generator_top_n() -> usize { 6 }

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_hz: default_poll_hz(),
            http_timeout_ms: default_http_timeout_ms(),
            observables_limit: default_observables_limit(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_bars: default_max_bars(),
            print_every_s: default_print_every_s(),
            console_enabled: default_console_enabled(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            update_hz: default_generator_hz(),
            period_s: default_scenario_period_s(),
            top_n: default_generator_top_n(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file if it exists, otherwise use defaults
    ///
    /// A missing file is normal (fresh deployment); a present but invalid
    /// file is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.feed.base_url.is_empty() {
            return Err(crate::error::HudBridgeError::Config(
                toml::de::Error::custom("feed base_url cannot be empty")
            ));
        }

        if !(self.feed.poll_hz > 0.0) || self.feed.poll_hz > 50.0 {
            return Err(crate::error::HudBridgeError::Config(
                toml::de::Error::custom("poll_hz must be between 0 and 50")
            ));
        }

        if self.feed.http_timeout_ms == 0 || self.feed.http_timeout_ms > 10000 {
            return Err(crate::error::HudBridgeError::Config(
                toml::de::Error::custom("http_timeout_ms must be between 1 and 10000")
            ));
        }

        if self.feed.observables_limit == 0 || self.feed.observables_limit > 256 {
            return Err(crate::error::HudBridgeError::Config(
                toml::de::Error::custom("observables_limit must be between 1 and 256")
            ));
        }

        if self.display.max_bars == 0 || self.display.max_bars > 16 {
            return Err(crate::error::HudBridgeError::Config(
                toml::de::Error::custom("max_bars must be between 1 and 16")
            ));
        }

        if !(self.display.print_every_s > 0.0) {
            return Err(crate::error::HudBridgeError::Config(
                toml::de::Error::custom("print_every_s must be greater than 0")
            ));
        }

        if !(self.generator.update_hz > 0.0) || self.generator.update_hz > 50.0 {
            return Err(crate::error::HudBridgeError::Config(
                toml::de::Error::custom("generator update_hz must be between 0 and 50")
            ));
        }

        if !(self.generator.period_s > 0.0) {
            return Err(crate::error::HudBridgeError::Config(
                toml::de::Error::custom("generator period_s must be greater than 0")
            ));
        }

        if self.generator.top_n == 0 || self.generator.top_n > 16 {
            return Err(crate::error::HudBridgeError::Config(
                toml::de::Error::custom("generator top_n must be between 1 and 16")
            ));
        }

        Ok(())
    }

    /// Poll period derived from the configured rate
    pub fn poll_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.feed.poll_hz)
    }

    /// Generator update period derived from the configured rate
    pub fn generator_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.generator.update_hz)
    }
}
