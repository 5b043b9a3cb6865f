//! # Error Types
//!
//! Custom error types for GNSS HUD Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for GNSS HUD Bridge
#[derive(Debug, Error)]
pub enum HudBridgeError {
    /// Feed transport errors (unreachable endpoint, timeout, bad status)
    #[error("Feed transport error: {0}")]
    Transport(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for GNSS HUD Bridge
pub type Result<T> = std::result::Result<T, HudBridgeError>;
