//! # GNSS HUD Bridge Library
//!
//! Bridge GNSS receiver telemetry to a microcontroller-driven LED matrix HUD.
//!
//! This library polls a receiver node's HTTP API for PVT fixes and CN0
//! observations, merges them into a single bounded snapshot, and encodes
//! that snapshot into the fixed-grammar status string the MCU parses.

pub mod aggregator;
pub mod config;
pub mod console;
pub mod error;
pub mod feed;
pub mod generator;
pub mod status;
