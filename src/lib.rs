//! blesense firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod codec;
pub mod config;
pub mod error;
pub mod pins;

// The adapters, drivers and sensors carry host simulation stubs next to
// their ESP-IDF implementations, so they compile on every target.
pub mod adapters;
pub mod drivers;
pub mod sensors;
