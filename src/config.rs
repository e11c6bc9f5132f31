//! Peripheral configuration parameters
//!
//! All tunable parameters for the sensor peripheral. The firmware runs with
//! the build-time defaults; the struct is serde-enabled so the active values
//! can be dumped at boot and inspected from tests.

use serde::{Deserialize, Serialize};

use crate::app::ports::TX_VALUE_CAP;
use crate::codec;
use crate::error::{Error, Result};

/// Which session variant the firmware runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Notify the bare reading every cycle while connected.
    Plain,
    /// Wait for the central to write a Unix timestamp, then notify
    /// `"<timestamp>,<reading>"` pairs.
    TimeSync,
}

/// Core peripheral configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeripheralConfig {
    // --- Identity ---
    /// GAP device name used while advertising
    pub device_name: heapless::String<24>,
    /// Session variant
    pub mode: SyncMode,

    // --- Timing ---
    /// Sampling cycle period (milliseconds)
    pub cycle_period_ms: u32,
    /// Wait between observing a disconnect and re-arming advertising (milliseconds)
    pub grace_delay_ms: u32,
    /// Minimum spacing between two notifications (milliseconds)
    pub min_notify_interval_ms: u32,
    /// Task watchdog timeout for the main loop (milliseconds)
    pub watchdog_timeout_ms: u32,

    // --- Sensor scaling ---
    /// Value reported for a full-scale ADC count (1100 mV at 0 dB attenuation)
    pub full_scale: f32,
    /// Highest raw count the ADC can produce (12-bit)
    pub adc_max_count: u16,

    // --- Wire format ---
    /// Fractional digits in the outbound decimal reading
    pub reading_precision: u8,

    // --- Time sync ---
    /// Clear the "clock set" flag on every new connection so each central
    /// performs its own handshake
    pub resync_on_reconnect: bool,
}

/// Largest fractional precision accepted for the outbound reading.
pub const MAX_READING_PRECISION: u8 = 6;

/// Widest timestamp prefix a time-sync frame can carry: `"-2147483648,"`.
const TIMESTAMP_PREFIX_MAX: usize = 12;

impl Default for PeripheralConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // "ESP32" always fits in 24 bytes.
        let _ = device_name.push_str("ESP32");

        Self {
            device_name,
            mode: SyncMode::TimeSync,

            // Timing
            cycle_period_ms: 1000,
            grace_delay_ms: 1000,
            min_notify_interval_ms: 1000,
            watchdog_timeout_ms: 10_000,

            // Sensor scaling
            full_scale: 1100.0,
            adc_max_count: 4095,

            // Wire format
            reading_precision: 3,

            // Time sync
            resync_on_reconnect: true,
        }
    }
}

impl PeripheralConfig {
    /// Default configuration for the plain (no time sync) variant.
    pub fn plain() -> Self {
        Self {
            mode: SyncMode::Plain,
            ..Self::default()
        }
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.device_name.is_empty() {
            return Err(Error::Config("device_name must not be empty"));
        }
        if self.cycle_period_ms == 0 {
            return Err(Error::Config("cycle_period_ms must be > 0"));
        }
        if self.reading_precision > MAX_READING_PRECISION {
            return Err(Error::Config("reading_precision must be <= 6"));
        }
        if self.adc_max_count == 0 {
            return Err(Error::Config("adc_max_count must be > 0"));
        }
        if !self.full_scale.is_finite() || self.full_scale <= 0.0 {
            return Err(Error::Config("full_scale must be a positive finite number"));
        }
        if self.max_frame_len() > TX_VALUE_CAP {
            return Err(Error::Config(
                "worst-case frame exceeds the TX characteristic (lower precision or full_scale)",
            ));
        }
        // One full cycle (period plus a disconnect grace delay) must fit
        // inside the watchdog window.
        let worst_cycle = u64::from(self.cycle_period_ms) + u64::from(self.grace_delay_ms);
        if u64::from(self.watchdog_timeout_ms) <= worst_cycle {
            return Err(Error::Config(
                "watchdog_timeout_ms must exceed cycle_period_ms + grace_delay_ms",
            ));
        }
        Ok(())
    }

    /// Scale factor applied to a raw ADC count.
    pub fn scale_per_count(&self) -> f32 {
        self.full_scale / f32::from(self.adc_max_count)
    }

    /// Length of the longest frame this configuration can produce.
    ///
    /// Readings are non-negative and peak at `adc_max_count`, so the widest
    /// reading is the full-scale one, scaled the same way the session does.
    pub fn max_frame_len(&self) -> usize {
        let peak = f32::from(self.adc_max_count) * self.scale_per_count();
        let reading = codec::encode_reading(peak, self.reading_precision).len();
        match self.mode {
            SyncMode::Plain => reading,
            SyncMode::TimeSync => TIMESTAMP_PREFIX_MAX + reading,
        }
    }
}
