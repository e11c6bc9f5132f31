//! GPIO / peripheral pin assignments for the sensor board.
//!
//! Single source of truth: drivers reference this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Sensors: Analog (ADC1)
// ---------------------------------------------------------------------------

/// Potentiometer wiper, analog voltage 0 to 1.1 V.
/// ADC1 channel 6 (GPIO 34 on the classic ESP32).
pub const SENSOR_ADC_GPIO: i32 = 34;
/// ADC1 channel number behind [`SENSOR_ADC_GPIO`].
pub const SENSOR_ADC_CHANNEL: u32 = 6;
