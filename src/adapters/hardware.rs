//! Hardware adapter: bridges the analog sensor to the session's [`SensorPort`].
//!
//! This is the only module in the system that owns a sensor driver. On
//! non-espidf targets the underlying driver uses cfg-gated simulation stubs.

use crate::app::ports::SensorPort;
use crate::error::SensorError;
use crate::pins;
use crate::sensors::analog::AnalogSensor;

/// Concrete adapter owning the potentiometer input.
pub struct HardwareAdapter {
    sensor: AnalogSensor,
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new(AnalogSensor::new(
            pins::SENSOR_ADC_GPIO,
            pins::SENSOR_ADC_CHANNEL,
        ))
    }
}

impl HardwareAdapter {
    pub fn new(sensor: AnalogSensor) -> Self {
        Self { sensor }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.sensor.read()
    }
}
