//! Potentiometer / analog voltage sensor driver.
//!
//! Reads the raw 12-bit count through an ESP32 ADC1 channel configured for
//! 0 dB attenuation (1.1 V full scale). Scaling to a physical unit happens
//! in the session, not here.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

#[cfg(not(target_os = "espidf"))]
static SIM_ADC: AtomicU16 = AtomicU16::new(0);
#[cfg(not(target_os = "espidf"))]
static SIM_ADC_FAIL: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(raw: u16) {
    SIM_ADC.store(raw, Ordering::Relaxed);
}

/// Make subsequent simulated reads fail (or succeed again).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc_failure(fail: bool) {
    SIM_ADC_FAIL.store(fail, Ordering::Relaxed);
}

pub struct AnalogSensor {
    channel: u32,
    _adc_gpio: i32,
}

impl AnalogSensor {
    pub fn new(adc_gpio: i32, channel: u32) -> Self {
        Self {
            channel,
            _adc_gpio: adc_gpio,
        }
    }

    pub fn read(&mut self) -> Result<u16, SensorError> {
        self.read_adc()
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> Result<u16, SensorError> {
        hw_init::adc1_read(self.channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> Result<u16, SensorError> {
        let _ = self.channel;
        if SIM_ADC_FAIL.load(Ordering::Relaxed) {
            return Err(SensorError::AdcReadFailed);
        }
        Ok(SIM_ADC.load(Ordering::Relaxed))
    }
}
