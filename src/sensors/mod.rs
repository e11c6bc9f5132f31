//! Sensor drivers.
//!
//! The firmware samples a single analog input; [`analog::AnalogSensor`]
//! is wrapped by [`HardwareAdapter`](crate::adapters::hardware::HardwareAdapter)
//! to satisfy the session's `SensorPort`.

pub mod analog;
