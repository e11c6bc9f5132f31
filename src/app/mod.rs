//! Application core: pure session logic, zero I/O.
//!
//! This module contains the rules for the sensor peripheral: connection
//! edge detection, the sample/notify cycle and the time-sync handshake.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod link;
pub mod ports;
pub mod session;
