//! Unified error types for the blesense firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! cycle driver's error handling uniform. All variants are `Copy` so they
//! can be passed through the session and logged without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The analog sensor could not be read or returned out-of-range data.
    Sensor(SensorError),
    /// A call into the BLE peripheral stack failed.
    Link(LinkError),
    /// A wire payload could not be encoded or decoded.
    Codec(CodecError),
    /// The wall clock could not be read or set.
    Clock(ClockError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Clock(e) => write!(f, "clock: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error code.
    AdcReadFailed,
    /// Raw count is above the converter's full-scale value.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// BLE link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The Bluetooth controller or host stack failed to come up.
    StackInitFailed,
    /// Attribute table is not registered yet (no handle for the characteristic).
    NotRegistered,
    /// Characteristic value write was rejected by the stack.
    SetValueFailed(i32),
    /// Value does not fit the characteristic; nothing was written.
    ValueTooLong { len: usize, cap: usize },
    /// Notification could not be queued.
    NotifyFailed(i32),
    /// Advertising could not be (re)started.
    AdvertiseFailed(i32),
    /// No central is connected.
    NotConnected,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackInitFailed => write!(f, "BLE stack initialisation failed"),
            Self::NotRegistered => write!(f, "characteristic not registered"),
            Self::SetValueFailed(rc) => write!(f, "set value failed (rc={rc})"),
            Self::ValueTooLong { len, cap } => {
                write!(f, "value of {len} bytes exceeds {cap}-byte characteristic")
            }
            Self::NotifyFailed(rc) => write!(f, "notify failed (rc={rc})"),
            Self::AdvertiseFailed(rc) => write!(f, "advertising start failed (rc={rc})"),
            Self::NotConnected => write!(f, "no central connected"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Payload is shorter than the fixed field it must contain.
    TooShort { needed: usize, got: usize },
    /// Payload bytes are not valid UTF-8.
    InvalidUtf8,
    /// Payload text does not match the frame grammar.
    Malformed,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { needed, got } => {
                write!(f, "payload too short ({got} < {needed} bytes)")
            }
            Self::InvalidUtf8 => write!(f, "payload is not valid UTF-8"),
            Self::Malformed => write!(f, "malformed frame"),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Clock errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The platform clock call returned an error.
    SetFailed(i32),
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetFailed(rc) => write!(f, "settimeofday failed (rc={rc})"),
        }
    }
}

impl From<ClockError> for Error {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
