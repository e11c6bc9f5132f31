//! Characteristic payload codec.
//!
//! Wire formats:
//! ```text
//! TX (device → central), ASCII:
//!   "<reading>"                 e.g. "734.066"
//!   "<unix-ts>,<reading>"       e.g. "1700000000,12.345"
//!
//! RX (central → device), binary:
//! ┌────────┬────────┬────────┬────────┐
//! │ byte 0 │ byte 1 │ byte 2 │ byte 3 │   i32, little-endian Unix seconds
//! │  LSB   │        │        │  MSB   │   0 = "no time supplied yet"
//! └────────┴────────┴────────┴────────┘
//! ```
//!
//! Outbound frames are owned `String`s sized by their content, so a large
//! reading can never be truncated into a fixed buffer.

use core::fmt::Write;

use crate::error::CodecError;

/// Size of the inbound timestamp field.
pub const TIMESTAMP_LEN: usize = 4;

/// Separator between the timestamp and reading fields.
const FIELD_SEPARATOR: char = ',';

/// A decoded outbound frame (client-side view of the TX characteristic).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub timestamp: Option<i64>,
    pub reading: f32,
}

impl Frame {
    /// Render this frame in its wire form.
    pub fn encode(&self, precision: u8) -> String {
        match self.timestamp {
            Some(ts) => encode_timestamped(ts, self.reading, precision),
            None => encode_reading(self.reading, precision),
        }
    }
}

// ── Encoding ──────────────────────────────────────────────────

/// Format a lone reading as a fixed-precision decimal string.
pub fn encode_reading(reading: f32, precision: u8) -> String {
    let mut out = String::with_capacity(12);
    push_reading(&mut out, reading, precision);
    out
}

/// Format a `"<timestamp>,<reading>"` pair.
pub fn encode_timestamped(timestamp: i64, reading: f32, precision: u8) -> String {
    let mut out = String::with_capacity(24);
    // Writing into a String cannot fail.
    let _ = write!(out, "{timestamp}{FIELD_SEPARATOR}");
    push_reading(&mut out, reading, precision);
    out
}

fn push_reading(out: &mut String, reading: f32, precision: u8) {
    let _ = write!(out, "{:.*}", usize::from(precision), reading);
}

/// Encode a Unix timestamp the way a central writes it to RX.
pub fn encode_timestamp(timestamp: i32) -> [u8; TIMESTAMP_LEN] {
    timestamp.to_le_bytes()
}

// ── Decoding ──────────────────────────────────────────────────

/// Decode the first four bytes of an RX payload as a little-endian `i32`.
///
/// Extra trailing bytes are ignored. Fewer than four bytes fail the decode.
pub fn decode_timestamp(payload: &[u8]) -> Result<i32, CodecError> {
    let field: [u8; TIMESTAMP_LEN] = payload
        .get(..TIMESTAMP_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or(CodecError::TooShort {
            needed: TIMESTAMP_LEN,
            got: payload.len(),
        })?;
    Ok(i32::from_le_bytes(field))
}

/// Parse a decimal reading field.
///
/// Trailing NUL terminators are tolerated (some centrals forward C strings).
pub fn decode_reading(field: &str) -> Result<f32, CodecError> {
    let field = field.trim_end_matches('\0');
    if !is_decimal(field) {
        return Err(CodecError::Malformed);
    }
    field.parse::<f32>().map_err(|_| CodecError::Malformed)
}

/// Parse a complete TX payload in either shape.
pub fn decode_frame(payload: &[u8]) -> Result<Frame, CodecError> {
    let text = core::str::from_utf8(payload).map_err(|_| CodecError::InvalidUtf8)?;
    match text.split_once(FIELD_SEPARATOR) {
        Some((ts, reading)) => {
            if !is_integer(ts) {
                return Err(CodecError::Malformed);
            }
            let timestamp = ts.parse::<i64>().map_err(|_| CodecError::Malformed)?;
            Ok(Frame {
                timestamp: Some(timestamp),
                reading: decode_reading(reading)?,
            })
        }
        None => Ok(Frame {
            timestamp: None,
            reading: decode_reading(text)?,
        }),
    }
}

/// `-?[0-9]+`
fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `-?[0-9]+(\.[0-9]+)?`
fn is_decimal(s: &str) -> bool {
    match s.split_once('.') {
        Some((int, frac)) => {
            is_integer(int) && !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit())
        }
        None => is_integer(s),
    }
}
