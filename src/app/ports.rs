//! Port traits: the hexagonal boundary between the session core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SessionService (domain)
//! ```
//!
//! Driven adapters (BLE stack, ADC, wall clock, event sinks) implement these
//! traits. The [`SessionService`](super::session::SessionService) consumes
//! them via generics, so the session never touches hardware directly.
//! Cycle pacing goes through [`embedded_hal::delay::DelayNs`].

use crate::error::{ClockError, LinkError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one raw ADC sample per call.
///
/// Synchronous and non-blocking; scaling is applied by the session.
pub trait SensorPort {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Peripheral stack port (driven adapter: domain ↔ GATT server)
// ───────────────────────────────────────────────────────────────

/// The handful of GATT-server primitives the session needs.
///
/// Service and characteristic registration happen once inside the adapter's
/// own start-up; the session only touches values, notifications and
/// advertising.
pub trait PeripheralPort {
    /// (Re-)arm advertising of the sensor service.
    ///
    /// Must be idempotent: calling it while already advertising is a no-op.
    fn start_advertising(&mut self) -> Result<(), LinkError>;

    /// Replace the TX characteristic value.
    ///
    /// Values longer than [`TX_VALUE_CAP`] are rejected whole, never cut.
    fn set_tx_value(&mut self, value: &[u8]) -> Result<(), LinkError>;

    /// Push the current TX value to the subscribed central.
    fn notify_tx(&mut self) -> Result<(), LinkError>;

    /// Current contents of the RX characteristic (last client write or the
    /// seeded placeholder).
    fn rx_value(&self) -> heapless::Vec<u8, RX_VALUE_CAP>;

    /// Replace the RX characteristic value (placeholder seeding).
    fn set_rx_value(&mut self, value: &[u8]) -> Result<(), LinkError>;
}

/// Largest RX value the session inspects (default ATT MTU payload).
pub const RX_VALUE_CAP: usize = 20;

/// Largest TX value a notification carries (default ATT MTU payload).
pub const TX_VALUE_CAP: usize = 20;

// ───────────────────────────────────────────────────────────────
// Connection callbacks (stack → domain)
// ───────────────────────────────────────────────────────────────

/// Capability injected into the BLE adapter so stack-side connection
/// events reach the session.
///
/// Implementations are invoked from the stack's own task, concurrently
/// with the cycle driver.
pub trait ConnectionCallbacks: Send + Sync {
    fn on_connect(&self);
    fn on_disconnect(&self);
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: domain ↔ wall clock)
// ───────────────────────────────────────────────────────────────

/// Wall clock used to timestamp readings in the time-sync variant.
pub trait ClockPort {
    /// Current Unix time in seconds.
    fn now(&self) -> i64;

    /// Set the wall clock to `unix_secs`.
    fn set(&mut self, unix_secs: i64) -> Result<(), ClockError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The session emits structured [`SessionEvent`](super::events::SessionEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::SessionEvent);
}
