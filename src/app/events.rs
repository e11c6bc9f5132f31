//! Outbound session events.
//!
//! The [`SessionService`](super::session::SessionService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide where they go.

use crate::config::SyncMode;
use crate::error::{ClockError, CodecError, LinkError, SensorError};

/// Structured events emitted by the session core.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The session has started advertising (carries the variant).
    Started(SyncMode),

    /// A central connected (Disconnected → Connected edge).
    ClientConnected,

    /// The central went away (Connected → Disconnected edge).
    ClientDisconnected,

    /// Advertising was re-armed after the grace delay.
    AdvertisingRearmed,

    /// Advertising could not be re-armed.
    AdvertisingFailed(LinkError),

    /// Steady-state disconnected cycle.
    StillDisconnected,

    /// The sensor could not produce a reading this cycle.
    SensorFault(SensorError),

    /// A frame was written to TX and notified.
    Notified(String),

    /// A notify was skipped to respect the minimum spacing.
    NotifyDeferred { wait_ms: u64 },

    /// Writing or notifying TX failed; retried next cycle.
    NotifyFailed(LinkError),

    /// The RX buffer holds no usable timestamp yet.
    AwaitingTime(TimeWait),

    /// The wall clock was set from a central's write.
    ClockSynced(i64),

    /// Plain variant: the central wrote new bytes to RX.
    InboundReceived(heapless::Vec<u8, { super::ports::RX_VALUE_CAP }>),
}

/// Why a time-sync cycle did not apply a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWait {
    /// RX still holds the zero sentinel.
    Unset,
    /// RX holds a payload that failed to decode.
    Undecodable(CodecError),
    /// The clock rejected the new time.
    ClockRejected(ClockError),
}
