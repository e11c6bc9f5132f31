//! Connection-state holder shared between the BLE stack and the cycle driver.
//!
//! ```text
//!  Bluedroid task                    main loop (once per cycle)
//!  ──────────────                    ──────────────────────────
//!  on_connect()    ──▶ connected ───▶ observe_edge()
//!  on_disconnect() ──▶ disconnects++    ├─ disconnect generation changed?
//!                      connected        │    → EnteredDisconnected
//!                                       └─ else compare level with shadow
//! ```
//!
//! The level flag and the disconnect generation are written only by the two
//! callbacks. The shadow copy and the last seen generation are touched only
//! by [`LinkMonitor::observe_edge`]. A disconnect is never lost, even when
//! the central connects and drops (or drops and reconnects) between two
//! observations: the disconnect is reported first and a live link is then
//! reported as a fresh connection on the following observation.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::debug;

use super::ports::ConnectionCallbacks;

/// Level of the BLE link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

impl ConnectionState {
    fn from_flag(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

/// Transition observed between two consecutive cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEdge {
    EnteredConnected,
    EnteredDisconnected,
    None,
}

/// One cycle's view of the link: the current level plus the edge (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkObservation {
    pub state: ConnectionState,
    pub edge: LinkEdge,
}

impl LinkObservation {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Atomic connection flag and disconnect generation, plus the observer's
/// shadow copies used for edge detection.
#[derive(Debug)]
pub struct LinkMonitor {
    connected: AtomicBool,
    disconnects: AtomicU32,
    shadow: AtomicBool,
    seen_disconnects: AtomicU32,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMonitor {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            disconnects: AtomicU32::new(0),
            shadow: AtomicBool::new(false),
            seen_disconnects: AtomicU32::new(0),
        }
    }

    /// Current level without consuming an edge.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_flag(self.connected.load(Ordering::SeqCst))
    }

    /// Sample the level and report the transition since the previous call.
    ///
    /// Call exactly once per cycle from the cycle driver.
    pub fn observe_edge(&self) -> LinkObservation {
        let generation = self.disconnects.load(Ordering::SeqCst);
        let seen = self.seen_disconnects.swap(generation, Ordering::SeqCst);
        let now = self.connected.load(Ordering::SeqCst);
        let before = self.shadow.load(Ordering::SeqCst);

        if generation != seen {
            // At least one disconnect since the last observation. Report it
            // even if a central is already back; that one is picked up as
            // EnteredConnected next time.
            self.shadow.store(false, Ordering::SeqCst);
            return LinkObservation {
                state: ConnectionState::Disconnected,
                edge: LinkEdge::EnteredDisconnected,
            };
        }

        match (before, now) {
            (false, true) => {
                self.shadow.store(true, Ordering::SeqCst);
                LinkObservation {
                    state: ConnectionState::Connected,
                    edge: LinkEdge::EnteredConnected,
                }
            }
            // Level already dropped but the generation bump is not visible
            // yet: stay quiet, the next observation reports the edge.
            (true, false) => LinkObservation {
                state: ConnectionState::Disconnected,
                edge: LinkEdge::None,
            },
            (_, level) => LinkObservation {
                state: ConnectionState::from_flag(level),
                edge: LinkEdge::None,
            },
        }
    }
}

impl ConnectionCallbacks for LinkMonitor {
    fn on_connect(&self) {
        debug!("link: connect callback");
        self.connected.store(true, Ordering::SeqCst);
    }

    fn on_disconnect(&self) {
        debug!("link: disconnect callback");
        // Generation first: an observer that sees the level drop has either
        // seen this bump or will see it on its next observation.
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }
}
