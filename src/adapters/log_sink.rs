//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing session events to the ESP-IDF
//! logger (which goes to UART in production).

use log::{info, warn};

use crate::app::events::{SessionEvent, TimeWait};
use crate::app::ports::EventSink;

/// Adapter that logs every [`SessionEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Started(mode) => {
                info!("START | mode={:?} | Waiting a client connection to notify...", mode);
            }
            SessionEvent::ClientConnected => info!("LINK  | connecting"),
            SessionEvent::ClientDisconnected => info!("LINK  | disconnected"),
            SessionEvent::AdvertisingRearmed => info!("LINK  | start advertising"),
            SessionEvent::AdvertisingFailed(e) => warn!("LINK  | advertising failed: {}", e),
            SessionEvent::StillDisconnected => {
                log::debug!("LINK  | waiting for a client connection");
            }
            SessionEvent::SensorFault(e) => warn!("SENSE | {}", e),
            SessionEvent::Notified(frame) => info!("TX    | {}", frame),
            SessionEvent::NotifyDeferred { wait_ms } => {
                log::debug!("TX    | deferred {} ms", wait_ms);
            }
            SessionEvent::NotifyFailed(e) => warn!("TX    | notify failed: {}", e),
            SessionEvent::AwaitingTime(TimeWait::Unset) => {
                info!("SYNC  | waiting for timestamp");
            }
            SessionEvent::AwaitingTime(TimeWait::Undecodable(e)) => {
                warn!("SYNC  | bad timestamp payload: {}", e);
            }
            SessionEvent::AwaitingTime(TimeWait::ClockRejected(e)) => {
                warn!("SYNC  | clock rejected timestamp: {}", e);
            }
            SessionEvent::ClockSynced(ts) => info!("SYNC  | Received Value: {}", ts),
            SessionEvent::InboundReceived(bytes) => {
                info!("RX    | Received Value: {}", String::from_utf8_lossy(bytes));
            }
        }
    }
}
