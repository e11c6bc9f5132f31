//! Session service: the per-cycle state machine.
//!
//! [`SessionService`] owns the connection-lifecycle bookkeeping and drives
//! the sample → encode → notify cycle and, in the time-sync variant, the
//! write → decode → apply cycle. All I/O flows through port traits injected
//! at call sites.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  SensorPort ──▶ │                              │ ──▶ PeripheralPort (TX, advertising)
//!  ClockPort  ◀─▶ │        SessionService        │ ◀── PeripheralPort (RX)
//!  LinkMonitor ─▶ │  observe · sample · exchange │ ──▶ EventSink
//!                 │  edges · pace                │ ──▶ DelayNs
//!                 └──────────────────────────────┘
//! ```
//!
//! One [`tick`](SessionService::tick) per cycle period:
//!
//! 1. Observe the link level and edge.
//! 2. Sample the sensor (always, connected or not).
//! 3. While connected: either consume the RX timestamp (time-sync, clock
//!    unset) or publish a frame on TX, subject to the notify pacer.
//! 4. On a disconnect edge: grace delay, reseed RX, re-arm advertising.
//! 5. Block for the cycle period.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::codec;
use crate::config::{PeripheralConfig, SyncMode};
use crate::error::SensorError;

use super::events::{SessionEvent, TimeWait};
use super::link::{LinkEdge, LinkMonitor};
use super::ports::{ClockPort, EventSink, PeripheralPort, RX_VALUE_CAP, SensorPort};

/// Placeholder seeded into RX in the plain variant.
pub const PLAIN_RX_PLACEHOLDER: &[u8] = b"mambana";

/// One scaled ADC sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub raw: u16,
    /// `raw` scaled by the configured full-scale value (millivolts by default).
    pub value: f32,
}

// ───────────────────────────────────────────────────────────────
// SessionService
// ───────────────────────────────────────────────────────────────

pub struct SessionService {
    config: PeripheralConfig,
    link: Arc<LinkMonitor>,
    /// Time-sync status: set once a non-zero timestamp has been applied.
    clock_set: bool,
    last_reading: Option<SensorReading>,
    /// Uptime of the last successful notify, for the pacer.
    last_notify_ms: Option<u64>,
    /// Plain variant: last RX contents already reported.
    last_inbound: heapless::Vec<u8, RX_VALUE_CAP>,
    cycle_count: u64,
}

impl SessionService {
    /// Construct the session. Does **not** touch the radio; call
    /// [`start`](Self::start) next.
    pub fn new(config: PeripheralConfig, link: Arc<LinkMonitor>) -> Self {
        Self {
            config,
            link,
            clock_set: false,
            last_reading: None,
            last_notify_ms: None,
            last_inbound: heapless::Vec::new(),
            cycle_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Seed the RX placeholder and begin advertising.
    pub fn start(
        &mut self,
        radio: &mut impl PeripheralPort,
        sink: &mut impl EventSink,
    ) -> crate::error::Result<()> {
        let placeholder = self.rx_placeholder();
        radio.set_rx_value(&placeholder)?;
        self.last_inbound = placeholder;

        radio.start_advertising()?;
        sink.emit(&SessionEvent::Started(self.config.mode));
        info!(
            "Session started ({:?}); waiting for a client connection to notify",
            self.config.mode
        );
        Ok(())
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full cycle, including its trailing pacing delay.
    ///
    /// `now_ms` is monotonic uptime at the start of the cycle.
    pub fn tick(
        &mut self,
        now_ms: u64,
        sensor: &mut impl SensorPort,
        radio: &mut impl PeripheralPort,
        clock: &mut impl ClockPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        self.cycle_count += 1;

        // 1. Single observation per cycle; every decision below uses it.
        let link = self.link.observe_edge();
        if link.edge == LinkEdge::EnteredConnected {
            self.begin_connection(sink);
        }

        // 2. Sample unconditionally so the value is fresh when a client connects.
        let reading = self.sample(sensor, sink);

        // 3. Exchange with the central.
        if link.is_connected() {
            if self.config.mode == SyncMode::TimeSync && !self.clock_set {
                self.consume_time(radio, clock, sink);
            } else {
                if self.config.mode == SyncMode::Plain {
                    self.consume_inbound(radio, sink);
                }
                if let Some(reading) = reading {
                    self.publish(now_ms, reading, radio, &*clock, sink);
                }
            }
        }

        // 4. Edge follow-up.
        match link.edge {
            LinkEdge::EnteredDisconnected => self.end_connection(radio, delay, sink),
            LinkEdge::None if !link.is_connected() => {
                sink.emit(&SessionEvent::StillDisconnected);
            }
            LinkEdge::EnteredConnected | LinkEdge::None => {}
        }

        // 5. Cycle pacing.
        delay.delay_ms(self.config.cycle_period_ms);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &PeripheralConfig {
        &self.config
    }

    /// Whether a central-supplied time has been applied this session.
    pub fn clock_is_set(&self) -> bool {
        self.clock_set
    }

    /// Most recent successful sample.
    pub fn last_reading(&self) -> Option<SensorReading> {
        self.last_reading
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Bytes the RX characteristic holds before any client write.
    pub fn rx_placeholder(&self) -> heapless::Vec<u8, RX_VALUE_CAP> {
        let seed: &[u8] = match self.config.mode {
            SyncMode::Plain => PLAIN_RX_PLACEHOLDER,
            SyncMode::TimeSync => &[0; codec::TIMESTAMP_LEN],
        };
        heapless::Vec::from_slice(seed).unwrap_or_default()
    }

    // ── Internal ──────────────────────────────────────────────

    fn begin_connection(&mut self, sink: &mut impl EventSink) {
        info!("Session: client connected");
        if self.config.resync_on_reconnect && self.clock_set {
            info!("Session: clearing clock sync, waiting for a fresh timestamp");
            self.clock_set = false;
        }
        sink.emit(&SessionEvent::ClientConnected);
    }

    fn end_connection(
        &mut self,
        radio: &mut impl PeripheralPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        info!("Session: client disconnected");
        sink.emit(&SessionEvent::ClientDisconnected);

        // Give the stack time to tear the link down before re-advertising.
        delay.delay_ms(self.config.grace_delay_ms);

        // A stale timestamp must not be applied to the next central.
        let placeholder = self.rx_placeholder();
        if let Err(e) = radio.set_rx_value(&placeholder) {
            warn!("Session: RX placeholder reseed failed: {}", e);
        }
        self.last_inbound = placeholder;

        match radio.start_advertising() {
            Ok(()) => {
                info!("Session: advertising re-armed");
                sink.emit(&SessionEvent::AdvertisingRearmed);
            }
            Err(e) => {
                warn!("Session: advertising re-arm failed: {}", e);
                sink.emit(&SessionEvent::AdvertisingFailed(e));
            }
        }
    }

    fn sample(
        &mut self,
        sensor: &mut impl SensorPort,
        sink: &mut impl EventSink,
    ) -> Option<SensorReading> {
        let result = sensor.read_raw().and_then(|raw| {
            if raw > self.config.adc_max_count {
                Err(SensorError::OutOfRange)
            } else {
                Ok(raw)
            }
        });

        match result {
            Ok(raw) => {
                let reading = SensorReading {
                    raw,
                    value: f32::from(raw) * self.config.scale_per_count(),
                };
                self.last_reading = Some(reading);
                Some(reading)
            }
            Err(e) => {
                warn!("Session: sensor read failed: {}", e);
                sink.emit(&SessionEvent::SensorFault(e));
                None
            }
        }
    }

    fn consume_time(
        &mut self,
        radio: &mut impl PeripheralPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        let wait = match codec::decode_timestamp(&radio.rx_value()) {
            Ok(0) => TimeWait::Unset,
            Ok(ts) => match clock.set(i64::from(ts)) {
                Ok(()) => {
                    self.clock_set = true;
                    info!("Session: clock set to {} from central", ts);
                    sink.emit(&SessionEvent::ClockSynced(i64::from(ts)));
                    return;
                }
                Err(e) => {
                    warn!("Session: clock rejected timestamp {}: {}", ts, e);
                    TimeWait::ClockRejected(e)
                }
            },
            Err(e) => TimeWait::Undecodable(e),
        };
        debug!("Session: awaiting time ({:?})", wait);
        sink.emit(&SessionEvent::AwaitingTime(wait));
    }

    fn consume_inbound(&mut self, radio: &mut impl PeripheralPort, sink: &mut impl EventSink) {
        let rx = radio.rx_value();
        if rx.is_empty() || rx == self.last_inbound {
            return;
        }
        info!("Received Value: {}", String::from_utf8_lossy(&rx));
        sink.emit(&SessionEvent::InboundReceived(rx.clone()));
        self.last_inbound = rx;
    }

    fn publish(
        &mut self,
        now_ms: u64,
        reading: SensorReading,
        radio: &mut impl PeripheralPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        let min_spacing = u64::from(self.config.min_notify_interval_ms);
        if let Some(last) = self.last_notify_ms {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < min_spacing {
                let wait_ms = min_spacing - elapsed;
                debug!("Session: notify deferred ({} ms early)", wait_ms);
                sink.emit(&SessionEvent::NotifyDeferred { wait_ms });
                return;
            }
        }

        let precision = self.config.reading_precision;
        let frame = match self.config.mode {
            SyncMode::TimeSync => codec::encode_timestamped(clock.now(), reading.value, precision),
            SyncMode::Plain => codec::encode_reading(reading.value, precision),
        };

        let sent = radio
            .set_tx_value(frame.as_bytes())
            .and_then(|()| radio.notify_tx());
        match sent {
            Ok(()) => {
                self.last_notify_ms = Some(now_ms);
                debug!("Session: notified {}", frame);
                sink.emit(&SessionEvent::Notified(frame));
            }
            Err(e) => {
                warn!("Session: notify failed: {}", e);
                sink.emit(&SessionEvent::NotifyFailed(e));
            }
        }
    }
}
