//! Integration tests for the SessionService cycle against mock adapters.
//!
//! Covers the connection lifecycle (edge handling, re-arm after the grace
//! delay), the time-sync handshake and the outbound frame shapes.

use std::sync::Arc;

use crate::mock_hw::{Call, CallLog, MockClock, MockDelay, MockRadio, MockSensor, RecordingSink, call_log};

use blesense::app::events::{SessionEvent, TimeWait};
use blesense::app::link::LinkMonitor;
use blesense::app::ports::ConnectionCallbacks;
use blesense::app::session::{PLAIN_RX_PLACEHOLDER, SessionService};
use blesense::codec;
use blesense::config::PeripheralConfig;
use blesense::error::{CodecError, LinkError, SensorError};

const GRACE_MS: u32 = 777;
const PERIOD_MS: u32 = 1000;

struct Rig {
    session: SessionService,
    link: Arc<LinkMonitor>,
    log: CallLog,
    radio: MockRadio,
    delay: MockDelay,
    sensor: MockSensor,
    clock: MockClock,
    sink: RecordingSink,
    now_ms: u64,
}

impl Rig {
    fn new(mut config: PeripheralConfig) -> Self {
        config.grace_delay_ms = GRACE_MS;
        config.cycle_period_ms = PERIOD_MS;
        config.validate().expect("valid test config");

        let link = Arc::new(LinkMonitor::new());
        let log = call_log();
        let mut radio = MockRadio::new(log.clone());
        let mut sink = RecordingSink::default();
        let mut session = SessionService::new(config, link.clone());
        session.start(&mut radio, &mut sink).expect("start");

        Self {
            session,
            link,
            delay: MockDelay::new(log.clone()),
            log,
            radio,
            sensor: MockSensor::steady(2048),
            clock: MockClock::default(),
            sink,
            now_ms: 0,
        }
    }

    fn tick(&mut self) {
        self.session.tick(
            self.now_ms,
            &mut self.sensor,
            &mut self.radio,
            &mut self.clock,
            &mut self.delay,
            &mut self.sink,
        );
        self.now_ms += u64::from(PERIOD_MS);
    }

    fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }
}

/// Config whose single ADC step maps exactly to 12.345.
fn exact_reading_config() -> PeripheralConfig {
    PeripheralConfig {
        full_scale: 12.345,
        adc_max_count: 1,
        ..PeripheralConfig::default()
    }
}

// ── Connection lifecycle ──────────────────────────────────────

#[test]
fn start_advertises_once_with_zero_rx() {
    let rig = Rig::new(PeripheralConfig::default());
    assert_eq!(
        rig.calls(),
        vec![Call::SetRx(vec![0, 0, 0, 0]), Call::Advertise]
    );
    assert!(matches!(rig.sink.events[0], SessionEvent::Started(_)));
}

#[test]
fn disconnect_rearms_advertising_once_after_grace_delay() {
    let mut rig = Rig::new(PeripheralConfig::plain());
    rig.link.on_connect();
    rig.ticks(3);
    rig.link.on_disconnect();
    rig.ticks(5);

    let calls = rig.calls();
    assert_eq!(rig.radio.advert_count(), 2, "initial advert plus one re-arm");

    let grace = calls
        .iter()
        .position(|c| *c == Call::Delay(GRACE_MS))
        .expect("grace delay observed");
    let rearm = calls
        .iter()
        .rposition(|c| *c == Call::Advertise)
        .expect("re-arm observed");
    assert!(grace < rearm, "re-arm must follow the grace delay");
    assert_eq!(
        calls.iter().filter(|c| **c == Call::Delay(GRACE_MS)).count(),
        1
    );

    assert_eq!(
        rig.sink.count(|e| *e == SessionEvent::AdvertisingRearmed),
        1
    );
    assert_eq!(rig.sink.count(|e| *e == SessionEvent::ClientDisconnected), 1);
    assert_eq!(rig.sink.count(|e| *e == SessionEvent::StillDisconnected), 4);
}

#[test]
fn connect_edge_is_reported_once() {
    let mut rig = Rig::new(PeripheralConfig::plain());
    rig.link.on_connect();
    rig.ticks(4);
    assert_eq!(rig.sink.count(|e| *e == SessionEvent::ClientConnected), 1);
}

#[test]
fn never_notifies_while_disconnected() {
    let mut rig = Rig::new(PeripheralConfig::plain());
    rig.ticks(20);
    assert!(rig.radio.notified().is_empty());
    assert!(!rig.calls().iter().any(|c| matches!(c, Call::SetTx(_))));
    assert_eq!(rig.session.cycle_count(), 20);
    assert!(rig.session.last_reading().is_some(), "sampling continues");
}

#[test]
fn every_cycle_ends_with_the_period_delay() {
    let mut rig = Rig::new(PeripheralConfig::plain());
    rig.ticks(3);
    let delays = rig
        .calls()
        .into_iter()
        .filter(|c| *c == Call::Delay(PERIOD_MS))
        .count();
    assert_eq!(delays, 3);
}

#[test]
fn rearm_failure_is_reported_not_fatal() {
    let mut rig = Rig::new(PeripheralConfig::plain());
    rig.link.on_connect();
    rig.tick();
    rig.radio.fail_advertise = true;
    rig.link.on_disconnect();
    rig.tick();
    assert_eq!(
        rig.sink.count(|e| matches!(e, SessionEvent::AdvertisingFailed(LinkError::AdvertiseFailed(_)))),
        1
    );
    rig.ticks(2);
    assert_eq!(rig.session.cycle_count(), 4);
}

#[test]
fn connect_and_drop_between_cycles_still_rearms() {
    let mut rig = Rig::new(PeripheralConfig::plain());
    rig.tick();
    rig.link.on_connect();
    rig.link.on_disconnect();
    rig.ticks(3);

    assert_eq!(rig.sink.count(|e| *e == SessionEvent::ClientDisconnected), 1);
    assert_eq!(rig.radio.advert_count(), 2, "initial advert plus one re-arm");
    assert!(rig.radio.notified().is_empty());
}

#[test]
fn quick_reconnect_between_cycles_runs_a_fresh_handshake() {
    let mut rig = Rig::new(exact_reading_config());
    rig.sensor = MockSensor::steady(1);
    rig.radio.client_write(&codec::encode_timestamp(1_700_000_000));
    rig.link.on_connect();
    rig.ticks(2);
    assert_eq!(rig.radio.notified(), vec!["1700000000,12.345"]);

    rig.link.on_disconnect();
    rig.link.on_connect();
    rig.tick();
    assert_eq!(rig.sink.count(|e| *e == SessionEvent::ClientDisconnected), 1);
    assert_eq!(rig.radio.rx.as_slice(), &[0, 0, 0, 0], "RX reseeded");
    assert_eq!(rig.radio.advert_count(), 2);

    rig.tick();
    assert_eq!(rig.sink.count(|e| *e == SessionEvent::ClientConnected), 2);
    assert!(!rig.session.clock_is_set(), "old timestamp not reused");
    assert_eq!(rig.radio.notified().len(), 1);

    rig.radio.client_write(&codec::encode_timestamp(1_800_000_000));
    rig.ticks(2);
    assert_eq!(rig.clock.sets, vec![1_700_000_000, 1_800_000_000]);
    assert_eq!(rig.radio.notified().last().map(String::as_str), Some("1800000000,12.345"));
}

// ── Plain variant ─────────────────────────────────────────────

#[test]
fn plain_variant_notifies_reading_each_connected_cycle() {
    let mut rig = Rig::new(PeripheralConfig {
        full_scale: 1000.0,
        adc_max_count: 1000,
        ..PeripheralConfig::plain()
    });
    rig.sensor = MockSensor::steady(250);
    rig.link.on_connect();
    rig.ticks(3);
    assert_eq!(rig.radio.notified(), vec!["250.000"; 3]);
}

#[test]
fn plain_variant_reports_new_inbound_once() {
    let mut rig = Rig::new(PeripheralConfig::plain());
    assert_eq!(rig.radio.rx.as_slice(), PLAIN_RX_PLACEHOLDER);
    rig.link.on_connect();
    rig.tick();
    rig.radio.client_write(b"hello");
    rig.ticks(3);
    assert_eq!(
        rig.sink.count(|e| matches!(e, SessionEvent::InboundReceived(_))),
        1
    );
}

#[test]
fn sensor_fault_skips_that_cycles_notify() {
    let mut rig = Rig::new(PeripheralConfig::plain());
    rig.sensor.script.push_back(Err(SensorError::AdcReadFailed));
    rig.link.on_connect();
    rig.tick();
    assert!(rig.radio.notified().is_empty());
    assert_eq!(
        rig.sink.count(|e| *e == SessionEvent::SensorFault(SensorError::AdcReadFailed)),
        1
    );
    rig.tick();
    assert_eq!(rig.radio.notified().len(), 1);
}

#[test]
fn notify_failure_retries_next_cycle() {
    let mut rig = Rig::new(PeripheralConfig::plain());
    rig.link.on_connect();
    rig.radio.fail_notify = true;
    rig.tick();
    rig.radio.fail_notify = false;
    rig.tick();
    assert_eq!(rig.radio.notified().len(), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, SessionEvent::NotifyFailed(_))),
        1
    );
}

// ── Time-sync variant ─────────────────────────────────────────

#[test]
fn little_endian_timestamp_sets_clock() {
    let mut rig = Rig::new(PeripheralConfig::default());
    rig.radio.client_write(&[0x78, 0x56, 0x34, 0x12]);
    rig.link.on_connect();
    rig.tick();
    assert_eq!(rig.clock.sets, vec![0x1234_5678]);
    assert!(rig.session.clock_is_set());
    assert_eq!(
        rig.sink.count(|e| *e == SessionEvent::ClockSynced(305_419_896)),
        1
    );
}

#[test]
fn timestamped_frame_after_sync() {
    let mut rig = Rig::new(exact_reading_config());
    rig.sensor = MockSensor::steady(1);
    rig.radio.client_write(&codec::encode_timestamp(1_700_000_000));
    rig.link.on_connect();
    rig.tick();
    assert!(rig.radio.notified().is_empty(), "sync cycle does not notify");
    rig.tick();
    assert_eq!(rig.radio.notified(), vec!["1700000000,12.345"]);
}

#[test]
fn zero_sentinel_never_sets_clock() {
    let mut rig = Rig::new(exact_reading_config());
    rig.link.on_connect();
    rig.ticks(6);
    assert!(rig.clock.sets.is_empty());
    assert!(!rig.session.clock_is_set());
    assert!(rig.radio.notified().is_empty());
    assert_eq!(
        rig.sink.count(|e| *e == SessionEvent::AwaitingTime(TimeWait::Unset)),
        6
    );
}

#[test]
fn short_rx_payload_is_not_applied() {
    let mut rig = Rig::new(PeripheralConfig::default());
    rig.radio.client_write(&[0x01, 0x02]);
    rig.link.on_connect();
    rig.tick();
    assert!(rig.clock.sets.is_empty());
    assert_eq!(
        rig.sink.count(|e| *e
            == SessionEvent::AwaitingTime(TimeWait::Undecodable(CodecError::TooShort {
                needed: 4,
                got: 2
            }))),
        1
    );
}

#[test]
fn clock_rejection_keeps_waiting() {
    let mut rig = Rig::new(PeripheralConfig::default());
    rig.clock.reject = true;
    rig.radio.client_write(&codec::encode_timestamp(1_700_000_000));
    rig.link.on_connect();
    rig.ticks(2);
    assert!(!rig.session.clock_is_set());
    assert!(rig.radio.notified().is_empty());
    assert_eq!(
        rig.sink.count(|e| matches!(e, SessionEvent::AwaitingTime(TimeWait::ClockRejected(_)))),
        2
    );
}

#[test]
fn reconnect_requires_fresh_timestamp_by_default() {
    let mut rig = Rig::new(exact_reading_config());
    rig.sensor = MockSensor::steady(1);
    rig.radio.client_write(&codec::encode_timestamp(1_700_000_000));
    rig.link.on_connect();
    rig.ticks(2);
    assert!(rig.session.clock_is_set());

    rig.link.on_disconnect();
    rig.tick();
    assert_eq!(rig.radio.rx.as_slice(), &[0, 0, 0, 0], "RX reseeded");

    rig.link.on_connect();
    rig.tick();
    assert!(!rig.session.clock_is_set());
    assert_eq!(rig.radio.notified().len(), 1, "no frame before resync");

    rig.radio.client_write(&codec::encode_timestamp(1_800_000_000));
    rig.ticks(2);
    assert_eq!(rig.clock.sets, vec![1_700_000_000, 1_800_000_000]);
    assert_eq!(rig.radio.notified().last().map(String::as_str), Some("1800000000,12.345"));
}

#[test]
fn reconnect_keeps_sync_when_resync_disabled() {
    let mut rig = Rig::new(PeripheralConfig {
        resync_on_reconnect: false,
        ..exact_reading_config()
    });
    rig.sensor = MockSensor::steady(1);
    rig.radio.client_write(&codec::encode_timestamp(1_700_000_000));
    rig.link.on_connect();
    rig.ticks(2);
    rig.link.on_disconnect();
    rig.tick();
    rig.link.on_connect();
    rig.tick();
    assert!(rig.session.clock_is_set());
    assert_eq!(rig.radio.notified().len(), 2);
    assert_eq!(rig.clock.sets.len(), 1);
}
