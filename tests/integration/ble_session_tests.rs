//! End-to-end: SessionService driving the simulated BLE adapter.
//!
//! Connection events originate in the adapter (as they would from the
//! Bluedroid task) and reach the session only through the shared
//! `LinkMonitor`.

use std::sync::Arc;

use crate::mock_hw::{MockClock, MockDelay, MockSensor, RecordingSink, call_log};

use blesense::adapters::ble::{BleAdapter, BleState};
use blesense::app::link::LinkMonitor;
use blesense::app::ports::PeripheralPort;
use blesense::app::events::SessionEvent;
use blesense::app::session::SessionService;
use blesense::codec;
use blesense::config::PeripheralConfig;
use blesense::error::LinkError;

struct Rig {
    session: SessionService,
    radio: BleAdapter,
    sensor: MockSensor,
    clock: MockClock,
    delay: MockDelay,
    sink: RecordingSink,
    now_ms: u64,
}

impl Rig {
    fn new(config: PeripheralConfig) -> Self {
        let link = Arc::new(LinkMonitor::new());
        let mut radio = BleAdapter::new(config.device_name.clone(), link.clone());
        radio.start().expect("stack up");
        let mut sink = RecordingSink::default();
        let mut session = SessionService::new(config, link);
        session.start(&mut radio, &mut sink).expect("session start");
        Self {
            session,
            radio,
            sensor: MockSensor::steady(1),
            clock: MockClock::default(),
            delay: MockDelay::new(call_log()),
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
        self.now_ms += 1000;
    }
}

#[test]
fn full_session_over_simulated_stack() {
    let mut rig = Rig::new(PeripheralConfig {
        full_scale: 12.345,
        adc_max_count: 1,
        ..PeripheralConfig::default()
    });
    assert_eq!(rig.radio.state(), BleState::Advertising);
    assert_eq!(rig.radio.rx_value().as_slice(), &[0, 0, 0, 0]);

    rig.radio.sim_connect();
    rig.tick();
    assert!(rig.radio.sim_notified().is_empty());

    rig.radio.sim_client_write(&codec::encode_timestamp(1_700_000_000));
    rig.tick();
    rig.tick();
    let frames: Vec<_> = rig
        .radio
        .sim_notified()
        .iter()
        .map(|v| codec::decode_frame(v).expect("well-formed frame"))
        .collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].timestamp, Some(1_700_000_000));
    assert!((frames[0].reading - 12.345).abs() < 1e-3);

    rig.radio.sim_disconnect();
    assert_eq!(rig.radio.state(), BleState::Idle);
    rig.tick();
    assert_eq!(rig.radio.state(), BleState::Advertising);
    assert_eq!(rig.radio.adverts_started(), 2);

    rig.tick();
    rig.tick();
    assert_eq!(rig.radio.adverts_started(), 2, "re-armed exactly once");
}

#[test]
fn plain_session_over_simulated_stack() {
    let mut rig = Rig::new(PeripheralConfig {
        full_scale: 1000.0,
        adc_max_count: 1000,
        ..PeripheralConfig::plain()
    });
    rig.sensor = MockSensor::steady(42);
    assert_eq!(rig.radio.rx_value().as_slice(), b"mambana");

    rig.radio.sim_connect();
    rig.tick();
    rig.tick();
    assert_eq!(rig.radio.sim_notified().len(), 2);
    assert_eq!(rig.radio.sim_tx_value(), b"42.000");
}

#[test]
fn central_dropping_between_cycles_leaves_device_advertising() {
    let mut rig = Rig::new(PeripheralConfig::default());
    rig.tick();

    rig.radio.sim_connect();
    rig.radio.sim_disconnect();
    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(rig.radio.state(), BleState::Advertising);
    assert_eq!(rig.radio.adverts_started(), 2);
}

#[test]
fn oversized_frame_is_reported_failed_not_sent() {
    // Bypasses validate(): precision 6 makes "1700000000,1100.000000".
    let mut rig = Rig::new(PeripheralConfig {
        reading_precision: 6,
        ..PeripheralConfig::default()
    });
    rig.sensor = MockSensor::steady(4095);
    rig.radio.sim_client_write(&codec::encode_timestamp(1_700_000_000));
    rig.radio.sim_connect();
    rig.tick();
    rig.tick();

    assert!(rig.radio.sim_notified().is_empty());
    assert_eq!(
        rig.sink.count(|e| matches!(e, SessionEvent::Notified(_))),
        0
    );
    assert_eq!(
        rig.sink.count(|e| *e
            == SessionEvent::NotifyFailed(LinkError::ValueTooLong { len: 22, cap: 20 })),
        1
    );
}
