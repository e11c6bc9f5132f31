//! Mock adapters for integration tests.
//!
//! The radio and the delay share one ordered call log so tests can assert
//! on interleaving (e.g. advertising re-armed only after the grace delay)
//! without touching a real BLE stack.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use blesense::app::events::SessionEvent;
use blesense::app::ports::{ClockPort, EventSink, PeripheralPort, RX_VALUE_CAP, SensorPort};
use blesense::error::{ClockError, LinkError, SensorError};
use embedded_hal::delay::DelayNs;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Advertise,
    SetTx(String),
    Notify,
    SetRx(Vec<u8>),
    Delay(u32),
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

// ── MockRadio ─────────────────────────────────────────────────

pub struct MockRadio {
    log: CallLog,
    pub rx: heapless::Vec<u8, RX_VALUE_CAP>,
    pub tx: Vec<u8>,
    pub fail_notify: bool,
    pub fail_advertise: bool,
}

#[allow(dead_code)]
impl MockRadio {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            rx: heapless::Vec::new(),
            tx: Vec::new(),
            fail_notify: false,
            fail_advertise: false,
        }
    }

    /// A central writes `bytes` to RX.
    pub fn client_write(&mut self, bytes: &[u8]) {
        self.rx = heapless::Vec::from_slice(bytes).expect("fits RX");
    }

    /// Frames that were notified, in order.
    pub fn notified(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut pending = None;
        for call in self.log.borrow().iter() {
            match call {
                Call::SetTx(v) => pending = Some(v.clone()),
                Call::Notify => {
                    if let Some(v) = pending.clone() {
                        out.push(v);
                    }
                }
                _ => {}
            }
        }
        out
    }

    pub fn advert_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|c| **c == Call::Advertise)
            .count()
    }
}

impl PeripheralPort for MockRadio {
    fn start_advertising(&mut self) -> Result<(), LinkError> {
        if self.fail_advertise {
            return Err(LinkError::AdvertiseFailed(-1));
        }
        self.log.borrow_mut().push(Call::Advertise);
        Ok(())
    }

    fn set_tx_value(&mut self, value: &[u8]) -> Result<(), LinkError> {
        self.tx = value.to_vec();
        self.log
            .borrow_mut()
            .push(Call::SetTx(String::from_utf8_lossy(value).into_owned()));
        Ok(())
    }

    fn notify_tx(&mut self) -> Result<(), LinkError> {
        if self.fail_notify {
            return Err(LinkError::NotifyFailed(-1));
        }
        self.log.borrow_mut().push(Call::Notify);
        Ok(())
    }

    fn rx_value(&self) -> heapless::Vec<u8, RX_VALUE_CAP> {
        self.rx.clone()
    }

    fn set_rx_value(&mut self, value: &[u8]) -> Result<(), LinkError> {
        self.rx = heapless::Vec::from_slice(value).map_err(|_| LinkError::SetValueFailed(-1))?;
        self.log.borrow_mut().push(Call::SetRx(value.to_vec()));
        Ok(())
    }
}

// ── MockDelay ─────────────────────────────────────────────────

pub struct MockDelay {
    log: CallLog,
}

impl MockDelay {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.borrow_mut().push(Call::Delay(ns / 1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Call::Delay(ms));
    }
}

// ── MockSensor ────────────────────────────────────────────────

/// Returns scripted results first, then `steady` forever.
pub struct MockSensor {
    pub script: VecDeque<Result<u16, SensorError>>,
    pub steady: u16,
}

impl MockSensor {
    pub fn steady(raw: u16) -> Self {
        Self {
            script: VecDeque::new(),
            steady: raw,
        }
    }
}

impl SensorPort for MockSensor {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.script.pop_front().unwrap_or(Ok(self.steady))
    }
}

// ── MockClock ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockClock {
    pub now: i64,
    pub sets: Vec<i64>,
    pub reject: bool,
}

impl ClockPort for MockClock {
    fn now(&self) -> i64 {
        self.now
    }

    fn set(&mut self, unix_secs: i64) -> Result<(), ClockError> {
        if self.reject {
            return Err(ClockError::SetFailed(-1));
        }
        self.now = unix_secs;
        self.sets.push(unix_secs);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<SessionEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &SessionEvent) {
        self.events.push(event.clone());
    }
}
