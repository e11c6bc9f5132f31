//! blesense firmware: main entry point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   BleAdapter        Esp32TimeAdapter          │
//! │  (SensorPort)      (PeripheralPort)  (ClockPort)               │
//! │  LogEventSink      FreeRtos                                    │
//! │  (EventSink)       (DelayNs)                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        SessionService (pure logic) + LinkMonitor       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{error, info};

use blesense::adapters::ble::BleAdapter;
use blesense::adapters::hardware::HardwareAdapter;
use blesense::adapters::log_sink::LogEventSink;
use blesense::adapters::time::Esp32TimeAdapter;
use blesense::app::link::LinkMonitor;
use blesense::app::session::SessionService;
use blesense::config::PeripheralConfig;
use blesense::drivers::{hw_init, watchdog::Watchdog};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("blesense v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = PeripheralConfig::default();
    config.validate()?;
    match serde_json::to_string(&config) {
        Ok(json) => info!("Config: {}", json),
        Err(e) => log::warn!("Config dump failed: {}", e),
    }

    // ── 3. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}", e);
        return Err(blesense::error::Error::from(e).into());
    }
    let mut watchdog = Watchdog::new(config.watchdog_timeout_ms);

    let mut sensor = HardwareAdapter::default();
    let mut clock = Esp32TimeAdapter::new();
    let mut sink = LogEventSink::new();
    let mut delay = FreeRtos;

    // ── 4. BLE stack + session ────────────────────────────────
    let link = Arc::new(LinkMonitor::new());
    let mut radio = BleAdapter::new(config.device_name.clone(), link.clone());
    radio.start().map_err(blesense::error::Error::from)?;

    let mut session = SessionService::new(config, link);
    session.start(&mut radio, &mut sink)?;

    info!("System ready. Entering sampling loop.");

    // ── 5. Sampling loop ──────────────────────────────────────
    loop {
        let now_ms = clock.uptime_ms();
        session.tick(
            now_ms,
            &mut sensor,
            &mut radio,
            &mut clock,
            &mut delay,
            &mut sink,
        );
        watchdog.feed();
    }
}
