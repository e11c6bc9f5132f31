//! BLE sensor-service adapter.
//!
//! Implements [`PeripheralPort`], the hexagonal boundary for the GATT
//! server that carries readings out (TX) and timestamps in (RX).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via raw `esp_idf_svc::sys` calls.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Attribute  | UUID                                   | Props                       |
//! |------------|----------------------------------------|-----------------------------|
//! | Service    | `62f794e9-3ef6-4fdd-81dc-c1940c81a5e2` | primary                     |
//! | TX         | `705e55a6-3d23-4bfa-9a27-ebc31f301cf9` | Read+Write+Notify+Indicate  |
//! | RX         | `7e8adb7e-b68b-48ce-aaad-d97a3399ef5a` | Read+Write+Notify+Indicate  |
//!
//! Both characteristics carry a Client Characteristic Configuration
//! descriptor (0x2902).
//!
//! Connection changes are not handled here. The stack's connect and
//! disconnect events are forwarded to the injected
//! [`ConnectionCallbacks`]; re-arming advertising is the session's call.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::app::ports::{ConnectionCallbacks, PeripheralPort, RX_VALUE_CAP, TX_VALUE_CAP};
use crate::error::LinkError;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x62f794e9_3ef6_4fdd_81dc_c1940c81a5e2;
pub const CHAR_TX: u128 = 0x705e55a6_3d23_4bfa_9a27_ebc31f301cf9;
pub const CHAR_RX: u128 = 0x7e8adb7e_b68b_48ce_aaad_d97a3399ef5a;

/// Client Characteristic Configuration descriptor.
pub const DESCR_CCCD: u16 = 0x2902;

/// Whole-value length check; a frame is never cut to fit.
fn check_tx_len(value: &[u8]) -> Result<(), LinkError> {
    if value.len() > TX_VALUE_CAP {
        warn!("BLE: TX value rejected ({} > {})", value.len(), TX_VALUE_CAP);
        return Err(LinkError::ValueTooLong {
            len: value.len(),
            cap: TX_VALUE_CAP,
        });
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF static state
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These statics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONN_ID: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONNECTED: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_ADVERTISING: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_ADV_DATA_READY: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_ADV_PENDING: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_TX_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_RX_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SETUP_STEP: AtomicU32 = AtomicU32::new(0);
// Set once any registration step reports an error; the chain stops there.
#[cfg(target_os = "espidf")]
static BLE_SETUP_FAILED: AtomicBool = AtomicBool::new(false);

// Mirror of the RX attribute, written by the GATTS task on client writes.
// GATTS callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
#[cfg(target_os = "espidf")]
static BLE_RX_BUF: std::sync::Mutex<heapless::Vec<u8, RX_VALUE_CAP>> =
    std::sync::Mutex::new(heapless::Vec::new());

#[cfg(target_os = "espidf")]
static BLE_CALLBACKS: std::sync::OnceLock<Arc<dyn ConnectionCallbacks>> =
    std::sync::OnceLock::new();

#[cfg(target_os = "espidf")]
static SERVICE_UUID_LE: [u8; 16] = SERVICE_UUID.to_le_bytes();

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    t.uuid.uuid128 = uuid.to_le_bytes();
    t
}

#[cfg(target_os = "espidf")]
fn uuid16_to_esp(uuid: u16) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 2;
    t.uuid.uuid16 = uuid;
    t
}

/// Abort attribute registration: the adapter reports `Failed` from now on.
#[cfg(target_os = "espidf")]
fn setup_failed(step: &str, code: i32) {
    log::error!("BLE GATTS: {} failed ({})", step, code);
    BLE_SETUP_FAILED.store(true, AtomicOrdering::SeqCst);
}

/// `true` when a GATTS completion event carries a non-OK status.
#[cfg(target_os = "espidf")]
fn gatt_failed(step: &str, status: esp_idf_svc::sys::esp_gatt_status_t) -> bool {
    if status == esp_idf_svc::sys::esp_gatt_status_t_ESP_GATT_OK {
        return false;
    }
    setup_failed(step, status as i32);
    true
}

/// Register a stack-responded characteristic with `max_len` bytes of value
/// storage. Bluedroid copies the initial value, so it may live on the stack.
#[cfg(target_os = "espidf")]
unsafe fn add_sensor_char(svc_handle: u16, uuid: u128, max_len: usize) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    let mut initial = [0u8; TX_VALUE_CAP];
    let mut value = esp_attr_value_t {
        attr_max_len: max_len as u16,
        attr_len: 0,
        attr_value: initial.as_mut_ptr(),
    };
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_AUTO_RSP as u8,
    };
    let ret = unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
            (ESP_GATT_CHAR_PROP_BIT_READ
                | ESP_GATT_CHAR_PROP_BIT_WRITE
                | ESP_GATT_CHAR_PROP_BIT_NOTIFY
                | ESP_GATT_CHAR_PROP_BIT_INDICATE) as esp_gatt_char_prop_t,
            &mut value,
            &mut control,
        )
    };
    if ret != ESP_OK as i32 {
        setup_failed("add_char", ret);
    }
}

/// CCCD starts at 0x0000: notifications and indications off.
#[cfg(target_os = "espidf")]
unsafe fn add_cccd(svc_handle: u16) {
    use esp_idf_svc::sys::*;
    let mut descr_uuid = uuid16_to_esp(DESCR_CCCD);
    let mut initial = [0u8; 2];
    let mut value = esp_attr_value_t {
        attr_max_len: initial.len() as u16,
        attr_len: initial.len() as u16,
        attr_value: initial.as_mut_ptr(),
    };
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_AUTO_RSP as u8,
    };
    let ret = unsafe {
        esp_ble_gatts_add_char_descr(
            svc_handle,
            &mut descr_uuid,
            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
            &mut value,
            &mut control,
        )
    };
    if ret != ESP_OK as i32 {
        setup_failed("add_char_descr", ret);
    }
}

/// Service UUID in advertising, flags general-discoverable, no scan response
/// and no preferred connection interval hint.
#[cfg(target_os = "espidf")]
unsafe fn configure_adv_data() {
    use esp_idf_svc::sys::*;
    let mut adv_data = esp_ble_adv_data_t {
        set_scan_rsp: false,
        include_name: true,
        include_txpower: false,
        min_interval: 0,
        max_interval: 0,
        appearance: 0,
        service_uuid_len: SERVICE_UUID_LE.len() as u16,
        p_service_uuid: SERVICE_UUID_LE.as_ptr() as *mut u8,
        flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
        ..unsafe { core::mem::zeroed() }
    };
    let ret = unsafe { esp_ble_gap_config_adv_data(&mut adv_data) };
    if ret != ESP_OK as i32 {
        log::error!("BLE GAP: config_adv_data failed ({})", ret);
    }
}

#[cfg(target_os = "espidf")]
unsafe fn gap_start_advertising() -> i32 {
    use esp_idf_svc::sys::*;
    let mut adv_params = esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    };
    unsafe { esp_ble_gap_start_advertising(&mut adv_params) }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
            BLE_ADV_DATA_READY.store(true, AtomicOrdering::SeqCst);
            if BLE_ADV_PENDING.swap(false, AtomicOrdering::SeqCst) {
                let ret = unsafe { gap_start_advertising() };
                if ret != ESP_OK as i32 {
                    log::error!("BLE GAP: deferred start_advertising failed ({})", ret);
                }
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            let status = unsafe { (*param).adv_start_cmpl.status };
            if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                BLE_ADVERTISING.store(true, AtomicOrdering::SeqCst);
                log::info!("BLE GAP: advertising started");
            } else {
                log::warn!("BLE GAP: advertising start failed (status={})", status);
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            BLE_ADVERTISING.store(false, AtomicOrdering::SeqCst);
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            if gatt_failed("app register", unsafe { (*param).reg.status }) {
                return;
            }
            BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128_to_esp(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            // 1 service + 2 × (declaration + value + CCCD)
            let ret = unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8) };
            if ret != ESP_OK as i32 {
                setup_failed("create_service", ret);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            if gatt_failed("create service", unsafe { (*param).create.status }) {
                return;
            }
            let svc_handle = unsafe { (*param).create.service_handle };
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            let ret = unsafe { esp_ble_gatts_start_service(svc_handle) };
            if ret != ESP_OK as i32 {
                setup_failed("start_service", ret);
                return;
            }
            BLE_SETUP_STEP.store(1, AtomicOrdering::Relaxed);
            unsafe { add_sensor_char(svc_handle, CHAR_TX, TX_VALUE_CAP) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            if gatt_failed("add char", unsafe { (*param).add_char.status }) {
                return;
            }
            let handle = unsafe { (*param).add_char.attr_handle };
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_SETUP_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    BLE_TX_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: TX char (handle={})", handle);
                    BLE_SETUP_STEP.store(2, AtomicOrdering::Relaxed);
                    unsafe { add_cccd(svc_handle) };
                }
                3 => {
                    BLE_RX_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: RX char (handle={})", handle);
                    BLE_SETUP_STEP.store(4, AtomicOrdering::Relaxed);
                    unsafe { add_cccd(svc_handle) };
                }
                step => log::warn!("BLE GATTS: unexpected char event at step {}", step),
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            if gatt_failed("add descriptor", unsafe { (*param).add_char_descr.status }) {
                return;
            }
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_SETUP_STEP.load(AtomicOrdering::Relaxed) {
                2 => {
                    BLE_SETUP_STEP.store(3, AtomicOrdering::Relaxed);
                    unsafe { add_sensor_char(svc_handle, CHAR_RX, RX_VALUE_CAP) };
                }
                4 => {
                    BLE_SETUP_STEP.store(5, AtomicOrdering::Relaxed);
                    // Seed the attribute with whatever the session wrote
                    // before registration finished.
                    if let Ok(buf) = BLE_RX_BUF.lock() {
                        let rx = BLE_RX_HANDLE.load(AtomicOrdering::Relaxed) as u16;
                        let ret = unsafe {
                            esp_ble_gatts_set_attr_value(rx, buf.len() as u16, buf.as_ptr())
                        };
                        if ret != ESP_OK as i32 {
                            setup_failed("seed RX value", ret);
                            return;
                        }
                    }
                    log::info!("BLE GATTS: all attributes registered");
                    unsafe { configure_adv_data() };
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            BLE_CONN_ID.store(p.conn_id as u32, AtomicOrdering::SeqCst);
            BLE_CONNECTED.store(true, AtomicOrdering::SeqCst);
            // The controller stops advertising once a connection is made.
            BLE_ADVERTISING.store(false, AtomicOrdering::SeqCst);
            log::debug!("BLE GATTS: client connected (conn_id={})", p.conn_id);
            if let Some(cb) = BLE_CALLBACKS.get() {
                cb.on_connect();
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            BLE_CONNECTED.store(false, AtomicOrdering::SeqCst);
            log::debug!("BLE GATTS: client disconnected");
            if let Some(cb) = BLE_CALLBACKS.get() {
                cb.on_disconnect();
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            if p.is_prep {
                return;
            }
            if p.handle as u32 == BLE_RX_HANDLE.load(AtomicOrdering::Relaxed) {
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                if let Ok(mut buf) = BLE_RX_BUF.lock() {
                    buf.clear();
                    let take = data.len().min(RX_VALUE_CAP);
                    let _ = buf.extend_from_slice(&data[..take]);
                }
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdapter {
    state: BleState,
    device_name: heapless::String<24>,
    callbacks: Arc<dyn ConnectionCallbacks>,
    adverts_started: u32,
    /// Simulation: current TX attribute value.
    #[cfg(not(target_os = "espidf"))]
    sim_tx: heapless::Vec<u8, TX_VALUE_CAP>,
    /// Simulation: current RX attribute value.
    #[cfg(not(target_os = "espidf"))]
    sim_rx: heapless::Vec<u8, RX_VALUE_CAP>,
    /// Simulation: every value pushed to the central, oldest first.
    #[cfg(not(target_os = "espidf"))]
    sim_notified: Vec<heapless::Vec<u8, TX_VALUE_CAP>>,
    /// Simulation: attribute registration reported an error.
    #[cfg(not(target_os = "espidf"))]
    sim_setup_failed: bool,
}

impl BleAdapter {
    pub fn new(device_name: heapless::String<24>, callbacks: Arc<dyn ConnectionCallbacks>) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
            callbacks,
            adverts_started: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_tx: heapless::Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_rx: heapless::Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_notified: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_setup_failed: false,
        }
    }

    /// Bring up the stack and register the sensor service.
    ///
    /// Advertising is not started here; call
    /// [`PeripheralPort::start_advertising`] once values are seeded.
    pub fn start(&mut self) -> Result<(), LinkError> {
        info!("BLE: initialising as '{}'", self.device_name);
        match self.platform_start() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = BleState::Failed;
                Err(e)
            }
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Number of times advertising was actually (re)started.
    pub fn adverts_started(&self) -> u32 {
        self.adverts_started
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;

        if BLE_CALLBACKS.set(self.callbacks.clone()).is_err() {
            warn!("BLE: callbacks already installed");
        }

        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return Err(LinkError::StackInitFailed);
            }

            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return Err(LinkError::StackInitFailed);
            }

            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return Err(LinkError::StackInitFailed);
            }

            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return Err(LinkError::StackInitFailed);
            }

            let mut name = [0u8; 25];
            name[..self.device_name.len()].copy_from_slice(self.device_name.as_bytes());
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            let ret = esp_ble_gatts_app_register(0);
            if ret != ESP_OK as i32 {
                log::error!("BLE: gatts_app_register failed ({})", ret);
                return Err(LinkError::StackInitFailed);
            }
        }

        info!("BLE(espidf): Bluedroid stack initialised");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<(), LinkError> {
        info!(
            "BLE(sim): service {:032x} registered",
            SERVICE_UUID
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn refresh_state(&mut self) {
        if self.state == BleState::Failed {
            return;
        }
        self.state = if BLE_SETUP_FAILED.load(AtomicOrdering::SeqCst) {
            BleState::Failed
        } else if BLE_CONNECTED.load(AtomicOrdering::SeqCst) {
            BleState::Connected
        } else if BLE_ADVERTISING.load(AtomicOrdering::SeqCst)
            || BLE_ADV_PENDING.load(AtomicOrdering::SeqCst)
        {
            BleState::Advertising
        } else {
            BleState::Idle
        };
    }

    #[cfg(not(target_os = "espidf"))]
    fn refresh_state(&mut self) {
        if self.sim_setup_failed {
            self.state = BleState::Failed;
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_advertise(&mut self) -> Result<(), LinkError> {
        if !BLE_ADV_DATA_READY.load(AtomicOrdering::SeqCst) {
            // Registration still in flight; the GAP handler starts advertising
            // as soon as the advertising payload is accepted.
            BLE_ADV_PENDING.store(true, AtomicOrdering::SeqCst);
            debug!("BLE: advertising deferred until registration completes");
            return Ok(());
        }
        let ret = unsafe { gap_start_advertising() };
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            return Err(LinkError::AdvertiseFailed(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_advertise(&mut self) -> Result<(), LinkError> {
        info!("BLE(sim): advertising '{}'", self.device_name);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_set_value(handle: &AtomicU32, value: &[u8]) -> Result<(), LinkError> {
        let handle = handle.load(AtomicOrdering::Relaxed) as u16;
        if handle == 0 {
            return Err(LinkError::NotRegistered);
        }
        let ret = unsafe {
            esp_idf_svc::sys::esp_ble_gatts_set_attr_value(handle, value.len() as u16, value.as_ptr())
        };
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            return Err(LinkError::SetValueFailed(ret));
        }
        Ok(())
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Simulation: a central connects. Advertising stops, as on hardware.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_connect(&mut self) {
        self.state = BleState::Connected;
        self.callbacks.on_connect();
    }

    /// Simulation: the central goes away. Advertising stays off until re-armed.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_disconnect(&mut self) {
        self.state = BleState::Idle;
        self.callbacks.on_disconnect();
    }

    /// Simulation: a registration event comes back with an error status.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_registration_failed(&mut self) {
        self.sim_setup_failed = true;
    }

    /// Simulation: the central writes `data` to RX.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_client_write(&mut self, data: &[u8]) {
        self.sim_rx.clear();
        let take = data.len().min(RX_VALUE_CAP);
        let _ = self.sim_rx.extend_from_slice(&data[..take]);
    }

    /// Simulation: current TX attribute value.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_tx_value(&self) -> &[u8] {
        &self.sim_tx
    }

    /// Simulation: values notified so far, oldest first.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_notified(&self) -> &[heapless::Vec<u8, TX_VALUE_CAP>] {
        &self.sim_notified
    }
}

// ───────────────────────────────────────────────────────────────
// PeripheralPort implementation
// ───────────────────────────────────────────────────────────────

impl PeripheralPort for BleAdapter {
    fn start_advertising(&mut self) -> Result<(), LinkError> {
        self.refresh_state();
        match self.state {
            BleState::Advertising => {
                debug!("BLE: already advertising");
                return Ok(());
            }
            BleState::Connected => {
                debug!("BLE: central connected, advertising not re-armed");
                return Ok(());
            }
            BleState::Failed => return Err(LinkError::StackInitFailed),
            BleState::Idle => {}
        }
        self.platform_advertise()?;
        self.state = BleState::Advertising;
        self.adverts_started = self.adverts_started.wrapping_add(1);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn set_tx_value(&mut self, value: &[u8]) -> Result<(), LinkError> {
        check_tx_len(value)?;
        Self::platform_set_value(&BLE_TX_HANDLE, value)
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_tx_value(&mut self, value: &[u8]) -> Result<(), LinkError> {
        check_tx_len(value)?;
        self.sim_tx.clear();
        // Length checked above.
        let _ = self.sim_tx.extend_from_slice(value);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn notify_tx(&mut self) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;
        if !BLE_CONNECTED.load(AtomicOrdering::SeqCst) {
            return Err(LinkError::NotConnected);
        }
        let handle = BLE_TX_HANDLE.load(AtomicOrdering::Relaxed) as u16;
        if handle == 0 {
            return Err(LinkError::NotRegistered);
        }
        let mut len: u16 = 0;
        let mut value: *const u8 = core::ptr::null();
        let status = unsafe { esp_ble_gatts_get_attr_value(handle, &mut len, &mut value) };
        if status != esp_gatt_status_t_ESP_GATT_OK || value.is_null() {
            return Err(LinkError::NotifyFailed(status as i32));
        }
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as esp_gatt_if_t,
                BLE_CONN_ID.load(AtomicOrdering::SeqCst) as u16,
                handle,
                len,
                value as *mut u8,
                false,
            )
        };
        if ret != ESP_OK as i32 {
            return Err(LinkError::NotifyFailed(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn notify_tx(&mut self) -> Result<(), LinkError> {
        if self.state != BleState::Connected {
            return Err(LinkError::NotConnected);
        }
        self.sim_notified.push(self.sim_tx.clone());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn rx_value(&self) -> heapless::Vec<u8, RX_VALUE_CAP> {
        BLE_RX_BUF
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    #[cfg(not(target_os = "espidf"))]
    fn rx_value(&self) -> heapless::Vec<u8, RX_VALUE_CAP> {
        self.sim_rx.clone()
    }

    #[cfg(target_os = "espidf")]
    fn set_rx_value(&mut self, value: &[u8]) -> Result<(), LinkError> {
        let take = value.len().min(RX_VALUE_CAP);
        if let Ok(mut buf) = BLE_RX_BUF.lock() {
            buf.clear();
            let _ = buf.extend_from_slice(&value[..take]);
        }
        // Before registration completes the mirror is applied by the
        // descriptor-added handler.
        if BLE_RX_HANDLE.load(AtomicOrdering::Relaxed) == 0 {
            return Ok(());
        }
        Self::platform_set_value(&BLE_RX_HANDLE, &value[..take])
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_rx_value(&mut self, value: &[u8]) -> Result<(), LinkError> {
        self.sim_client_write(value);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
