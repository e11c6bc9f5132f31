//! ESP32 time adapter.
//!
//! Provides monotonic uptime for cycle pacing and the settable wall clock
//! used to timestamp readings.
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer_get_time()`, wall
//!   clock through `gettimeofday` / `settimeofday`.
//! - **`not(target_os = "espidf")`**: `std::time` plus an offset, for
//!   host-side testing and simulation.

use crate::app::ports::ClockPort;
use crate::error::ClockError;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    /// Simulation: difference between the set wall clock and host time.
    #[cfg(not(target_os = "espidf"))]
    offset_secs: i64,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            offset_secs: 0,
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn host_unix_secs() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

impl ClockPort for Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    fn now(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }

    #[cfg(not(target_os = "espidf"))]
    fn now(&self) -> i64 {
        Self::host_unix_secs() + self.offset_secs
    }

    #[cfg(target_os = "espidf")]
    fn set(&mut self, unix_secs: i64) -> Result<(), ClockError> {
        let tv = esp_idf_svc::sys::timeval {
            tv_sec: unix_secs as esp_idf_svc::sys::time_t,
            tv_usec: 0,
        };
        let rc = unsafe { esp_idf_svc::sys::settimeofday(&tv, core::ptr::null()) };
        if rc != 0 {
            return Err(ClockError::SetFailed(rc));
        }
        log::info!("clock: wall time set to {}", unix_secs);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn set(&mut self, unix_secs: i64) -> Result<(), ClockError> {
        self.offset_secs = unix_secs - Self::host_unix_secs();
        log::info!("clock(sim): wall time set to {}", unix_secs);
        Ok(())
    }
}
