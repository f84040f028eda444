//! ESP32 wall-clock adapter.
//!
//! Implements [`SystemClock`] in Unix seconds.
//!
//! - **`target_os = "espidf"`**: wraps newlib's `gettimeofday` /
//!   `settimeofday`, so every ESP-IDF component sees the same time.
//! - **`not(target_os = "espidf")`**: an offset over `std::time::SystemTime`
//!   for host-side testing and simulation.

use log::info;

use crate::app::ports::SystemClock;

/// Wall clock for the ESP32 platform.
pub struct Esp32Clock {
    #[cfg(not(target_os = "espidf"))]
    offset_secs: i64,
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32Clock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            offset_secs: 0,
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_now(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: valid out-pointer, null timezone.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_now(&self) -> i64 {
        let host = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64);
        host + self.offset_secs
    }

    #[cfg(target_os = "espidf")]
    fn platform_set(&mut self, epoch_secs: i64) {
        let tv = esp_idf_svc::sys::timeval {
            tv_sec: epoch_secs as _,
            tv_usec: 0,
        };
        // SAFETY: valid in-pointer, null timezone.
        let rc = unsafe { esp_idf_svc::sys::settimeofday(&tv, core::ptr::null()) };
        if rc != 0 {
            log::warn!("Clock: settimeofday failed (rc={})", rc);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_set(&mut self, epoch_secs: i64) {
        self.offset_secs = 0;
        self.offset_secs = epoch_secs - self.platform_now();
    }
}

impl SystemClock for Esp32Clock {
    fn now(&self) -> i64 {
        self.platform_now()
    }

    fn set(&mut self, epoch_secs: i64) {
        self.platform_set(epoch_secs);
        info!("Clock: set to {}", epoch_secs);
    }
}
