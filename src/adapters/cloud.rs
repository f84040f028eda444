//! Log-based cloud client adapter.
//!
//! Implements [`CloudClient`] by writing each telemetry sample to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production).  The
//! session is "up" whenever the network can carry traffic; a reset drops
//! it until the next service call sees a ready link.  An MQTT client would
//! implement the same trait.

use log::{info, warn};

use crate::app::ports::CloudClient;

/// Adapter that logs every publish to the serial console.
#[derive(Debug, Default)]
pub struct LogCloudClient {
    device_id: heapless::String<20>,
    initialised: bool,
    connected: bool,
    published: u32,
    resets: u32,
}

impl LogCloudClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples published since boot.
    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }
}

impl CloudClient for LogCloudClient {
    fn init(&mut self, device_id: &str) {
        self.device_id.clear();
        if self.device_id.push_str(device_id).is_err() {
            warn!("CLOUD | device id '{}' truncated away", device_id);
        }
        self.initialised = true;
        info!("CLOUD | init as '{}'", self.device_id);
    }

    fn service(&mut self, link_ready: bool) {
        let up = self.initialised && link_ready;
        if up != self.connected {
            info!("CLOUD | session {}", if up { "up" } else { "down" });
        }
        self.connected = up;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.connected = false;
        info!("CLOUD | reset (#{})", self.resets);
    }

    fn publish(&mut self, timestamp: i64) {
        if !self.connected {
            warn!("CLOUD | publish while down, dropped");
            return;
        }
        self.published += 1;
        info!(
            "TELEM | device={} | ts={} | seq={}",
            self.device_id, timestamp, self.published
        );
    }
}
