//! Node configuration parameters
//!
//! All tunable parameters for the sensor node: scheduler cadence, the
//! connection manager's task intervals, the telemetry send interval, the
//! provisioning access point and the built-in station credentials.
//! Defaults are compiled in; a JSON override can be loaded with
//! [`NodeConfig::from_json`].

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::ports::ApConfig;
use crate::error::{CredentialError, Error};
use crate::scheduler::MAX_PERIOD_MS;
use crate::wifi::credentials::{
    AuthType, PASSPHRASE_MAX_LEN, SSID_MAX_LEN, WifiCredentials,
};

/// Longest boot switch debounce the node will block for.
pub const MAX_DEBOUNCE_WINDOW_MS: u32 = 10_000;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Scheduler ---
    /// Milliseconds per hardware tick
    pub tick_ms: u16,

    // --- Telemetry ---
    /// Data task cadence (milliseconds)
    pub data_interval_ms: u32,
    /// Telemetry send interval (seconds)
    pub send_interval_secs: u32,

    // --- Connection manager ---
    /// Radio event poll interval (milliseconds)
    pub wifi_poll_interval_ms: u32,
    /// NTP resync interval (milliseconds)
    pub ntp_interval_ms: u32,
    /// Delay between provisioned association attempts (milliseconds)
    pub soft_ap_retry_ms: u32,
    /// How long a reported disconnect may take to recover (milliseconds)
    pub check_back_ms: u32,

    // --- Boot ---
    /// Samples taken of each boot switch
    pub debounce_samples: u32,
    /// Time the samples are spread over (milliseconds)
    pub debounce_window_ms: u32,

    // --- Network ---
    /// Cloud broker host, resolved after every DHCP lease
    pub cloud_host: String<64>,
    /// Provisioning access point
    pub ap: ApConfig,
    /// Built-in station network (both boot switches held)
    pub station_ssid: String<SSID_MAX_LEN>,
    pub station_passphrase: String<PASSPHRASE_MAX_LEN>,
    pub station_auth: AuthType,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Scheduler
            tick_ms: 8,

            // Telemetry
            data_interval_ms: 100,
            send_interval_secs: 1,

            // Connection manager
            wifi_poll_interval_ms: 50,
            ntp_interval_ms: 32_000,
            soft_ap_retry_ms: 1000,
            check_back_ms: 50,

            // Boot
            debounce_samples: 2000,
            debounce_window_ms: 2000,

            // Network
            cloud_host: str_field("mqtt.sensornode.local"),
            ap: ApConfig {
                name: str_field("SensorNode"),
                channel: 1,
                address: [192, 168, 1, 1],
                visible: true,
            },
            station_ssid: str_field("sensornode-lab"),
            station_passphrase: str_field("changeme-psk"),
            station_auth: AuthType::Wpa2Psk,
        }
    }
}

fn str_field<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    // Compile-time literals that fit their buffers.
    let _ = out.push_str(s);
    out
}

impl NodeConfig {
    /// Reject settings the scheduler or the connection manager cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.tick_ms == 0 {
            return Err(Error::Config("tick_ms must be non-zero"));
        }
        let intervals = [
            ("data_interval_ms", self.data_interval_ms),
            ("wifi_poll_interval_ms", self.wifi_poll_interval_ms),
            ("ntp_interval_ms", self.ntp_interval_ms),
            ("soft_ap_retry_ms", self.soft_ap_retry_ms),
            ("check_back_ms", self.check_back_ms),
        ];
        for (name, value) in intervals {
            if value == 0 || value > MAX_PERIOD_MS {
                log::warn!("Config: {} = {} out of range", name, value);
                return Err(Error::Config("interval out of scheduler range"));
            }
        }
        if self.send_interval_secs.saturating_mul(1000) < self.data_interval_ms {
            return Err(Error::Config("send interval shorter than data task cadence"));
        }
        if self.debounce_samples == 0 {
            return Err(Error::Config("debounce_samples must be non-zero"));
        }
        if self.debounce_window_ms == 0 || self.debounce_window_ms > MAX_DEBOUNCE_WINDOW_MS {
            return Err(Error::Config("debounce_window_ms out of range"));
        }
        if self.cloud_host.is_empty() {
            return Err(Error::Config("cloud_host is empty"));
        }
        if self.ap.name.is_empty() {
            return Err(Error::Config("AP name is empty"));
        }
        self.station_credentials()?;
        Ok(())
    }

    /// The built-in station network as validated credentials.
    pub fn station_credentials(&self) -> Result<WifiCredentials, CredentialError> {
        WifiCredentials::new(&self.station_ssid, &self.station_passphrase, self.station_auth)
    }

    /// Parse and validate a JSON override.  Missing fields are an error.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_slice(bytes).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Data task runs per telemetry send.
    pub fn send_ticks(&self) -> u32 {
        (self.send_interval_secs.saturating_mul(1000) / self.data_interval_ms).max(1)
    }
}
