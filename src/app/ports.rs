//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ WifiService / SensorNode (domain)
//! ```
//!
//! Driven adapters (radio, cloud client, clock, LEDs, identity chip)
//! implement these traits.  The domain consumes them through generics, so
//! it never touches hardware directly and the whole node runs on the host
//! with recording mocks.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::{Error, RadioError};
use crate::wifi::credentials::WifiCredentials;

use super::events::RadioEvent;

/// Ask the radio to scan every channel.
pub const CHANNEL_ALL: u8 = 255;

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain ↔ WiFi module)
// ───────────────────────────────────────────────────────────────

/// Provisioning access point parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApConfig {
    /// SSID of the provisioning AP, also used as its HTTP domain.
    pub name: String<32>,
    pub channel: u8,
    /// IPv4 address the AP serves the provisioning page on.
    pub address: [u8; 4],
    pub visible: bool,
}

/// Commands into the WiFi module.  Every command is accept/reject only;
/// outcomes arrive later as [`RadioEvent`]s through [`poll_event`].
///
/// [`poll_event`]: RadioDriver::poll_event
pub trait RadioDriver {
    fn init(&mut self) -> Result<(), RadioError>;

    /// Associate using `credentials`.
    fn connect(&mut self, credentials: &WifiCredentials, channel: u8) -> Result<(), RadioError>;

    /// Associate using whatever the module has stored.
    fn connect_default(&mut self) -> Result<(), RadioError>;

    fn disconnect(&mut self) -> Result<(), RadioError>;

    /// Start a DNS lookup for `host`.
    fn resolve_host(&mut self, host: &str) -> Result<(), RadioError>;

    /// Request the module's SNTP time; answered by [`RadioEvent::SystemTime`].
    fn request_system_time(&mut self) -> Result<(), RadioError>;

    /// Bring up the provisioning AP and its HTTP page at `domain`.
    fn start_provisioning(&mut self, ap: &ApConfig, domain: &str) -> Result<(), RadioError>;

    /// Next queued event, if any.
    fn poll_event(&mut self) -> Option<RadioEvent>;
}

// ───────────────────────────────────────────────────────────────
// Cloud port (driven adapter: domain → MQTT client)
// ───────────────────────────────────────────────────────────────

/// The cloud session.  Connection management and payload encoding live on
/// the other side of this trait.
pub trait CloudClient {
    fn init(&mut self, device_id: &str);
    /// Drive the session.  Called once per data task run with whether the
    /// network can carry traffic (associated, addressed, no error).
    fn service(&mut self, link_ready: bool);
    fn is_connected(&self) -> bool;
    /// Tear the session down so it restarts from scratch.
    fn reset(&mut self);
    /// Publish one telemetry sample stamped with `timestamp` (Unix seconds).
    fn publish(&mut self, timestamp: i64);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Process wall clock in Unix seconds.
pub trait SystemClock {
    fn now(&self) -> i64;
    fn set(&mut self, epoch_secs: i64);
}

// ───────────────────────────────────────────────────────────────
// Indicator port (domain → LEDs)
// ───────────────────────────────────────────────────────────────

/// State of one status LED.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Led {
    #[default]
    Off,
    On,
    Blinking,
}

/// What the three status LEDs should show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorState {
    pub wifi: Led,
    pub error: Led,
    pub cloud: Led,
}

pub trait StatusIndicators {
    fn show(&mut self, state: &IndicatorState);
}

// ───────────────────────────────────────────────────────────────
// Identity port (secure element / eFuse)
// ───────────────────────────────────────────────────────────────

/// Source of the 9-byte device serial number.
pub trait DeviceIdentity {
    fn serial_number(&mut self) -> Result<[u8; 9], Error>;
}
