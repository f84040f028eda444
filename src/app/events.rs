//! Inbound radio events.
//!
//! The WiFi module answers commands asynchronously.  Its adapter queues
//! these events and the connection manager drains them from the radio poll
//! task.

use chrono::NaiveDate;
use heapless::String;

use crate::error::Error;
use crate::wifi::credentials::{PASSPHRASE_MAX_LEN, SSID_MAX_LEN};

/// Station link state reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    Disconnected,
}

/// Calendar time as the radio reports it.  `month` and `day` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemTimeFields {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl SystemTimeFields {
    /// Seconds since the Unix epoch, treating the fields as UTC.
    pub fn to_unix(&self) -> Result<i64, Error> {
        if self.year == 0 {
            return Err(Error::TimestampInvalid);
        }
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
            .and_then(|d| {
                d.and_hms_opt(
                    u32::from(self.hour),
                    u32::from(self.minute),
                    u32::from(self.second),
                )
            })
            .map(|dt| dt.and_utc().timestamp())
            .ok_or(Error::TimestampInvalid)
    }
}

/// Events delivered by the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    StateChanged(LinkStatus),
    /// DHCP lease obtained.
    DhcpConfigured,
    /// Answer to [`request_system_time`](super::ports::RadioDriver::request_system_time).
    SystemTime(SystemTimeFields),
    /// Credentials entered on the provisioning page.
    ProvisionInfo {
        ssid: String<SSID_MAX_LEN>,
        password: String<PASSPHRASE_MAX_LEN>,
        /// Raw auth code from the radio.
        auth: u8,
        success: bool,
    },
}
