//! Device identity.
//!
//! The device ID is the identity serial number in uppercase hex (18
//! characters for the 9-byte serial).  It names the node to the cloud and
//! prefixes its logs.  If the identity source fails the node still boots
//! with a recognisable placeholder ID.
//!
//! On ESP32 the serial is built from the factory eFuse MAC, framed the way
//! secure-element serials are (`01 23 <mac> EE`).

use core::fmt::Write;

use log::error;

use crate::app::ports::DeviceIdentity;
use crate::app::service::DeviceId;
use crate::error::Error;

/// ID used when the identity source cannot be read.
pub const FALLBACK_DEVICE_ID: &str = "BAAAAADD1DBAAADD1D";

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> Result<MacAddress, Error> {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte out-buffer.
    let rc = unsafe { esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
    if rc != esp_idf_svc::sys::ESP_OK {
        return Err(Error::Init("eFuse MAC read failed"));
    }
    Ok(mac)
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> Result<MacAddress, Error> {
    Ok([0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE])
}

/// [`DeviceIdentity`] backed by the eFuse MAC.
#[derive(Debug, Default)]
pub struct EfuseIdentity;

impl DeviceIdentity for EfuseIdentity {
    fn serial_number(&mut self) -> Result<[u8; 9], Error> {
        let mac = read_mac()?;
        let mut serial = [0x01, 0x23, 0, 0, 0, 0, 0, 0, 0xEE];
        serial[2..8].copy_from_slice(&mac);
        Ok(serial)
    }
}

/// Format a serial number as the device ID.
pub fn device_id_from_serial(serial: &[u8; 9]) -> DeviceId {
    let mut id = DeviceId::new();
    for b in serial {
        // 18 hex digits always fit the buffer.
        let _ = write!(id, "{:02X}", b);
    }
    id
}

/// Read the identity and derive the device ID, falling back to
/// [`FALLBACK_DEVICE_ID`] on failure.
pub fn resolve_device_id(identity: &mut impl DeviceIdentity) -> DeviceId {
    match identity.serial_number() {
        Ok(serial) => device_id_from_serial(&serial),
        Err(e) => {
            error!("APP: device ID generation failed: {}", e);
            let mut id = DeviceId::new();
            let _ = id.push_str(FALLBACK_DEVICE_ID);
            id
        }
    }
}
