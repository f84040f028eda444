//! WiFi station credentials.
//!
//! Credentials arrive from three places: the built-in set in
//! [`NodeConfig`](crate::config::NodeConfig), the provisioning access point,
//! and the `wifi <ssid>[,<pass>[,<auth>]]` console command.  All of them go
//! through the same validation before the radio ever sees them.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// Maximum SSID length in bytes.
pub const SSID_MAX_LEN: usize = 32;
/// Maximum passphrase buffer length in bytes.
pub const PASSPHRASE_MAX_LEN: usize = 64;

/// Authentication type.  Discriminants are the radio's wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AuthType {
    Open = 1,
    Wpa2Psk = 2,
    Wep = 3,
}

impl AuthType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, CredentialError> {
        match code {
            1 => Ok(Self::Open),
            2 => Ok(Self::Wpa2Psk),
            3 => Ok(Self::Wep),
            _ => Err(CredentialError::UnsupportedAuth),
        }
    }
}

/// A validated SSID / passphrase / auth triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: String<SSID_MAX_LEN>,
    passphrase: String<PASSPHRASE_MAX_LEN>,
    auth: AuthType,
}

impl WifiCredentials {
    pub fn new(ssid: &str, passphrase: &str, auth: AuthType) -> Result<Self, CredentialError> {
        validate_ssid(ssid)?;
        validate_passphrase(passphrase, auth)?;

        let mut creds = Self {
            ssid: String::new(),
            passphrase: String::new(),
            auth,
        };
        creds
            .ssid
            .push_str(ssid)
            .map_err(|()| CredentialError::InvalidSsid)?;
        creds
            .passphrase
            .push_str(passphrase)
            .map_err(|()| CredentialError::InvalidPassphrase)?;
        Ok(creds)
    }

    pub fn open(ssid: &str) -> Result<Self, CredentialError> {
        Self::new(ssid, "", AuthType::Open)
    }

    /// Parse the argument of the `wifi` console command.
    ///
    /// ```text
    /// <ssid>                  open network
    /// <ssid>,<pass>           WPA2-PSK
    /// <ssid>,<pass>,<auth>    explicit auth code (1 open, 2 PSK, 3 WEP)
    /// ```
    ///
    /// An open network ignores any passphrase field.
    pub fn parse_command(args: &str) -> Result<Self, CredentialError> {
        let mut fields = args.trim().splitn(3, ',');
        let ssid = fields.next().unwrap_or_default();
        let pass = fields.next();
        let auth = match (pass, fields.next()) {
            (None, _) => AuthType::Open,
            (Some(_), None) => AuthType::Wpa2Psk,
            (Some(_), Some(code)) => {
                let code = code
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| CredentialError::UnsupportedAuth)?;
                AuthType::from_code(code)?
            }
        };

        match auth {
            AuthType::Open => Self::open(ssid),
            AuthType::Wpa2Psk | AuthType::Wep => Self::new(ssid, pass.unwrap_or_default(), auth),
        }
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn auth(&self) -> AuthType {
        self.auth
    }
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), CredentialError> {
    if ssid.is_empty() || ssid.len() > SSID_MAX_LEN || !is_printable_ascii(ssid) {
        return Err(CredentialError::InvalidSsid);
    }
    Ok(())
}

fn validate_passphrase(passphrase: &str, auth: AuthType) -> Result<(), CredentialError> {
    let ok = match auth {
        AuthType::Open => passphrase.is_empty(),
        AuthType::Wpa2Psk => (8..=63).contains(&passphrase.len()) && is_printable_ascii(passphrase),
        // 40- or 104-bit keys, as ASCII or hex.
        AuthType::Wep => matches!(passphrase.len(), 5 | 10 | 13 | 26),
    };
    if ok { Ok(()) } else { Err(CredentialError::InvalidPassphrase) }
}
