//! Credential form served on the provisioning access point.
//!
//! `GET /` returns the form; `POST /provision` takes the submitted
//! `application/x-www-form-urlencoded` body, decodes it into a
//! [`RadioEvent::ProvisionInfo`] and queues it for the poll task exactly
//! as a radio-side provisioning report would be.  The credentials
//! themselves are validated later by the connection manager.
//!
//! Form fields: `ssid` (required), `password`, `auth` (1 open, 2 WPA2,
//! 3 WEP; defaults to WPA2 with a password and open without).

use core::fmt;

use heapless::String;

use crate::app::events::RadioEvent;
use crate::wifi::credentials::AuthType;

use super::radio::push_radio_event;

/// Largest form body accepted.
pub const MAX_FORM_BODY: usize = 512;

pub const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta name="viewport" content="width=device-width, initial-scale=1"><title>SensorNode setup</title></head>
<body>
<h1>SensorNode WiFi setup</h1>
<form method="post" action="/provision">
<label>Network <input name="ssid" maxlength="32" required></label><br>
<label>Password <input name="password" type="password" maxlength="63"></label><br>
<label>Security
<select name="auth">
<option value="2">WPA2</option>
<option value="1">Open</option>
<option value="3">WEP</option>
</select></label><br>
<button type="submit">Connect</button>
</form>
</body>
</html>
"#;

pub const SAVED_PAGE: &str = "<!DOCTYPE html><html><body><p>Credentials received. The node is joining the network.</p></body></html>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    /// No `ssid` field, or an empty one.
    MissingSsid,
    /// A field does not fit its radio buffer.
    TooLong,
    /// Bad percent-encoding or a non-numeric `auth`.
    Malformed,
    /// The event queue had no room.
    QueueFull,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSsid => write!(f, "network name missing"),
            Self::TooLong => write!(f, "field too long"),
            Self::Malformed => write!(f, "malformed form data"),
            Self::QueueFull => write!(f, "busy, try again"),
        }
    }
}

fn decode_field(raw: &str) -> Result<std::string::String, FormError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|_| FormError::Malformed)
}

/// Decode a submitted form body into a provisioning report.
pub fn parse_provision_form(body: &str) -> Result<RadioEvent, FormError> {
    let mut ssid: String<32> = String::new();
    let mut password: String<64> = String::new();
    let mut auth = None;

    for pair in body.trim().split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = decode_field(value)?;
        match key {
            "ssid" => ssid = String::try_from(value.as_str()).map_err(|()| FormError::TooLong)?,
            "password" => {
                password = String::try_from(value.as_str()).map_err(|()| FormError::TooLong)?;
            }
            "auth" => auth = Some(value.parse::<u8>().map_err(|_| FormError::Malformed)?),
            _ => {}
        }
    }

    if ssid.is_empty() {
        return Err(FormError::MissingSsid);
    }
    let auth = auth.unwrap_or(if password.is_empty() {
        AuthType::Open.code()
    } else {
        AuthType::Wpa2Psk.code()
    });

    Ok(RadioEvent::ProvisionInfo {
        ssid,
        password,
        auth,
        success: true,
    })
}

/// Parse a submitted form and queue the report for the poll task.
pub fn accept_provision_form(body: &str) -> Result<(), FormError> {
    let event = parse_provision_form(body)?;
    if push_radio_event(event) { Ok(()) } else { Err(FormError::QueueFull) }
}

// ───────────────────────────────────────────────────────────────
// HTTP server (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use server::start_server;

#[cfg(target_os = "espidf")]
mod server {
    use esp_idf_svc::http::server::{Configuration, EspHttpServer};
    use esp_idf_svc::http::{Headers, Method};
    use esp_idf_svc::io::{Read, Write};
    use log::{info, warn};

    use super::{accept_provision_form, FORM_PAGE, MAX_FORM_BODY, SAVED_PAGE};

    /// Serve the credential form until the returned handle is dropped.
    pub fn start_server() -> anyhow::Result<EspHttpServer<'static>> {
        let conf = Configuration {
            stack_size: 8 * 1024,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&conf)?;

        server.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| {
            req.into_response(200, Some("OK"), &[("Content-Type", "text/html; charset=utf-8")])?
                .write_all(FORM_PAGE.as_bytes())?;
            Ok(())
        })?;

        server.fn_handler::<anyhow::Error, _>("/provision", Method::Post, |mut req| {
            let len = req.content_len().unwrap_or(0) as usize;
            if len > MAX_FORM_BODY {
                req.into_status_response(413)?.write_all(b"form too large")?;
                return Ok(());
            }
            let mut body = vec![0u8; len];
            req.read_exact(&mut body)?;

            let result = core::str::from_utf8(&body)
                .map_err(|_| super::FormError::Malformed)
                .and_then(accept_provision_form);
            match result {
                Ok(()) => {
                    info!("SOFT AP: form submitted");
                    req.into_response(200, Some("OK"), &[("Content-Type", "text/html; charset=utf-8")])?
                        .write_all(SAVED_PAGE.as_bytes())?;
                }
                Err(e) => {
                    warn!("SOFT AP: form rejected: {}", e);
                    req.into_status_response(400)?.write_all(e.to_string().as_bytes())?;
                }
            }
            Ok(())
        })?;

        Ok(server)
    }
}
