//! WiFi radio adapter.
//!
//! Implements [`RadioDriver`], the hexagonal boundary for the WiFi module.
//! Commands return the driver's immediate accept/reject; outcomes come
//! back later as [`RadioEvent`]s that the connection manager polls.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF `esp_wifi_*` calls.  A system event
//!   handler translates WiFi/IP events into the shared event queue.  Time
//!   comes from `EspSntp` and is reported only once a sync has completed;
//!   host lookups run on a short-lived thread; the provisioning AP serves
//!   the credential form from [`provisioning_page`](super::provisioning_page).
//! - **all other targets**: a loopback simulation.  Every accepted command
//!   queues the event the real module would eventually send, so the whole
//!   node can run on the host.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use heapless::Deque;
use log::{info, warn};

use crate::app::events::{LinkStatus, RadioEvent, SystemTimeFields};
use crate::app::ports::{ApConfig, RadioDriver};
use crate::error::RadioError;
use crate::wifi::credentials::WifiCredentials;

/// Events buffered between the radio and the poll task.
const EVENT_QUEUE_CAP: usize = 16;

// ── Shared event queue ────────────────────────────────────────
//
// Producers: the ESP-IDF event task (target) or the simulated radio
// (host).  Consumer: the connection manager's poll task.

static RADIO_EVENTS: Mutex<RefCell<Deque<RadioEvent, EVENT_QUEUE_CAP>>> =
    Mutex::new(RefCell::new(Deque::new()));

/// Queue an event for the next poll.  Returns `false` when the queue is
/// full and the event was dropped.
pub fn push_radio_event(event: RadioEvent) -> bool {
    let pushed = critical_section::with(|cs| RADIO_EVENTS.borrow_ref_mut(cs).push_back(event).is_ok());
    if !pushed {
        warn!("Radio: event queue full, event dropped");
    }
    pushed
}

fn pop_radio_event() -> Option<RadioEvent> {
    critical_section::with(|cs| RADIO_EVENTS.borrow_ref_mut(cs).pop_front())
}

/// Discard everything queued.
pub fn clear_radio_events() {
    critical_section::with(|cs| RADIO_EVENTS.borrow_ref_mut(cs).clear());
}

// ───────────────────────────────────────────────────────────────
// Station radio
// ───────────────────────────────────────────────────────────────

pub struct StationRadio {
    initialised: bool,
    #[cfg(target_os = "espidf")]
    sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
    #[cfg(target_os = "espidf")]
    portal: Option<esp_idf_svc::http::server::EspHttpServer<'static>>,
    /// Simulation: SSID the loopback radio is "associated" with.
    #[cfg(not(target_os = "espidf"))]
    sim_ssid: Option<heapless::String<32>>,
}

impl Default for StationRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl StationRadio {
    pub fn new() -> Self {
        Self {
            initialised: false,
            #[cfg(target_os = "espidf")]
            sntp: None,
            #[cfg(target_os = "espidf")]
            portal: None,
            #[cfg(not(target_os = "espidf"))]
            sim_ssid: None,
        }
    }

    fn ensure_init(&self) -> Result<(), RadioError> {
        if self.initialised {
            Ok(())
        } else {
            Err(RadioError::NotInitialised)
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        // SAFETY: called once from the main task after the default event
        // loop and netif have been created in main.
        unsafe {
            let rc = esp_event_handler_register(
                WIFI_EVENT,
                ESP_EVENT_ANY_ID,
                Some(esp::on_system_event),
                core::ptr::null_mut(),
            );
            esp::check(rc)?;
            let rc = esp_event_handler_register(
                IP_EVENT,
                ip_event_t_IP_EVENT_STA_GOT_IP as i32,
                Some(esp::on_system_event),
                core::ptr::null_mut(),
            );
            esp::check(rc)?;
            esp::check(esp_wifi_set_mode(wifi_mode_t_WIFI_MODE_STA))?;
            esp::check(esp_wifi_start())?;
        }
        info!("Radio(espidf): station started");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self) -> Result<(), RadioError> {
        info!("Radio(sim): initialised");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, credentials: Option<&WifiCredentials>, channel: u8) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        // SAFETY: the WiFi driver was started in platform_init; the config
        // struct is fully initialised before it is handed over.
        unsafe {
            if let Some(creds) = credentials {
                let mut cfg: wifi_config_t = core::mem::zeroed();
                let ssid = creds.ssid().as_bytes();
                let pass = creds.passphrase().as_bytes();
                cfg.sta.ssid[..ssid.len()].copy_from_slice(ssid);
                cfg.sta.password[..pass.len()].copy_from_slice(pass);
                cfg.sta.channel = if channel == crate::app::ports::CHANNEL_ALL { 0 } else { channel };
                esp::check(esp_wifi_set_config(wifi_interface_t_WIFI_IF_STA, &mut cfg))?;
            }
            esp::check(esp_wifi_connect())
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, credentials: Option<&WifiCredentials>, _channel: u8) -> Result<(), RadioError> {
        let ssid = match credentials {
            Some(c) => heapless::String::try_from(c.ssid()).map_err(|()| RadioError::Rejected(-1))?,
            None => self.sim_ssid.clone().ok_or(RadioError::NoCredentials)?,
        };
        info!("Radio(sim): associating with '{}'", ssid);
        self.sim_ssid = Some(ssid);
        push_radio_event(RadioEvent::StateChanged(LinkStatus::Connected));
        push_radio_event(RadioEvent::DhcpConfigured);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) -> Result<(), RadioError> {
        // SAFETY: plain driver call, valid after esp_wifi_start.
        esp::check(unsafe { esp_idf_svc::sys::esp_wifi_disconnect() })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) -> Result<(), RadioError> {
        info!("Radio(sim): disconnected");
        push_radio_event(RadioEvent::StateChanged(LinkStatus::Disconnected));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_resolve(&mut self, host: &str) -> Result<(), RadioError> {
        resolve_in_background(host, system_lookup)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_resolve(&mut self, host: &str) -> Result<(), RadioError> {
        info!("Radio(sim): resolved '{}'", host);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_system_time(&mut self) -> Result<(), RadioError> {
        use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};

        let Some(sntp) = &self.sntp else {
            // The first request starts the client; each completed sync
            // reports itself.
            let sntp = EspSntp::new_with_callback(&SntpConf::default(), |synced| {
                push_radio_event(RadioEvent::SystemTime(calendar_fields(synced.as_secs() as i64)));
            })
            .map_err(esp::from_esp)?;
            info!("Radio(espidf): SNTP started");
            self.sntp = Some(sntp);
            return Ok(());
        };

        let synced = sntp.get_sync_status() == SyncStatus::Completed;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: tv is a valid out-pointer; tz may be null.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return Err(RadioError::Rejected(-1));
        }
        match synced_time_report(synced, tv.tv_sec as i64) {
            Some(event) => {
                push_radio_event(event);
            }
            None => log::debug!("Radio(espidf): SNTP sync pending"),
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_system_time(&mut self) -> Result<(), RadioError> {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64);
        push_radio_event(RadioEvent::SystemTime(calendar_fields(secs)));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_provisioning(&mut self, ap: &ApConfig, domain: &str) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        // SAFETY: driver started in platform_init; cfg fully initialised.
        unsafe {
            let mut cfg: wifi_config_t = core::mem::zeroed();
            let name = ap.name.as_bytes();
            cfg.ap.ssid[..name.len()].copy_from_slice(name);
            cfg.ap.ssid_len = name.len() as u8;
            cfg.ap.channel = ap.channel;
            cfg.ap.ssid_hidden = u8::from(!ap.visible);
            cfg.ap.max_connection = 1;
            cfg.ap.authmode = wifi_auth_mode_t_WIFI_AUTH_OPEN;
            esp::check(esp_wifi_set_mode(wifi_mode_t_WIFI_MODE_APSTA))?;
            esp::check(esp_wifi_set_config(wifi_interface_t_WIFI_IF_AP, &mut cfg))?;
        }
        if self.portal.is_none() {
            let server = super::provisioning_page::start_server().map_err(|e| {
                warn!("Radio(espidf): credential form not served: {}", e);
                RadioError::Rejected(-1)
            })?;
            self.portal = Some(server);
        }
        info!("Radio(espidf): provisioning AP '{}' up, page at http://{}/", ap.name, domain);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_provisioning(&mut self, ap: &ApConfig, domain: &str) -> Result<(), RadioError> {
        info!(
            "Radio(sim): provisioning AP '{}' on channel {} at {:?} (domain '{}')",
            ap.name, ap.channel, ap.address, domain
        );
        Ok(())
    }
}

/// The wall clock as a time report, once SNTP has completed a sync.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn synced_time_report(synced: bool, epoch_secs: i64) -> Option<RadioEvent> {
    synced.then(|| RadioEvent::SystemTime(calendar_fields(epoch_secs)))
}

// ── Host lookup ───────────────────────────────────────────────
//
// getaddrinfo blocks, so lookups run on a helper thread and only their
// outcome is logged.  One lookup at a time; a request while one is in
// flight is already covered by it.

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
static LOOKUP_BUSY: AtomicBool = AtomicBool::new(false);

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
type LookupFn = fn(&str) -> std::io::Result<Option<std::net::IpAddr>>;

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn system_lookup(host: &str) -> std::io::Result<Option<std::net::IpAddr>> {
    use std::net::ToSocketAddrs;
    Ok((host, 0).to_socket_addrs()?.next().map(|a| a.ip()))
}

/// Start `lookup` for `host` without waiting for it.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn resolve_in_background(host: &str, lookup: LookupFn) -> Result<(), RadioError> {
    if LOOKUP_BUSY.swap(true, Ordering::AcqRel) {
        log::debug!("Radio: lookup of '{}' already in flight", host);
        return Ok(());
    }
    let host = std::string::String::from(host);
    let spawned = std::thread::Builder::new()
        .name("dns-lookup".into())
        .stack_size(4096)
        .spawn(move || {
            match lookup(&host) {
                Ok(Some(ip)) => info!("Radio: '{}' is {}", host, ip),
                Ok(None) => warn!("Radio: '{}' has no address", host),
                Err(e) => warn!("Radio: lookup of '{}' failed: {}", host, e),
            }
            LOOKUP_BUSY.store(false, Ordering::Release);
        });
    if let Err(e) = spawned {
        LOOKUP_BUSY.store(false, Ordering::Release);
        warn!("Radio: lookup thread not started: {}", e);
        return Err(RadioError::Rejected(-1));
    }
    Ok(())
}

/// Split Unix seconds into the calendar fields the radio reports.
fn calendar_fields(epoch_secs: i64) -> SystemTimeFields {
    use chrono::{Datelike, Timelike};
    match chrono::DateTime::from_timestamp(epoch_secs, 0) {
        Some(dt) => SystemTimeFields {
            year: u16::try_from(dt.year()).unwrap_or(0),
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        },
        None => SystemTimeFields::default(),
    }
}

// ───────────────────────────────────────────────────────────────
// RadioDriver
// ───────────────────────────────────────────────────────────────

impl RadioDriver for StationRadio {
    fn init(&mut self) -> Result<(), RadioError> {
        if !self.initialised {
            self.platform_init()?;
            self.initialised = true;
        }
        Ok(())
    }

    fn connect(&mut self, credentials: &WifiCredentials, channel: u8) -> Result<(), RadioError> {
        self.ensure_init()?;
        info!("Radio: connect to '{}' ({:?})", credentials.ssid(), credentials.auth());
        self.platform_connect(Some(credentials), channel)
    }

    fn connect_default(&mut self) -> Result<(), RadioError> {
        self.ensure_init()?;
        info!("Radio: connect with stored credentials");
        self.platform_connect(None, crate::app::ports::CHANNEL_ALL)
    }

    fn disconnect(&mut self) -> Result<(), RadioError> {
        self.ensure_init()?;
        self.platform_disconnect()
    }

    fn resolve_host(&mut self, host: &str) -> Result<(), RadioError> {
        self.ensure_init()?;
        self.platform_resolve(host)
    }

    fn request_system_time(&mut self) -> Result<(), RadioError> {
        self.ensure_init()?;
        self.platform_system_time()
    }

    fn start_provisioning(&mut self, ap: &ApConfig, domain: &str) -> Result<(), RadioError> {
        self.ensure_init()?;
        self.platform_provisioning(ap, domain)
    }

    fn poll_event(&mut self) -> Option<RadioEvent> {
        pop_radio_event()
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF event translation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::sys::*;

    use super::push_radio_event;
    use crate::app::events::{LinkStatus, RadioEvent};
    use crate::error::RadioError;

    pub(super) fn check(rc: esp_err_t) -> Result<(), RadioError> {
        if rc == ESP_OK {
            Ok(())
        } else {
            log::error!("Radio(espidf): driver returned {}", rc);
            Err(RadioError::Rejected(rc.clamp(i8::MIN as i32, i8::MAX as i32) as i8))
        }
    }

    pub(super) fn from_esp(e: EspError) -> RadioError {
        log::error!("Radio(espidf): {}", e);
        RadioError::Rejected(e.code().clamp(i8::MIN as i32, i8::MAX as i32) as i8)
    }

    /// Runs in the ESP-IDF event task.
    pub(super) unsafe extern "C" fn on_system_event(
        _arg: *mut core::ffi::c_void,
        base: esp_event_base_t,
        id: i32,
        _data: *mut core::ffi::c_void,
    ) {
        // SAFETY: WIFI_EVENT / IP_EVENT are link-time constants.
        let (wifi, ip) = unsafe { (WIFI_EVENT, IP_EVENT) };
        let event = if base == wifi && id == wifi_event_t_WIFI_EVENT_STA_CONNECTED as i32 {
            Some(RadioEvent::StateChanged(LinkStatus::Connected))
        } else if base == wifi && id == wifi_event_t_WIFI_EVENT_STA_DISCONNECTED as i32 {
            Some(RadioEvent::StateChanged(LinkStatus::Disconnected))
        } else if base == ip && id == ip_event_t_IP_EVENT_STA_GOT_IP as i32 {
            Some(RadioEvent::DhcpConfigured)
        } else {
            None
        };
        if let Some(event) = event {
            push_radio_event(event);
        }
    }
}
