//! WiFi connection manager.
//!
//! Drives the station link entirely from scheduler timers and radio
//! events.  There is no thread and no blocking: every reaction is a short
//! state update plus timer bookkeeping.
//!
//! ```text
//!                 connect() accepted
//!   ┌──────┐   ───────────────────▶  ┌─────────────┐
//!   │ Idle │                         │ Associating │
//!   └──────┘                         └─────────────┘
//!                                           │ StateChanged(Connected)
//!                                           ▼
//!   ┌──────────────────────┐  DHCP    ┌──────────────────────────┐
//!   │ Associated { has_ip }│ ◀─────── │ Associated { !has_ip }   │
//!   └──────────────────────┘          └──────────────────────────┘
//!        │ StateChanged(Disconnected)        ▲
//!        ▼                                   │ DHCP within window
//!   ┌──────────────────────────────┐  ───────┘
//!   │ Disconnected{pending_confirm}│
//!   └──────────────────────────────┘
//!        │ check-back timer expires
//!        ▼
//!   Disconnected{!pending_confirm}: has_error, LinkDown to host
//! ```
//!
//! In provisioning mode the radio serves an access point.  Credentials
//! entered there are retried on a fixed period until the station link
//! comes up, at which point the host gets exactly one
//! [`WifiNotice::Provisioned`].
//!
//! Four timers are registered with the scheduler:
//!
//! | Timer        | Period       | Job                                  |
//! |--------------|--------------|--------------------------------------|
//! | `wifi-poll`  | 50 ms        | drain radio events                   |
//! | `ntp`        | 32 s         | request SNTP time                    |
//! | `soft-ap`    | 1 s          | retry provisioned association        |
//! | `check-back` | 50 ms, once  | confirm a reported disconnect        |

pub mod credentials;
pub mod status;

use heapless::{String, Vec};
use log::{debug, error, info, warn};

use crate::app::events::{LinkStatus, RadioEvent, SystemTimeFields};
use crate::app::ports::{ApConfig, CHANNEL_ALL, RadioDriver};
use crate::config::NodeConfig;
use crate::error::{Error, RadioError};
use crate::scheduler::{Scheduler, TimerAction, TimerId};

use credentials::{AuthType, WifiCredentials};
use status::{ConnectionStatus, CredentialSource, LinkIndicators, LinkState, WifiMode};

/// Radio events handled per poll pass.
const MAX_EVENTS_PER_POLL: usize = 8;

// ───────────────────────────────────────────────────────────────
// Upward notices
// ───────────────────────────────────────────────────────────────

/// What the connection manager reports to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiNotice {
    /// Associated, and no disconnect is being confirmed.
    LinkUp,
    /// A disconnect was confirmed after the check-back window.
    LinkDown,
    /// The first association with provisioned credentials succeeded.
    Provisioned,
    /// The radio reported wall-clock time (Unix seconds).
    ClockSynced(i64),
}

pub type Notices = Vec<WifiNotice, 2>;

/// Whatever owns a [`WifiService`] and receives its notices.  The
/// connection manager's timer callbacks run against this context.
pub trait WifiHost: Sized {
    type Radio: RadioDriver;

    fn wifi(&mut self) -> &mut WifiService<Self::Radio>;

    fn on_wifi_notice(&mut self, notice: WifiNotice, sched: &Scheduler<Self>);
}

// ───────────────────────────────────────────────────────────────
// Settings
// ───────────────────────────────────────────────────────────────

/// The part of [`NodeConfig`] the connection manager needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiSettings {
    pub poll_interval_ms: u32,
    pub ntp_interval_ms: u32,
    pub soft_ap_retry_ms: u32,
    pub check_back_ms: u32,
    pub cloud_host: String<64>,
    pub ap: ApConfig,
}

impl From<&NodeConfig> for WifiSettings {
    fn from(config: &NodeConfig) -> Self {
        Self {
            poll_interval_ms: config.wifi_poll_interval_ms,
            ntp_interval_ms: config.ntp_interval_ms,
            soft_ap_retry_ms: config.soft_ap_retry_ms,
            check_back_ms: config.check_back_ms,
            cloud_host: config.cloud_host.clone(),
            ap: config.ap.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WifiTimers {
    poll: TimerId,
    ntp: TimerId,
    soft_ap: TimerId,
    check_back: TimerId,
}

// ───────────────────────────────────────────────────────────────
// WifiService
// ───────────────────────────────────────────────────────────────

pub struct WifiService<R: RadioDriver> {
    radio: R,
    settings: WifiSettings,
    status: ConnectionStatus,
    indicators: LinkIndicators,
    credentials: Option<WifiCredentials>,
    provisioning_pending: bool,
    link: LinkState,
    mode: WifiMode,
    timers: Option<WifiTimers>,
}

impl<R: RadioDriver> WifiService<R> {
    pub fn new(radio: R, settings: WifiSettings) -> Self {
        Self {
            radio,
            settings,
            status: ConnectionStatus::default(),
            indicators: LinkIndicators::default(),
            credentials: None,
            provisioning_pending: false,
            link: LinkState::Idle,
            mode: WifiMode::Normal,
            timers: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring the radio up, register the timers and start in `mode`.
    ///
    /// Normal mode arms the NTP resync; provisioning mode starts the access
    /// point instead.  The event poll timer runs in both.
    pub fn init<H>(&mut self, sched: &Scheduler<H>, mode: WifiMode) -> Result<(), Error>
    where
        H: WifiHost<Radio = R>,
    {
        self.radio.init()?;

        let timers = match self.timers {
            Some(t) => t,
            None => {
                let t = WifiTimers {
                    poll: sched.register("wifi-poll", poll_task::<H>)?,
                    ntp: sched.register("ntp", ntp_task::<H>)?,
                    soft_ap: sched.register("soft-ap", soft_ap_task::<H>)?,
                    check_back: sched.register("check-back", check_back_task::<H>)?,
                };
                self.timers = Some(t);
                t
            }
        };

        self.mode = mode;
        match mode {
            WifiMode::Provisioning => {
                self.enable_provisioning_ap();
                info!("WiFi: access point mode for provisioning");
            }
            WifiMode::Normal => sched.create(timers.ntp, self.settings.ntp_interval_ms)?,
        }
        sched.create(timers.poll, self.settings.poll_interval_ms)?;
        Ok(())
    }

    fn enable_provisioning_ap(&mut self) {
        self.indicators.provisioning = true;
        let ap = &self.settings.ap;
        if let Err(e) = self.radio.start_provisioning(ap, &ap.name) {
            error!("WiFi: provisioning AP failed to start: {}", e);
            self.status.has_error = true;
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Ask the radio to associate.  Only the radio's immediate
    /// accept/reject is reported; a rejection also raises `has_error`.
    pub fn connect(&mut self, source: CredentialSource) -> Result<(), RadioError> {
        let result = match source {
            CredentialSource::New => match &self.credentials {
                Some(creds) => self.radio.connect(creds, CHANNEL_ALL),
                None => Err(RadioError::NoCredentials),
            },
            CredentialSource::Stored => self.radio.connect_default(),
        };
        match result {
            Ok(()) => self.link = LinkState::Associating,
            Err(e) => {
                error!("WiFi: connect error: {}", e);
                self.status.has_error = true;
            }
        }
        result
    }

    /// Drop the station link.  Does nothing unless associated.
    pub fn disconnect(&mut self) -> Result<(), RadioError> {
        if !self.status.has_ap_connection {
            return Ok(());
        }
        self.radio.disconnect().inspect_err(|e| {
            error!("WiFi: disconnect from AP error: {}", e);
        })
    }

    /// Connect with held credentials when there are any, otherwise with
    /// whatever the radio has stored.
    pub fn reconnect(&mut self) -> Result<(), RadioError> {
        let source = if self.credentials.is_some() {
            CredentialSource::New
        } else {
            CredentialSource::Stored
        };
        self.connect(source)
    }

    /// Hold `credentials` for the next [`CredentialSource::New`] connect.
    /// They are dropped once an association succeeds.
    pub fn set_credentials(&mut self, credentials: WifiCredentials) {
        info!("WiFi: credentials set (SSID='{}')", credentials.ssid());
        self.credentials = Some(credentials);
    }

    /// Show the "searching" indicator until the next association.
    pub fn mark_searching(&mut self) {
        self.indicators.searching = true;
    }

    // ── Radio events ──────────────────────────────────────────

    /// React to one radio event.  Returns the notices for the host.
    pub fn handle_event<C>(&mut self, event: RadioEvent, sched: &Scheduler<C>) -> Notices {
        let mut notices = Notices::new();
        match event {
            RadioEvent::StateChanged(LinkStatus::Connected) => {
                self.on_connected(sched, &mut notices);
            }
            RadioEvent::StateChanged(LinkStatus::Disconnected) => self.on_disconnected(sched),
            RadioEvent::DhcpConfigured => self.on_dhcp(sched),
            RadioEvent::SystemTime(fields) => {
                if let Some(epoch) = self.on_system_time(&fields) {
                    let _ = notices.push(WifiNotice::ClockSynced(epoch));
                }
            }
            RadioEvent::ProvisionInfo {
                ssid,
                password,
                auth,
                success,
            } => self.on_provision_info(sched, &ssid, &password, auth, success),
        }
        notices
    }

    fn on_connected<C>(&mut self, sched: &Scheduler<C>, notices: &mut Notices) {
        if self.provisioning_pending {
            if let Some(t) = self.timers {
                sched.delete(t.soft_ap);
                if let Err(e) = sched.create(t.ntp, self.settings.ntp_interval_ms) {
                    warn!("WiFi: NTP timer not armed: {}", e);
                }
            }
            self.provisioning_pending = false;
            self.indicators.provisioning = false;
            self.mode = WifiMode::Normal;
            let _ = notices.push(WifiNotice::Provisioned);
        }

        self.status.has_ap_connection = true;
        self.link = LinkState::Associated { has_ip: false };
        self.credentials = None;
        self.indicators.searching = false;
        info!("WiFi: connected to AP");

        if !self.status.is_disconnecting {
            let _ = notices.push(WifiNotice::LinkUp);
        }
    }

    fn on_disconnected<C>(&mut self, sched: &Scheduler<C>) {
        if let Some(t) = self.timers {
            if let Err(e) = sched.create(t.check_back, self.settings.check_back_ms) {
                warn!("WiFi: check-back timer not armed: {}", e);
            }
        }
        self.status.is_disconnecting = true;
        self.link = LinkState::Disconnected {
            pending_confirm: true,
        };
        debug!("WiFi: disconnect reported, confirming");
    }

    fn on_dhcp<C>(&mut self, sched: &Scheduler<C>) {
        // An IP alone is not enough: the cloud host must resolve too.
        if let Err(e) = self.radio.resolve_host(&self.settings.cloud_host) {
            warn!("WiFi: lookup of '{}' rejected: {}", self.settings.cloud_host, e);
            return;
        }
        if self.status.is_disconnecting {
            if let Some(t) = self.timers {
                sched.delete(t.check_back);
            }
            self.status.is_disconnecting = false;
        }
        self.status.has_error = false;
        self.link = LinkState::Associated { has_ip: true };
        info!("WiFi: DHCP configured");
    }

    fn on_system_time(&mut self, fields: &SystemTimeFields) -> Option<i64> {
        if fields.year == 0 {
            debug!("WiFi: radio has no time yet");
            return None;
        }
        match fields.to_unix() {
            Ok(epoch) => Some(epoch),
            Err(e) => {
                warn!("WiFi: ignoring system time {:?}: {}", fields, e);
                None
            }
        }
    }

    fn on_provision_info<C>(
        &mut self,
        sched: &Scheduler<C>,
        ssid: &str,
        password: &str,
        auth: u8,
        success: bool,
    ) {
        if !success {
            warn!("SOFT AP: provisioning reported failure");
            return;
        }
        let creds = match AuthType::from_code(auth)
            .and_then(|auth| WifiCredentials::new(ssid, password, auth))
        {
            Ok(c) => c,
            Err(e) => {
                warn!("SOFT AP: rejected credentials for '{}': {}", ssid, e);
                return;
            }
        };
        info!("SOFT AP: credentials received for '{}'", creds.ssid());
        self.credentials = Some(creds);
        self.provisioning_pending = true;

        if let Some(t) = self.timers {
            if let Err(e) = sched.create_immediate(t.soft_ap, self.settings.soft_ap_retry_ms) {
                warn!("SOFT AP: connect timer not armed: {}", e);
            }
        }
    }

    // ── Timer bodies ──────────────────────────────────────────

    fn attempt_provisioned_connect(&mut self) {
        match self.connect(CredentialSource::New) {
            Ok(()) => info!("SOFT AP: new connect credentials sent to radio"),
            Err(_) => error!("SOFT AP: connect failure"),
        }
    }

    fn confirm_disconnect(&mut self) -> WifiNotice {
        error!("WiFi: AP connection lost");
        self.status.has_ap_connection = false;
        self.status.has_error = true;
        self.status.is_disconnecting = false;
        self.link = LinkState::Disconnected {
            pending_confirm: false,
        };
        WifiNotice::LinkDown
    }

    fn request_time(&mut self) {
        if let Err(e) = self.radio.request_system_time() {
            warn!("WiFi: time request rejected: {}", e);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn indicators(&self) -> LinkIndicators {
        self.indicators
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn mode(&self) -> WifiMode {
        self.mode
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn provisioning_pending(&self) -> bool {
        self.provisioning_pending
    }

    pub fn settings(&self) -> &WifiSettings {
        &self.settings
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Handles of the poll, NTP, soft-AP and check-back timers, once
    /// registered.
    pub fn timer_ids(&self) -> Option<[TimerId; 4]> {
        self.timers.map(|t| [t.poll, t.ntp, t.soft_ap, t.check_back])
    }
}

// ───────────────────────────────────────────────────────────────
// Timer callbacks
// ───────────────────────────────────────────────────────────────

/// Feed up to [`MAX_EVENTS_PER_POLL`] queued radio events through
/// [`WifiService::handle_event`] and hand the notices to the host.
fn drain_radio_events<H: WifiHost>(host: &mut H, sched: &Scheduler<H>) {
    for _ in 0..MAX_EVENTS_PER_POLL {
        let Some(event) = host.wifi().radio.poll_event() else {
            break;
        };
        debug!("WiFi: event {:?}", event);
        for notice in host.wifi().handle_event(event, sched) {
            host.on_wifi_notice(notice, sched);
        }
    }
}

fn poll_task<H: WifiHost>(host: &mut H, sched: &Scheduler<H>) -> TimerAction {
    drain_radio_events(host, sched);
    TimerAction::Repeat
}

fn ntp_task<H: WifiHost>(host: &mut H, _sched: &Scheduler<H>) -> TimerAction {
    host.wifi().request_time();
    TimerAction::Repeat
}

fn soft_ap_task<H: WifiHost>(host: &mut H, _sched: &Scheduler<H>) -> TimerAction {
    host.wifi().attempt_provisioned_connect();
    TimerAction::Repeat
}

fn check_back_task<H: WifiHost>(host: &mut H, sched: &Scheduler<H>) -> TimerAction {
    // The poll may share this due time and sit behind us in the queue; an
    // IP that arrived inside the window still cancels the confirmation.
    drain_radio_events(host, sched);
    if !host.wifi().status.is_disconnecting {
        debug!("WiFi: link recovered before confirmation");
        return TimerAction::Stop;
    }
    let notice = host.wifi().confirm_disconnect();
    host.on_wifi_notice(notice, sched);
    TimerAction::Stop
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
