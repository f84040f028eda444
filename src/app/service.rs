//! Application orchestrator: the hexagonal core.
//!
//! [`SensorNode`] owns the connection manager, the cloud session, the
//! clock and the status LEDs.  It runs one periodic data task that paces
//! telemetry and refreshes the indicators, and it is the context every
//! scheduler callback in the firmware runs against.
//!
//! ```text
//!  RadioDriver ──▶ ┌──────────────────────────┐ ──▶ CloudClient
//!                  │        SensorNode         │
//!  SystemClock ◀──▶│  WifiService · data task  │ ──▶ StatusIndicators
//!                  └──────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::config::NodeConfig;
use crate::error::{Error, TimerError};
use crate::scheduler::{Scheduler, TimerAction, TimerId};
use crate::wifi::status::{ConnectionStatus, CredentialSource, LinkIndicators, WifiMode};
use crate::wifi::{WifiHost, WifiNotice, WifiService, WifiSettings};

use super::commands::AppCommand;
use super::ports::{CloudClient, IndicatorState, Led, RadioDriver, StatusIndicators, SystemClock};

/// Device ID buffer: 18 hex digits.
pub type DeviceId = heapless::String<20>;

/// How the node starts, chosen from the boot switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    /// Join a network with the given credentials.
    Station(CredentialSource),
    /// Serve the provisioning access point.
    Provisioning,
}

// ───────────────────────────────────────────────────────────────
// Indicators
// ───────────────────────────────────────────────────────────────

/// Map link and cloud state onto the three status LEDs.
pub fn derive_indicators(
    status: ConnectionStatus,
    hints: LinkIndicators,
    cloud_up: bool,
) -> IndicatorState {
    let wifi = if hints.provisioning() {
        Led::Blinking
    } else if status.has_ap_connection() {
        Led::On
    } else {
        Led::Off
    };
    let error = if status.has_error() { Led::On } else { Led::Off };
    let cloud = if hints.searching() {
        Led::Blinking
    } else if cloud_up {
        Led::On
    } else {
        Led::Off
    };
    IndicatorState { wifi, error, cloud }
}

// ───────────────────────────────────────────────────────────────
// SensorNode
// ───────────────────────────────────────────────────────────────

pub struct SensorNode<R, K, T, L>
where
    R: RadioDriver,
    K: CloudClient,
    T: SystemClock,
    L: StatusIndicators,
{
    wifi: WifiService<R>,
    cloud: K,
    clock: T,
    leds: L,
    config: NodeConfig,
    device_id: DeviceId,
    data_timer: Option<TimerId>,
    send_ticks: u32,
    send_counter: u32,
    tick_count: u64,
}

impl<R, K, T, L> SensorNode<R, K, T, L>
where
    R: RadioDriver,
    K: CloudClient,
    T: SystemClock,
    L: StatusIndicators,
{
    /// Construct the node from configuration.
    ///
    /// Does **not** touch the radio or the scheduler. Call [`start`] next.
    ///
    /// [`start`]: Self::start
    pub fn new(radio: R, cloud: K, clock: T, leds: L, config: NodeConfig, device_id: DeviceId) -> Self {
        let wifi = WifiService::new(radio, WifiSettings::from(&config));
        let send_ticks = config.send_ticks();
        Self {
            wifi,
            cloud,
            clock,
            leds,
            config,
            device_id,
            data_timer: None,
            send_ticks,
            send_counter: 0,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the connection manager in the mode picked at boot.
    ///
    /// Station mode also starts the cloud session and the data task and
    /// issues the first connect.  Provisioning mode defers both until the
    /// provisioned credentials have associated.
    pub fn start(&mut self, sched: &Scheduler<Self>, boot: BootMode) -> Result<(), Error> {
        info!("APP: starting as {} ({:?})", self.device_id, boot);
        match boot {
            BootMode::Station(source) => {
                if source == CredentialSource::New {
                    let creds = self.config.station_credentials()?;
                    self.wifi.set_credentials(creds);
                    self.wifi.mark_searching();
                }
                self.wifi.init(sched, WifiMode::Normal)?;
                self.start_cloud(sched)?;
                if let Err(e) = self.wifi.connect(source) {
                    warn!("APP: initial connect rejected: {}", e);
                }
            }
            BootMode::Provisioning => self.wifi.init(sched, WifiMode::Provisioning)?,
        }
        Ok(())
    }

    fn start_cloud(&mut self, sched: &Scheduler<Self>) -> Result<(), TimerError> {
        self.cloud.init(&self.device_id);
        let id = match self.data_timer {
            Some(id) => id,
            None => {
                let id = sched.register("data", data_task::<R, K, T, L>)?;
                self.data_timer = Some(id);
                id
            }
        };
        sched.create(id, self.config.data_interval_ms)
    }

    // ── Data task ─────────────────────────────────────────────

    /// One data task run: service the cloud session, pace telemetry, then
    /// refresh the LEDs.
    ///
    /// Every `send_ticks` consecutive runs with the cloud up, the clock is
    /// advanced by the send interval and a sample is published.  Any run
    /// with the cloud down restarts the count.
    pub fn tick(&mut self) {
        self.tick_count += 1;
        let status = self.wifi.status();
        self.cloud.service(status.has_ap_connection() && !status.has_error());
        let cloud_up = self.cloud.is_connected();

        if cloud_up {
            self.send_counter += 1;
            if self.send_counter >= self.send_ticks {
                self.send_counter = 0;
                let now = self.clock.now() + i64::from(self.config.send_interval_secs);
                self.clock.set(now);
                self.cloud.publish(now);
            }
        } else {
            self.send_counter = 0;
        }

        let state = derive_indicators(status, self.wifi.indicators(), cloud_up);
        self.leds.show(&state);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (serial console, cloud).
    pub fn handle_command(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::SetCredentials(creds) => {
                self.wifi.set_credentials(creds);
                if self.cloud.is_connected() {
                    self.cloud.reset();
                }
                if self.wifi.status().has_ap_connection() {
                    // The confirmed LinkDown reconnects with the new set.
                    if let Err(e) = self.wifi.disconnect() {
                        warn!("APP: disconnect for new credentials rejected: {}", e);
                    }
                } else if let Err(e) = self.wifi.connect(CredentialSource::New) {
                    warn!("APP: connect with new credentials rejected: {}", e);
                }
            }
            AppCommand::Reconnect => {
                info!("APP: reconnect requested");
                self.cloud.reset();
                if !self.wifi.status().has_ap_connection() {
                    if let Err(e) = self.wifi.reconnect() {
                        warn!("APP: reconnect rejected: {}", e);
                    }
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn wifi_status(&self) -> ConnectionStatus {
        self.wifi.status()
    }

    pub fn wifi_service(&self) -> &WifiService<R> {
        &self.wifi
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Data task runs since start.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn send_counter(&self) -> u32 {
        self.send_counter
    }

    pub fn data_timer(&self) -> Option<TimerId> {
        self.data_timer
    }

    pub fn cloud(&self) -> &K {
        &self.cloud
    }

    pub fn cloud_mut(&mut self) -> &mut K {
        &mut self.cloud
    }

    pub fn clock(&self) -> &T {
        &self.clock
    }

    pub fn leds(&self) -> &L {
        &self.leds
    }

    pub fn radio_mut(&mut self) -> &mut R {
        self.wifi.radio_mut()
    }
}

impl<R, K, T, L> WifiHost for SensorNode<R, K, T, L>
where
    R: RadioDriver,
    K: CloudClient,
    T: SystemClock,
    L: StatusIndicators,
{
    type Radio = R;

    fn wifi(&mut self) -> &mut WifiService<R> {
        &mut self.wifi
    }

    fn on_wifi_notice(&mut self, notice: WifiNotice, sched: &Scheduler<Self>) {
        match notice {
            WifiNotice::LinkUp => info!("APP: WiFi link up"),
            WifiNotice::LinkDown => {
                warn!("APP: WiFi link down, resetting cloud session");
                self.cloud.reset();
                if let Err(e) = self.wifi.reconnect() {
                    warn!("APP: reconnect rejected: {}", e);
                }
            }
            WifiNotice::Provisioned => {
                info!("APP: provisioning complete, starting cloud");
                if let Err(e) = self.start_cloud(sched) {
                    error!("APP: data task not started: {}", e);
                }
            }
            WifiNotice::ClockSynced(epoch) => {
                self.clock.set(epoch);
                info!("APP: clock set to {}", epoch);
            }
        }
    }
}

fn data_task<R, K, T, L>(
    node: &mut SensorNode<R, K, T, L>,
    _sched: &Scheduler<SensorNode<R, K, T, L>>,
) -> TimerAction
where
    R: RadioDriver,
    K: CloudClient,
    T: SystemClock,
    L: StatusIndicators,
{
    node.tick();
    TimerAction::Repeat
}
