//! Recording mocks for integration tests.
//!
//! Each mock implements one port trait and records every call so tests
//! can assert on the full command history without a radio or GPIO.

use std::collections::VecDeque;

use sensornode::app::events::{LinkStatus, RadioEvent};
use sensornode::app::ports::{
    ApConfig, CloudClient, IndicatorState, RadioDriver, StatusIndicators, SystemClock,
};
use sensornode::error::RadioError;
use sensornode::scheduler::Scheduler;
use sensornode::wifi::credentials::WifiCredentials;

// ── Radio call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    Init,
    Connect { ssid: String, channel: u8 },
    ConnectDefault,
    Disconnect,
    ResolveHost(String),
    RequestTime,
    StartProvisioning { name: String, domain: String },
}

// ── MockRadio ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRadio {
    pub calls: Vec<RadioCall>,
    pub events: VecDeque<RadioEvent>,
    pub reject_connect: bool,
    pub reject_resolve: bool,
    pub reject_disconnect: bool,
}

#[allow(dead_code)]
impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: RadioEvent) {
        self.events.push_back(event);
    }

    pub fn push_link_up(&mut self) {
        self.push(RadioEvent::StateChanged(LinkStatus::Connected));
        self.push(RadioEvent::DhcpConfigured);
    }

    pub fn count(&self, pred: impl Fn(&RadioCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn connects(&self) -> usize {
        self.count(|c| matches!(c, RadioCall::Connect { .. }))
    }

    pub fn last_connect_ssid(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|c| match c {
            RadioCall::Connect { ssid, .. } => Some(ssid.as_str()),
            _ => None,
        })
    }
}

impl RadioDriver for MockRadio {
    fn init(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Init);
        Ok(())
    }

    fn connect(&mut self, credentials: &WifiCredentials, channel: u8) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Connect {
            ssid: credentials.ssid().to_string(),
            channel,
        });
        if self.reject_connect {
            Err(RadioError::Rejected(-1))
        } else {
            Ok(())
        }
    }

    fn connect_default(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::ConnectDefault);
        if self.reject_connect {
            Err(RadioError::Rejected(-1))
        } else {
            Ok(())
        }
    }

    fn disconnect(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Disconnect);
        if self.reject_disconnect {
            Err(RadioError::Rejected(-3))
        } else {
            Ok(())
        }
    }

    fn resolve_host(&mut self, host: &str) -> Result<(), RadioError> {
        self.calls.push(RadioCall::ResolveHost(host.to_string()));
        if self.reject_resolve {
            Err(RadioError::Rejected(-2))
        } else {
            Ok(())
        }
    }

    fn request_system_time(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::RequestTime);
        Ok(())
    }

    fn start_provisioning(&mut self, ap: &ApConfig, domain: &str) -> Result<(), RadioError> {
        self.calls.push(RadioCall::StartProvisioning {
            name: ap.name.to_string(),
            domain: domain.to_string(),
        });
        Ok(())
    }

    fn poll_event(&mut self) -> Option<RadioEvent> {
        self.events.pop_front()
    }
}

// ── MockCloud ─────────────────────────────────────────────────

/// Follows link readiness unless `forced` pins the session state.
#[derive(Default)]
pub struct MockCloud {
    pub device_id: Option<String>,
    pub connected: bool,
    pub forced: Option<bool>,
    pub published: Vec<i64>,
    pub resets: u32,
}

impl CloudClient for MockCloud {
    fn init(&mut self, device_id: &str) {
        self.device_id = Some(device_id.to_string());
    }

    fn service(&mut self, link_ready: bool) {
        self.connected = self.device_id.is_some() && self.forced.unwrap_or(link_ready);
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.connected = false;
    }

    fn publish(&mut self, timestamp: i64) {
        self.published.push(timestamp);
    }
}

// ── MockClock ─────────────────────────────────────────────────

pub struct MockClock {
    pub now: i64,
    pub sets: Vec<i64>,
}

impl MockClock {
    pub fn at(now: i64) -> Self {
        Self {
            now,
            sets: Vec::new(),
        }
    }
}

impl SystemClock for MockClock {
    fn now(&self) -> i64 {
        self.now
    }

    fn set(&mut self, epoch_secs: i64) {
        self.now = epoch_secs;
        self.sets.push(epoch_secs);
    }
}

// ── MockLeds ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockLeds {
    pub history: Vec<IndicatorState>,
}

#[allow(dead_code)]
impl MockLeds {
    pub fn last(&self) -> Option<IndicatorState> {
        self.history.last().copied()
    }
}

impl StatusIndicators for MockLeds {
    fn show(&mut self, state: &IndicatorState) {
        self.history.push(*state);
    }
}

// ── Scheduler helpers ─────────────────────────────────────────

/// One tick: promote, then drain the due queue like the super-loop.
pub fn step<C>(sched: &Scheduler<C>, ctx: &mut C) {
    sched.on_tick();
    while sched.run_next(ctx) {}
}

/// Run for `ms` milliseconds of scheduler time.
#[allow(dead_code)]
pub fn advance<C>(sched: &Scheduler<C>, ctx: &mut C, ms: u32) {
    let ticks = ms / u32::from(sched.tick_ms());
    for _ in 0..ticks {
        step(sched, ctx);
    }
}
