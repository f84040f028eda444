//! Integration tests for the connection manager running on the scheduler.
//!
//! A minimal host owns the [`WifiService`] and records its notices; time
//! is driven one 1 ms tick at a time so window edges can be hit exactly.

use heapless::String;

use sensornode::app::events::{LinkStatus, RadioEvent};
use sensornode::config::NodeConfig;
use sensornode::scheduler::{Scheduler, TimerState};
use sensornode::wifi::status::{CredentialSource, LinkState, WifiMode};
use sensornode::wifi::{WifiHost, WifiNotice, WifiService, WifiSettings};

use crate::mock_hw::{advance, step, MockRadio, RadioCall};

struct Host {
    wifi: WifiService<MockRadio>,
    notices: Vec<WifiNotice>,
}

impl WifiHost for Host {
    type Radio = MockRadio;

    fn wifi(&mut self) -> &mut WifiService<MockRadio> {
        &mut self.wifi
    }

    fn on_wifi_notice(&mut self, notice: WifiNotice, _sched: &Scheduler<Self>) {
        self.notices.push(notice);
    }
}

impl Host {
    fn count(&self, notice: WifiNotice) -> usize {
        self.notices.iter().filter(|n| **n == notice).count()
    }
}

fn make_host(mode: WifiMode) -> (Host, Scheduler<Host>) {
    let settings = WifiSettings::from(&NodeConfig::default());
    let mut host = Host {
        wifi: WifiService::new(MockRadio::new(), settings),
        notices: Vec::new(),
    };
    let sched = Scheduler::new(1);
    host.wifi.init(&sched, mode).unwrap();
    (host, sched)
}

/// Feed one event straight into the state machine, as the poll task would.
fn inject(host: &mut Host, sched: &Scheduler<Host>, event: RadioEvent) {
    for notice in host.wifi.handle_event(event, sched) {
        host.on_wifi_notice(notice, sched);
    }
}

fn link_up(host: &mut Host, sched: &Scheduler<Host>) {
    inject(host, sched, RadioEvent::StateChanged(LinkStatus::Connected));
    inject(host, sched, RadioEvent::DhcpConfigured);
}

fn provision_info(ssid: &str, password: &str, auth: u8, success: bool) -> RadioEvent {
    RadioEvent::ProvisionInfo {
        ssid: String::try_from(ssid).unwrap(),
        password: String::try_from(password).unwrap(),
        auth,
        success,
    }
}

// ── Link up ──────────────────────────────────────────────────

#[test]
fn connected_and_dhcp_bring_link_up() {
    let (mut host, sched) = make_host(WifiMode::Normal);
    link_up(&mut host, &sched);

    let status = host.wifi.status();
    assert!(status.has_ap_connection());
    assert!(!status.has_error());
    assert_eq!(host.wifi.link(), LinkState::Associated { has_ip: true });
    assert_eq!(host.notices, vec![WifiNotice::LinkUp]);
    assert!(host
        .wifi
        .radio()
        .calls
        .contains(&RadioCall::ResolveHost("mqtt.sensornode.local".into())));
}

#[test]
fn failed_lookup_keeps_link_without_ip() {
    let (mut host, sched) = make_host(WifiMode::Normal);
    host.wifi.radio_mut().reject_resolve = true;
    link_up(&mut host, &sched);
    assert_eq!(host.wifi.link(), LinkState::Associated { has_ip: false });
}

#[test]
fn radio_events_flow_through_poll_task() {
    let (mut host, sched) = make_host(WifiMode::Normal);
    host.wifi.radio_mut().push_link_up();
    advance(&sched, &mut host, 49);
    assert!(!host.wifi.status().has_ap_connection());
    step(&sched, &mut host);
    assert!(host.wifi.status().has_ap_connection());
    assert_eq!(host.count(WifiNotice::LinkUp), 1);
}

// ── Disconnect debounce ──────────────────────────────────────

#[test]
fn dhcp_inside_check_back_window_never_raises_error() {
    for delay in [0u32, 1, 25, 48, 49] {
        let (mut host, sched) = make_host(WifiMode::Normal);
        link_up(&mut host, &sched);
        let check_back = host.wifi.timer_ids().unwrap()[3];

        inject(&mut host, &sched, RadioEvent::StateChanged(LinkStatus::Disconnected));
        assert!(host.wifi.status().is_disconnecting());
        advance(&sched, &mut host, delay);
        assert!(!host.wifi.status().has_error(), "error before DHCP at +{}ms", delay);

        inject(&mut host, &sched, RadioEvent::DhcpConfigured);
        assert!(!sched.is_active(check_back), "check-back still armed at +{}ms", delay);
        assert!(!host.wifi.status().is_disconnecting());

        advance(&sched, &mut host, 200);
        assert!(!host.wifi.status().has_error(), "error after DHCP at +{}ms", delay);
        assert!(host.wifi.status().has_ap_connection());
        assert_eq!(host.count(WifiNotice::LinkDown), 0);
    }
}

#[test]
fn dhcp_cancels_check_back_sitting_in_due_queue() {
    let (mut host, sched) = make_host(WifiMode::Normal);
    link_up(&mut host, &sched);
    let check_back = host.wifi.timer_ids().unwrap()[3];

    inject(&mut host, &sched, RadioEvent::StateChanged(LinkStatus::Disconnected));
    advance(&sched, &mut host, 49);
    // Expiry tick: promoted, not yet run.
    sched.on_tick();
    assert_eq!(sched.state(check_back), Some(TimerState::Due));

    inject(&mut host, &sched, RadioEvent::DhcpConfigured);
    assert_eq!(sched.state(check_back), Some(TimerState::Idle));
    while sched.run_next(&mut host) {}

    assert!(!host.wifi.status().has_error());
    assert_eq!(host.count(WifiNotice::LinkDown), 0);
}

#[test]
fn check_back_expiry_confirms_link_down() {
    let (mut host, sched) = make_host(WifiMode::Normal);
    link_up(&mut host, &sched);

    inject(&mut host, &sched, RadioEvent::StateChanged(LinkStatus::Disconnected));
    advance(&sched, &mut host, 50);

    let status = host.wifi.status();
    assert!(!status.has_ap_connection());
    assert!(status.has_error());
    assert!(!status.is_disconnecting());
    assert_eq!(host.wifi.link(), LinkState::Disconnected { pending_confirm: false });
    assert_eq!(host.count(WifiNotice::LinkDown), 1);

    // One-shot: nothing more after the window.
    advance(&sched, &mut host, 500);
    assert_eq!(host.count(WifiNotice::LinkDown), 1);
}

#[test]
fn reassociation_during_window_is_not_announced() {
    let (mut host, sched) = make_host(WifiMode::Normal);
    link_up(&mut host, &sched);
    inject(&mut host, &sched, RadioEvent::StateChanged(LinkStatus::Disconnected));
    inject(&mut host, &sched, RadioEvent::StateChanged(LinkStatus::Connected));
    assert_eq!(host.count(WifiNotice::LinkUp), 1);
}

// ── Provisioning ─────────────────────────────────────────────

#[test]
fn provisioning_mode_starts_access_point() {
    let (host, sched) = make_host(WifiMode::Provisioning);
    assert!(host.wifi.indicators().provisioning());
    assert_eq!(host.wifi.mode(), WifiMode::Provisioning);
    assert!(host.wifi.radio().calls.contains(&RadioCall::StartProvisioning {
        name: "SensorNode".into(),
        domain: "SensorNode".into(),
    }));
    let [poll, ntp, ..] = host.wifi.timer_ids().unwrap();
    assert!(sched.is_active(poll));
    assert!(!sched.is_active(ntp));
}

#[test]
fn provision_info_attempts_association_on_next_pass() {
    let (mut host, sched) = make_host(WifiMode::Provisioning);
    let soft_ap = host.wifi.timer_ids().unwrap()[2];

    inject(&mut host, &sched, provision_info("homenet", "hunter2hunter2", 2, true));
    assert!(host.wifi.provisioning_pending());
    assert_eq!(sched.state(soft_ap), Some(TimerState::Due));

    assert!(sched.run_next(&mut host));
    assert_eq!(host.wifi.radio().connects(), 1);
    assert_eq!(host.wifi.radio().last_connect_ssid(), Some("homenet"));
}

#[test]
fn soft_ap_retries_until_connected_then_fires_hook_once() {
    let (mut host, sched) = make_host(WifiMode::Provisioning);
    let [_, ntp, soft_ap, _] = host.wifi.timer_ids().unwrap();
    host.wifi.radio_mut().reject_connect = true;

    inject(&mut host, &sched, provision_info("homenet", "hunter2hunter2", 2, true));
    while sched.run_next(&mut host) {}
    advance(&sched, &mut host, 3000);
    // Immediate attempt plus one per second.
    assert_eq!(host.wifi.radio().connects(), 4);
    assert!(sched.is_active(soft_ap));

    host.wifi.radio_mut().reject_connect = false;
    inject(&mut host, &sched, RadioEvent::StateChanged(LinkStatus::Connected));

    assert_eq!(host.count(WifiNotice::Provisioned), 1);
    assert!(!sched.is_active(soft_ap));
    assert!(sched.is_active(ntp));
    assert!(!host.wifi.indicators().provisioning());
    assert!(!host.wifi.provisioning_pending());
    assert!(!host.wifi.has_credentials());
    assert_eq!(host.wifi.mode(), WifiMode::Normal);

    inject(&mut host, &sched, RadioEvent::StateChanged(LinkStatus::Connected));
    assert_eq!(host.count(WifiNotice::Provisioned), 1);

    advance(&sched, &mut host, 5000);
    assert_eq!(host.wifi.radio().connects(), 4);
}

#[test]
fn provision_info_via_poll_connects_within_one_poll() {
    let (mut host, sched) = make_host(WifiMode::Provisioning);
    host.wifi
        .radio_mut()
        .push(provision_info("homenet", "hunter2hunter2", 2, true));
    advance(&sched, &mut host, 50);
    assert_eq!(host.wifi.radio().connects(), 1);
}

#[test]
fn failed_or_invalid_provision_info_is_ignored() {
    let (mut host, sched) = make_host(WifiMode::Provisioning);
    let soft_ap = host.wifi.timer_ids().unwrap()[2];

    inject(&mut host, &sched, provision_info("homenet", "hunter2hunter2", 2, false));
    inject(&mut host, &sched, provision_info("homenet", "short", 2, true));
    inject(&mut host, &sched, provision_info("homenet", "hunter2hunter2", 9, true));

    assert!(!host.wifi.provisioning_pending());
    assert!(!sched.is_active(soft_ap));
}

// ── Time and commands ────────────────────────────────────────

#[test]
fn system_time_reports_clock_only_with_nonzero_year() {
    use sensornode::app::events::SystemTimeFields;

    let (mut host, sched) = make_host(WifiMode::Normal);
    inject(&mut host, &sched, RadioEvent::SystemTime(SystemTimeFields::default()));
    assert!(host.notices.is_empty());

    let fields = SystemTimeFields {
        year: 2024,
        month: 3,
        day: 1,
        hour: 12,
        minute: 30,
        second: 5,
    };
    inject(&mut host, &sched, RadioEvent::SystemTime(fields));
    assert_eq!(host.notices, vec![WifiNotice::ClockSynced(1_709_296_205)]);
}

#[test]
fn ntp_task_requests_time_periodically() {
    let (mut host, sched) = make_host(WifiMode::Normal);
    advance(&sched, &mut host, 32_000);
    assert_eq!(host.wifi.radio().count(|c| *c == RadioCall::RequestTime), 1);
}

#[test]
fn connect_new_without_credentials_is_rejected() {
    let (mut host, _sched) = make_host(WifiMode::Normal);
    assert!(host.wifi.connect(CredentialSource::New).is_err());
    assert_eq!(host.wifi.radio().connects(), 0);
}

#[test]
fn rejected_connect_raises_error() {
    let (mut host, _sched) = make_host(WifiMode::Normal);
    host.wifi.radio_mut().reject_connect = true;
    assert!(host.wifi.connect(CredentialSource::Stored).is_err());
    assert!(host.wifi.status().has_error());
}

#[test]
fn disconnect_only_when_associated() {
    let (mut host, sched) = make_host(WifiMode::Normal);
    let _ = host.wifi.disconnect();
    assert_eq!(host.wifi.radio().count(|c| *c == RadioCall::Disconnect), 0);

    link_up(&mut host, &sched);
    host.wifi.disconnect().unwrap();
    assert_eq!(host.wifi.radio().count(|c| *c == RadioCall::Disconnect), 1);
}
