//! Integration tests for the SensorNode → WifiService → ports pipeline.
//!
//! The node runs on a real scheduler at the firmware tick rate; radio
//! events are queued on the mock radio and picked up by the poll task.

use heapless::String;

use sensornode::adapters::console;
use sensornode::app::commands::AppCommand;
use sensornode::app::events::{LinkStatus, RadioEvent, SystemTimeFields};
use sensornode::app::ports::{IndicatorState, Led};
use sensornode::app::service::{BootMode, DeviceId, SensorNode};
use sensornode::config::NodeConfig;
use sensornode::scheduler::Scheduler;
use sensornode::wifi::credentials::WifiCredentials;
use sensornode::wifi::status::CredentialSource;

use crate::mock_hw::{advance, step, MockClock, MockCloud, MockLeds, MockRadio, RadioCall};

type Node = SensorNode<MockRadio, MockCloud, MockClock, MockLeds>;

const T0: i64 = 1_700_000_000;

fn make_node(boot: BootMode) -> (Node, Scheduler<Node>) {
    let config = NodeConfig::default();
    let sched = Scheduler::new(config.tick_ms);
    let mut node = SensorNode::new(
        MockRadio::new(),
        MockCloud::default(),
        MockClock::at(T0),
        MockLeds::default(),
        config,
        DeviceId::try_from("0123DEADBEEFCAFEEE").unwrap(),
    );
    node.start(&sched, boot).unwrap();
    (node, sched)
}

/// Step until `done` holds, failing after `max_ticks`.
fn run_until(sched: &Scheduler<Node>, node: &mut Node, max_ticks: u32, done: impl Fn(&Node) -> bool) {
    for _ in 0..max_ticks {
        if done(node) {
            return;
        }
        step(sched, node);
    }
    assert!(done(node), "condition not reached within {} ticks", max_ticks);
}

fn run_data_ticks(sched: &Scheduler<Node>, node: &mut Node, n: u64) {
    let target = node.tick_count() + n;
    run_until(sched, node, 10_000, |nd| nd.tick_count() >= target);
}

// ── Boot ─────────────────────────────────────────────────────

#[test]
fn station_boot_connects_with_stored_credentials() {
    let (mut node, _sched) = make_node(BootMode::Station(CredentialSource::Stored));
    let radio = node.radio_mut();
    assert_eq!(radio.calls[0], RadioCall::Init);
    assert!(radio.calls.contains(&RadioCall::ConnectDefault));
    assert_eq!(radio.connects(), 0);
    assert_eq!(node.cloud().device_id.as_deref(), Some("0123DEADBEEFCAFEEE"));
    assert!(node.data_timer().is_some());
}

#[test]
fn station_boot_with_built_in_network_blinks_until_associated() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::New));
    assert_eq!(node.radio_mut().last_connect_ssid(), Some("sensornode-lab"));

    run_data_ticks(&sched, &mut node, 1);
    assert_eq!(node.leds().last().unwrap().cloud, Led::Blinking);

    node.radio_mut().push_link_up();
    run_data_ticks(&sched, &mut node, 2);
    let leds = node.leds().last().unwrap();
    assert_eq!(leds.cloud, Led::On);
    assert_eq!(leds.wifi, Led::On);
}

#[test]
fn provisioning_boot_defers_cloud_until_provisioned() {
    let (mut node, sched) = make_node(BootMode::Provisioning);
    assert!(node.data_timer().is_none());
    assert!(node.cloud().device_id.is_none());
    assert!(node.radio_mut().calls.contains(&RadioCall::StartProvisioning {
        name: "SensorNode".into(),
        domain: "SensorNode".into(),
    }));

    node.radio_mut().push(RadioEvent::ProvisionInfo {
        ssid: String::try_from("homenet").unwrap(),
        password: String::try_from("hunter2hunter2").unwrap(),
        auth: 2,
        success: true,
    });
    advance(&sched, &mut node, 100);
    assert_eq!(node.radio_mut().last_connect_ssid(), Some("homenet"));
    assert!(node.data_timer().is_none());

    node.radio_mut().push_link_up();
    run_until(&sched, &mut node, 100, |n| n.data_timer().is_some());
    assert!(node.cloud().device_id.is_some());
    assert!(sched.is_active(node.data_timer().unwrap()));

    run_data_ticks(&sched, &mut node, 1);
    let leds = node.leds().last().unwrap();
    assert_eq!(leds.wifi, Led::On);
    assert_eq!(leds.cloud, Led::On);
}

// ── Telemetry pacing ─────────────────────────────────────────

#[test]
fn ten_ticks_after_link_up_publish_once_and_advance_clock() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.radio_mut().push_link_up();

    run_data_ticks(&sched, &mut node, 10);

    assert!(node.wifi_status().has_ap_connection());
    assert_eq!(node.cloud().published, vec![T0 + 1]);
    assert_eq!(node.clock().now, T0 + 1);
    assert_eq!(node.clock().sets, vec![T0 + 1]);
    assert_eq!(node.send_counter(), 0);
}

#[test]
fn send_counter_restarts_when_cloud_drops() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.radio_mut().push_link_up();

    run_data_ticks(&sched, &mut node, 4);
    assert_eq!(node.send_counter(), 4);

    node.cloud_mut().forced = Some(false);
    run_data_ticks(&sched, &mut node, 1);
    assert_eq!(node.send_counter(), 0);

    node.cloud_mut().forced = None;
    let recovered_at = node.tick_count();
    run_until(&sched, &mut node, 10_000, |n| !n.cloud().published.is_empty());
    assert_eq!(node.tick_count(), recovered_at + 10);
    assert_eq!(node.cloud().published.len(), 1);
}

#[test]
fn no_publish_without_link() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    run_data_ticks(&sched, &mut node, 30);
    assert!(node.cloud().published.is_empty());
    assert_eq!(node.send_counter(), 0);
    assert_eq!(node.leds().last().unwrap(), IndicatorState::default());
}

// ── Link loss ────────────────────────────────────────────────

#[test]
fn confirmed_link_loss_resets_cloud_and_reconnects() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.radio_mut().push_link_up();
    run_data_ticks(&sched, &mut node, 3);
    assert!(node.cloud().connected);

    node.radio_mut()
        .push(RadioEvent::StateChanged(LinkStatus::Disconnected));
    run_until(&sched, &mut node, 100, |n| n.wifi_status().has_error());

    assert!(!node.wifi_status().has_ap_connection());
    assert_eq!(node.cloud().resets, 1);
    assert_eq!(
        node.radio_mut().count(|c| *c == RadioCall::ConnectDefault),
        2
    );

    run_data_ticks(&sched, &mut node, 1);
    let leds = node.leds().last().unwrap();
    assert_eq!(leds.error, Led::On);
    assert_eq!(leds.wifi, Led::Off);
    assert_eq!(leds.cloud, Led::Off);

    node.radio_mut().push_link_up();
    run_until(&sched, &mut node, 100, |n| !n.wifi_status().has_error());
    run_data_ticks(&sched, &mut node, 1);
    assert!(node.cloud().connected);
}

#[test]
fn brief_dropout_keeps_cloud_session() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.radio_mut().push_link_up();
    run_data_ticks(&sched, &mut node, 2);

    node.radio_mut()
        .push(RadioEvent::StateChanged(LinkStatus::Disconnected));
    node.radio_mut().push(RadioEvent::DhcpConfigured);
    run_data_ticks(&sched, &mut node, 5);

    assert!(!node.wifi_status().has_error());
    assert_eq!(node.cloud().resets, 0);
}

#[test]
fn dhcp_on_the_check_back_tick_keeps_link() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.radio_mut().push_link_up();
    run_until(&sched, &mut node, 100, |_| sched.now() == 192);
    assert!(node.wifi_status().has_ap_connection());

    // The poll runs exactly on its due time at 200; check-back and the
    // next poll then share due time 250 and are promoted together at 256.
    node.radio_mut()
        .push(RadioEvent::StateChanged(LinkStatus::Disconnected));
    step(&sched, &mut node);
    assert_eq!(sched.now(), 200);
    assert!(node.wifi_status().is_disconnecting());

    run_until(&sched, &mut node, 100, |_| sched.now() == 248);
    node.radio_mut().push(RadioEvent::DhcpConfigured);

    let mut saw_error = false;
    while sched.now() != 400 {
        step(&sched, &mut node);
        saw_error |= node.wifi_status().has_error();
    }
    assert!(!saw_error);
    assert!(!node.wifi_status().is_disconnecting());
    assert!(node.wifi_status().has_ap_connection());
    assert_eq!(node.cloud().resets, 0);
}

// ── Clock ────────────────────────────────────────────────────

#[test]
fn radio_time_commits_to_clock() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.radio_mut().push(RadioEvent::SystemTime(SystemTimeFields {
        year: 2024,
        month: 3,
        day: 1,
        hour: 12,
        minute: 30,
        second: 5,
    }));
    node.radio_mut()
        .push(RadioEvent::SystemTime(SystemTimeFields::default()));
    advance(&sched, &mut node, 100);
    assert_eq!(node.clock().sets, vec![1_709_296_205]);
}

// ── Commands ─────────────────────────────────────────────────

#[test]
fn set_credentials_while_up_disconnects_then_uses_new_set() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.radio_mut().push_link_up();
    run_data_ticks(&sched, &mut node, 2);

    let creds = WifiCredentials::parse_command("office,correct-horse").unwrap();
    node.handle_command(AppCommand::SetCredentials(creds));
    assert_eq!(node.cloud().resets, 1);
    assert_eq!(node.radio_mut().count(|c| *c == RadioCall::Disconnect), 1);

    node.radio_mut()
        .push(RadioEvent::StateChanged(LinkStatus::Disconnected));
    run_until(&sched, &mut node, 100, |n| n.wifi_status().has_error());
    assert_eq!(node.radio_mut().last_connect_ssid(), Some("office"));
}

#[test]
fn rejected_disconnect_keeps_new_credentials_for_next_drop() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.radio_mut().push_link_up();
    run_data_ticks(&sched, &mut node, 1);
    node.radio_mut().reject_disconnect = true;

    let creds = WifiCredentials::parse_command("office,correct-horse").unwrap();
    node.handle_command(AppCommand::SetCredentials(creds));
    assert_eq!(node.radio_mut().count(|c| *c == RadioCall::Disconnect), 1);
    assert!(node.wifi_status().has_ap_connection());
    assert!(node.wifi_service().has_credentials());

    node.radio_mut()
        .push(RadioEvent::StateChanged(LinkStatus::Disconnected));
    run_until(&sched, &mut node, 100, |n| n.wifi_status().has_error());
    assert_eq!(node.radio_mut().last_connect_ssid(), Some("office"));
}

#[test]
fn set_credentials_while_down_connects_immediately() {
    let (mut node, _sched) = make_node(BootMode::Station(CredentialSource::Stored));
    let creds = WifiCredentials::parse_command("guest").unwrap();
    node.handle_command(AppCommand::SetCredentials(creds));
    assert_eq!(node.radio_mut().last_connect_ssid(), Some("guest"));
    assert_eq!(node.radio_mut().count(|c| *c == RadioCall::Disconnect), 0);
}

#[test]
fn reconnect_command_resets_cloud_and_retries_when_down() {
    let (mut node, _sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.handle_command(AppCommand::Reconnect);
    assert_eq!(node.cloud().resets, 1);
    assert_eq!(
        node.radio_mut().count(|c| *c == RadioCall::ConnectDefault),
        2
    );
}

#[test]
fn reconnect_command_keeps_live_link() {
    let (mut node, sched) = make_node(BootMode::Station(CredentialSource::Stored));
    node.radio_mut().push_link_up();
    run_data_ticks(&sched, &mut node, 1);

    node.handle_command(AppCommand::Reconnect);
    assert_eq!(node.cloud().resets, 1);
    assert!(!node.cloud().connected);
    assert_eq!(
        node.radio_mut().count(|c| *c == RadioCall::ConnectDefault),
        1
    );

    // The session comes back on the next data task run.
    run_data_ticks(&sched, &mut node, 1);
    assert!(node.cloud().connected);
}

#[test]
fn console_line_reaches_the_node() {
    let (mut node, _sched) = make_node(BootMode::Station(CredentialSource::Stored));
    console::submit_line("wifi guest\n").unwrap();
    while let Some(cmd) = console::take_command() {
        node.handle_command(cmd);
    }
    assert_eq!(node.radio_mut().last_connect_ssid(), Some("guest"));
}
