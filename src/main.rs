//! SensorNode firmware: main entry point
//!
//! Hexagonal architecture around a cooperative timer scheduler.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  StationRadio     LogCloudClient   Esp32Clock   EfuseIdentity  │
//! │  (RadioDriver)    (CloudClient)    (Clock)      (Identity)     │
//! │  StatusLeds       boot switches                                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            SensorNode (pure logic)                     │    │
//! │  │  WifiService · data task · indicators                  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (esp_timer tick → due queue → super-loop)           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Delay, FreeRtos};
use esp_idf_svc::hal::gpio::{AnyIOPin, Output, PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::{info, warn};

use sensornode::adapters::cloud::LogCloudClient;
use sensornode::adapters::console;
use sensornode::adapters::device_id::{resolve_device_id, EfuseIdentity};
use sensornode::adapters::radio::StationRadio;
use sensornode::adapters::time::Esp32Clock;
use sensornode::app::service::SensorNode;
use sensornode::config::NodeConfig;
use sensornode::drivers::{boot_mode, hw_timer, status_led::StatusLeds};
use sensornode::pins;
use sensornode::scheduler::Scheduler;

type LedPin = PinDriver<'static, AnyIOPin, Output>;
type Node = SensorNode<StationRadio, LogCloudClient, Esp32Clock, StatusLeds<LedPin, LedPin, LedPin>>;

/// JSON override baked in at build time, e.g.
/// `SENSORNODE_CONFIG_JSON="$(cat node.json)" cargo build`.
const CONFIG_OVERRIDE: Option<&str> = option_env!("SENSORNODE_CONFIG_JSON");

fn load_config() -> Result<NodeConfig> {
    let config = match CONFIG_OVERRIDE {
        Some(json) => {
            info!("Config: using build-time JSON override");
            NodeConfig::from_json(json.as_bytes())?
        }
        None => NodeConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn led_pin(gpio: i32) -> Result<LedPin> {
    // SAFETY: each GPIO number in `pins` is claimed exactly once, here.
    let pin = unsafe { AnyIOPin::new(gpio) };
    Ok(PinDriver::output(pin)?)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SensorNode v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config()?;

    // ── 2. Network stack ──────────────────────────────────────
    // EspWifi brings up netif, NVS-backed WiFi storage and esp_wifi_init;
    // StationRadio drives the station through the raw esp_wifi API.
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let wifi = EspWifi::new(peripherals.modem, sysloop, Some(nvs))?;

    // ── 3. Boot mode ──────────────────────────────────────────
    // SAFETY: the switch GPIOs are claimed once, here.
    let mut sw0 = PinDriver::input(unsafe { AnyIOPin::new(pins::SW0_GPIO) })?;
    let mut sw1 = PinDriver::input(unsafe { AnyIOPin::new(pins::SW1_GPIO) })?;
    sw0.set_pull(Pull::Up)?;
    sw1.set_pull(Pull::Up)?;
    let boot = boot_mode::read_boot_mode(
        &mut sw0,
        &mut sw1,
        &mut Delay::new_default(),
        config.debounce_samples,
        config.debounce_window_ms,
    );
    drop((sw0, sw1));

    // ── 4. Device identity ────────────────────────────────────
    let device_id = resolve_device_id(&mut EfuseIdentity);
    info!("Device ID: {}", device_id);

    // ── 5. Construct the node ─────────────────────────────────
    let leds = StatusLeds::new(
        led_pin(pins::LED_WIFI_GPIO)?,
        led_pin(pins::LED_ERROR_GPIO)?,
        led_pin(pins::LED_CLOUD_GPIO)?,
    );
    let sched: &'static Scheduler<Node> = Box::leak(Box::new(Scheduler::new(config.tick_ms)));
    let mut node: Node = SensorNode::new(
        StationRadio::new(),
        LogCloudClient::new(),
        Esp32Clock::new(),
        leds,
        config,
        device_id,
    );

    node.start(sched, boot)?;
    hw_timer::start_tick(sched)?;
    if let Err(e) = console::spawn_reader() {
        warn!("Console not started: {}", e);
    }

    info!("System ready. Entering super-loop.");

    // ── 6. Super-loop ─────────────────────────────────────────
    // Callbacks run here, one per pass, in due order.  The tick timer only
    // promotes timers; nothing is executed in interrupt context.  Console
    // commands are applied between callbacks.
    let _wifi = wifi;
    loop {
        if let Some(cmd) = console::take_command() {
            node.handle_command(cmd);
        }
        if !sched.run_next(&mut node) {
            FreeRtos::delay_ms(1);
        }
    }
}
