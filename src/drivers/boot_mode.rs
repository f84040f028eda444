//! Boot-mode switches.
//!
//! ## Hardware
//!
//! Two active-low momentary switches with pull-ups, SW0 and SW1.  They are
//! only read once, at power-on, so there is no ISR: both pins are sampled
//! `samples` times in a blocking loop spread evenly over `window_ms`, and
//! each switch counts as pressed when it read low in more than half of the
//! samples.
//!
//! ## Mode table
//!
//! | SW0      | SW1      | Mode                                   |
//! |----------|----------|----------------------------------------|
//! | released | any      | Station, credentials stored in radio   |
//! | pressed  | pressed  | Station, built-in credentials          |
//! | pressed  | released | Provisioning access point              |

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::{info, warn};

use crate::app::service::BootMode;
use crate::wifi::status::CredentialSource;

/// Debounced switch levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchReading {
    pub sw0_pressed: bool,
    pub sw1_pressed: bool,
}

/// Map switch levels onto a boot mode.
pub fn select_boot_mode(reading: SwitchReading) -> BootMode {
    match (reading.sw0_pressed, reading.sw1_pressed) {
        (false, _) => BootMode::Station(CredentialSource::Stored),
        (true, true) => BootMode::Station(CredentialSource::New),
        (true, false) => BootMode::Provisioning,
    }
}

/// Majority-sample both switches over `window_ms`.
///
/// A failed read counts as released, so a broken pin falls back to the
/// stored-credentials boot.
pub fn sample_switches<S0, S1, D>(
    sw0: &mut S0,
    sw1: &mut S1,
    delay: &mut D,
    samples: u32,
    window_ms: u32,
) -> SwitchReading
where
    S0: InputPin,
    S1: InputPin,
    D: DelayNs,
{
    let mut low0 = 0u32;
    let mut low1 = 0u32;
    let mut failed = false;
    let window_us = u64::from(window_ms) * 1000;
    let samples = samples.max(1);
    let mut waited_us = 0u64;

    for i in 1..=samples {
        match sw0.is_low() {
            Ok(true) => low0 += 1,
            Ok(false) => {}
            Err(_) => failed = true,
        }
        match sw1.is_low() {
            Ok(true) => low1 += 1,
            Ok(false) => {}
            Err(_) => failed = true,
        }
        // Cumulative target keeps the rounding from drifting.
        let target_us = window_us * u64::from(i) / u64::from(samples);
        delay.delay_us((target_us - waited_us) as u32);
        waited_us = target_us;
    }

    if failed {
        warn!("Boot: switch read error during debounce");
    }

    SwitchReading {
        sw0_pressed: low0 * 2 > samples,
        sw1_pressed: low1 * 2 > samples,
    }
}

/// Sample the switches and pick the boot mode.
pub fn read_boot_mode<S0, S1, D>(
    sw0: &mut S0,
    sw1: &mut S1,
    delay: &mut D,
    samples: u32,
    window_ms: u32,
) -> BootMode
where
    S0: InputPin,
    S1: InputPin,
    D: DelayNs,
{
    let reading = sample_switches(sw0, sw1, delay, samples, window_ms);
    let mode = select_boot_mode(reading);
    info!(
        "Boot: SW0={} SW1={} -> {:?}",
        reading.sw0_pressed, reading.sw1_pressed, mode
    );
    mode
}
