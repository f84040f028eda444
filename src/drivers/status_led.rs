//! Status LED driver.
//!
//! Three discrete LEDs (WiFi, error, cloud) on plain GPIO outputs, active
//! high.  `Blinking` toggles on a shared phase that flips every
//! [`BLINK_DIVIDER`] refreshes, so at the 100 ms data task cadence the
//! LEDs blink at 1 Hz.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{IndicatorState, Led, StatusIndicators};

/// Refreshes per blink half-period.
pub const BLINK_DIVIDER: u8 = 5;

pub struct StatusLeds<W, E, C> {
    wifi: W,
    error: E,
    cloud: C,
    phase_on: bool,
    refreshes: u8,
    current: IndicatorState,
}

impl<W, E, C> StatusLeds<W, E, C>
where
    W: OutputPin,
    E: OutputPin,
    C: OutputPin,
{
    pub fn new(wifi: W, error: E, cloud: C) -> Self {
        Self {
            wifi,
            error,
            cloud,
            phase_on: true,
            refreshes: 0,
            current: IndicatorState::default(),
        }
    }

    /// Last state passed to [`show`](StatusIndicators::show).
    pub fn current(&self) -> IndicatorState {
        self.current
    }

    /// Whether blinking LEDs are lit in the current phase.
    pub fn phase_on(&self) -> bool {
        self.phase_on
    }

    fn advance_phase(&mut self) {
        self.refreshes += 1;
        if self.refreshes >= BLINK_DIVIDER {
            self.refreshes = 0;
            self.phase_on = !self.phase_on;
        }
    }
}

fn drive<P: OutputPin>(pin: &mut P, led: Led, phase_on: bool) {
    let lit = match led {
        Led::Off => false,
        Led::On => true,
        Led::Blinking => phase_on,
    };
    // A failed write leaves the LED as is until the next refresh.
    let _ = if lit { pin.set_high() } else { pin.set_low() };
}

impl<W, E, C> StatusIndicators for StatusLeds<W, E, C>
where
    W: OutputPin,
    E: OutputPin,
    C: OutputPin,
{
    fn show(&mut self, state: &IndicatorState) {
        self.advance_phase();
        drive(&mut self.wifi, state.wifi, self.phase_on);
        drive(&mut self.error, state.error, self.phase_on);
        drive(&mut self.cloud, state.cloud, self.phase_on);
        self.current = *state;
    }
}
