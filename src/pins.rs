//! GPIO pin assignments for the SensorNode board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Boot-mode switches (active-low with pull-ups)
// ---------------------------------------------------------------------------

/// SW0: held at power-on to leave stored-credentials mode.
pub const SW0_GPIO: i32 = 4;
/// SW1: with SW0, selects the built-in station network.
pub const SW1_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Status LEDs (active high)
// ---------------------------------------------------------------------------

pub const LED_WIFI_GPIO: i32 = 11;
pub const LED_ERROR_GPIO: i32 = 12;
pub const LED_CLOUD_GPIO: i32 = 13;
