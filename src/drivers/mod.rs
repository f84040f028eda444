//! Tick source, boot switches and status LEDs.

pub mod boot_mode;
pub mod hw_timer;
pub mod status_led;
