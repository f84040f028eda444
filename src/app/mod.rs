//! Application core: pure domain logic, zero I/O.
//!
//! [`service::SensorNode`] wires the connection manager, the cloud session
//! and the telemetry cadence together.  All interaction with hardware
//! happens through the **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
