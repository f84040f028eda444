//! Unified error types for the SensorNode firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! bring-up and command paths uniform.  All variants are `Copy` so they can
//! be handed through scheduler callbacks and radio event handlers without
//! allocation.  Nothing in here is fatal: failures end up as a `Result`
//! the caller checks, or as the `has_error` status flag.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A scheduler operation was rejected.
    Timer(TimerError),
    /// The radio refused a command.
    Radio(RadioError),
    /// WiFi credentials failed validation.
    Credentials(CredentialError),
    /// The radio reported a timestamp that cannot be a real date.
    TimestampInvalid,
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// A console line named no known command.
    Command(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Credentials(e) => write!(f, "credentials: {e}"),
            Self::TimestampInvalid => write!(f, "invalid timestamp"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Command(msg) => write!(f, "command: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Scheduler errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Period is zero or exceeds [`MAX_PERIOD_MS`](crate::scheduler::MAX_PERIOD_MS).
    InvalidPeriod,
    /// The handle does not name a registered timer.
    UnknownTimer,
    /// All timer slots are taken.
    NoFreeSlot,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPeriod => write!(f, "invalid timer period"),
            Self::UnknownTimer => write!(f, "unknown timer"),
            Self::NoFreeSlot => write!(f, "no free timer slot"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The radio rejected the request with the given driver code.
    Rejected(i8),
    /// A connect with new credentials was requested but none are stored.
    NoCredentials,
    /// The connection manager has not been initialised yet.
    NotInitialised,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(code) => write!(f, "command rejected (code {code})"),
            Self::NoCredentials => write!(f, "no WiFi credentials stored"),
            Self::NotInitialised => write!(f, "WiFi not initialised"),
        }
    }
}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

// ---------------------------------------------------------------------------
// Credential errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    InvalidSsid,
    InvalidPassphrase,
    UnsupportedAuth,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassphrase => {
                write!(f, "passphrase invalid (8-63 bytes for PSK, empty for open)")
            }
            Self::UnsupportedAuth => write!(f, "unsupported authentication type"),
        }
    }
}

impl From<CredentialError> for Error {
    fn from(e: CredentialError) -> Self {
        Self::Credentials(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
