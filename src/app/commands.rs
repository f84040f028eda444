//! Inbound commands to the node.
//!
//! These represent actions requested by the outside world (serial console,
//! cloud) that [`SensorNode`](super::service::SensorNode) interprets and acts
//! upon.

use crate::error::Error;
use crate::wifi::credentials::WifiCredentials;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Replace the station credentials and reconnect with them.
    SetCredentials(WifiCredentials),

    /// Drop the cloud session and retry the link.
    Reconnect,
}

impl AppCommand {
    /// Parse one console line.
    ///
    /// ```text
    /// wifi <ssid>[,<pass>[,<auth>]]
    /// reconnect
    /// ```
    pub fn parse_line(line: &str) -> Result<Self, Error> {
        let line = line.trim();
        let (verb, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match verb {
            "wifi" => Ok(Self::SetCredentials(WifiCredentials::parse_command(args)?)),
            "reconnect" if args.trim().is_empty() => Ok(Self::Reconnect),
            "reconnect" => Err(Error::Command("reconnect takes no arguments")),
            "" => Err(Error::Command("empty line")),
            _ => Err(Error::Command("unknown command")),
        }
    }
}
