//! Connection status shared with the rest of the firmware.
//!
//! Only [`WifiService`](super::WifiService) writes these; everyone else gets
//! a `Copy` snapshot.

/// Link-level flags read by the orchestrator and the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub(super) has_ap_connection: bool,
    pub(super) has_error: bool,
    pub(super) is_disconnecting: bool,
}

impl ConnectionStatus {
    #[cfg(test)]
    pub(crate) fn with_flags(has_ap_connection: bool, has_error: bool, is_disconnecting: bool) -> Self {
        Self {
            has_ap_connection,
            has_error,
            is_disconnecting,
        }
    }

    /// Associated to an access point.
    pub fn has_ap_connection(&self) -> bool {
        self.has_ap_connection
    }

    /// A radio command failed or the link dropped and did not come back.
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// A disconnect was reported and is waiting out the check-back window.
    pub fn is_disconnecting(&self) -> bool {
        self.is_disconnecting
    }
}

/// Indicator hints owned by the connection manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkIndicators {
    pub(super) searching: bool,
    pub(super) provisioning: bool,
}

impl LinkIndicators {
    #[cfg(test)]
    pub(crate) fn with_flags(searching: bool, provisioning: bool) -> Self {
        Self {
            searching,
            provisioning,
        }
    }

    /// Connecting with built-in credentials, not yet associated.
    pub fn searching(&self) -> bool {
        self.searching
    }

    /// The provisioning access point is up.
    pub fn provisioning(&self) -> bool {
        self.provisioning
    }
}

/// Where the station link is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    /// Connect request accepted by the radio, no answer yet.
    Associating,
    Associated { has_ip: bool },
    /// `pending_confirm` while the check-back timer is armed.
    Disconnected { pending_confirm: bool },
}

/// Operating mode chosen at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    Normal,
    Provisioning,
}

/// Which credentials a connect request should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Whatever the radio has stored from its last association.
    Stored,
    /// The set held by the connection manager.
    New,
}
