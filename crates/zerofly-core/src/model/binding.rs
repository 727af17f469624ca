use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumString};

use super::network::NetworkStatus;
use super::network_id::NetworkId;

/// Administrative state of a host network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterfaceState {
    Up,
    Down,
    /// The daemon could not create or attach the interface.
    PortError,
    Unknown,
}

impl InterfaceState {
    pub fn from_up(up: bool) -> Self {
        if up { Self::Up } else { Self::Down }
    }

    /// Decide a network's interface state from the daemon's view and the
    /// host's view. A daemon-side port error always wins; otherwise the host
    /// is authoritative when it knows the interface.
    pub fn reconcile(status: &NetworkStatus, host: Option<Self>) -> Self {
        if *status == NetworkStatus::PortError {
            return Self::PortError;
        }
        host.unwrap_or(Self::Unknown)
    }
}

/// Association between a joined network and its host interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceBinding {
    pub network_id: NetworkId,
    pub interface: String,
    pub state: InterfaceState,
    /// When `state` was last confirmed against the host.
    pub verified_at: DateTime<Utc>,
}
