use std::fmt;

use serde::{Serialize, Serializer};
use strum::{AsRefStr, EnumString};

use super::binding::InterfaceState;
use super::network_id::NetworkId;

/// Name shown for networks whose controller has not sent a name yet.
pub const UNKNOWN_NAME: &str = "Unknown Name";

/// A joined ZeroTier network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub id: NetworkId,
    pub name: String,
    pub mac: Option<String>,
    pub status: NetworkStatus,
    pub network_type: NetworkType,
    /// Managed addresses in CIDR form.
    pub assigned_addresses: Vec<String>,
    pub routes: Vec<Route>,
    pub mtu: Option<u32>,
    pub dhcp: bool,
    pub bridge: bool,
    pub broadcast_enabled: bool,
    pub allow_default: bool,
    pub allow_global: bool,
    pub allow_managed: bool,
    pub allow_dns: bool,
    /// Host interface carrying the network, e.g. `ztabcdef12`.
    pub port_device_name: Option<String>,
    pub port_error: Option<i32>,
    /// Administrative state of the host interface, reconciled on every poll.
    pub interface: InterfaceState,
}

impl Network {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            UNKNOWN_NAME
        } else {
            &self.name
        }
    }

    /// The current per-network settings as a flag set.
    pub fn flags(&self) -> NetworkFlags {
        NetworkFlags {
            allow_default: Some(self.allow_default),
            allow_global: Some(self.allow_global),
            allow_managed: Some(self.allow_managed),
            allow_dns: Some(self.allow_dns),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub target: String,
    pub via: Option<String>,
}

// ── Wire enums ──────────────────────────────────────────────────────

/// Membership status reported by the daemon.
///
/// Unknown strings are kept verbatim in `Other` so a newer daemon never
/// turns a poll into a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkStatus {
    RequestingConfiguration,
    Ok,
    AccessDenied,
    NotFound,
    PortError,
    ClientTooOld,
    AuthenticationRequired,
    #[strum(default)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkType {
    Private,
    Public,
    #[strum(default)]
    Other(String),
}

macro_rules! wire_enum_text {
    ($($ty:ty),+ $(,)?) => {$(
        impl $ty {
            pub fn as_str(&self) -> &str {
                match self {
                    Self::Other(raw) => raw.as_str(),
                    known => known.as_ref(),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    )+};
}

wire_enum_text!(NetworkStatus, NetworkType);
pub(crate) use wire_enum_text;

// ── Settings ────────────────────────────────────────────────────────

/// Per-network settings a user may toggle. `None` leaves a flag unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkFlags {
    pub allow_default: Option<bool>,
    pub allow_global: Option<bool>,
    pub allow_managed: Option<bool>,
    pub allow_dns: Option<bool>,
}

impl NetworkFlags {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether applying these flags to `network` would change anything.
    pub fn differs_from(&self, network: &Network) -> bool {
        let differs = |wanted: Option<bool>, current: bool| wanted.is_some_and(|w| w != current);
        differs(self.allow_default, network.allow_default)
            || differs(self.allow_global, network.allow_global)
            || differs(self.allow_managed, network.allow_managed)
            || differs(self.allow_dns, network.allow_dns)
    }
}

impl fmt::Display for NetworkFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("allowDefault", self.allow_default),
            ("allowGlobal", self.allow_global),
            ("allowManaged", self.allow_managed),
            ("allowDNS", self.allow_dns),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.map(|v| format!("{name}={}", u8::from(v))))
        .collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn status_round_trips_known_and_unknown() {
        assert_eq!(
            NetworkStatus::from_str("REQUESTING_CONFIGURATION").unwrap(),
            NetworkStatus::RequestingConfiguration
        );
        assert_eq!(NetworkStatus::from_str("OK").unwrap(), NetworkStatus::Ok);
        let odd = NetworkStatus::from_str("SOMETHING_NEW").unwrap();
        assert_eq!(odd, NetworkStatus::Other("SOMETHING_NEW".into()));
        assert_eq!(odd.to_string(), "SOMETHING_NEW");
        assert_eq!(NetworkStatus::PortError.to_string(), "PORT_ERROR");
    }

    #[test]
    fn flags_display_only_set_values() {
        let flags = NetworkFlags {
            allow_dns: Some(true),
            allow_default: Some(false),
            ..Default::default()
        };
        assert_eq!(flags.to_string(), "allowDefault=0,allowDNS=1");
        assert!(NetworkFlags::default().is_empty());
    }
}
