use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use strum::{AsRefStr, EnumString};

use super::network::wire_enum_text;

/// Another node this node talks to. Replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub address: String,
    pub role: PeerRole,
    /// Round-trip latency in milliseconds, `None` when unmeasured.
    pub latency: Option<u32>,
    /// `None` when the peer has not announced a version.
    pub version: Option<String>,
    /// In the order the daemon reports them.
    pub paths: Vec<Path>,
}

impl Peer {
    pub fn preferred_path(&self) -> Option<&Path> {
        self.paths
            .iter()
            .find(|p| p.preferred && p.active)
            .or_else(|| self.paths.iter().find(|p| p.active))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerRole {
    Leaf,
    Moon,
    Planet,
    #[strum(default)]
    Other(String),
}

wire_enum_text!(PeerRole);

/// A concrete transport route to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Path {
    /// Remote socket, `ip/port`.
    pub address: String,
    /// Daemon-local socket handle the path is bound to.
    pub local_socket: Option<i64>,
    pub active: bool,
    pub expired: bool,
    pub preferred: bool,
    pub last_send: Option<DateTime<Utc>>,
    pub last_receive: Option<DateTime<Utc>>,
    pub trusted: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn path(address: &str, active: bool, preferred: bool) -> Path {
        Path {
            address: address.into(),
            local_socket: None,
            active,
            expired: false,
            preferred,
            last_send: None,
            last_receive: None,
            trusted: false,
        }
    }

    #[test]
    fn role_parses_wire_strings() {
        assert_eq!(PeerRole::from_str("PLANET").unwrap(), PeerRole::Planet);
        assert_eq!(PeerRole::from_str("LEAF").unwrap().to_string(), "LEAF");
        assert_eq!(
            PeerRole::from_str("ROOT").unwrap(),
            PeerRole::Other("ROOT".into())
        );
    }

    #[test]
    fn preferred_path_falls_back_to_first_active() {
        let mut peer = Peer {
            address: "62f865ae71".into(),
            role: PeerRole::Leaf,
            latency: Some(12),
            version: None,
            paths: vec![
                path("10.0.0.1/9993", false, true),
                path("192.168.1.5/9993", true, false),
            ],
        };
        assert_eq!(peer.preferred_path().unwrap().address, "192.168.1.5/9993");

        peer.paths[0].active = true;
        assert_eq!(peer.preferred_path().unwrap().address, "10.0.0.1/9993");
    }
}
