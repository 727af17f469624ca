// ── API-to-domain type conversions ──
//
// Bridges raw `zerofly_api` response types into canonical
// `zerofly_core::model` types. Identifiers are validated here; a payload that
// does not describe a real node/network/peer becomes `CoreError::Malformed`.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use zerofly_api::{NetworkConfigUpdate, NetworkInfo, NodeStatus, PathInfo, PeerInfo, RouteInfo};

use crate::error::CoreError;
use crate::model::node::fingerprint;
use crate::model::{
    InterfaceState, Network, NetworkFlags, NetworkId, NetworkStatus, NetworkType, Node, Path,
    Peer, PeerRole, Route,
};

/// Version string the daemon reports for peers that never announced one.
const UNKNOWN_PEER_VERSION: &str = "-1.-1.-1";

// ── Helpers ────────────────────────────────────────────────────────

fn malformed(message: impl Into<String>) -> CoreError {
    CoreError::Malformed {
        message: message.into(),
    }
}

fn is_node_address(raw: &str) -> bool {
    raw.len() == 10 && raw.chars().all(|c| c.is_ascii_hexdigit())
}

/// Millisecond epoch timestamps; the daemon uses 0 for "never".
fn epoch_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.filter(|&ms| ms > 0)
        .and_then(DateTime::from_timestamp_millis)
}

fn parse_wire<T: FromStr>(raw: Option<&str>, fallback: T) -> T {
    raw.and_then(|s| T::from_str(s).ok()).unwrap_or(fallback)
}

// ── Node ───────────────────────────────────────────────────────────

impl TryFrom<NodeStatus> for Node {
    type Error = CoreError;

    fn try_from(raw: NodeStatus) -> Result<Self, Self::Error> {
        if !is_node_address(&raw.address) {
            return Err(malformed(format!(
                "status reports invalid node address '{}'",
                raw.address
            )));
        }

        Ok(Self {
            address: raw.address.to_ascii_lowercase(),
            public_key_fingerprint: raw.public_identity.as_deref().and_then(fingerprint),
            online: raw.online,
            version: raw.version.filter(|v| !v.is_empty()),
            tcp_fallback: raw.tcp_fallback_active,
            primary_port: raw.config.and_then(|c| c.settings).and_then(|s| s.primary_port),
            clock: epoch_millis(raw.clock),
        })
    }
}

// ── Network ────────────────────────────────────────────────────────

impl From<RouteInfo> for Route {
    fn from(raw: RouteInfo) -> Self {
        Self {
            target: raw.target,
            via: raw.via.filter(|v| !v.is_empty()),
        }
    }
}

impl TryFrom<NetworkInfo> for Network {
    type Error = CoreError;

    fn try_from(raw: NetworkInfo) -> Result<Self, Self::Error> {
        let id = NetworkId::parse(&raw.id)
            .map_err(|_| malformed(format!("network has invalid id '{}'", raw.id)))?;
        if let Some(nwid) = raw.nwid.as_deref() {
            if !nwid.eq_ignore_ascii_case(id.as_str()) {
                return Err(malformed(format!(
                    "network id '{}' disagrees with nwid '{nwid}'",
                    raw.id
                )));
            }
        }

        let status = parse_wire(raw.status.as_deref(), NetworkStatus::RequestingConfiguration);
        let interface = InterfaceState::reconcile(&status, None);

        Ok(Self {
            id,
            name: raw.name,
            mac: raw.mac,
            status,
            network_type: parse_wire(raw.network_type.as_deref(), NetworkType::Private),
            assigned_addresses: raw.assigned_addresses,
            routes: raw.routes.into_iter().map(Route::from).collect(),
            mtu: raw.mtu,
            dhcp: raw.dhcp,
            bridge: raw.bridge,
            broadcast_enabled: raw.broadcast_enabled,
            allow_default: raw.allow_default,
            allow_global: raw.allow_global,
            allow_managed: raw.allow_managed,
            allow_dns: raw.allow_dns,
            port_device_name: raw.port_device_name.filter(|n| !n.is_empty()),
            port_error: raw.port_error.filter(|&e| e != 0),
            interface,
        })
    }
}

impl From<NetworkFlags> for NetworkConfigUpdate {
    fn from(flags: NetworkFlags) -> Self {
        Self {
            allow_default: flags.allow_default,
            allow_global: flags.allow_global,
            allow_managed: flags.allow_managed,
            allow_dns: flags.allow_dns,
        }
    }
}

// ── Peer ───────────────────────────────────────────────────────────

impl From<PathInfo> for Path {
    fn from(raw: PathInfo) -> Self {
        Self {
            address: raw.address,
            local_socket: raw.local_socket,
            active: raw.active,
            expired: raw.expired,
            preferred: raw.preferred,
            last_send: epoch_millis(raw.last_send),
            last_receive: epoch_millis(raw.last_receive),
            trusted: raw.trusted_path_id.is_some_and(|id| id != 0),
        }
    }
}

impl TryFrom<PeerInfo> for Peer {
    type Error = CoreError;

    fn try_from(raw: PeerInfo) -> Result<Self, Self::Error> {
        if !is_node_address(&raw.address) {
            return Err(malformed(format!("peer has invalid address '{}'", raw.address)));
        }

        Ok(Self {
            address: raw.address.to_ascii_lowercase(),
            role: parse_wire(raw.role.as_deref(), PeerRole::Leaf),
            latency: raw.latency.and_then(|l| u32::try_from(l).ok()),
            version: raw
                .version
                .filter(|v| !v.is_empty() && v != UNKNOWN_PEER_VERSION),
            paths: raw.paths.into_iter().map(Path::from).collect(),
        })
    }
}

/// Convert a whole list, failing on the first invalid entry.
pub(crate) fn convert_all<R, T>(raw: Vec<R>) -> Result<Vec<T>, CoreError>
where
    T: TryFrom<R, Error = CoreError>,
{
    raw.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw_network(value: serde_json::Value) -> NetworkInfo {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn network_conversion_normalizes_fields() {
        let raw = raw_network(json!({
            "id": "ABCDEF0123456789",
            "nwid": "abcdef0123456789",
            "name": "",
            "status": "PORT_ERROR",
            "type": "PUBLIC",
            "portDeviceName": "",
            "portError": -1
        }));
        let net = Network::try_from(raw).unwrap();
        assert_eq!(net.id.as_str(), "abcdef0123456789");
        assert_eq!(net.display_name(), "Unknown Name");
        assert_eq!(net.network_type, NetworkType::Public);
        assert_eq!(net.interface, InterfaceState::PortError);
        assert_eq!(net.port_device_name, None);
        assert_eq!(net.port_error, Some(-1));
    }

    #[test]
    fn network_with_bad_id_is_malformed() {
        let raw = raw_network(json!({ "id": "xyz" }));
        assert!(matches!(Network::try_from(raw), Err(CoreError::Malformed { .. })));

        let raw = raw_network(json!({ "id": "abcdef0123456789", "nwid": "1111111111111111" }));
        assert!(matches!(Network::try_from(raw), Err(CoreError::Malformed { .. })));
    }

    #[test]
    fn peer_sentinels_become_none() {
        let raw: PeerInfo = serde_json::from_value(json!({
            "address": "62F865AE71",
            "role": "PLANET",
            "latency": -1,
            "version": "-1.-1.-1",
            "paths": [{
                "address": "50.7.252.138/9993",
                "active": true,
                "lastSend": 0,
                "lastReceive": 1_700_000_000_000_i64,
                "trustedPathId": 0
            }]
        }))
        .unwrap();
        let peer = Peer::try_from(raw).unwrap();
        assert_eq!(peer.address, "62f865ae71");
        assert_eq!(peer.role, PeerRole::Planet);
        assert_eq!(peer.latency, None);
        assert_eq!(peer.version, None);
        assert_eq!(peer.paths[0].last_send, None);
        assert!(peer.paths[0].last_receive.is_some());
        assert!(!peer.paths[0].trusted);
    }

    #[test]
    fn node_conversion_reads_nested_port() {
        let raw: NodeStatus = serde_json::from_value(json!({
            "address": "89e92ceee5",
            "publicIdentity": "89e92ceee5:0:9e4b3a1f0c2d7e8855aa66bb77cc88dd",
            "online": true,
            "version": "1.14.0",
            "clock": 1_700_000_000_000_i64,
            "config": { "settings": { "primaryPort": 9993 } }
        }))
        .unwrap();
        let node = Node::try_from(raw).unwrap();
        assert_eq!(node.primary_port, Some(9993));
        assert_eq!(node.public_key_fingerprint.as_deref(), Some("9e4b:3a1f:0c2d:7e88"));
    }

    #[test]
    fn flags_map_onto_update_body() {
        let update = NetworkConfigUpdate::from(NetworkFlags {
            allow_global: Some(true),
            ..Default::default()
        });
        assert_eq!(update.allow_global, Some(true));
        assert_eq!(update.allow_dns, None);
    }
}
