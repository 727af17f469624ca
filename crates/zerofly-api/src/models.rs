// Local service API response types
//
// Models for the ZeroTier One daemon's JSON API. Field presence varies between
// daemon releases, so everything that is not an identifier carries
// `#[serde(default)]`. Identifiers are kept as raw strings here; validation
// happens when `zerofly-core` converts them into domain types.

use serde::{Deserialize, Serialize};

// ── Node ─────────────────────────────────────────────────────────────

/// `GET /status`: the local node's identity and connectivity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// 10-hex-digit node address.
    pub address: String,
    #[serde(default)]
    pub public_identity: Option<String>,
    /// Whether the node can reach the root servers.
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tcp_fallback_active: bool,
    /// Daemon wall clock, milliseconds since epoch.
    #[serde(default)]
    pub clock: Option<i64>,
    #[serde(default)]
    pub config: Option<NodeConfig>,
    /// Catch-all for fields we do not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(default)]
    pub settings: Option<NodeSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSettings {
    #[serde(default)]
    pub primary_port: Option<u16>,
}

// ── Network ──────────────────────────────────────────────────────────

/// One entry of `GET /network` (and the body of `GET /network/{id}`).
///
/// The daemon sends the network id twice, as `id` and as `nwid`. Both are
/// modelled so neither key trips a duplicate-field error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nwid: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mac: Option<String>,
    /// `OK`, `REQUESTING_CONFIGURATION`, `ACCESS_DENIED`, `NOT_FOUND`, ...
    #[serde(default)]
    pub status: Option<String>,
    /// `PRIVATE` or `PUBLIC`.
    #[serde(default, rename = "type")]
    pub network_type: Option<String>,
    #[serde(default)]
    pub assigned_addresses: Vec<String>,
    #[serde(default)]
    pub routes: Vec<RouteInfo>,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub dhcp: bool,
    #[serde(default)]
    pub bridge: bool,
    #[serde(default)]
    pub broadcast_enabled: bool,
    #[serde(default)]
    pub allow_default: bool,
    #[serde(default)]
    pub allow_global: bool,
    #[serde(default)]
    pub allow_managed: bool,
    #[serde(default, rename = "allowDNS")]
    pub allow_dns: bool,
    /// Host interface carrying this network, e.g. `ztabcdef12`.
    #[serde(default)]
    pub port_device_name: Option<String>,
    #[serde(default)]
    pub port_error: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub target: String,
    #[serde(default)]
    pub via: Option<String>,
}

/// Body for `POST /network/{id}` when changing per-network settings.
///
/// Unset fields are omitted so the daemon leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_global: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_managed: Option<bool>,
    #[serde(rename = "allowDNS", skip_serializing_if = "Option::is_none")]
    pub allow_dns: Option<bool>,
}

impl NetworkConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── Peer ─────────────────────────────────────────────────────────────

/// One entry of `GET /peer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub address: String,
    /// `LEAF`, `MOON`, `PLANET`.
    #[serde(default)]
    pub role: Option<String>,
    /// Milliseconds; negative when unknown.
    #[serde(default)]
    pub latency: Option<i64>,
    /// `-1.-1.-1` when the peer has not reported a version.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: Vec<PathInfo>,
}

/// A physical path to a peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathInfo {
    /// `ip/port`.
    pub address: String,
    #[serde(default)]
    pub local_socket: Option<i64>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub expired: bool,
    #[serde(default)]
    pub preferred: bool,
    #[serde(default)]
    pub last_send: Option<i64>,
    #[serde(default)]
    pub last_receive: Option<i64>,
    #[serde(default)]
    pub trusted_path_id: Option<u64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn network_accepts_both_id_keys() {
        let raw = json!({
            "id": "abcdef0123456789",
            "nwid": "abcdef0123456789",
            "name": "lab",
            "status": "OK",
            "type": "PRIVATE",
            "assignedAddresses": ["10.147.17.4/24"],
            "routes": [{ "target": "10.147.17.0/24", "via": null }],
            "allowDNS": true,
            "portDeviceName": "ztabcdef12"
        });
        let net: NetworkInfo = serde_json::from_value(raw).unwrap();
        assert_eq!(net.id, "abcdef0123456789");
        assert_eq!(net.nwid.as_deref(), Some("abcdef0123456789"));
        assert!(net.allow_dns);
        assert!(!net.allow_default);
        assert_eq!(net.network_type.as_deref(), Some("PRIVATE"));
        assert_eq!(net.routes[0].via, None);
    }

    #[test]
    fn config_update_omits_unset_flags() {
        let update = NetworkConfigUpdate {
            allow_dns: Some(false),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "allowDNS": false }));
        assert!(NetworkConfigUpdate::default().is_empty());
    }

    #[test]
    fn status_keeps_unknown_fields() {
        let raw = json!({
            "address": "89e92ceee5",
            "online": true,
            "version": "1.14.0",
            "planetWorldId": 149_604_618
        });
        let status: NodeStatus = serde_json::from_value(raw).unwrap();
        assert!(status.online);
        assert!(status.extra.contains_key("planetWorldId"));
    }
}
