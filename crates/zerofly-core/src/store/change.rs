// ── Change descriptions ──
//
// What a single store mutation did, in a form cheap enough to broadcast to
// every subscriber.

use serde::Serialize;

use crate::model::{DaemonHealth, NetworkId, ServiceUnitState};

/// One entity-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change<K> {
    Added { key: K },
    Removed { key: K },
    Updated { key: K, fields: Vec<&'static str> },
}

impl<K> Change<K> {
    pub fn key(&self) -> &K {
        match self {
            Self::Added { key } | Self::Removed { key } | Self::Updated { key, .. } => key,
        }
    }
}

/// Everything one store mutation changed. Empty sets are never broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Keyed by node address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<Change<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<Change<NetworkId>>,
    /// Keyed by peer address.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<Change<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Change<NetworkId>>,
    /// New health, when it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<DaemonHealth>,
    /// New service unit state, when it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceUnitState>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.node.is_none()
            && self.networks.is_empty()
            && self.peers.is_empty()
            && self.bindings.is_empty()
            && self.health.is_none()
            && self.service.is_none()
    }

    pub(crate) fn merge(&mut self, other: Self) {
        if other.node.is_some() {
            self.node = other.node;
        }
        self.networks.extend(other.networks);
        self.peers.extend(other.peers);
        self.bindings.extend(other.bindings);
        if other.health.is_some() {
            self.health = other.health;
        }
        if other.service.is_some() {
            self.service = other.service;
        }
    }

    /// Number of entity-level changes (health/service transitions excluded).
    pub fn len(&self) -> usize {
        usize::from(self.node.is_some())
            + self.networks.len()
            + self.peers.len()
            + self.bindings.len()
    }
}

/// Names of the listed fields whose values differ between `$old` and `$new`.
macro_rules! changed_fields {
    ($old:expr, $new:expr; $($field:ident),+ $(,)?) => {{
        let mut fields: Vec<&'static str> = Vec::new();
        $(
            if $old.$field != $new.$field {
                fields.push(stringify!($field));
            }
        )+
        fields
    }};
}

pub(crate) use changed_fields;
