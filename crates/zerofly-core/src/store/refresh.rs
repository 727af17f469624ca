// ── Refresh and mutation application ──
//
// Applies poll snapshots and command results to the DataStore and reports
// what changed. Only the store writer task calls the mutating methods.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use chrono::Utc;

use super::DataStore;
use super::change::{Change, ChangeSet, changed_fields};
use super::collection::EntityCollection;
use crate::model::{
    DaemonHealth, InterfaceBinding, InterfaceState, Network, NetworkId, Node, Peer,
    ServiceUnitState,
};

/// Everything one poll read from the daemon and the host.
#[derive(Debug, Clone)]
pub(crate) struct RefreshSnapshot {
    pub node: Node,
    pub networks: Vec<Network>,
    pub peers: Vec<Peer>,
    /// Host interface admin states by interface name. `None` when the host
    /// read failed, in which case the last known binding states are kept.
    pub interfaces: Option<HashMap<String, InterfaceState>>,
    pub service: Option<ServiceUnitState>,
}

// ── Field diffs ──────────────────────────────────────────────────────

fn node_fields(old: &Node, new: &Node) -> Vec<&'static str> {
    // `clock` moves on every read and is not a change worth reporting.
    changed_fields!(old, new;
        address, public_key_fingerprint, online, version, tcp_fallback, primary_port)
}

fn network_fields(old: &Network, new: &Network) -> Vec<&'static str> {
    changed_fields!(old, new;
        name, mac, status, network_type, assigned_addresses, routes, mtu, dhcp, bridge,
        broadcast_enabled, allow_default, allow_global, allow_managed, allow_dns,
        port_device_name, port_error, interface)
}

fn peer_fields(old: &Peer, new: &Peer) -> Vec<&'static str> {
    changed_fields!(old, new; role, latency, version, paths)
}

fn binding_fields(old: &InterfaceBinding, new: &InterfaceBinding) -> Vec<&'static str> {
    changed_fields!(old, new; interface, state)
}

/// One entry per key, in first-seen order, holding the last value seen.
fn dedup_by_key<T, K: ToString>(items: Vec<T>, key_of: impl Fn(&T) -> K) -> Vec<(String, T)> {
    let mut position: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut unique: Vec<(String, T)> = Vec::with_capacity(items.len());
    for item in items {
        let raw_key = key_of(&item).to_string();
        match position.get(&raw_key) {
            Some(&at) => unique[at].1 = item,
            None => {
                position.insert(raw_key.clone(), unique.len());
                unique.push((raw_key, item));
            }
        }
    }
    unique
}

/// Upsert all incoming entities, then prune any existing keys not in the
/// incoming set. Publishes once, and only if something actually differs.
fn upsert_and_prune<T, K>(
    collection: &EntityCollection<T>,
    items: Vec<T>,
    key_of: impl Fn(&T) -> K,
    diff: impl Fn(&T, &T) -> Vec<&'static str>,
) -> Vec<Change<K>>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    K: ToString + Eq + Hash,
{
    let mut changes = Vec::new();
    let mut incoming: HashSet<String> = HashSet::with_capacity(items.len());
    let mut dirty = false;

    for (raw_key, item) in dedup_by_key(items, &key_of) {
        let key = key_of(&item);
        match collection.get(&raw_key) {
            None => {
                changes.push(Change::Added { key });
                dirty = true;
            }
            Some(old) if *old != item => {
                let fields = diff(old.as_ref(), &item);
                if !fields.is_empty() {
                    changes.push(Change::Updated { key, fields });
                }
                dirty = true;
            }
            Some(_) => {}
        }
        collection.stage_upsert(raw_key.clone(), item);
        incoming.insert(raw_key);
    }

    for existing in collection.keys() {
        if incoming.contains(&existing) {
            continue;
        }
        if let Some(removed) = collection.stage_remove(&existing) {
            changes.push(Change::Removed {
                key: key_of(&removed),
            });
            dirty = true;
        }
    }

    if dirty {
        collection.publish();
    }
    changes
}

impl DataStore {
    /// Apply a full poll snapshot.
    ///
    /// Afterwards the model holds exactly the node, networks, and peers in
    /// `snap`; anything absent from it is removed. Network interface states
    /// are reconciled against the host view and bindings are re-derived.
    pub(crate) fn apply_snapshot(&self, snap: RefreshSnapshot) -> ChangeSet {
        let now = Utc::now();
        let mut changes = ChangeSet {
            node: self.replace_node(snap.node),
            ..ChangeSet::default()
        };

        let host_state = |network: &Network| -> Option<InterfaceState> {
            let name = network.port_device_name.as_deref()?;
            match &snap.interfaces {
                Some(map) => map.get(name).copied(),
                None => self.bindings.get(network.id.as_str()).map(|b| b.state),
            }
        };

        let networks: Vec<Network> = snap
            .networks
            .into_iter()
            .map(|mut n| {
                n.interface = InterfaceState::reconcile(&n.status, host_state(&n));
                n
            })
            .collect();

        let bindings: Vec<InterfaceBinding> = networks
            .iter()
            .filter_map(|n| {
                let interface = n.port_device_name.clone()?;
                let verified_at = match (&snap.interfaces, self.bindings.get(n.id.as_str())) {
                    (None, Some(previous)) => previous.verified_at,
                    _ => now,
                };
                Some(InterfaceBinding {
                    network_id: n.id.clone(),
                    interface,
                    state: n.interface,
                    verified_at,
                })
            })
            .collect();

        changes.networks =
            upsert_and_prune(&self.networks, networks, |n| n.id.clone(), network_fields);
        changes.bindings = upsert_and_prune(
            &self.bindings,
            bindings,
            |b| b.network_id.clone(),
            binding_fields,
        );
        changes.peers = upsert_and_prune(
            &self.peers,
            snap.peers,
            |p| p.address.clone(),
            peer_fields,
        );

        changes.health = self.set_health(DaemonHealth::Online);
        if let Some(service) = snap.service {
            changes.service = self.replace_service(service);
        }
        self.refreshed_at.send_replace(Some(now));

        self.publish_model();
        changes
    }

    /// The daemon stopped answering: mark the node offline, keep networks
    /// and peers as last seen.
    pub(crate) fn mark_unreachable(&self, reason: String) -> ChangeSet {
        let mut changes = ChangeSet::default();

        if let Some(node) = self.node().filter(|n| n.online) {
            let mut offline = (*node).clone();
            offline.online = false;
            changes.node = self.replace_node(offline);
        }

        let since = match &*self.health.borrow() {
            DaemonHealth::Unreachable { since, .. } => *since,
            _ => Utc::now(),
        };
        changes.health = self.set_health(DaemonHealth::Unreachable { reason, since });

        self.publish_if_changed(&changes);
        changes
    }

    /// The daemon answered but the answer could not be used.
    pub(crate) fn mark_degraded(&self, reason: String) -> ChangeSet {
        let changes = ChangeSet {
            health: self.set_health(DaemonHealth::Degraded { reason }),
            ..ChangeSet::default()
        };
        self.publish_if_changed(&changes);
        changes
    }

    pub(crate) fn set_service_state(&self, state: ServiceUnitState) -> ChangeSet {
        let changes = ChangeSet {
            service: self.replace_service(state),
            ..ChangeSet::default()
        };
        self.publish_if_changed(&changes);
        changes
    }

    /// Insert or replace one network after a confirmed join or settings
    /// change. The interface state carries over from the current binding
    /// until the next poll re-validates it.
    pub(crate) fn upsert_network(&self, mut network: Network) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let key = network.id.to_string();
        let known = self.bindings.get(&key).map(|b| b.state);
        network.interface = InterfaceState::reconcile(&network.status, known);

        match self.networks.get(&key) {
            None => changes.networks.push(Change::Added {
                key: network.id.clone(),
            }),
            Some(old) => {
                let fields = network_fields(&old, &network);
                if !fields.is_empty() {
                    changes.networks.push(Change::Updated {
                        key: network.id.clone(),
                        fields,
                    });
                }
            }
        }

        if let Some(interface) = network.port_device_name.clone() {
            let binding = InterfaceBinding {
                network_id: network.id.clone(),
                interface,
                state: network.interface,
                verified_at: self
                    .bindings
                    .get(&key)
                    .map_or_else(Utc::now, |b| b.verified_at),
            };
            if let Some(change) = self.replace_binding(binding) {
                changes.bindings.push(change);
            }
        }

        self.networks.upsert(key, network);
        self.publish_model();
        changes
    }

    /// Drop a network and its binding after a confirmed leave.
    pub(crate) fn remove_network(&self, id: &NetworkId) -> ChangeSet {
        let mut changes = ChangeSet::default();
        if self.networks.remove(id.as_str()).is_some() {
            changes.networks.push(Change::Removed { key: id.clone() });
        }
        if self.bindings.remove(id.as_str()).is_some() {
            changes.bindings.push(Change::Removed { key: id.clone() });
        }
        self.publish_if_changed(&changes);
        changes
    }

    /// Record a confirmed host interface change.
    pub(crate) fn set_interface_state(&self, id: &NetworkId, state: InterfaceState) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let Some(existing) = self.networks.get(id.as_str()) else {
            return changes;
        };

        if existing.interface != state {
            let mut network = (*existing).clone();
            network.interface = state;
            changes.networks.push(Change::Updated {
                key: id.clone(),
                fields: vec!["interface"],
            });
            self.networks.upsert(id.to_string(), network);
        }

        if let Some(interface) = existing.port_device_name.clone() {
            let binding = InterfaceBinding {
                network_id: id.clone(),
                interface,
                state,
                verified_at: Utc::now(),
            };
            if let Some(change) = self.replace_binding(binding) {
                changes.bindings.push(change);
            }
        }

        self.publish_model();
        changes
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn replace_node(&self, node: Node) -> Option<Change<String>> {
        let previous = self.node();
        if previous.as_deref() == Some(&node) {
            return None;
        }

        let change = match previous {
            None => Some(Change::Added {
                key: node.address.clone(),
            }),
            Some(old) => {
                let fields = node_fields(&old, &node);
                (!fields.is_empty()).then(|| Change::Updated {
                    key: node.address.clone(),
                    fields,
                })
            }
        };
        self.node.send_replace(Some(Arc::new(node)));
        change
    }

    fn replace_binding(&self, binding: InterfaceBinding) -> Option<Change<NetworkId>> {
        let key = binding.network_id.clone();
        let previous = self.bindings.upsert(key.to_string(), binding.clone());
        match previous {
            None => Some(Change::Added { key }),
            Some(old) => {
                let fields = binding_fields(&old, &binding);
                (!fields.is_empty()).then_some(Change::Updated { key, fields })
            }
        }
    }

    fn set_health(&self, health: DaemonHealth) -> Option<DaemonHealth> {
        if *self.health.borrow() == health {
            return None;
        }
        self.health.send_replace(health.clone());
        Some(health)
    }

    fn replace_service(&self, state: ServiceUnitState) -> Option<ServiceUnitState> {
        if *self.service.borrow() == Some(state) {
            return None;
        }
        self.service.send_replace(Some(state));
        Some(state)
    }

    fn publish_if_changed(&self, changes: &ChangeSet) {
        if !changes.is_empty() {
            self.publish_model();
        }
    }
}
