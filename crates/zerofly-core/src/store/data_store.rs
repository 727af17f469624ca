// ── Central reactive data store ──
//
// Holds the domain model and hands out snapshots and subscriptions.
// Every mutation runs on the store writer task; everything public here is
// a read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use super::collection::EntityCollection;
use crate::model::{
    DaemonHealth, InterfaceBinding, Network, NetworkId, Node, Peer, ServiceUnitState,
};
use crate::stream::EntityStream;

/// A coherent point-in-time view of the whole model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSnapshot {
    pub node: Option<Arc<Node>>,
    pub networks: Arc<Vec<Arc<Network>>>,
    pub peers: Arc<Vec<Arc<Peer>>>,
    pub bindings: Arc<Vec<Arc<InterfaceBinding>>>,
    pub health: DaemonHealth,
    pub service: Option<ServiceUnitState>,
    /// When the last poll snapshot was applied.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Bumped on every store mutation.
    pub version: u64,
}

impl Default for ModelSnapshot {
    fn default() -> Self {
        Self {
            node: None,
            networks: Arc::new(Vec::new()),
            peers: Arc::new(Vec::new()),
            bindings: Arc::new(Vec::new()),
            health: DaemonHealth::Unknown,
            service: None,
            refreshed_at: None,
            version: 0,
        }
    }
}

impl ModelSnapshot {
    pub fn network(&self, id: &NetworkId) -> Option<&Arc<Network>> {
        self.networks.iter().find(|n| &n.id == id)
    }
}

/// Central in-memory model of the local node, its networks, peers, and
/// interface bindings.
///
/// Consumers only read it. Mutations go through the controller's store
/// writer, so a holder of a [`Controller`](crate::Controller) cannot write:
///
/// ```compile_fail
/// fn overwrite(ctrl: &zerofly_core::Controller, other: &zerofly_core::DataStore) {
///     let _ = ctrl.store().apply_snapshot(other.snapshot());
/// }
/// ```
pub struct DataStore {
    pub(crate) node: watch::Sender<Option<Arc<Node>>>,
    pub(crate) networks: EntityCollection<Network>,
    pub(crate) peers: EntityCollection<Peer>,
    pub(crate) bindings: EntityCollection<InterfaceBinding>,
    pub(crate) health: watch::Sender<DaemonHealth>,
    pub(crate) service: watch::Sender<Option<ServiceUnitState>>,
    pub(crate) refreshed_at: watch::Sender<Option<DateTime<Utc>>>,
    model: watch::Sender<Arc<ModelSnapshot>>,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        let (node, _) = watch::channel(None);
        let (health, _) = watch::channel(DaemonHealth::Unknown);
        let (service, _) = watch::channel(None);
        let (refreshed_at, _) = watch::channel(None);
        let (model, _) = watch::channel(Arc::new(ModelSnapshot::default()));

        Self {
            node,
            networks: EntityCollection::new(),
            peers: EntityCollection::new(),
            bindings: EntityCollection::new(),
            health,
            service,
            refreshed_at,
            model,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.model.borrow().clone()
    }

    pub fn node(&self) -> Option<Arc<Node>> {
        self.node.borrow().clone()
    }

    pub fn networks_snapshot(&self) -> Arc<Vec<Arc<Network>>> {
        self.networks.snapshot()
    }

    pub fn peers_snapshot(&self) -> Arc<Vec<Arc<Peer>>> {
        self.peers.snapshot()
    }

    pub fn bindings_snapshot(&self) -> Arc<Vec<Arc<InterfaceBinding>>> {
        self.bindings.snapshot()
    }

    pub fn health(&self) -> DaemonHealth {
        self.health.borrow().clone()
    }

    pub fn service_state(&self) -> Option<ServiceUnitState> {
        *self.service.borrow()
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn network(&self, id: &NetworkId) -> Option<Arc<Network>> {
        self.networks.get(id.as_str())
    }

    pub fn peer(&self, address: &str) -> Option<Arc<Peer>> {
        self.peers.get(&address.to_ascii_lowercase())
    }

    pub fn binding(&self, id: &NetworkId) -> Option<Arc<InterfaceBinding>> {
        self.bindings.get(id.as_str())
    }

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_model(&self) -> watch::Receiver<Arc<ModelSnapshot>> {
        self.model.subscribe()
    }

    pub fn subscribe_networks(&self) -> EntityStream<Network> {
        EntityStream::new(self.networks.subscribe(), |n| n.id.as_str())
    }

    pub fn subscribe_peers(&self) -> EntityStream<Peer> {
        EntityStream::new(self.peers.subscribe(), |p| p.address.as_str())
    }

    pub fn subscribe_bindings(&self) -> EntityStream<InterfaceBinding> {
        EntityStream::new(self.bindings.subscribe(), |b| b.network_id.as_str())
    }

    pub fn subscribe_health(&self) -> watch::Receiver<DaemonHealth> {
        self.health.subscribe()
    }

    // ── Publication ──────────────────────────────────────────────────

    /// Rebuild the combined snapshot from the per-collection ones.
    pub(crate) fn publish_model(&self) {
        let version = self.model.borrow().version + 1;
        let snapshot = ModelSnapshot {
            node: self.node(),
            networks: self.networks.snapshot(),
            peers: self.peers.snapshot(),
            bindings: self.bindings.snapshot(),
            health: self.health(),
            service: self.service_state(),
            refreshed_at: *self.refreshed_at.borrow(),
            version,
        };
        self.model.send_replace(Arc::new(snapshot));
    }
}
