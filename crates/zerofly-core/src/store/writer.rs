// ── Single-writer store task ──
//
// The poll loop and the command queue never touch the DataStore directly:
// they send `StoreUpdate`s here, and one task applies them in arrival order
// and broadcasts the resulting change sets.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::DataStore;
use super::change::{Change, ChangeSet};
use super::refresh::RefreshSnapshot;
use crate::command::gate::CommandGate;
use crate::model::{InterfaceState, Network, NetworkId, ServiceUnitState};

const STORE_CHANNEL_SIZE: usize = 64;

/// A mutation intent for the store writer.
#[derive(Debug)]
pub(crate) enum StoreUpdate {
    /// A full poll result, read while the command gate was at `generation`.
    Snapshot {
        snapshot: Box<RefreshSnapshot>,
        generation: u64,
    },
    Unreachable {
        reason: String,
        service: Option<ServiceUnitState>,
    },
    Degraded {
        reason: String,
        service: Option<ServiceUnitState>,
    },
    NetworkUpserted(Network),
    NetworkRemoved(NetworkId),
    InterfaceSet {
        network: NetworkId,
        state: InterfaceState,
    },
    Service(ServiceUnitState),
}

pub(crate) struct StoreMessage {
    update: StoreUpdate,
    /// `true` once applied, `false` if the update was discarded as stale.
    ack: oneshot::Sender<bool>,
}

/// Sending half of the writer channel. Cheap to clone.
#[derive(Clone)]
pub(crate) struct StoreWriter {
    tx: mpsc::Sender<StoreMessage>,
}

impl StoreWriter {
    pub(crate) fn channel() -> (Self, mpsc::Receiver<StoreMessage>) {
        let (tx, rx) = mpsc::channel(STORE_CHANNEL_SIZE);
        (Self { tx }, rx)
    }

    /// Queue an update and wait until the writer has handled it.
    ///
    /// Returns `false` when the update was discarded or the writer is gone.
    pub(crate) async fn apply(&self, update: StoreUpdate) -> bool {
        let (ack, rx) = oneshot::channel();
        if self.tx.send(StoreMessage { update, ack }).await.is_err() {
            debug!("store writer closed, dropping update");
            return false;
        }
        rx.await.unwrap_or(false)
    }
}

/// Apply store updates until cancelled, then drain whatever is still queued
/// so no confirmed command result is lost.
pub(crate) async fn store_writer_task(
    store: Arc<DataStore>,
    gate: Arc<CommandGate>,
    mut rx: mpsc::Receiver<StoreMessage>,
    changes_tx: broadcast::Sender<Arc<ChangeSet>>,
    cancel: CancellationToken,
) {
    debug!("store writer started");
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                handle(&store, &gate, &changes_tx, msg);
            }
            () = cancel.cancelled() => {
                rx.close();
                while let Some(msg) = rx.recv().await {
                    handle(&store, &gate, &changes_tx, msg);
                }
                break;
            }
        }
    }
    debug!("store writer stopped");
}

fn handle(
    store: &DataStore,
    gate: &CommandGate,
    changes_tx: &broadcast::Sender<Arc<ChangeSet>>,
    msg: StoreMessage,
) {
    let applied = match apply(store, gate, msg.update) {
        Some(changes) => {
            if !changes.is_empty() {
                // No receivers is fine: nobody is watching yet.
                let _ = changes_tx.send(Arc::new(changes));
            }
            true
        }
        None => false,
    };
    let _ = msg.ack.send(applied);
}

/// Apply one update. `None` means it was discarded.
pub(crate) fn apply(store: &DataStore, gate: &CommandGate, update: StoreUpdate) -> Option<ChangeSet> {
    let changes = match update {
        StoreUpdate::Snapshot {
            snapshot,
            generation,
        } => {
            if gate.generation() != generation || gate.active() > 0 {
                debug!(
                    read_at = generation,
                    now = gate.generation(),
                    "discarding poll that overlapped a command"
                );
                return None;
            }
            let changes = store.apply_snapshot(*snapshot);
            log_drift(&changes);
            changes
        }
        StoreUpdate::Unreachable { reason, service } => {
            let mut changes = store.mark_unreachable(reason);
            if let Some(service) = service {
                changes.merge(store.set_service_state(service));
            }
            changes
        }
        StoreUpdate::Degraded { reason, service } => {
            let mut changes = store.mark_degraded(reason);
            if let Some(service) = service {
                changes.merge(store.set_service_state(service));
            }
            changes
        }
        StoreUpdate::NetworkUpserted(network) => store.upsert_network(network),
        StoreUpdate::NetworkRemoved(id) => store.remove_network(&id),
        StoreUpdate::InterfaceSet { network, state } => store.set_interface_state(&network, state),
        StoreUpdate::Service(state) => store.set_service_state(state),
    };
    Some(changes)
}

/// Binding state moved without a command asking for it.
fn log_drift(changes: &ChangeSet) {
    for change in &changes.bindings {
        if let Change::Updated { key, fields } = change {
            if fields.contains(&"state") {
                info!(network = %key, "interface state changed outside zerofly");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::ServiceStatus;

    fn running() -> ServiceUnitState {
        ServiceUnitState {
            status: ServiceStatus::Running,
            boot_enabled: false,
        }
    }

    #[tokio::test]
    async fn updates_are_acked_and_broadcast() {
        let store = Arc::new(DataStore::new());
        let gate = Arc::new(CommandGate::default());
        let (writer, rx) = StoreWriter::channel();
        let (changes_tx, mut changes_rx) = broadcast::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(store_writer_task(
            Arc::clone(&store),
            gate,
            rx,
            changes_tx,
            cancel.clone(),
        ));

        assert!(writer.apply(StoreUpdate::Service(running())).await);
        assert_eq!(store.service_state(), Some(running()));
        let changes = changes_rx.recv().await.unwrap();
        assert_eq!(changes.service, Some(running()));

        cancel.cancel();
        task.await.unwrap();
        assert!(!writer.apply(StoreUpdate::Service(running())).await);
    }

    #[test]
    fn stale_snapshot_is_discarded() {
        let store = DataStore::new();
        let gate = Arc::new(CommandGate::default());
        let read_at = gate.generation();
        drop(gate.enter());

        let snapshot = RefreshSnapshot {
            node: crate::model::Node {
                address: "89e92ceee5".into(),
                public_key_fingerprint: None,
                online: true,
                version: None,
                tcp_fallback: false,
                primary_port: None,
                clock: None,
            },
            networks: Vec::new(),
            peers: Vec::new(),
            interfaces: None,
            service: None,
        };
        let update = StoreUpdate::Snapshot {
            snapshot: Box::new(snapshot),
            generation: read_at,
        };
        assert!(apply(&store, &gate, update).is_none());
        assert!(store.node().is_none());
    }
}
