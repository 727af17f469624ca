// ── Sync engine ──
//
// Timer- and request-driven polling of the daemon and the host. Each poll
// reads node, networks, and peers from the API plus unit and interface state
// from the host, validates everything into domain types, and hands the result
// to the store writer. Read-path failures never escape this loop: they land
// in the model as a health state and drive the backoff schedule.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zerofly_api::{DaemonClient, NetworkInfo, NodeStatus, PeerInfo};

use super::backoff::Backoff;
use crate::command::gate::CommandGate;
use crate::config::SyncConfig;
use crate::convert::convert_all;
use crate::error::CoreError;
use crate::host::ServiceController;
use crate::model::{Network, Node, Peer};
use crate::store::RefreshSnapshot;
use crate::store::writer::{StoreUpdate, StoreWriter};

/// Observable state of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// Waiting for the next tick or refresh request.
    Idle,
    Polling,
    /// The daemon stopped answering; the next poll waits `retry_in`.
    Backoff { attempt: u32, retry_in: Duration },
    Stopped,
}

impl SyncState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Backoff { .. } => "backoff",
            Self::Stopped => "stopped",
        }
    }
}

/// What happened to a successfully read snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    Applied,
    /// A command started or finished while the poll was reading.
    Discarded,
}

/// Performs one read of daemon and host state. Shared by the background
/// loop and `Controller::refresh_now`.
pub(crate) struct Poller {
    client: DaemonClient,
    service: Arc<ServiceController>,
    writer: StoreWriter,
    gate: Arc<CommandGate>,
}

impl Poller {
    pub(crate) fn new(
        client: DaemonClient,
        service: Arc<ServiceController>,
        writer: StoreWriter,
        gate: Arc<CommandGate>,
    ) -> Self {
        Self {
            client,
            service,
            writer,
            gate,
        }
    }

    pub(crate) fn gate(&self) -> &CommandGate {
        &self.gate
    }

    pub(crate) async fn poll(&self) -> Result<PollOutcome, CoreError> {
        let generation = self.gate.generation();

        let (status, networks, peers, unit, interfaces) = tokio::join!(
            self.client.status(),
            self.client.list_networks(),
            self.client.list_peers(),
            self.service.unit_state(),
            self.service.interface_states(),
        );

        // Host reads are best effort: the API view is still worth applying.
        let service = unit
            .inspect_err(|e| debug!(error = %e, "service state unavailable"))
            .ok();
        let interfaces = interfaces
            .inspect_err(|e| debug!(error = %e, "interface states unavailable"))
            .ok();

        match validate(status, networks, peers) {
            Ok((node, networks, peers)) => {
                let snapshot = RefreshSnapshot {
                    node,
                    networks,
                    peers,
                    interfaces,
                    service,
                };
                let applied = self
                    .writer
                    .apply(StoreUpdate::Snapshot {
                        snapshot: Box::new(snapshot),
                        generation,
                    })
                    .await;
                Ok(if applied {
                    PollOutcome::Applied
                } else {
                    PollOutcome::Discarded
                })
            }
            Err(e) => {
                let reason = e.to_string();
                let update = if e.is_transient() {
                    StoreUpdate::Unreachable { reason, service }
                } else {
                    StoreUpdate::Degraded { reason, service }
                };
                self.writer.apply(update).await;
                Err(e)
            }
        }
    }
}

/// Turn the three API reads into domain types. The first failure wins.
fn validate(
    status: Result<NodeStatus, zerofly_api::Error>,
    networks: Result<Vec<NetworkInfo>, zerofly_api::Error>,
    peers: Result<Vec<PeerInfo>, zerofly_api::Error>,
) -> Result<(Node, Vec<Network>, Vec<Peer>), CoreError> {
    let node = Node::try_from(status?)?;
    let networks = convert_all(networks?)?;
    let peers = convert_all(peers?)?;
    Ok((node, networks, peers))
}

/// Background poll loop. Runs until `cancel` fires; an in-flight poll is
/// abandoned at that point.
pub(crate) async fn sync_task(
    poller: Arc<Poller>,
    config: SyncConfig,
    state: Arc<watch::Sender<SyncState>>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut backoff = Backoff::new(config.backoff_base, config.backoff_max);
    let mut retry_in: Option<Duration> = None;

    debug!(interval_ms = config.poll_interval.as_millis(), "sync engine started");

    loop {
        let wait = async {
            match retry_in {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    interval.tick().await;
                }
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = refresh.notified() => debug!("refresh requested"),
            () = wait => {}
        }

        if poller.gate().active() > 0 {
            debug!("command in progress, deferring poll");
            continue;
        }

        state.send_replace(SyncState::Polling);
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = poller.poll() => result,
        };
        interval.reset();

        match result {
            Ok(outcome) => {
                if backoff.attempt() > 0 {
                    info!(failures = backoff.attempt(), "daemon reachable again");
                }
                if outcome == PollOutcome::Discarded {
                    debug!("poll overlapped a command, result discarded");
                }
                backoff.reset();
                retry_in = None;
                state.send_replace(SyncState::Idle);
            }
            Err(e) if e.is_transient() => {
                let delay = backoff.next_delay();
                warn!(error = %e, attempt = backoff.attempt(), retry_ms = delay.as_millis(), "poll failed, backing off");
                retry_in = Some(delay);
                state.send_replace(SyncState::Backoff {
                    attempt: backoff.attempt(),
                    retry_in: delay,
                });
            }
            Err(e) => {
                warn!(error = %e, "poll failed, daemon state degraded");
                retry_in = None;
                state.send_replace(SyncState::Idle);
            }
        }
    }

    state.send_replace(SyncState::Stopped);
    debug!("sync engine stopped");
}
