// ── Command routing ──
//
// Maps each command onto daemon API calls or host operations. Routing never
// touches the store: it returns the confirmed result plus the store update
// that reflects it, and the queue applies that update through the writer.

use std::sync::Arc;

use tracing::debug;
use zerofly_api::{DaemonClient, NetworkConfigUpdate};

use super::{Command, CommandResult};
use crate::error::CoreError;
use crate::host::{HostOutcome, ServiceController};
use crate::model::{InterfaceState, Network, NetworkFlags, NetworkId};
use crate::store::DataStore;
use crate::store::writer::StoreUpdate;

/// What a command needs to reach the outside world.
pub(crate) struct RouteContext {
    pub(crate) client: DaemonClient,
    pub(crate) service: Arc<ServiceController>,
    pub(crate) store: Arc<DataStore>,
}

/// A confirmed command outcome and its optimistic model update.
#[derive(Debug)]
pub(crate) struct Routed {
    pub(crate) result: CommandResult,
    pub(crate) update: Option<StoreUpdate>,
}

impl Routed {
    fn unchanged() -> Self {
        Self {
            result: CommandResult::Unchanged,
            update: None,
        }
    }
}

pub(crate) async fn route_command(ctx: &RouteContext, command: &Command) -> Result<Routed, CoreError> {
    match command {
        // ── Membership ───────────────────────────────────────────────
        Command::JoinNetwork(id) => {
            if ctx.store.network(id).is_some() {
                debug!(network = %id, "already a member");
                return Ok(Routed::unchanged());
            }
            let network = Network::try_from(
                ctx.client
                    .join_network(id.as_str())
                    .await
                    .map_err(|e| network_error(e, id))?,
            )?;
            Ok(Routed {
                result: CommandResult::Network(network.clone()),
                update: Some(StoreUpdate::NetworkUpserted(network)),
            })
        }

        Command::LeaveNetwork(id) => {
            // DELETE succeeds for networks that were never joined, so ask first.
            ctx.client
                .get_network(id.as_str())
                .await
                .map_err(|e| network_error(e, id))?;
            ctx.client
                .leave_network(id.as_str())
                .await
                .map_err(|e| network_error(e, id))?;
            Ok(Routed {
                result: CommandResult::Applied,
                update: Some(StoreUpdate::NetworkRemoved(id.clone())),
            })
        }

        // ── Per-network settings ─────────────────────────────────────
        Command::SetNetworkInterfaceUp { network, up } => {
            let current = current_network(ctx, network).await?;
            let interface =
                current
                    .port_device_name
                    .clone()
                    .ok_or_else(|| CoreError::OperationFailed {
                        message: format!("network {network} has no host interface yet"),
                    })?;

            let outcome = ctx.service.set_interface_up(&interface, *up).await?;
            Ok(Routed {
                result: host_result(outcome),
                update: Some(StoreUpdate::InterfaceSet {
                    network: network.clone(),
                    state: InterfaceState::from_up(*up),
                }),
            })
        }

        Command::SetNetworkFlags { network, flags } => {
            set_network_flags(ctx, network, *flags).await
        }

        // ── Service ──────────────────────────────────────────────────
        Command::SetServiceRunning(running) => {
            let outcome = ctx.service.set_running(*running).await?;
            Ok(service_routed(ctx, outcome).await)
        }

        Command::SetServiceEnabled(enabled) => {
            let outcome = ctx.service.set_enabled(*enabled).await?;
            Ok(service_routed(ctx, outcome).await)
        }
    }
}

async fn set_network_flags(
    ctx: &RouteContext,
    id: &NetworkId,
    flags: NetworkFlags,
) -> Result<Routed, CoreError> {
    if flags.is_empty() {
        return Err(CoreError::ValidationFailed {
            message: "no network setting to change".into(),
        });
    }

    // POST on an unknown id would join it; require membership first.
    let current = current_network(ctx, id).await?;
    if !flags.differs_from(&current) {
        return Ok(Routed::unchanged());
    }

    let update = NetworkConfigUpdate::from(flags);
    let network = Network::try_from(
        ctx.client
            .update_network(id.as_str(), &update)
            .await
            .map_err(|e| network_error(e, id))?,
    )?;
    Ok(Routed {
        result: CommandResult::Network(network.clone()),
        update: Some(StoreUpdate::NetworkUpserted(network)),
    })
}

/// The store's copy of a network, or the daemon's when the store has not
/// seen it yet.
async fn current_network(ctx: &RouteContext, id: &NetworkId) -> Result<Arc<Network>, CoreError> {
    if let Some(network) = ctx.store.network(id) {
        return Ok(network);
    }
    let info = ctx
        .client
        .get_network(id.as_str())
        .await
        .map_err(|e| network_error(e, id))?;
    Ok(Arc::new(Network::try_from(info)?))
}

/// Re-read the unit after a service change so the model gets both fields.
async fn service_routed(ctx: &RouteContext, outcome: HostOutcome) -> Routed {
    let update = match ctx.service.unit_state().await {
        Ok(state) => Some(StoreUpdate::Service(state)),
        Err(e) => {
            debug!(error = %e, "could not re-read service state");
            None
        }
    };
    Routed {
        result: host_result(outcome),
        update,
    }
}

fn host_result(outcome: HostOutcome) -> CommandResult {
    match outcome {
        HostOutcome::Applied => CommandResult::Applied,
        HostOutcome::Unchanged => CommandResult::Unchanged,
    }
}

/// Name 404s after the network rather than the request path.
fn network_error(err: zerofly_api::Error, id: &NetworkId) -> CoreError {
    if err.is_not_found() {
        CoreError::NotFound {
            identifier: format!("network {id}"),
        }
    } else {
        err.into()
    }
}
