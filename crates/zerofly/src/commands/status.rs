//! `zerofly status`: node identity, health, and totals.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use zerofly_core::{Controller, DaemonHealth, ModelSnapshot, Node, ServiceStatus, ServiceUnitState};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util::{or_dash, yes_no};

#[derive(Debug, Serialize)]
struct StatusView {
    node: Option<Arc<Node>>,
    health: DaemonHealth,
    service: Option<ServiceUnitState>,
    networks: usize,
    peers: usize,
    refreshed_at: Option<DateTime<Utc>>,
}

impl From<&ModelSnapshot> for StatusView {
    fn from(snap: &ModelSnapshot) -> Self {
        Self {
            node: snap.node.clone(),
            health: snap.health.clone(),
            service: snap.service,
            networks: snap.networks.len(),
            peers: snap.peers.len(),
            refreshed_at: snap.refreshed_at,
        }
    }
}

fn detail(view: &StatusView, paint: Painter) -> String {
    let health = match &view.health {
        DaemonHealth::Online => paint.good("online"),
        DaemonHealth::Unknown => paint.dim("unknown"),
        DaemonHealth::Degraded { reason } => format!("{} ({reason})", paint.warn("degraded")),
        DaemonHealth::Unreachable { reason, since } => format!(
            "{} since {} ({reason})",
            paint.bad("unreachable"),
            since.format("%H:%M:%S")
        ),
    };
    let service = match view.service {
        Some(unit) => {
            let status = match unit.status {
                ServiceStatus::Running => paint.good("running"),
                ServiceStatus::Stopped => paint.bad("stopped"),
                ServiceStatus::Unknown => paint.dim("unknown"),
            };
            let boot = if unit.boot_enabled { "enabled" } else { "disabled" };
            format!("{status}, {boot} at boot")
        }
        None => paint.dim("unknown"),
    };

    let mut pairs = vec![("Health", health), ("Service", service)];
    if let Some(ref node) = view.node {
        pairs.extend([
            ("Address", node.address.clone()),
            ("Fingerprint", or_dash(node.public_key_fingerprint.as_deref())),
            (
                "Online",
                if node.online { paint.good("yes") } else { paint.bad("no") },
            ),
            ("Version", or_dash(node.version.as_deref())),
            ("Port", or_dash(node.primary_port)),
            ("TCP fallback", yes_no(node.tcp_fallback)),
        ]);
    }
    pairs.extend([
        ("Networks", view.networks.to_string()),
        ("Peers", view.peers.to_string()),
    ]);
    output::render_detail(&pairs)
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    // Still render what is known (service state, last health) when the
    // read fails, then report the failure.
    let refreshed = controller.refresh_now().await;

    let view = StatusView::from(controller.snapshot().as_ref());
    let paint = Painter::new(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, paint),
        |v| v.health.label().to_owned(),
    )?;
    output::print_output(&out, global.quiet);

    refreshed.map_err(Into::into)
}
