//! Peer command handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tabled::Tabled;
use zerofly_core::{Controller, Path, Peer};

use crate::cli::{GlobalOpts, PeersArgs, PeersCommand};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util::{or_dash, yes_no};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct PeerRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Paths")]
    paths: String,
    #[tabled(rename = "Via")]
    via: String,
}

impl PeerRow {
    fn new(p: &Arc<Peer>, paint: Painter) -> Self {
        let active = p.paths.iter().filter(|path| path.active).count();
        let via = match p.preferred_path() {
            Some(path) => path.address.clone(),
            None => paint.dim("relay"),
        };
        Self {
            address: p.address.clone(),
            role: p.role.to_string(),
            latency: p.latency.map_or_else(|| "-".into(), |ms| format!("{ms} ms")),
            version: or_dash(p.version.as_deref()),
            paths: format!("{active}/{}", p.paths.len()),
            via,
        }
    }
}

#[derive(Tabled)]
struct PathRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Preferred")]
    preferred: String,
    #[tabled(rename = "Expired")]
    expired: String,
    #[tabled(rename = "Trusted")]
    trusted: String,
    #[tabled(rename = "Last send")]
    last_send: String,
    #[tabled(rename = "Last receive")]
    last_receive: String,
}

fn ago(at: Option<DateTime<Utc>>) -> String {
    let Some(at) = at else {
        return "-".into();
    };
    let secs = (Utc::now() - at).num_seconds().max(0);
    match secs {
        0..60 => format!("{secs}s ago"),
        60..3600 => format!("{}m ago", secs / 60),
        _ => format!("{}h ago", secs / 3600),
    }
}

impl From<&Path> for PathRow {
    fn from(p: &Path) -> Self {
        Self {
            address: p.address.clone(),
            active: yes_no(p.active),
            preferred: yes_no(p.preferred),
            expired: yes_no(p.expired),
            trusted: yes_no(p.trusted),
            last_send: ago(p.last_send),
            last_receive: ago(p.last_receive),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: PeersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    controller.refresh_now().await?;

    match args.command {
        PeersCommand::List { role } => {
            let snap = controller.peers_snapshot();
            let peers: Vec<Arc<Peer>> = snap
                .iter()
                .filter(|p| {
                    role.as_deref()
                        .is_none_or(|r| p.role.as_str().eq_ignore_ascii_case(r))
                })
                .cloned()
                .collect();

            let paint = Painter::new(&global.color);
            let out = output::render_list(
                &global.output,
                &peers,
                |p| PeerRow::new(p, paint),
                |p| p.address.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PeersCommand::Paths { address } => {
            let peer = controller
                .store()
                .peer(&address.to_ascii_lowercase())
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "peer".into(),
                    identifier: address.clone(),
                    list_command: "peers list".into(),
                })?;

            let out = output::render_list(
                &global.output,
                &peer.paths,
                |p| PathRow::from(p),
                |p| p.address.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
