//! `zerofly watch`: follow the model as the poll loop updates it.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use tracing::debug;

use zerofly_core::{Change, ChangeSet, Controller, DaemonConfig, DaemonHealth, SyncState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, Painter};

#[derive(Serialize)]
struct WatchEvent<'a> {
    at: DateTime<Utc>,
    #[serde(flatten)]
    changes: &'a ChangeSet,
}

fn describe<K: std::fmt::Display>(kind: &str, change: &Change<K>) -> String {
    match change {
        Change::Added { key } => format!("{kind} {key} added"),
        Change::Removed { key } => format!("{kind} {key} removed"),
        Change::Updated { key, fields } => {
            format!("{kind} {key} updated ({})", fields.join(", "))
        }
    }
}

fn health_text(health: &DaemonHealth, paint: Painter) -> String {
    match health {
        DaemonHealth::Online => paint.good("online"),
        DaemonHealth::Unknown => paint.dim("unknown"),
        DaemonHealth::Degraded { reason } => format!("{}: {reason}", paint.warn("degraded")),
        DaemonHealth::Unreachable { reason, .. } => {
            format!("{}: {reason}", paint.bad("unreachable"))
        }
    }
}

/// One line per change, prefixed with the local time.
fn render_lines(set: &ChangeSet, paint: Painter) -> String {
    let stamp = paint.dim(&Local::now().format("%H:%M:%S").to_string());
    let mut lines = Vec::new();
    if let Some(ref health) = set.health {
        lines.push(format!("health {}", health_text(health, paint)));
    }
    if let Some(service) = set.service {
        let boot = if service.boot_enabled { "enabled" } else { "disabled" };
        lines.push(format!("service {} ({boot} at boot)", service.status));
    }
    if let Some(ref node) = set.node {
        lines.push(describe("node", node));
    }
    lines.extend(set.networks.iter().map(|c| describe("network", c)));
    lines.extend(set.bindings.iter().map(|c| describe("interface of", c)));
    lines.extend(set.peers.iter().map(|c| describe("peer", c)));

    let mut out = String::new();
    for line in lines {
        let _ = writeln!(out, "{stamp}  {line}");
    }
    out.trim_end().to_owned()
}

fn render_event(format: &OutputFormat, set: &ChangeSet, paint: Painter) -> Result<String, CliError> {
    let event = WatchEvent {
        at: Utc::now(),
        changes: set,
    };
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(render_lines(set, paint)),
        // One document per line so the stream stays line-parseable.
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(&event),
        OutputFormat::Yaml => Ok(format!("---\n{}", output::render_yaml(&event)?)),
    }
}

pub async fn handle(
    mut config: DaemonConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    config.background_sync = true;
    if let Some(ms) = args.interval_ms {
        if ms == 0 {
            return Err(CliError::Validation {
                field: "interval-ms".into(),
                reason: "must be positive".into(),
            });
        }
        config.sync.poll_interval = Duration::from_millis(ms);
    }

    let controller = Controller::new(config)?;
    // Subscribe before start so the first poll's change set is not missed.
    let mut changes = controller.change_stream();
    let mut sync_state = controller.sync_state();
    controller.start().await?;

    let paint = Painter::new(&global.color);
    let mut seen = 0usize;
    let result = loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break Ok(());
            }
            next = changes.next() => {
                let Some(set) = next else {
                    break Ok(());
                };
                match render_event(&global.output, &set, paint) {
                    Ok(out) => output::print_output(&out, global.quiet),
                    Err(e) => break Err(e),
                }
                seen += 1;
                if args.count.is_some_and(|limit| seen >= limit) {
                    break Ok(());
                }
            }
            Ok(()) = sync_state.changed() => {
                let state = sync_state.borrow_and_update().clone();
                if let SyncState::Backoff { attempt, retry_in } = state {
                    debug!(attempt, ?retry_in, "poll backing off");
                }
            }
        }
    };

    controller.shutdown().await;
    result
}
