// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The queue
// serializes commands per key, bounds overall concurrency, and routes each
// variant to the daemon API or the host service controller.

pub(crate) mod gate;
pub(crate) mod queue;
pub(crate) mod route;

use std::fmt;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Network, NetworkFlags, NetworkId};

pub(crate) use queue::CommandQueue;

/// All mutating operations against the daemon or the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ── Membership ───────────────────────────────────────────────────
    JoinNetwork(NetworkId),
    LeaveNetwork(NetworkId),

    // ── Per-network settings ─────────────────────────────────────────
    /// Bring the network's host interface administratively up or down.
    SetNetworkInterfaceUp { network: NetworkId, up: bool },
    /// Change the daemon's allowDefault/allowGlobal/allowManaged/allowDNS.
    SetNetworkFlags {
        network: NetworkId,
        flags: NetworkFlags,
    },

    // ── Service ──────────────────────────────────────────────────────
    SetServiceRunning(bool),
    SetServiceEnabled(bool),
}

impl Command {
    /// Commands with equal keys never run at the same time.
    pub fn key(&self) -> CommandKey {
        match self {
            Self::JoinNetwork(id) | Self::LeaveNetwork(id) => CommandKey::Network(id.clone()),
            Self::SetNetworkInterfaceUp { network, .. } | Self::SetNetworkFlags { network, .. } => {
                CommandKey::Network(network.clone())
            }
            Self::SetServiceRunning(_) | Self::SetServiceEnabled(_) => CommandKey::Service,
        }
    }

    /// Short verb for logs and UI messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::JoinNetwork(_) => "join",
            Self::LeaveNetwork(_) => "leave",
            Self::SetNetworkInterfaceUp { up: true, .. } => "interface up",
            Self::SetNetworkInterfaceUp { up: false, .. } => "interface down",
            Self::SetNetworkFlags { .. } => "set flags",
            Self::SetServiceRunning(true) => "service start",
            Self::SetServiceRunning(false) => "service stop",
            Self::SetServiceEnabled(true) => "service enable",
            Self::SetServiceEnabled(false) => "service disable",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.key())
    }
}

/// Serialization key of a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandKey {
    Network(NetworkId),
    Service,
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(id) => write!(f, "network {id}"),
            Self::Service => f.write_str("the ZeroTier service"),
        }
    }
}

/// Successful outcome of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Applied,
    /// Target already in the requested state; nothing was changed.
    Unchanged,
    /// The daemon's view of the network after the change.
    Network(Network),
}

/// Completion notice broadcast to every command-event subscriber, in
/// completion order.
#[derive(Debug, Clone)]
pub enum CommandEvent {
    Submitted {
        id: Uuid,
        command: Command,
    },
    Completed {
        id: Uuid,
        command: Command,
        result: Result<CommandResult, CoreError>,
    },
}

/// Handle to a submitted command.
#[derive(Debug)]
pub struct CommandHandle {
    id: Uuid,
    command: Command,
    rx: oneshot::Receiver<Result<CommandResult, CoreError>>,
}

impl CommandHandle {
    pub(crate) fn new(
        id: Uuid,
        command: Command,
        rx: oneshot::Receiver<Result<CommandResult, CoreError>>,
    ) -> Self {
        Self { id, command, rx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Wait for the command to finish.
    pub async fn outcome(self) -> Result<CommandResult, CoreError> {
        self.rx.await.map_err(|_| CoreError::Cancelled)?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn network_commands_share_a_key() {
        let id: NetworkId = "abcdef0123456789".parse().unwrap();
        let join = Command::JoinNetwork(id.clone());
        let up = Command::SetNetworkInterfaceUp {
            network: id.clone(),
            up: true,
        };
        assert_eq!(join.key(), up.key());
        assert_ne!(join.key(), Command::SetServiceRunning(true).key());
        assert_eq!(
            Command::SetServiceEnabled(false).key(),
            Command::SetServiceRunning(true).key()
        );
        assert_eq!(join.to_string(), "join (network abcdef0123456789)");
    }
}
