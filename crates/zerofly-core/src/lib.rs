//! Reactive state layer between `zerofly-api` and presentation consumers.
//!
//! This crate owns the domain model, host control, and the synchronization
//! machinery of the zerofly workspace:
//!
//! - **[`Controller`]**: Central facade. [`start()`](Controller::start)
//!   spawns the single store-writer task and the background poll loop;
//!   [`shutdown()`](Controller::shutdown) cancels polling and queued commands
//!   and waits for running ones. [`Controller::oneshot()`](Controller::oneshot)
//!   is the lightweight mode for single CLI invocations.
//!
//! - **[`DataStore`]**: Lock-free reactive storage built on
//!   `EntityCollection<T>` (`DashMap` + `tokio::sync::watch` channels).
//!   Read-only outside this crate: only the store writer task applies polls
//!   and command results, each producing a [`ChangeSet`].
//!
//! - **[`ServiceController`]**: systemd unit and host interface control as
//!   idempotent operations, bounded by a timeout and serialized internally.
//!
//! - **[`Command`]**: Typed mutation requests. At most one command per
//!   network (or for the service) is in flight; results are applied to the
//!   model only after the daemon or host confirms them.
//!
//! - **Domain model** ([`model`]): Canonical types (`Node`, `Network`,
//!   `Peer`, `InterfaceBinding`, ...) validated at the deserialization
//!   boundary.

pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod host;
pub mod model;
pub mod store;
pub mod stream;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandEvent, CommandHandle, CommandKey, CommandResult};
pub use config::{DaemonConfig, SyncConfig};
pub use controller::Controller;
pub use error::CoreError;
pub use host::{HostCommand, HostExecutor, HostOutcome, HostOutput, ServiceController, SystemExecutor};
pub use store::{Change, ChangeSet, DataStore, ModelSnapshot};
pub use stream::{ChangeStream, EntityStream};
pub use sync::{Backoff, SyncState};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    DaemonHealth, InterfaceBinding, InterfaceState, Network, NetworkFlags, NetworkId,
    NetworkStatus, NetworkType, Node, Path, Peer, PeerRole, Route, ServiceStatus,
    ServiceUnitState,
};
