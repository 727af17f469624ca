// ── Domain model ──
//
// Canonical types the rest of the workspace works with. Raw daemon payloads
// are converted into these in `convert.rs`; nothing here does I/O.

pub mod binding;
pub mod health;
pub mod network;
pub mod network_id;
pub mod node;
pub mod peer;

pub use binding::{InterfaceBinding, InterfaceState};
pub use health::{DaemonHealth, ServiceStatus, ServiceUnitState};
pub use network::{Network, NetworkFlags, NetworkStatus, NetworkType, Route, UNKNOWN_NAME};
pub use network_id::NetworkId;
pub use node::Node;
pub use peer::{Path, Peer, PeerRole};
