// zerofly-api: Async Rust client for the ZeroTier One local control API

pub mod client;
pub mod error;
pub mod models;
pub mod networks;
pub mod node;
pub mod peers;
pub mod transport;

pub use client::{AUTH_HEADER, DaemonClient};
pub use error::Error;
pub use models::{
    NetworkConfigUpdate, NetworkInfo, NodeStatus, PathInfo, PeerInfo, RouteInfo,
};
pub use transport::TransportConfig;
