// Peer endpoints

use tracing::debug;

use crate::client::DaemonClient;
use crate::error::Error;
use crate::models::PeerInfo;

impl DaemonClient {
    /// List every peer the node currently knows about.
    ///
    /// `GET /peer`
    pub async fn list_peers(&self) -> Result<Vec<PeerInfo>, Error> {
        debug!("listing peers");
        self.get("peer").await
    }

    /// Fetch a single peer by node address.
    ///
    /// `GET /peer/{address}`
    pub async fn get_peer(&self, address: &str) -> Result<PeerInfo, Error> {
        debug!(peer = address, "fetching peer");
        self.get(&format!("peer/{address}")).await
    }
}
