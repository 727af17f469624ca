// Network membership endpoints
//
// Joining and updating share one endpoint: `POST /network/{id}` creates the
// membership if absent and applies whatever settings the body carries.

use serde_json::json;
use tracing::debug;

use crate::client::DaemonClient;
use crate::error::Error;
use crate::models::{NetworkConfigUpdate, NetworkInfo};

impl DaemonClient {
    /// List joined networks.
    ///
    /// `GET /network`
    pub async fn list_networks(&self) -> Result<Vec<NetworkInfo>, Error> {
        debug!("listing networks");
        self.get("network").await
    }

    /// Fetch a single joined network. Unknown ids yield [`Error::NotFound`].
    ///
    /// `GET /network/{id}`
    pub async fn get_network(&self, id: &str) -> Result<NetworkInfo, Error> {
        debug!(network = id, "fetching network");
        self.get(&format!("network/{id}")).await
    }

    /// Join a network.
    ///
    /// `POST /network/{id}` with an empty object
    pub async fn join_network(&self, id: &str) -> Result<NetworkInfo, Error> {
        debug!(network = id, "joining network");
        self.post(&format!("network/{id}"), &json!({})).await
    }

    /// Change per-network settings (`allowDefault`, `allowDNS`, ...).
    ///
    /// `POST /network/{id}` with only the changed flags
    pub async fn update_network(
        &self,
        id: &str,
        update: &NetworkConfigUpdate,
    ) -> Result<NetworkInfo, Error> {
        debug!(network = id, ?update, "updating network settings");
        self.post(&format!("network/{id}"), update).await
    }

    /// Leave a network.
    ///
    /// `DELETE /network/{id}`
    pub async fn leave_network(&self, id: &str) -> Result<(), Error> {
        debug!(network = id, "leaving network");
        self.delete(&format!("network/{id}")).await
    }
}
