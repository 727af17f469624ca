// Node status endpoint

use tracing::debug;

use crate::client::DaemonClient;
use crate::error::Error;
use crate::models::NodeStatus;

impl DaemonClient {
    /// Fetch the local node's identity and online state.
    ///
    /// `GET /status`
    pub async fn status(&self) -> Result<NodeStatus, Error> {
        debug!("fetching node status");
        self.get("status").await
    }
}
