// ── Runtime daemon configuration ──
//
// These types describe *how* to talk to the local ZeroTier service and how
// aggressively to keep the model in sync. They carry the auth token but never
// touch disk: the CLI (via zerofly-config) builds a `DaemonConfig` and hands
// it in.

use std::time::Duration;

use secrecy::SecretString;

/// Local API address the daemon listens on by default.
pub const DEFAULT_URL: &str = "http://127.0.0.1:9993/";

/// systemd unit name of the daemon.
pub const DEFAULT_SERVICE_UNIT: &str = "zerotier-one";

/// Helper used to run privileged host commands.
pub const DEFAULT_ELEVATE: &str = "pkexec";

/// Poll cadence and read-path retry tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Normal interval between polls.
    pub poll_interval: Duration,
    /// First backoff delay after the daemon stops answering.
    pub backoff_base: Duration,
    /// Upper bound on the backoff delay.
    pub backoff_max: Duration,
    /// Extra refreshes scheduled after a successful join, measured from
    /// command completion. The daemon needs a moment to fetch network config.
    pub follow_up_refresh: Vec<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(30),
            follow_up_refresh: vec![Duration::from_secs(1), Duration::from_secs(5)],
        }
    }
}

/// Configuration for one local daemon.
///
/// Built by CLI/config layer, passed to `Controller` -- core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Local API base URL.
    pub url: String,
    /// Contents of `authtoken.secret`.
    pub token: SecretString,
    /// Per-request timeout against the local API.
    pub timeout: Duration,
    /// Bound on every service-manager / interface command.
    pub host_timeout: Duration,
    /// systemd unit controlled by the service commands.
    pub service_unit: String,
    /// Privilege helper prefixed to interface commands. `None` runs them
    /// directly (useful when already root).
    pub elevate: Option<String>,
    pub sync: SyncConfig,
    /// Upper bound on commands executing at once across all keys.
    pub max_concurrent_commands: usize,
    /// Spawn the periodic poll loop on `start()`. One-shot CLI invocations
    /// turn this off and refresh explicitly.
    pub background_sync: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            token: SecretString::from(String::new()),
            timeout: zerofly_api::transport::DEFAULT_TIMEOUT,
            host_timeout: Duration::from_secs(60),
            service_unit: DEFAULT_SERVICE_UNIT.into(),
            elevate: Some(DEFAULT_ELEVATE.into()),
            sync: SyncConfig::default(),
            max_concurrent_commands: 2,
            background_sync: true,
        }
    }
}

impl DaemonConfig {
    pub(crate) fn transport(&self) -> zerofly_api::TransportConfig {
        let defaults = zerofly_api::TransportConfig::default();
        zerofly_api::TransportConfig {
            timeout: self.timeout,
            connect_timeout: defaults.connect_timeout.min(self.timeout),
        }
    }
}
