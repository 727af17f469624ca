use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumString};

/// How the last read of the daemon went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DaemonHealth {
    /// No poll has completed yet.
    Unknown,
    Online,
    /// The daemon answers but the answer is unusable (bad token, bad body).
    Degraded { reason: String },
    /// The daemon does not answer. `since` marks the first failed poll of
    /// the current outage.
    Unreachable {
        reason: String,
        since: DateTime<Utc>,
    },
}

impl DaemonHealth {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Degraded { .. } => "degraded",
            Self::Unreachable { .. } => "unreachable",
        }
    }
}

/// Run state of the daemon's service unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Running,
    Stopped,
    Unknown,
}

impl ServiceStatus {
    /// Map systemd's `ActiveState`.
    pub fn from_active_state(raw: &str) -> Self {
        match raw.trim() {
            "active" => Self::Running,
            "inactive" | "failed" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

/// What the service manager reports for the daemon unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceUnitState {
    pub status: ServiceStatus,
    /// Starts at boot (`UnitFileState=enabled`).
    pub boot_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_state_mapping() {
        assert_eq!(ServiceStatus::from_active_state("active"), ServiceStatus::Running);
        assert_eq!(ServiceStatus::from_active_state("failed"), ServiceStatus::Stopped);
        assert_eq!(ServiceStatus::from_active_state("activating"), ServiceStatus::Unknown);
    }
}
