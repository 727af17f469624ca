// ── Service Controller ──
//
// systemd unit control and host interface admin state, as idempotent
// operations with typed outcomes. Every program call is bounded by the host
// timeout; privileged changes are serialized by an internal lock.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{HostCommand, HostExecutor, HostOutput};
use crate::config::DaemonConfig;
use crate::error::CoreError;
use crate::model::{InterfaceState, ServiceStatus, ServiceUnitState};

/// Lower-cased stderr fragments that mean "you are not allowed to do this".
const PERMISSION_MARKERS: &[&str] = &[
    "access denied",
    "authentication is required",
    "authentication required",
    "operation not permitted",
    "not authorized",
    "permission denied",
];

/// Exit codes pkexec uses when the user dismisses or fails authorization.
const ELEVATION_DENIED_CODES: &[i32] = &[126, 127];

/// Linux interface names are at most 15 bytes.
const MAX_IFNAME_LEN: usize = 15;

/// Whether an idempotent host operation had to do anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOutcome {
    Applied,
    /// Already in the requested state; no command was issued.
    Unchanged,
}

/// One entry of `ip --json link|address`.
#[derive(Debug, Deserialize)]
struct IpLink {
    ifname: String,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    operstate: Option<String>,
}

impl IpLink {
    /// The admin `UP` flag when flags are reported, else `operstate`.
    fn admin_state(&self) -> InterfaceState {
        if !self.flags.is_empty() {
            return InterfaceState::from_up(self.flags.iter().any(|f| f == "UP"));
        }
        match self.operstate.as_deref() {
            Some("UP") => InterfaceState::Up,
            Some("DOWN") => InterfaceState::Down,
            _ => InterfaceState::Unknown,
        }
    }
}

pub struct ServiceController {
    executor: Arc<dyn HostExecutor>,
    unit: String,
    elevate: Option<String>,
    timeout: Duration,
    privileged: Mutex<()>,
}

impl ServiceController {
    pub fn new(
        executor: Arc<dyn HostExecutor>,
        unit: impl Into<String>,
        elevate: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            unit: unit.into(),
            elevate,
            timeout,
            privileged: Mutex::new(()),
        }
    }

    pub fn from_config(config: &DaemonConfig, executor: Arc<dyn HostExecutor>) -> Self {
        Self::new(
            executor,
            config.service_unit.clone(),
            config.elevate.clone(),
            config.host_timeout,
        )
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    // ── Service unit ─────────────────────────────────────────────────

    /// Read `ActiveState` and `UnitFileState` of the unit.
    pub async fn unit_state(&self) -> Result<ServiceUnitState, CoreError> {
        let output = self
            .exec_checked(HostCommand::new(
                "systemctl",
                [
                    "show",
                    self.unit.as_str(),
                    "--property=ActiveState,UnitFileState",
                ],
            ))
            .await?;

        let mut status = ServiceStatus::Unknown;
        let mut boot_enabled = false;
        for line in output.stdout.lines() {
            match line.split_once('=') {
                Some(("ActiveState", value)) => status = ServiceStatus::from_active_state(value),
                Some(("UnitFileState", value)) => boot_enabled = value.trim() == "enabled",
                _ => {}
            }
        }
        Ok(ServiceUnitState {
            status,
            boot_enabled,
        })
    }

    /// Current run state; `Unknown` when the service manager cannot be asked.
    pub async fn status(&self) -> ServiceStatus {
        match self.unit_state().await {
            Ok(state) => state.status,
            Err(e) => {
                debug!(error = %e, unit = %self.unit, "could not read service state");
                ServiceStatus::Unknown
            }
        }
    }

    pub async fn start(&self) -> Result<HostOutcome, CoreError> {
        self.set_running(true).await
    }

    pub async fn stop(&self) -> Result<HostOutcome, CoreError> {
        self.set_running(false).await
    }

    pub async fn set_running(&self, running: bool) -> Result<HostOutcome, CoreError> {
        let _guard = self.privileged.lock().await;

        let wanted = if running {
            ServiceStatus::Running
        } else {
            ServiceStatus::Stopped
        };
        if self.unit_state().await?.status == wanted {
            debug!(unit = %self.unit, %wanted, "service already in requested state");
            return Ok(HostOutcome::Unchanged);
        }

        let action = if running { "start" } else { "stop" };
        self.exec_checked(HostCommand::new("systemctl", [action, self.unit.as_str()]))
            .await?;
        info!(unit = %self.unit, action, "service state changed");
        Ok(HostOutcome::Applied)
    }

    /// Enable or disable starting the unit at boot.
    pub async fn set_enabled(&self, enabled: bool) -> Result<HostOutcome, CoreError> {
        let _guard = self.privileged.lock().await;

        if self.unit_state().await?.boot_enabled == enabled {
            return Ok(HostOutcome::Unchanged);
        }

        let action = if enabled { "enable" } else { "disable" };
        self.exec_checked(HostCommand::new("systemctl", [action, self.unit.as_str()]))
            .await?;
        info!(unit = %self.unit, action, "service boot setting changed");
        Ok(HostOutcome::Applied)
    }

    // ── Interfaces ───────────────────────────────────────────────────

    /// Admin state of one interface.
    pub async fn interface_state(&self, name: &str) -> Result<InterfaceState, CoreError> {
        validate_ifname(name)?;
        let output = self
            .exec_checked(HostCommand::new(
                "ip",
                ["--json", "link", "show", "dev", name],
            ))
            .await?;
        let links = parse_links(&output.stdout)?;
        links
            .iter()
            .find(|l| l.ifname == name)
            .map(IpLink::admin_state)
            .ok_or_else(|| CoreError::NotFound {
                identifier: format!("interface {name}"),
            })
    }

    /// Admin state of every host interface, by name.
    pub async fn interface_states(&self) -> Result<HashMap<String, InterfaceState>, CoreError> {
        let output = self
            .exec_checked(HostCommand::new("ip", ["--json", "address"]))
            .await?;
        Ok(parse_links(&output.stdout)?
            .into_iter()
            .map(|l| {
                let state = l.admin_state();
                (l.ifname, state)
            })
            .collect())
    }

    /// Bring an interface administratively up or down.
    pub async fn set_interface_up(&self, name: &str, up: bool) -> Result<HostOutcome, CoreError> {
        validate_ifname(name)?;
        let _guard = self.privileged.lock().await;

        let wanted = InterfaceState::from_up(up);
        if self.interface_state(name).await? == wanted {
            debug!(interface = name, %wanted, "interface already in requested state");
            return Ok(HostOutcome::Unchanged);
        }

        let direction = if up { "up" } else { "down" };
        let command = HostCommand::new("ip", ["link", "set", name, direction])
            .elevated(self.elevate.as_deref());
        self.exec_checked(command).await?;
        info!(interface = name, direction, "interface state changed");
        Ok(HostOutcome::Applied)
    }

    // ── Auth token ───────────────────────────────────────────────────

    /// Copy the daemon's root-only auth token to `dest` through the
    /// elevation helper, mode `0600` and owned by `owner` (uid, gid).
    ///
    /// A dismissed or failed authorization prompt is `PermissionDenied`.
    pub async fn copy_auth_token(
        &self,
        source: &Path,
        dest: &Path,
        owner: Option<(u32, u32)>,
    ) -> Result<(), CoreError> {
        let source = host_path(source)?;
        let dest = host_path(dest)?;
        let _guard = self.privileged.lock().await;

        let mut args = vec!["-m".to_owned(), "0600".to_owned()];
        if let Some((uid, gid)) = owner {
            args.extend(["-o".to_owned(), uid.to_string(), "-g".to_owned(), gid.to_string()]);
        }
        args.extend([source, dest.clone()]);

        let command = HostCommand::new("install", args).elevated(self.elevate.as_deref());
        self.exec_checked(command).await?;
        info!(dest = %dest, "auth token copied");
        Ok(())
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Run a command under the host timeout, failing on non-zero exit.
    async fn exec_checked(&self, command: HostCommand) -> Result<HostOutput, CoreError> {
        let output = self.exec(&command).await?;
        if output.success() {
            return Ok(output);
        }
        let elevated = self
            .elevate
            .as_deref()
            .is_some_and(|helper| helper.trim() == command.program);
        Err(classify_failure(&command, &output, elevated))
    }

    async fn exec(&self, command: &HostCommand) -> Result<HostOutput, CoreError> {
        debug!(%command, "running host command");
        match tokio::time::timeout(self.timeout, self.executor.run(command)).await {
            Err(_) => {
                warn!(%command, timeout_secs = self.timeout.as_secs(), "host command timed out");
                Err(CoreError::Timeout {
                    operation: command.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CoreError::OperationFailed {
                    message: format!("`{}` is not installed or not on PATH", command.program),
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(CoreError::PermissionDenied {
                    message: format!("cannot run `{}`: {e}", command.program),
                })
            }
            Ok(Err(e)) => Err(CoreError::OperationFailed {
                message: format!("cannot run `{command}`: {e}"),
            }),
            Ok(Ok(output)) => Ok(output),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn validate_ifname(name: &str) -> Result<(), CoreError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IFNAME_LEN
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CoreError::ValidationFailed {
            message: format!("'{name}' is not a valid interface name"),
        })
    }
}

/// Absolute, UTF-8, and not mistakable for an option.
fn host_path(path: &Path) -> Result<String, CoreError> {
    match path.to_str() {
        Some(raw) if path.is_absolute() && !raw.contains('\n') => Ok(raw.to_owned()),
        _ => Err(CoreError::ValidationFailed {
            message: format!("'{}' is not a usable absolute path", path.display()),
        }),
    }
}

fn parse_links(stdout: &str) -> Result<Vec<IpLink>, CoreError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(stdout).map_err(|e| CoreError::OperationFailed {
        message: format!("unexpected output from `ip --json`: {e}"),
    })
}

fn classify_failure(command: &HostCommand, output: &HostOutput, elevated: bool) -> CoreError {
    let stderr = output.stderr.trim();
    let lower = stderr.to_ascii_lowercase();

    let refused_elevation =
        elevated && output.code.is_some_and(|c| ELEVATION_DENIED_CODES.contains(&c));
    if refused_elevation || PERMISSION_MARKERS.iter().any(|m| lower.contains(m)) {
        return CoreError::PermissionDenied {
            message: if stderr.is_empty() {
                format!("authorization for `{command}` was refused")
            } else {
                format!("{command}: {stderr}")
            },
        };
    }

    if lower.contains("does not exist") {
        return CoreError::NotFound {
            identifier: stderr.to_owned(),
        };
    }

    let code = output
        .code
        .map_or_else(|| "a signal".to_owned(), |c| format!("status {c}"));
    CoreError::OperationFailed {
        message: if stderr.is_empty() {
            format!("`{command}` exited with {code}")
        } else {
            format!("`{command}` exited with {code}: {stderr}")
        },
    }
}
