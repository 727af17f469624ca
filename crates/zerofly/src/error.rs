//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use zerofly_config::ConfigError;
use zerofly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the ZeroTier service at {url}")]
    #[diagnostic(
        code(zerofly::unreachable),
        help(
            "Check that the service is running: zerofly service status\n\
             Reason: {reason}"
        )
    )]
    Unreachable { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("The ZeroTier service rejected the auth token (HTTP {status})")]
    #[diagnostic(
        code(zerofly::auth_failed),
        help(
            "The token must match the service's authtoken.secret.\n\
             Store the right one with: zerofly config set-token"
        )
    )]
    AuthFailed { status: u16 },

    #[error("No auth token found")]
    #[diagnostic(
        code(zerofly::no_token),
        help(
            "Searched: {searched}\n\
             Pass --token, set ZEROFLY_TOKEN, or run: zerofly config set-token"
        )
    )]
    NoToken { searched: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(zerofly::not_found),
        help("Run: zerofly {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{0}")]
    #[diagnostic(
        code(zerofly::busy),
        help("Wait for the running command to finish and try again.")
    )]
    Busy(String),

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(zerofly::conflict), help("Use --force to overwrite it."))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── Host ─────────────────────────────────────────────────────────

    #[error("Permission denied: {message}")]
    #[diagnostic(
        code(zerofly::permission_denied),
        help(
            "Changing the service or its interfaces needs administrator rights.\n\
             Approve the elevation prompt, or set daemon.elevate in the config."
        )
    )]
    PermissionDenied { message: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("ZeroTier service error ({code}): {message}")]
    #[diagnostic(code(zerofly::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(zerofly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(zerofly::config),
        help("Check the config file: zerofly config path")
    )]
    Config(Box<figment::Error>),

    #[error("Failed to write configuration: {0}")]
    #[diagnostic(code(zerofly::config_write))]
    ConfigWrite(String),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(zerofly::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("{operation} timed out after {seconds}s")]
    #[diagnostic(
        code(zerofly::timeout),
        help("Increase --timeout or daemon.host_timeout_secs, or check the service.")
    )]
    Timeout { operation: String, seconds: u64 },

    // ── Internal ─────────────────────────────────────────────────────

    #[error("{0}")]
    #[diagnostic(code(zerofly::internal))]
    Internal(String),

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoToken { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Busy(_) | Self::Conflict { .. } => exit_code::CONFLICT,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoToken { searched } => CliError::NoToken { searched },
            ConfigError::Serialization(e) => CliError::ConfigWrite(e.to_string()),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unreachable { url, reason } => CliError::Unreachable { url, reason },

            CoreError::Unauthorized { status } => CliError::AuthFailed { status },

            CoreError::NotFound { identifier } => not_found(&identifier),

            CoreError::Malformed { message } => CliError::ApiError {
                code: "malformed".into(),
                message,
            },

            CoreError::ServerError { status, message } => CliError::ApiError {
                code: status.to_string(),
                message,
            },

            CoreError::PermissionDenied { message } => CliError::PermissionDenied { message },

            CoreError::Timeout {
                operation,
                timeout_secs,
            } => CliError::Timeout {
                operation,
                seconds: timeout_secs,
            },

            e @ CoreError::AlreadyInProgress { .. } => CliError::Busy(e.to_string()),

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::OperationFailed { message } => CliError::ApiError {
                code: "operation_failed".into(),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            e @ (CoreError::Cancelled | CoreError::NotRunning) => CliError::Internal(e.to_string()),

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

/// Core reports what was missing as "network <id>", "peer <address>", or a
/// request path.
fn not_found(identifier: &str) -> CliError {
    let (resource_type, id, list_command) =
        if let Some(id) = identifier.strip_prefix("network ") {
            ("network", id, "networks list")
        } else if let Some(id) = identifier.strip_prefix("network/") {
            ("network", id, "networks list")
        } else if let Some(id) = identifier.strip_prefix("peer ") {
            ("peer", id, "peers list")
        } else {
            ("resource", identifier, "status")
        };
    CliError::NotFound {
        resource_type: resource_type.into(),
        identifier: id.into(),
        list_command: list_command.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_exit_codes() {
        let cases = [
            (
                CoreError::Unreachable {
                    url: "http://127.0.0.1:9993/".into(),
                    reason: "connection refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Unauthorized { status: 401 }, exit_code::AUTH),
            (
                CoreError::NotFound {
                    identifier: "network abcdef0123456789".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::PermissionDenied {
                    message: "pkexec exited with 126".into(),
                },
                exit_code::PERMISSION,
            ),
            (
                CoreError::AlreadyInProgress {
                    key: "network abcdef0123456789".into(),
                },
                exit_code::CONFLICT,
            ),
            (
                CoreError::Timeout {
                    operation: "systemctl start".into(),
                    timeout_secs: 60,
                },
                exit_code::TIMEOUT,
            ),
            (
                CoreError::ValidationFailed {
                    message: "no flags given".into(),
                },
                exit_code::USAGE,
            ),
            (CoreError::NotRunning, exit_code::GENERAL),
        ];

        for (core, code) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = CliError::from(CoreError::NotFound {
            identifier: "network abcdef0123456789".into(),
        });
        let CliError::NotFound {
            resource_type,
            identifier,
            list_command,
        } = err
        else {
            panic!("expected NotFound");
        };
        assert_eq!(resource_type, "network");
        assert_eq!(identifier, "abcdef0123456789");
        assert_eq!(list_command, "networks list");
    }
}
