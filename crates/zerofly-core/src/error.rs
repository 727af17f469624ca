// ── Core error types ──
//
// User-facing errors from zerofly-core. Consumers never see reqwest errors
// or raw HTTP bodies; the `From<zerofly_api::Error>` impl folds transport
// failures into the kinds a presentation layer can act on.

use thiserror::Error;

/// Unified error type for the core crate.
///
/// `Clone` so a single command outcome can be handed to its caller and
/// broadcast to every command-event subscriber.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Daemon API ───────────────────────────────────────────────────
    #[error("Cannot reach the ZeroTier service at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("The ZeroTier service rejected the auth token (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Not found: {identifier}")]
    NotFound { identifier: String },

    #[error("Malformed response from the ZeroTier service: {message}")]
    Malformed { message: String },

    #[error("ZeroTier service error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    // ── Host operations ──────────────────────────────────────────────
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout { operation: String, timeout_secs: u64 },

    // ── Command queue ────────────────────────────────────────────────
    #[error("Another command for {key} is already in progress")]
    AlreadyInProgress { key: String },

    #[error("Command cancelled before it started")]
    Cancelled,

    #[error("Controller is not running")]
    NotRunning,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    // ── Configuration / internal ─────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Read-path failures that mean "the daemon is not answering right now"
    /// rather than "the daemon answered with something we cannot use".
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::ServerError { .. } | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<zerofly_api::Error> for CoreError {
    fn from(err: zerofly_api::Error) -> Self {
        match err {
            zerofly_api::Error::Unreachable { url, reason } => Self::Unreachable { url, reason },
            // Response-less failures already arrive as `Unreachable`.
            zerofly_api::Error::Transport(e) => Self::OperationFailed {
                message: e.to_string(),
            },
            zerofly_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid daemon URL: {e}"),
            },
            zerofly_api::Error::Client(message) => Self::Config { message },
            zerofly_api::Error::Unauthorized { status } => Self::Unauthorized { status },
            zerofly_api::Error::InvalidToken(reason) => Self::Config {
                message: format!("Invalid auth token: {reason}"),
            },
            zerofly_api::Error::NotFound { path } => Self::NotFound { identifier: path },
            zerofly_api::Error::ServerError { status, message } => {
                Self::ServerError { status, message }
            }
            zerofly_api::Error::Malformed { message, body: _ } => Self::Malformed { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_their_kind() {
        let err: CoreError = zerofly_api::Error::NotFound {
            path: "network/ffffffffffffffff".into(),
        }
        .into();
        assert_eq!(
            err,
            CoreError::NotFound {
                identifier: "network/ffffffffffffffff".into()
            }
        );

        let err: CoreError = zerofly_api::Error::Unauthorized { status: 401 }.into();
        assert!(matches!(err, CoreError::Unauthorized { status: 401 }));
        assert!(!err.is_transient());
    }

    #[test]
    fn timeouts_and_server_errors_are_transient() {
        assert!(
            CoreError::Timeout {
                operation: "systemctl start".into(),
                timeout_secs: 60
            }
            .is_transient()
        );
        assert!(
            CoreError::ServerError {
                status: 500,
                message: "boom".into()
            }
            .is_transient()
        );
        assert!(!CoreError::Malformed { message: "x".into() }.is_transient());
    }
}
