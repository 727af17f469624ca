use thiserror::Error;

/// Top-level error type for the `zerofly-api` crate.
///
/// Every failure of a call against the daemon's local API lands in one of
/// these variants. `zerofly-core` maps them onto its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// No response: connection refused, reset or closed before the reply
    /// was complete, or the per-call timeout elapsed. Usually means the
    /// daemon is stopped, starting, or died mid-request.
    #[error("daemon unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Any other HTTP-level failure reqwest reports (redirect loops,
    /// request construction).
    #[error("HTTP transport error: {0}")]
    Transport(reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    // ── Authentication ──────────────────────────────────────────────
    /// The token is missing, stale, or otherwise rejected (401/403).
    #[error("daemon rejected the auth token (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The token cannot be encoded as a header value.
    #[error("invalid auth token: {0}")]
    InvalidToken(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Unknown network or peer (404).
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The daemon answered with a non-success status.
    #[error("daemon error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Body was not JSON, or did not match the expected schema.
    #[error("malformed response: {message}")]
    Malformed { message: String, body: String },
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if no_response(&err) {
            Self::Unreachable {
                url: err
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: if err.is_timeout() {
                    "request timed out".into()
                } else {
                    err.to_string()
                },
            }
        } else {
            Self::Transport(err)
        }
    }
}

/// The exchange failed before a complete response arrived: refused, reset,
/// closed mid-request or mid-body, or timed out.
fn no_response(err: &reqwest::Error) -> bool {
    err.is_connect()
        || err.is_timeout()
        || err.is_request()
        || err.is_body()
        || (err.status().is_none() && !err.is_decode() && !err.is_builder() && !err.is_redirect())
}

impl Error {
    /// Returns `true` if the daemon could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// read path.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable { .. } | Self::ServerError { .. } => true,
            Self::Transport(e) => no_response(e),
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
