use thiserror::Error;

/// Top-level error type for the `modemly-api` crate.
///
/// Covers every failure mode of the HNAP surface: authentication,
/// transport, device-reported action results, and payload decoding.
/// `modemly-core` maps these into the collector's error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The device rejected the supplied username/password.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The session is no longer accepted (uid cookie expired, modem
    /// rebooted, or the request was bounced to the login page).
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, reset, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A request signature could not be computed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Non-success HTTP status that is not an auth rejection.
    #[error("HTTP {status} from device: {message}")]
    Status { status: u16, message: String },

    // ── HNAP ────────────────────────────────────────────────────────
    /// The device answered, but reported a non-OK `<Action>Result`.
    #[error("HNAP action {action} returned {result}")]
    Hnap { action: String, result: String },

    /// The `<Action>Response` envelope or a required field was absent.
    #[error("HNAP action {action} response is missing '{field}'")]
    MissingField { action: String, field: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if the device rejected the credentials themselves.
    pub fn is_credentials_rejected(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Timeouts, connection failures, and mid-body resets are common on
    /// a flaky cable link; a 5xx means the modem's web server is busy.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
