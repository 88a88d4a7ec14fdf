// ── Core error types ──
//
// The collector's failure taxonomy. Raw `modemly_api::Error` values are
// classified on the way in: credential rejection becomes `AuthError`,
// everything the device or network does wrong becomes `FetchError`.
// Only confirmed-bad credentials are unrecoverable.

use std::path::PathBuf;

use thiserror::Error;

use crate::fetch::Resource;

/// Session establishment failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The device refused the username/password on consecutive logins.
    #[error("Device rejected the credentials for '{username}' {attempts} times in a row")]
    CredentialsRejected { username: String, attempts: u32 },

    /// The login exchange could not complete (network, device busy).
    #[error("Login exchange failed: {0}")]
    Unreachable(#[source] modemly_api::Error),
}

impl AuthError {
    /// Bad credentials stop the process; anything else is worth retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CredentialsRejected { .. })
    }
}

/// A resource could not be fetched this cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch {resource} after {attempts} attempt(s): {source}")]
    Device {
        resource: Resource,
        attempts: u32,
        #[source]
        source: modemly_api::Error,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl FetchError {
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Auth(e) => e.is_fatal(),
            Self::Device { .. } => false,
        }
    }
}

/// Why a single device row was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("missing {field}")]
    MissingField { field: &'static str },

    #[error("invalid {field} '{value}'")]
    InvalidField { field: &'static str, value: String },
}

/// Persistence failures. The batch is retried next cycle.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sink rejected the write (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid sink URL: {url}")]
    InvalidUrl { url: String },

    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Sink unavailable: {message}")]
    Unavailable { message: String },
}

/// Cursor load/save failures.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("Cannot access cursor file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cursor file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Cannot set up device client: {0}")]
    Client(#[from] modemly_api::Error),
}

impl CoreError {
    /// Whether the collector must stop rather than try again next cycle.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Auth(e) => e.is_fatal(),
            Self::Fetch(e) => e.is_fatal(),
            Self::Config { .. } | Self::Client(_) => true,
            Self::Sink(_) | Self::Cursor(_) => false,
        }
    }
}
