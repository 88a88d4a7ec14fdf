//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use modemly_config::ConfigError;
use modemly_core::{AuthError, CoreError, CursorError, FetchError, SinkError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const CONFIG: i32 = 10;
    pub const SINK: i32 = 11;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the modem ({target})")]
    #[diagnostic(
        code(modemly::connection_failed),
        help(
            "Check that the modem is powered on and reachable.\n\
             The default address is https://192.168.100.1; override it with --host."
        )
    )]
    ConnectionFailed {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Authentication ───────────────────────────────────────────────

    #[error("The modem rejected the credentials for '{username}'")]
    #[diagnostic(
        code(modemly::auth_failed),
        help(
            "Verify the modem password. It is read from the env var named by\n\
             [modem].password_env, then MODEMLY_PASSWORD / MOTO_PASSWORD, then the\n\
             system keyring (service 'modemly', account '<host>/password'),\n\
             then [modem].password."
        )
    )]
    AuthFailed { username: String },

    // ── Sink ─────────────────────────────────────────────────────────

    #[error("Failed to write to the sink")]
    #[diagnostic(
        code(modemly::sink),
        help("Check the [sink] settings; try `modemly ingest --dry-run` to test collection alone.")
    )]
    Sink(#[source] SinkError),

    #[error(transparent)]
    #[diagnostic(code(modemly::cursor))]
    Cursor(CursorError),

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(modemly::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(
        code(modemly::config),
        help("Run `modemly config show` to see the resolved configuration.")
    )]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Sink(_) => exit_code::SINK,
            Self::Validation { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::Cursor(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::CredentialsRejected { username, .. } => Self::AuthFailed { username },
            AuthError::Unreachable(source) => Self::ConnectionFailed {
                target: "login".into(),
                source: source.into(),
            },
        }
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Auth(e) => e.into(),
            FetchError::Device {
                resource, source, ..
            } => Self::ConnectionFailed {
                target: resource.to_string(),
                source: source.into(),
            },
        }
    }
}

impl From<modemly_api::Error> for CliError {
    fn from(err: modemly_api::Error) -> Self {
        Self::ConnectionFailed {
            target: "request".into(),
            source: err.into(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Auth(e) => e.into(),
            CoreError::Fetch(e) => e.into(),
            CoreError::Sink(e) => Self::Sink(e),
            CoreError::Cursor(e) => Self::Cursor(e),
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Client(e) => Self::Validation {
                field: "modem".into(),
                reason: e.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Collector(e) => e.into(),
            ConfigError::Sink(e) => Self::Sink(e),
            other => Self::Config(other),
        }
    }
}
