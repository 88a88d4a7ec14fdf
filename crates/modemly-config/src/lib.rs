//! Configuration for modemly.
//!
//! TOML file plus environment layering, credential resolution
//! (env → keyring → plaintext), and translation into
//! [`modemly_core::CollectorConfig`] and a ready-to-use sink.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use modemly_core::{
    AnySink, CollectorConfig, CoreError, DEFAULT_WINDOW, DeviceTimezone, InfluxConfig, InfluxSink,
    JsonLinesSink, RetryPolicy, SinkError, TlsMode,
};

const KEYRING_SERVICE: &str = "modemly";
/// Factory password printed on the modem's label.
const FACTORY_PASSWORD: &str = "motorola";
const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("the {kind} sink needs `{field}` (set [sink].{field} or the environment)")]
    MissingSinkSetting {
        kind: &'static str,
        field: &'static str,
    },

    #[error(transparent)]
    Collector(#[from] CoreError),

    #[error("failed to build sink: {0}")]
    Sink(#[from] SinkError),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub modem: ModemSection,

    #[serde(default)]
    pub collector: CollectorSection,

    #[serde(default)]
    pub sink: SinkSection,
}

/// Where the modem is and how to log in.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModemSection {
    /// Hostname or IP, optionally with a scheme.
    pub host: String,

    pub scheme: String,

    pub username: String,

    /// Plaintext password (prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// `device` (accept the modem's self-signed certificate), `system`,
    /// or a path to a CA bundle.
    pub tls: String,

    pub timeout_secs: u64,

    /// Zone the device's log timestamps are written in.
    pub timezone: DeviceTimezone,
}

impl Default for ModemSection {
    fn default() -> Self {
        Self {
            host: "192.168.100.1".into(),
            scheme: "https".into(),
            username: "admin".into(),
            password: None,
            password_env: None,
            tls: "device".into(),
            timeout_secs: 30,
            timezone: DeviceTimezone::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorSection {
    pub interval_secs: u64,

    /// Event-log identities remembered between cycles.
    pub window: usize,

    pub retry_attempts: u32,

    pub retry_base_ms: u64,

    pub retry_max_ms: u64,

    /// Defaults to `cursor.json` in the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_path: Option<PathBuf>,
}

impl Default for CollectorSection {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            interval_secs: 300,
            window: DEFAULT_WINDOW,
            retry_attempts: retry.attempts,
            retry_base_ms: duration_ms(retry.base_delay),
            retry_max_ms: duration_ms(retry.max_delay),
            cursor_path: None,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Influx,
    Jsonl,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Influx => "influx",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkSection {
    pub kind: SinkKind,

    /// InfluxDB base URL.
    pub url: String,

    /// InfluxDB API token (plaintext; prefer `INFLUXDB_TOKEN` or keyring).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// JSON-lines output file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    pub timeout_secs: u64,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            url: "http://localhost:8086".into(),
            token: None,
            org: None,
            bucket: None,
            path: None,
            timeout_secs: 10,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "modemly")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "modemly", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for the cursor file and default JSON-lines output.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "modemly"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Environment names the original Python tooling read. Passwords are
/// deliberately absent: they go through [`resolve_password`].
const LEGACY_ENV: &[(&str, &str)] = &[
    ("MOTO_HOSTNAME", "modem.host"),
    ("MOTO_USERNAME", "modem.username"),
    ("INFLUXDB_URL", "sink.url"),
    ("INFLUXDB_TOKEN", "sink.token"),
    ("INFLUXDB_ORG", "sink.org"),
    ("INFLUXDB_BUCKET", "sink.bucket"),
];

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map_or_else(|| key.as_str().into(), |(_, path)| (*path).into())
    })
}

/// The full provider stack, lowest precedence first.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(legacy_env())
        .merge(Env::prefixed("MODEMLY_").split("__"))
}

/// Load the config from `path` (or the platform default) and environment.
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), exists = path.exists(), "loading configuration");
    Ok(figment(&path).extract()?)
}

// ── Credential resolution ───────────────────────────────────────────

/// Where the modem password came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    EnvVar(String),
    Keyring,
    ConfigFile,
    FactoryDefault,
}

impl std::fmt::Display for PasswordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(name) => write!(f, "environment (${name})"),
            Self::Keyring => f.write_str("system keyring"),
            Self::ConfigFile => f.write_str("config file"),
            Self::FactoryDefault => f.write_str("factory default"),
        }
    }
}

/// Keyring account holding the password for `host`.
pub fn keyring_account(host: &str) -> String {
    format!("{host}/password")
}

fn keyring_get(account: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, account)
        .and_then(|entry| entry.get_password())
        .ok()
}

/// Resolve the modem password: `password_env` → `MODEMLY_PASSWORD` →
/// `MOTO_PASSWORD` → keyring → plaintext config → factory default.
pub fn resolve_password(modem: &ModemSection) -> (SecretString, PasswordSource) {
    resolve_password_with(modem, |name| std::env::var(name).ok(), keyring_get)
}

fn resolve_password_with(
    modem: &ModemSection,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> (SecretString, PasswordSource) {
    let names = modem
        .password_env
        .as_deref()
        .into_iter()
        .chain(["MODEMLY_PASSWORD", "MOTO_PASSWORD"]);
    for name in names {
        if let Some(value) = env(name).filter(|v| !v.is_empty()) {
            return (
                SecretString::from(value),
                PasswordSource::EnvVar(name.to_owned()),
            );
        }
    }

    if let Some(value) = keyring(&keyring_account(&modem.host)) {
        return (SecretString::from(value), PasswordSource::Keyring);
    }

    if let Some(ref value) = modem.password {
        return (SecretString::from(value.clone()), PasswordSource::ConfigFile);
    }

    warn!(
        host = %modem.host,
        "no password configured, falling back to the factory default"
    );
    (
        SecretString::from(FACTORY_PASSWORD.to_owned()),
        PasswordSource::FactoryDefault,
    )
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Modem root URL. `host` may carry its own scheme.
    pub fn modem_url(&self) -> Result<Url, ConfigError> {
        let host = self.modem.host.trim().trim_end_matches('/');
        let raw = if host.contains("://") {
            host.to_owned()
        } else {
            format!("{}://{host}", self.modem.scheme)
        };
        Url::parse(&raw).map_err(|e| ConfigError::Validation {
            field: "modem.host".into(),
            reason: format!("{e}: {raw}"),
        })
    }

    pub fn tls_mode(&self) -> TlsMode {
        match self.modem.tls.trim() {
            "" | "device" => TlsMode::AcceptDeviceCertificate,
            "system" => TlsMode::System,
            path => TlsMode::CustomCa(PathBuf::from(path)),
        }
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.collector
            .cursor_path
            .clone()
            .unwrap_or_else(|| data_dir().join("cursor.json"))
    }

    /// Build a validated `CollectorConfig`, resolving the password.
    pub fn to_collector_config(&self) -> Result<CollectorConfig, ConfigError> {
        let (password, source) = resolve_password(&self.modem);
        debug!(%source, "resolved modem password");
        self.collector_config_with(password)
    }

    fn collector_config_with(&self, password: SecretString) -> Result<CollectorConfig, ConfigError> {
        let config = CollectorConfig {
            url: self.modem_url()?,
            username: self.modem.username.clone(),
            password,
            tls: self.tls_mode(),
            timeout: Duration::from_secs(self.modem.timeout_secs),
            interval: Duration::from_secs(self.collector.interval_secs),
            window: self.collector.window,
            retry: RetryPolicy {
                attempts: self.collector.retry_attempts,
                base_delay: Duration::from_millis(self.collector.retry_base_ms),
                max_delay: Duration::from_millis(self.collector.retry_max_ms),
            },
            timezone: self.modem.timezone,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build the configured sink.
    pub fn build_sink(&self) -> Result<AnySink, ConfigError> {
        match self.sink.kind {
            SinkKind::Influx => {
                let url = Url::parse(&self.sink.url).map_err(|e| ConfigError::Validation {
                    field: "sink.url".into(),
                    reason: format!("{e}: {}", self.sink.url),
                })?;
                let org = required(self.sink.org.as_deref(), "org")?;
                let bucket = required(self.sink.bucket.as_deref(), "bucket")?;
                let token = self
                    .sink
                    .token
                    .clone()
                    .or_else(|| keyring_get("influx/token"))
                    .ok_or(ConfigError::MissingSinkSetting {
                        kind: SinkKind::Influx.as_str(),
                        field: "token",
                    })?;
                let sink = InfluxSink::new(InfluxConfig {
                    url,
                    org,
                    bucket,
                    token: SecretString::from(token),
                    timeout: Duration::from_secs(self.sink.timeout_secs),
                })?;
                Ok(sink.into())
            }
            SinkKind::Jsonl => {
                let path = self
                    .sink
                    .path
                    .clone()
                    .unwrap_or_else(|| data_dir().join("modemly.jsonl"));
                Ok(JsonLinesSink::new(path).into())
            }
        }
    }

    /// Copy with every secret replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.modem.password.is_some() {
            config.modem.password = Some(REDACTED.into());
        }
        if config.sink.token.is_some() {
            config.sink.token = Some(REDACTED.into());
        }
        config
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(ConfigError::MissingSinkSetting {
            kind: SinkKind::Influx.as_str(),
            field,
        })
}
