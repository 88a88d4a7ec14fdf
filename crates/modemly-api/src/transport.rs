// Transport configuration for building the device's reqwest::Client.
//
// The modem serves a self-signed certificate after redirecting HTTP to
// HTTPS. Certificate relaxation lives here and only here: it is applied
// to the one client built for the device and never to any other client
// in the process (the InfluxDB sink builds its own strict client).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("modemly/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode for the device connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept the device's self-signed certificate. Scoped to the
    /// client built from this config.
    #[default]
    AcceptDeviceCertificate,
}

/// Transport configuration for the device HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Per-request timeout. Must stay below the poll interval so a hung
    /// request cannot starve later cycles.
    pub timeout: Duration,
    /// Connect timeout, kept separate so a dead link fails fast.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::AcceptDeviceCertificate,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::AcceptDeviceCertificate => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
