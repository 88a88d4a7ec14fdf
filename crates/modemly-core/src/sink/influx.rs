// InfluxDB v2 sink.
//
// Uses its own strict reqwest client: the device's certificate
// relaxation never applies here.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use super::line_protocol::{event_point, signal_point};
use super::{Batch, Sink};
use crate::error::SinkError;

/// Connection details for an InfluxDB v2 bucket.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: Url,
    pub org: String,
    pub bucket: String,
    pub token: SecretString,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct InfluxSink {
    http: reqwest::Client,
    write_url: Url,
    token: SecretString,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("modemly/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(http, config)
    }

    /// Build with a pre-configured `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, config: InfluxConfig) -> Result<Self, SinkError> {
        let mut write_url = config.url.clone();
        write_url
            .path_segments_mut()
            .map_err(|()| SinkError::InvalidUrl {
                url: config.url.to_string(),
            })?
            .pop_if_empty()
            .extend(["api", "v2", "write"]);
        write_url
            .query_pairs_mut()
            .append_pair("org", &config.org)
            .append_pair("bucket", &config.bucket)
            .append_pair("precision", "ns");

        Ok(Self {
            http,
            write_url,
            token: config.token,
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    /// Encode a batch as newline-separated line protocol.
    pub fn encode(batch: &Batch) -> String {
        let signals = batch.signals.iter().map(signal_point);
        let events = batch.events.iter().map(event_point);
        signals
            .chain(events)
            .filter_map(|point| point.render())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Sink for InfluxSink {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    async fn persist(&self, batch: &Batch) -> Result<(), SinkError> {
        if batch.is_empty() {
            return Ok(());
        }
        let body = Self::encode(batch);
        debug!(points = batch.len(), bytes = body.len(), "writing to InfluxDB");

        let resp = self
            .http
            .post(self.write_url.clone())
            .header(
                AUTHORIZATION,
                format!("Token {}", self.token.expose_secret()),
            )
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let message = resp.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %message, "InfluxDB rejected write");
        Err(SinkError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
