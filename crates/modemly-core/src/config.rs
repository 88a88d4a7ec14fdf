// ── Runtime collector configuration ──
//
// Describes *what* to poll and *how often*. Carries credentials and
// tuning but never touches disk; `modemly-config` resolves files, env,
// and keyring into one of these and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use modemly_api::{TlsMode, TransportConfig};

use crate::cursor::DEFAULT_WINDOW;
use crate::error::CoreError;
use crate::fetch::RetryPolicy;
use crate::parse::DeviceTimezone;

/// Everything the collector needs to talk to one modem.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Modem root, e.g. `https://192.168.100.1`.
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsMode,
    /// Per-request timeout. Must be shorter than `interval`.
    pub timeout: Duration,
    /// Time between cycle starts.
    pub interval: Duration,
    /// Identities remembered by the cursor.
    pub window: usize,
    pub retry: RetryPolicy,
    pub timezone: DeviceTimezone,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("https://192.168.100.1").expect("static URL is valid"),
            username: "admin".into(),
            password: SecretString::from("motorola".to_owned()),
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
            interval: Duration::from_secs(300),
            window: DEFAULT_WINDOW,
            retry: RetryPolicy::default(),
            timezone: DeviceTimezone::default(),
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.timeout >= self.interval {
            return Err(invalid(format!(
                "request timeout ({}s) must be shorter than the poll interval ({}s)",
                self.timeout.as_secs_f64(),
                self.interval.as_secs_f64()
            )));
        }
        if self.timeout.is_zero() {
            return Err(invalid("request timeout must be non-zero".into()));
        }
        if self.window == 0 {
            return Err(invalid("cursor window must hold at least one entry".into()));
        }
        if self.retry.attempts == 0 {
            return Err(invalid("retry attempts must be at least 1".into()));
        }
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "modem URL must be http or https, got '{}'",
                self.url
            )));
        }
        Ok(())
    }

    /// Transport settings for the device client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
            connect_timeout: self.timeout.min(Duration::from_secs(10)),
        }
    }
}

fn invalid(message: String) -> CoreError {
    CoreError::Config { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CollectorConfig::default().validate().is_ok());
    }

    #[test]
    fn timeout_must_undercut_interval() {
        let config = CollectorConfig {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(60),
            ..CollectorConfig::default()
        };
        let err = config.validate().expect_err("invalid");
        assert!(err.to_string().contains("shorter than the poll interval"));
        assert!(err.is_fatal());
    }

    #[test]
    fn zero_window_and_attempts_rejected() {
        let config = CollectorConfig {
            window: 0,
            ..CollectorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CollectorConfig {
            retry: RetryPolicy {
                attempts: 0,
                ..RetryPolicy::default()
            },
            ..CollectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn transport_carries_timeout() {
        let config = CollectorConfig {
            timeout: Duration::from_secs(5),
            ..CollectorConfig::default()
        };
        let transport = config.transport();
        assert_eq!(transport.timeout, Duration::from_secs(5));
        assert_eq!(transport.connect_timeout, Duration::from_secs(5));
        assert_eq!(transport.tls, TlsMode::AcceptDeviceCertificate);
    }
}
