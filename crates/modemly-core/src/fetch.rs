// ── Fetcher ──
//
// Pulls the three raw resources through the session manager. Each
// attempt may re-authenticate once when the device says the session is
// gone; transient failures are retried with capped exponential backoff.
// Running out of attempts costs the resource one cycle, nothing more.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use strum::Display;
use tracing::{debug, warn};

use modemly_api::{HnapClient, HnapSession};

use crate::error::{AuthError, FetchError};
use crate::session::SessionManager;

/// Something the collector fetches each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Resource {
    EventLog,
    Downstream,
    Upstream,
}

/// A resource exactly as the device returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub resource: Resource,
    pub body: String,
    pub collected_at: DateTime<Utc>,
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (zero-based): base, 2×base, 4×base …
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Final failure of a retried operation and how many attempts it took.
#[derive(Debug)]
pub(crate) struct GaveUp<E> {
    pub error: E,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
pub(crate) async fn retry<T, E, Op, Fut>(
    policy: RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut op: Op,
) -> Result<T, GaveUp<E>>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < attempts && is_transient(&error) => {
                let delay = policy.delay_for(attempt - 1);
                warn!(%error, attempt, ?delay, "transient failure, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                return Err(GaveUp {
                    error,
                    attempts: attempt,
                });
            }
        }
    }
}

/// One attempt's failure, before classification into `FetchError`.
#[derive(Debug)]
enum Failure {
    Session(AuthError),
    Device(modemly_api::Error),
}

impl Failure {
    fn is_transient(&self) -> bool {
        match self {
            Self::Session(AuthError::Unreachable(e)) | Self::Device(e) => e.is_transient(),
            Self::Session(AuthError::CredentialsRejected { .. }) => false,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session(e) => e.fmt(f),
            Self::Device(e) => e.fmt(f),
        }
    }
}

/// Results of one concurrent fetch of every resource.
#[derive(Debug)]
pub struct FetchBatch {
    pub event_log: Result<RawPayload, FetchError>,
    pub downstream: Result<RawPayload, FetchError>,
    pub upstream: Result<RawPayload, FetchError>,
}

impl FetchBatch {
    pub fn iter(&self) -> impl Iterator<Item = (Resource, &Result<RawPayload, FetchError>)> {
        [
            (Resource::EventLog, &self.event_log),
            (Resource::Downstream, &self.downstream),
            (Resource::Upstream, &self.upstream),
        ]
        .into_iter()
    }
}

/// Authenticated, retrying access to the device's status resources.
#[derive(Debug, Clone)]
pub struct Fetcher {
    session: Arc<SessionManager>,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(session: Arc<SessionManager>, retry: RetryPolicy) -> Self {
        Self { session, retry }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn client(&self) -> &HnapClient {
        self.session.client()
    }

    /// Fetch one resource.
    pub async fn fetch(&self, resource: Resource) -> Result<RawPayload, FetchError> {
        let result = retry(self.retry, Failure::is_transient, move || {
            self.fetch_with_reauth(resource)
        })
        .await;

        match result {
            Ok(body) => {
                debug!(%resource, bytes = body.len(), "fetched");
                Ok(RawPayload {
                    resource,
                    body,
                    collected_at: Utc::now(),
                })
            }
            Err(GaveUp {
                error: Failure::Session(e @ AuthError::CredentialsRejected { .. }),
                ..
            }) => Err(FetchError::Auth(e)),
            Err(GaveUp {
                error: Failure::Session(AuthError::Unreachable(source)) | Failure::Device(source),
                attempts,
            }) => Err(FetchError::Device {
                resource,
                attempts,
                source,
            }),
        }
    }

    /// Fetch every resource concurrently over the shared session.
    pub async fn fetch_all(&self) -> FetchBatch {
        let (event_log, downstream, upstream) = tokio::join!(
            self.fetch(Resource::EventLog),
            self.fetch(Resource::Downstream),
            self.fetch(Resource::Upstream),
        );
        FetchBatch {
            event_log,
            downstream,
            upstream,
        }
    }

    /// One attempt: request, and on a rejected session log in again and
    /// repeat the request once.
    async fn fetch_with_reauth(&self, resource: Resource) -> Result<String, Failure> {
        let valid = self.session.ensure_session().await.map_err(Failure::Session)?;
        match self.request(resource, &valid.session).await {
            Err(e) if e.is_auth_expired() => {
                warn!(%resource, generation = valid.generation, "session rejected, re-authenticating");
                self.session.invalidate(valid.generation).await;
                let fresh = self.session.ensure_session().await.map_err(Failure::Session)?;
                self.request(resource, &fresh.session)
                    .await
                    .map_err(Failure::Device)
            }
            other => other.map_err(Failure::Device),
        }
    }

    async fn request(
        &self,
        resource: Resource,
        session: &HnapSession,
    ) -> Result<String, modemly_api::Error> {
        let client = self.client();
        match resource {
            Resource::EventLog => client.get_status_log(session).await,
            Resource::Downstream => client.get_downstream_channels(session).await,
            Resource::Upstream => client.get_upstream_channels(session).await,
        }
    }
}
