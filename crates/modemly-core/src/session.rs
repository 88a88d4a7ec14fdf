// ── Session manager ──
//
// Owns the HNAP session for one device. The login exchange runs under a
// tokio mutex so concurrent fetches that all find the session missing
// trigger exactly one login. The lock is never held across status
// requests: callers clone the session out and release it immediately.

use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use modemly_api::{HnapClient, HnapSession};

use crate::error::AuthError;

/// Consecutive credential rejections tolerated before giving up.
const MAX_REJECTIONS: u32 = 2;

/// A session plus the generation it was issued in.
///
/// The generation lets a caller invalidate exactly the session it saw
/// rejected, never a newer one another task already replaced it with.
#[derive(Debug, Clone)]
pub struct ValidSession {
    pub session: HnapSession,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct SessionState {
    current: Option<HnapSession>,
    generation: u64,
}

/// Authentication lifecycle for the device.
pub struct SessionManager {
    client: HnapClient,
    username: String,
    password: SecretString,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(client: HnapClient, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            client,
            username: username.into(),
            password,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn client(&self) -> &HnapClient {
        &self.client
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Return the current session, logging in first if there is none.
    pub async fn ensure_session(&self) -> Result<ValidSession, AuthError> {
        let mut state = self.state.lock().await;
        if let Some(session) = &state.current {
            return Ok(ValidSession {
                session: session.clone(),
                generation: state.generation,
            });
        }
        self.login(&mut state).await
    }

    /// Drop the session issued in `generation`, if it is still current.
    ///
    /// Returns `true` when the session was actually cleared.
    pub async fn invalidate(&self, generation: u64) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != generation || state.current.is_none() {
            debug!(generation, current = state.generation, "stale invalidation ignored");
            return false;
        }
        debug!(generation, "session invalidated");
        state.current = None;
        true
    }

    /// Current generation, `0` before the first login.
    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    async fn login(&self, state: &mut SessionState) -> Result<ValidSession, AuthError> {
        let mut rejections = 0;
        loop {
            match self.client.login(&self.username, &self.password).await {
                Ok(outcome) => {
                    state.generation += 1;
                    state.current = Some(outcome.session.clone());
                    info!(
                        username = %self.username,
                        generation = state.generation,
                        "logged in to device"
                    );
                    return Ok(ValidSession {
                        session: outcome.session,
                        generation: state.generation,
                    });
                }
                Err(e) if e.is_credentials_rejected() => {
                    rejections += 1;
                    if rejections >= MAX_REJECTIONS {
                        error!(username = %self.username, "device rejected credentials again, giving up");
                        return Err(AuthError::CredentialsRejected {
                            username: self.username.clone(),
                            attempts: rejections,
                        });
                    }
                    warn!(error = %e, "device rejected login, retrying once");
                }
                Err(e) => return Err(AuthError::Unreachable(e)),
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.client.base_url().as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
