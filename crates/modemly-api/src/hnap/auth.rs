// HNAP login challenge
//
// Two-phase login: `Action: request` returns a public key, challenge,
// and session cookie; `Action: login` answers the challenge with an
// HMAC chain derived from the password. The resulting session material
// is handed back to the caller rather than stored here.

use secrecy::SecretString;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::auth::{HnapSession, derive_private_key, login_password};
use crate::error::Error;
use crate::hnap::client::HnapClient;
use crate::hnap::models::{Action, ActionResult, find_str};

/// What a successful login hands back.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: HnapSession,
    /// Raw `LoginResult` reported by the device, when present.
    pub result: Option<String>,
}

impl HnapClient {
    /// Authenticate with the modem using username/password.
    ///
    /// Credential rejection at either phase (a non-OK `LoginResult`, or
    /// an HTTP 401/403) is reported as [`Error::Authentication`]; other
    /// failures keep their transport classification so callers can
    /// retry them.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<LoginOutcome, Error> {
        debug!(username, "requesting login challenge");

        let challenge = self
            .call_raw(Action::Login, login_params("request", username, ""), None)
            .await
            .map_err(rejection_as_auth)?;
        check_login_result(&challenge)?;

        let public_key = required(&challenge, "PublicKey")?;
        let nonce = required(&challenge, "Challenge")?;
        let uid = required(&challenge, "Cookie")?;

        let private_key = derive_private_key(public_key, password, nonce)?;
        let answer = login_password(&private_key, nonce)?;
        let session = HnapSession::new(uid, private_key);

        let response = self
            .call_raw(
                Action::Login,
                login_params("login", username, &answer),
                Some(&session),
            )
            .await
            .map_err(rejection_as_auth)?;
        let result = check_login_result(&response)?;

        debug!("login successful");
        Ok(LoginOutcome { session, result })
    }
}

fn login_params(phase: &str, username: &str, password: &str) -> Value {
    json!({
        "Action": phase,
        "Captcha": "",
        "LoginPassword": password,
        "PrivateLogin": "LoginPassword",
        "Username": username,
    })
}

fn required<'a>(response: &'a Map<String, Value>, field: &str) -> Result<&'a str, Error> {
    find_str(response, field).ok_or_else(|| Error::MissingField {
        action: Action::Login.to_string(),
        field: field.to_owned(),
    })
}

fn check_login_result(response: &Map<String, Value>) -> Result<Option<String>, Error> {
    let Some(raw) = find_str(response, &Action::Login.result_key()) else {
        return Ok(None);
    };
    match ActionResult::parse(raw) {
        ActionResult::Ok => Ok(Some(raw.to_owned())),
        ActionResult::Unauthenticated | ActionResult::Failed(_) => Err(Error::Authentication {
            message: format!("device returned LoginResult={raw}"),
        }),
    }
}

fn rejection_as_auth(err: Error) -> Error {
    match err {
        Error::SessionExpired => Error::Authentication {
            message: "login rejected by device (HTTP 401/403 or login page)".into(),
        },
        other => other,
    }
}
