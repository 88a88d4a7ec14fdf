// HNAP HTTP client
//
// Wraps `reqwest::Client` with HNAP request signing and response
// envelope unwrapping. Login and the status actions are implemented as
// inherent methods in sibling modules to keep this one focused on
// transport mechanics.

use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::Url;

use crate::auth::{ANONYMOUS_KEY, HnapSession, hnap_auth_header, hnap_timestamp, soap_action};
use crate::error::Error;
use crate::hnap::models::{Action, ActionResult, find_str, take_field};
use crate::transport::TransportConfig;

const HNAP_PATH: &str = "/HNAP1/";

/// Raw HTTP client for the modem's HNAP interface.
///
/// Stateless with respect to authentication: callers pass the
/// [`HnapSession`] they hold into every request. All methods return the
/// unwrapped `<Action>Response` object -- the envelope is stripped
/// before the caller sees it.
#[derive(Debug, Clone)]
pub struct HnapClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HnapClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// The `base_url` is the modem root, e.g. `https://192.168.100.1`.
    /// TLS relaxation from the config applies to this client only.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The modem base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The HNAP endpoint URL.
    pub fn endpoint(&self) -> Result<Url, Error> {
        Ok(self.base_url.join(HNAP_PATH)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Issue an action and return its response object after checking
    /// `<Action>Result`.
    pub async fn call(
        &self,
        action: Action,
        params: Value,
        session: Option<&HnapSession>,
    ) -> Result<Map<String, Value>, Error> {
        let response = self.call_raw(action, params, session).await?;

        match find_str(&response, &action.result_key()).map(ActionResult::parse) {
            Some(ActionResult::Unauthenticated) => Err(Error::SessionExpired),
            Some(ActionResult::Failed(result)) => Err(Error::Hnap {
                action: action.to_string(),
                result,
            }),
            Some(ActionResult::Ok) | None => Ok(response),
        }
    }

    /// Issue an action and return its response object without
    /// interpreting `<Action>Result`.
    pub(crate) async fn call_raw(
        &self,
        action: Action,
        params: Value,
        session: Option<&HnapSession>,
    ) -> Result<Map<String, Value>, Error> {
        let url = self.endpoint()?;
        let signing_key = session.map_or(ANONYMOUS_KEY, HnapSession::signing_key);

        let mut body = Map::new();
        body.insert(action.as_str().to_owned(), params);

        debug!(%action, "POST {}", url);

        let auth = hnap_auth_header(signing_key, action.as_str(), hnap_timestamp())?;
        let mut builder = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header("SOAPAction", soap_action(action.as_str()))
            .header("HNAP_AUTH", auth)
            .body(Value::Object(body).to_string());

        if let Some(session) = session {
            builder = builder.header(COOKIE, session.cookie_header());
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        parse_envelope(action, resp).await
    }
}

/// Strip the `{ "<Action>Response": { ... } }` envelope.
///
/// Auth rejections arrive three ways depending on firmware: HTTP
/// 401/403, an HTML login page with HTTP 200, or `<Action>Result`
/// of `UN-AUTH` (handled by [`HnapClient::call`]).
async fn parse_envelope(
    action: Action,
    resp: reqwest::Response,
) -> Result<Map<String, Value>, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::SessionExpired);
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    let trimmed = body.trim();
    trace!(%action, bytes = trimmed.len(), "response body received");

    if trimmed.starts_with('<') {
        debug!(%action, "device answered with markup, treating as login redirect");
        return Err(Error::SessionExpired);
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(trimmed)),
        body: body.clone(),
    })?;

    let Value::Object(mut envelope) = value else {
        return Err(Error::Deserialization {
            message: "expected a JSON object".into(),
            body,
        });
    };

    match take_field(&mut envelope, &action.response_key()) {
        Some(Value::Object(response)) => Ok(response),
        _ => Err(Error::MissingField {
            action: action.to_string(),
            field: action.response_key(),
        }),
    }
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
