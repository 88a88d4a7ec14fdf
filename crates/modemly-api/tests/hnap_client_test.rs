#![allow(clippy::unwrap_used)]
// Integration tests for `HnapClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modemly_api::{Action, Error, HnapClient, HnapSession};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HnapClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = HnapClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn soap(action: &str) -> String {
    format!("http://purenetworks.com/HNAP1/{action}")
}

fn session() -> HnapSession {
    HnapSession::new("uid-123", SecretString::from("PRIVKEY".to_owned()))
}

async fn mount_challenge(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(header("SOAPAction", soap("Login").as_str()))
        .and(body_partial_json(json!({ "Login": { "Action": "request" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoginResponse": {
                "Challenge": "CHALLENGE",
                "Cookie": "uid-123",
                "PublicKey": "PUBKEY",
                "LoginResult": "OK"
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;
    mount_challenge(&server).await;

    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(body_partial_json(json!({ "Login": { "Action": "login", "Username": "admin" } })))
        .and(header_exists("HNAP_AUTH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoginResponse": { "LoginResult": "OK" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let password = SecretString::from("motorola".to_owned());
    let outcome = client.login("admin", &password).await.unwrap();

    assert_eq!(outcome.session.uid(), "uid-123");
    assert_eq!(outcome.result.as_deref(), Some("OK"));
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;
    mount_challenge(&server).await;

    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(body_partial_json(json!({ "Login": { "Action": "login" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoginResponse": { "LoginResult": "FAILED" }
        })))
        .mount(&server)
        .await;

    let password = SecretString::from("wrong".to_owned());
    let result = client.login("admin", &password).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_http_403_is_rejection() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let password = SecretString::from("motorola".to_owned());
    let result = client.login("admin", &password).await;

    assert!(matches!(result, Err(Error::Authentication { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_login_missing_challenge_field() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoginResponse": { "Cookie": "uid", "PublicKey": "PK", "LoginResult": "OK" }
        })))
        .mount(&server)
        .await;

    let password = SecretString::from("motorola".to_owned());
    match client.login("admin", &password).await {
        Err(Error::MissingField { field, .. }) => assert_eq!(field, "Challenge"),
        other => panic!("expected MissingField, got: {other:?}"),
    }
}

// ── Status tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_log_sends_session_cookies() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(header("SOAPAction", soap("GetMotoStatusLog").as_str()))
        .and(header("Cookie", "uid=uid-123; PrivateKey=PRIVKEY"))
        .and(body_partial_json(json!({ "GetMotoStatusLog": {} })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "GetMotoStatusLogResponse": {
                "MotoStatusLogList": "12:00:00^Thu Jan 01 2026\n^Notice (6)^hello",
                "GetMotoStatusLogResult": "OK"
            }
        })))
        .mount(&server)
        .await;

    let log = client.get_status_log(&session()).await.unwrap();
    assert!(log.ends_with("hello"));
}

#[tokio::test]
async fn test_channel_field_case_drift() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(header(
            "SOAPAction",
            soap("GetMotoStatusDownstreamChannelInfo").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "getmotostatusdownstreamchannelinforesponse": {
                "motoconndownstreamchannel": "1^Locked^QAM256^20^573.0^3.1^40.9^5^0^"
            }
        })))
        .mount(&server)
        .await;

    let table = client.get_downstream_channels(&session()).await.unwrap();
    assert!(table.starts_with("1^Locked"));
}

#[tokio::test]
async fn test_get_multiple() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(header("SOAPAction", soap("GetMultipleHNAPs").as_str()))
        .and(body_partial_json(json!({
            "GetMultipleHNAPs": { "GetMotoStatusSoftware": "", "GetHomeAddress": "" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "GetMultipleHNAPsResponse": {
                "GetMotoStatusSoftwareResponse": { "StatusSoftwareSfVer": "8600-19.3.18" },
                "GetHomeAddressResponse": { "MotoHomeIpAddress": "203.0.113.7" },
                "GetMultipleHNAPsResult": "OK"
            }
        })))
        .mount(&server)
        .await;

    let data = client
        .get_multiple(
            &[Action::GetMotoStatusSoftware, Action::GetHomeAddress],
            &session(),
        )
        .await
        .unwrap();
    assert!(data.contains_key("GetMotoStatusSoftwareResponse"));
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauth_result_is_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "GetMotoStatusLogResponse": { "GetMotoStatusLogResult": "UN-AUTH" }
        })))
        .mount(&server)
        .await;

    let result = client.get_status_log(&session()).await;
    assert!(matches!(result, Err(Error::SessionExpired)), "got: {result:?}");
    assert!(result.unwrap_err().is_auth_expired());
}

#[tokio::test]
async fn test_http_401_is_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.get_upstream_channels(&session()).await;
    assert!(matches!(result, Err(Error::SessionExpired)), "got: {result:?}");
}

#[tokio::test]
async fn test_login_page_is_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>Login.html</body></html>"),
        )
        .mount(&server)
        .await;

    let result = client.get_status_log(&session()).await;
    assert!(matches!(result, Err(Error::SessionExpired)), "got: {result:?}");
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = client.get_status_log(&session()).await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, .. }), "got: {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_failed_result_is_hnap_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "GetMotoStatusLogResponse": { "GetMotoStatusLogResult": "ERROR" }
        })))
        .mount(&server)
        .await;

    match client.get_status_log(&session()).await {
        Err(Error::Hnap { action, result }) => {
            assert_eq!(action, "GetMotoStatusLog");
            assert_eq!(result, "ERROR");
        }
        other => panic!("expected Hnap error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Unrelated": {} })))
        .mount(&server)
        .await;

    let result = client.get_status_log(&session()).await;
    assert!(matches!(result, Err(Error::MissingField { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_garbage_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client.get_status_log(&session()).await;
    assert!(matches!(result, Err(Error::Deserialization { .. })), "got: {result:?}");
}
