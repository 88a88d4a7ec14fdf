#![allow(clippy::unwrap_used, dead_code)]
// Shared fixtures: a wiremock stand-in for the modem's HNAP endpoint.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modemly_core::{CollectorConfig, RetryPolicy};

pub const LOG: &str = "\
    10:00:00^Sun Mar 01 2026\n^Notice (6)^Honoring MDD; IP provisioning mode = IPv6}-{\
    10:05:00^Sun Mar 01 2026\n^Warning (5)^Dynamic Range Window violation}-{\
    Time Not Established^Critical (3)^No Ranging Response received - T3 time-out";

pub const REBOOTED_LOG: &str = "\
    Time Not Established^Critical (3)^Started Unicast Maintenance Ranging - No Response}-{\
    00:00:40^Sun Mar 01 2026\n^Notice (6)^Cable Modem Reboot because of - power on";

pub const DOWNSTREAM: &str = "1^Locked^QAM256^20^573.0^3.1^40.9^5^0^|+|\
    2^Locked^QAM256^1^477.0^2.4^40.3^12^3^";

pub const UPSTREAM: &str = "1^Locked^SC-QAM^2^5120^35.6^44.3^";

pub fn soap(action: &str) -> String {
    format!("http://purenetworks.com/HNAP1/{action}")
}

pub fn config(server: &MockServer) -> CollectorConfig {
    CollectorConfig {
        url: Url::parse(&server.uri()).unwrap(),
        username: "admin".into(),
        password: SecretString::from("motorola".to_owned()),
        timeout: Duration::from_secs(5),
        interval: Duration::from_secs(60),
        retry: RetryPolicy {
            attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
        ..CollectorConfig::default()
    }
}

/// Both login phases succeed with the same response.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(header("SOAPAction", soap("Login").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoginResponse": {
                "Challenge": "CHALLENGE",
                "Cookie": "uid-1",
                "PublicKey": "PUBKEY",
                "LoginResult": "OK"
            }
        })))
        .mount(server)
        .await;
}

/// The challenge succeeds but the password is refused.
pub async fn mount_rejecting_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(header("SOAPAction", soap("Login").as_str()))
        .and(body_partial_json(json!({ "Login": { "Action": "request" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoginResponse": {
                "Challenge": "CHALLENGE",
                "Cookie": "uid-1",
                "PublicKey": "PUBKEY",
                "LoginResult": "OK"
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(header("SOAPAction", soap("Login").as_str()))
        .and(body_partial_json(json!({ "Login": { "Action": "login" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoginResponse": { "LoginResult": "FAILED" }
        })))
        .mount(server)
        .await;
}

pub fn table_response(action: &str, field: &str, table: &str) -> ResponseTemplate {
    let mut inner = serde_json::Map::new();
    inner.insert(field.to_owned(), json!(table));
    inner.insert(format!("{action}Result"), json!("OK"));
    let mut outer = serde_json::Map::new();
    outer.insert(format!("{action}Response"), serde_json::Value::Object(inner));
    ResponseTemplate::new(200).set_body_json(serde_json::Value::Object(outer))
}

pub async fn mount_table(server: &MockServer, action: &str, field: &str, table: &str) {
    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(header("SOAPAction", soap(action).as_str()))
        .respond_with(table_response(action, field, table))
        .mount(server)
        .await;
}

pub async fn mount_log(server: &MockServer, log: &str) {
    mount_table(server, "GetMotoStatusLog", "MotoStatusLogList", log).await;
}

pub async fn mount_channels(server: &MockServer) {
    mount_table(
        server,
        "GetMotoStatusDownstreamChannelInfo",
        "MotoConnDownstreamChannel",
        DOWNSTREAM,
    )
    .await;
    mount_table(
        server,
        "GetMotoStatusUpstreamChannelInfo",
        "MotoConnUpstreamChannel",
        UPSTREAM,
    )
    .await;
}

/// A healthy modem with the given event log.
pub async fn mount_device(server: &MockServer, log: &str) {
    mount_login(server).await;
    mount_log(server, log).await;
    mount_channels(server).await;
}

/// Count requests that carried a given SOAP action.
pub async fn requests_for(server: &MockServer, action: &str) -> usize {
    let expected = soap(action);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| {
            req.headers
                .get("SOAPAction")
                .and_then(|v| v.to_str().ok())
                == Some(expected.as_str())
        })
        .count()
}
