#![allow(clippy::unwrap_used)]
// Sink writers against a wiremock InfluxDB and a temp directory.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modemly_core::{
    Batch, Direction, EventLogEntry, InfluxConfig, InfluxSink, JsonLinesSink, Severity,
    SignalReading, Sink, SinkError,
};

fn collected_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T10:10:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn batch() -> Batch {
    Batch {
        signals: vec![SignalReading {
            direction: Direction::Downstream,
            channel: 1,
            channel_id: 20,
            lock_status: "Locked".into(),
            modulation: "QAM256".into(),
            frequency_hz: 573_000_000,
            power_dbmv: 3.1,
            snr_db: Some(40.9),
            symbol_rate_ksps: None,
            corrected: Some(5),
            uncorrected: Some(0),
            collected_at: collected_at(),
        }],
        events: vec![EventLogEntry {
            sequence: 0,
            device_time_raw: "Time Not Established".into(),
            device_time: None,
            severity: Severity::Critical,
            message: "No Ranging Response received - T3 time-out".into(),
            collected_at: collected_at(),
        }],
    }
}

fn influx_config(server: &MockServer) -> InfluxConfig {
    InfluxConfig {
        url: Url::parse(&server.uri()).unwrap(),
        org: "home".into(),
        bucket: "modem".into(),
        token: SecretString::from("s3cr3t".to_owned()),
        timeout: Duration::from_secs(5),
    }
}

// ── InfluxDB ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_influx_writes_line_protocol() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .and(query_param("org", "home"))
        .and(query_param("bucket", "modem"))
        .and(query_param("precision", "ns"))
        .and(header("Authorization", "Token s3cr3t"))
        .and(body_string_contains("downstream,channel=1,channel_id=20"))
        .and(body_string_contains("log,level=critical,key="))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = InfluxSink::new(influx_config(&server)).unwrap();
    sink.persist(&batch()).await.unwrap();
}

#[tokio::test]
async fn test_influx_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized access"))
        .mount(&server)
        .await;

    let sink = InfluxSink::new(influx_config(&server)).unwrap();
    let err = sink.persist(&batch()).await.unwrap_err();
    match err {
        SinkError::Rejected { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "unauthorized access");
        }
        other => panic!("expected Rejected, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_influx_skips_empty_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let sink = InfluxSink::new(influx_config(&server)).unwrap();
    sink.persist(&Batch::default()).await.unwrap();
}

// ── JSON lines ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_jsonl_appends_across_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("modem.jsonl");
    let sink = JsonLinesSink::new(&path);

    sink.persist(&batch()).await.unwrap();
    sink.persist(&batch()).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["record"], "signal");
    assert_eq!(lines[0]["direction"], "downstream");
    assert_eq!(lines[0]["frequency_hz"], 573_000_000);
    assert_eq!(lines[1]["record"], "event");
    assert_eq!(
        lines[1]["message"],
        "No Ranging Response received - T3 time-out"
    );
    assert_eq!(lines[2]["record"], "signal");
}
