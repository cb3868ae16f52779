// crates/mailbeacon-server/tests/http_tracking.rs
// ============================================================================
// Module: Tracking HTTP Tests
// Description: End-to-end tests for marker, redirect, and ingestion routes.
// Purpose: Validate benign fallbacks, deduplication, and ingestion auth over HTTP.
// Dependencies: mailbeacon-server, mailbeacon-config, mailbeacon-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! Starts a tracking server on an ephemeral port and drives it with a real
//! HTTP client. Redirects are never followed so `Location` can be asserted.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use mailbeacon_config::AuditSinkKind;
use mailbeacon_config::MailBeaconConfig;
use mailbeacon_config::RateLimitBackend;
use mailbeacon_config::ServerAuthConfig;
use mailbeacon_config::StoreType;
use mailbeacon_core::MessageStatus;
use mailbeacon_core::OutboundMessageRecord;
use mailbeacon_core::RejectReason;
use mailbeacon_core::SharedTrackingStore;
use mailbeacon_core::Timestamp;
use mailbeacon_core::TrackingStore;
use mailbeacon_core::derive_identity;
use mailbeacon_server::MARKER_GIF;
use mailbeacon_server::TrackerServer;
use reqwest::StatusCode;
use reqwest::redirect::Policy;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn memory_config() -> MailBeaconConfig {
    let mut config = MailBeaconConfig::default();
    config.audit.sink = AuditSinkKind::None;
    config
}

async fn spawn(config: MailBeaconConfig) -> (String, SharedTrackingStore) {
    let server = TrackerServer::from_config(config).expect("server init");
    let store = server.store();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    tokio::spawn(server.serve_listener(listener));
    (base, store)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().redirect(Policy::none()).build().expect("client")
}

fn seed(store: &SharedTrackingStore, subject: &str, recipient: &str) -> OutboundMessageRecord {
    let record = OutboundMessageRecord::sent(
        derive_identity(subject, recipient),
        subject,
        recipient,
        Timestamp::now(),
    );
    store.insert_message(&record).expect("seed");
    record
}

async fn fetch_marker(base: &str, identity: &str, origin: &str) -> reqwest::Response {
    client()
        .get(format!("{base}/track/pixel/{identity}"))
        .header("x-forwarded-for", origin)
        .header("user-agent", "Mail/1.0")
        .send()
        .await
        .expect("marker request")
}

// ============================================================================
// SECTION: Marker Endpoint
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn marker_records_once_per_origin_within_window() {
    let (base, store) = spawn(memory_config()).await;
    let record = seed(&store, "Q3 Report", "a@x.com");

    let first = fetch_marker(&base, record.id.as_str(), "198.51.100.7").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["content-type"], "image/gif");
    assert_eq!(first.headers()["content-length"], "43");
    assert_eq!(first.headers()["cache-control"], "no-store, no-cache, must-revalidate");
    assert_eq!(first.headers()["access-control-allow-origin"], "*");
    assert_eq!(first.bytes().await.unwrap().as_ref(), MARKER_GIF.as_slice());

    let repeat = fetch_marker(&base, record.id.as_str(), "198.51.100.7").await;
    assert_eq!(repeat.status(), StatusCode::OK);
    assert_eq!(repeat.bytes().await.unwrap().as_ref(), MARKER_GIF.as_slice());

    let other = fetch_marker(&base, record.id.as_str(), "203.0.113.1").await;
    assert_eq!(other.status(), StatusCode::OK);

    let opens = store.open_events(&record.id).unwrap();
    assert_eq!(opens.len(), 2);
    assert_eq!(opens[0].origin.as_str(), "198.51.100.7");
    assert_eq!(opens[0].user_agent, "Mail/1.0");
    assert_eq!(opens[1].origin.as_str(), "203.0.113.1");
    assert_eq!(store.load_message(&record.id).unwrap().unwrap().status, MessageStatus::Opened);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn marker_for_unknown_identity_serves_image_and_records_nothing() {
    let (base, store) = spawn(memory_config()).await;
    let identity = derive_identity("Never", "sent@x.com");
    let response = fetch_marker(&base, identity.as_str(), "198.51.100.7").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().as_ref(), MARKER_GIF.as_slice());
    assert!(store.open_events(&identity).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn marker_without_identity_still_serves_image() {
    let (base, _store) = spawn(memory_config()).await;
    for path in ["/track/pixel", "/track/pixel/"] {
        let response = client().get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/gif");
        assert_eq!(response.bytes().await.unwrap().len(), 43);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn preflight_returns_cors_headers() {
    let (base, _store) = spawn(memory_config()).await;
    for path in ["/track/pixel/email_x", "/track/link"] {
        let response =
            client().request(reqwest::Method::OPTIONS, format!("{base}{path}")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(response.headers()["access-control-max-age"], "86400");
    }
}

// ============================================================================
// SECTION: Redirect Endpoint
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn redirect_for_unknown_identity_still_redirects() {
    let (base, store) = spawn(memory_config()).await;
    let identity = derive_identity("Missing", "nobody@x.com");
    let response = client()
        .get(format!("{base}/track/link"))
        .query(&[("url", "https://example.com"), ("emailId", identity.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "https://example.com");
    assert_eq!(response.headers()["pragma"], "no-cache");
    assert!(store.click_events(&identity).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn redirect_without_url_is_a_client_error() {
    let (base, _store) = spawn(memory_config()).await;
    let response =
        client().get(format!("{base}/track/link?emailId=email_abc")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("location").is_none());
    assert_eq!(response.text().await.unwrap(), "URL and email ID required");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn redirect_without_identity_is_a_client_error() {
    let (base, store) = spawn(memory_config()).await;
    let record = seed(&store, "Links", "b@y.com");
    let response = client()
        .get(format!("{base}/track/link"))
        .query(&[("url", "https://example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("location").is_none());
    assert_eq!(response.text().await.unwrap(), RejectReason::MESSAGE);
    assert!(store.click_events(&record.id).unwrap().is_empty());
    assert_eq!(store.load_message(&record.id).unwrap().unwrap().status, MessageStatus::Sent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn redirect_records_click_and_advances_status() {
    let (base, store) = spawn(memory_config()).await;
    let record = seed(&store, "Links", "b@y.com");
    let target = "https://example.com/docs?page=2";
    for _ in 0 .. 2 {
        let response = client()
            .get(format!("{base}/track/link"))
            .query(&[("url", target), ("emailId", record.id.as_str())])
            .header("x-forwarded-for", "192.0.2.10")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], target);
    }
    let clicks = store.click_events(&record.id).unwrap();
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0].target_url, target);
    assert_eq!(store.load_message(&record.id).unwrap().unwrap().status, MessageStatus::Clicked);
}

// ============================================================================
// SECTION: Ingestion API
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ingestion_inserts_once_and_reads_back() {
    let (base, _store) = spawn(memory_config()).await;
    let record = OutboundMessageRecord::sent(
        derive_identity("Q3 Report", "a@x.com"),
        "Q3 Report",
        "a@x.com",
        Timestamp::from_unix_millis(1_700_000_000_000),
    );
    let first = client().post(format!("{base}/api/messages")).json(&record).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body, json!({ "id": record.id.as_str(), "created": true }));

    let second = client().post(format!("{base}/api/messages")).json(&record).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let fetched = client()
        .get(format!("{base}/api/messages/{}", record.id.as_str()))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let loaded: OutboundMessageRecord = fetched.json().await.unwrap();
    assert_eq!(loaded, record);

    let missing = client().get(format!("{base}/api/messages/email_missing")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ingestion_forces_sent_status_and_rejects_malformed_bodies() {
    let (base, store) = spawn(memory_config()).await;
    let mut record = OutboundMessageRecord::sent(
        derive_identity("Status", "c@z.com"),
        "Status",
        "c@z.com",
        Timestamp::from_unix_millis(5),
    );
    record.status = MessageStatus::Clicked;
    let response = client().post(format!("{base}/api/messages")).json(&record).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(store.load_message(&record.id).unwrap().unwrap().status, MessageStatus::Sent);

    let malformed = client()
        .post(format!("{base}/api/messages"))
        .header("content-type", "application/json")
        .body("{\"id\":")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let bad_identity = json!({
        "id": "email with spaces",
        "subject": "s",
        "recipient": "r",
        "sent_at": 1,
        "status": "sent",
    });
    let response =
        client().post(format!("{base}/api/messages")).json(&bad_identity).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ingestion_rejects_bodies_over_the_limit() {
    let mut config = memory_config();
    config.server.max_body_bytes = 64;
    let (base, _store) = spawn(config).await;
    let record = OutboundMessageRecord::sent(
        derive_identity(&"s".repeat(80), "a@x.com"),
        "s".repeat(80),
        "a@x.com",
        Timestamp::from_unix_millis(5),
    );
    let response = client().post(format!("{base}/api/messages")).json(&record).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ingestion_requires_configured_bearer_token() {
    let mut config = memory_config();
    config.server.auth = Some(ServerAuthConfig {
        bearer_tokens: vec!["secret-token".to_string()],
    });
    let (base, _store) = spawn(config).await;
    let record = OutboundMessageRecord::sent(
        derive_identity("Auth", "d@x.com"),
        "Auth",
        "d@x.com",
        Timestamp::from_unix_millis(5),
    );

    let anonymous =
        client().post(format!("{base}/api/messages")).json(&record).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.headers()["www-authenticate"], "Bearer");

    let wrong = client()
        .post(format!("{base}/api/messages"))
        .bearer_auth("other-token")
        .json(&record)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let accepted = client()
        .post(format!("{base}/api/messages"))
        .bearer_auth("secret-token")
        .json(&record)
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::CREATED);

    let marker = fetch_marker(&base, record.id.as_str(), "198.51.100.7").await;
    assert_eq!(marker.status(), StatusCode::OK);
}

// ============================================================================
// SECTION: Shared Backends
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sqlite_backends_share_the_window_across_servers() {
    let temp = TempDir::new().unwrap();
    let sqlite_config = || {
        let mut config = memory_config();
        config.store.store_type = StoreType::Sqlite;
        config.store.path = Some(temp.path().join("tracking.sqlite"));
        config.rate_limit.backend = RateLimitBackend::Sqlite;
        config
    };
    let (first_base, store) = spawn(sqlite_config()).await;
    let (second_base, _second_store) = spawn(sqlite_config()).await;
    let record = seed(&store, "Q3 Report", "a@x.com");

    let first = fetch_marker(&first_base, record.id.as_str(), "198.51.100.7").await;
    assert_eq!(first.status(), StatusCode::OK);
    let second = fetch_marker(&second_base, record.id.as_str(), "198.51.100.7").await;
    assert_eq!(second.status(), StatusCode::OK);

    assert_eq!(store.open_events(&record.id).unwrap().len(), 1);
}
