// crates/mailbeacon-server/src/http.rs
// ============================================================================
// Module: Tracking HTTP Handlers
// Description: Marker, redirect, preflight, and ingestion request handlers.
// Purpose: Translate HTTP requests into recorder and store calls.
// Dependencies: axum, url, mailbeacon-core
// ============================================================================

//! ## Overview
//! Marker and redirect handlers build a [`CallbackRequest`] and a
//! [`CallbackContext`] from the request, run the matching [`EventRecorder`]
//! and map every [`RecordOutcome`] onto the benign fallback response. The only
//! exception is a redirect missing `url` or `emailId`, which is answered with
//! 400 and is not a redirect.
//!
//! Ingestion handlers authenticate with bearer tokens when configured and
//! write [`OutboundMessageRecord`] values to the shared store.
//!
//! Security posture: every header, path segment and query value is
//! untrusted. Identities are parsed with [`MessageIdentity::from_untrusted`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::RawQuery;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use mailbeacon_core::AuditEvent;
use mailbeacon_core::CallbackContext;
use mailbeacon_core::CallbackRequest;
use mailbeacon_core::EventRecorder;
use mailbeacon_core::InsertOutcome;
use mailbeacon_core::MessageIdentity;
use mailbeacon_core::MessageStatus;
use mailbeacon_core::NetworkOrigin;
use mailbeacon_core::OutboundMessageRecord;
use mailbeacon_core::RecordOutcome;
use mailbeacon_core::RejectReason;
use mailbeacon_core::StoreError;
use mailbeacon_core::Timestamp;
use mailbeacon_core::TrackingStore;
use mailbeacon_core::UNKNOWN_AGENT;
use serde::Serialize;
use serde_json::json;

use crate::security::authorize_bearer;
use crate::server::ServerState;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Transparent 1x1 GIF served by the marker endpoint.
pub const MARKER_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xFF, 0xFF,
    0xFF, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

/// Forwarded-for header consulted when trusted.
const FORWARDED_FOR: &str = "x-forwarded-for";
/// Query parameter carrying the original destination.
const URL_PARAM: &str = "url";
/// Query parameter carrying the message identity.
const IDENTITY_PARAM: &str = "emailId";
/// Maximum user agent bytes kept on an event.
const MAX_USER_AGENT_BYTES: usize = 1024;
/// Audit component label for the ingestion API.
const INGEST_COMPONENT: &str = "ingest_api";

// ============================================================================
// SECTION: Tracking Handlers
// ============================================================================

/// Marker retrieval with an identity path segment.
pub(crate) async fn marker_with_identity(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(identity): Path<String>,
    headers: HeaderMap,
) -> Response {
    let context = callback_context(&state, peer, &headers);
    let request = CallbackRequest::open(Some(identity));
    record_with_blocking(&state.opens, &request, &context);
    marker_response()
}

/// Marker retrieval without an identity; serves the marker, records nothing.
pub(crate) async fn marker_without_identity(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let context = callback_context(&state, peer, &headers);
    record_with_blocking(&state.opens, &CallbackRequest::open(None), &context);
    marker_response()
}

/// Link redirect carrying `url` and `emailId` query parameters.
pub(crate) async fn redirect(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let context = callback_context(&state, peer, &headers);
    let request = parse_redirect_query(query.as_deref());
    match record_with_blocking(&state.clicks, &request, &context) {
        RecordOutcome::Rejected(_) => {
            (StatusCode::BAD_REQUEST, cors_headers(), RejectReason::MESSAGE).into_response()
        }
        _ => redirect_response(request.target_url.as_deref()),
    }
}

/// CORS preflight for the tracking routes.
pub(crate) async fn preflight() -> Response {
    (StatusCode::OK, cors_headers()).into_response()
}

// ============================================================================
// SECTION: Ingestion Handlers
// ============================================================================

/// Ingestion API response for a stored record.
#[derive(Debug, Serialize)]
struct IngestResponse {
    /// Identity of the record.
    id: MessageIdentity,
    /// True when this request created the record.
    created: bool,
}

/// Stores an outbound message record.
pub(crate) async fn ingest_message(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(response) = authenticate(&state, &headers) {
        return response;
    }
    if body.len() > state.max_body_bytes {
        return ingest_rejected(&state, "request body too large");
    }
    let Ok(mut record) = serde_json::from_slice::<OutboundMessageRecord>(body.as_ref()) else {
        return ingest_rejected(&state, "invalid message record");
    };
    if MessageIdentity::from_untrusted(record.id.as_str()).is_err() {
        return ingest_rejected(&state, "invalid message identity");
    }
    record.status = MessageStatus::Sent;

    let store = state.store.clone();
    match run_blocking(|| store.insert_message(&record)) {
        Ok(outcome) => {
            let created = outcome == InsertOutcome::Inserted;
            state.audit.record(
                &AuditEvent::info(INGEST_COMPONENT, "message_ingested", "message record stored")
                    .with_identity(&record.id)
                    .with_detail(json!({ "created": created })),
            );
            let status = if created { StatusCode::CREATED } else { StatusCode::OK };
            (
                status,
                Json(IngestResponse {
                    id: record.id,
                    created,
                }),
            )
                .into_response()
        }
        Err(StoreError::Invalid(message)) => ingest_rejected(&state, &message),
        Err(err) => store_failure(&state, &err),
    }
}

/// Loads an outbound message record by identity.
pub(crate) async fn fetch_message(
    State(state): State<Arc<ServerState>>,
    Path(identity): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = authenticate(&state, &headers) {
        return response;
    }
    let Ok(identity) = MessageIdentity::from_untrusted(&identity) else {
        return not_found();
    };
    let store = state.store.clone();
    match run_blocking(|| store.load_message(&identity)) {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => not_found(),
        Err(err) => store_failure(&state, &err),
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Fixed marker response.
fn marker_response() -> Response {
    let mut headers = cors_headers();
    no_cache_headers(&mut headers);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/gif"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(MARKER_GIF.len()));
    (StatusCode::OK, headers, Bytes::from_static(&MARKER_GIF)).into_response()
}

/// Redirect to the destination, or to `/` when it cannot be used.
fn redirect_response(target: Option<&str>) -> Response {
    let location = target
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static("/"));
    let mut headers = cors_headers();
    no_cache_headers(&mut headers);
    headers.insert(header::LOCATION, location);
    (StatusCode::FOUND, headers).into_response()
}

/// CORS headers for tracking responses.
fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    headers
}

/// Adds headers forbidding any caching.
fn no_cache_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
}

/// Checks ingestion credentials; returns the rejection response on failure.
fn authenticate(state: &ServerState, headers: &HeaderMap) -> Option<Response> {
    let auth_header = headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok());
    if authorize_bearer(&state.bearer_tokens, auth_header) {
        return None;
    }
    state.audit.record(&AuditEvent::warn(
        INGEST_COMPONENT,
        "ingest_unauthorized",
        "missing or invalid bearer token",
    ));
    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    Some(
        (
            StatusCode::UNAUTHORIZED,
            response_headers,
            Json(json!({ "error": "unauthenticated" })),
        )
            .into_response(),
    )
}

/// 400 response for a malformed ingestion request.
fn ingest_rejected(state: &ServerState, message: &str) -> Response {
    state.audit.record(
        &AuditEvent::warn(INGEST_COMPONENT, "ingest_rejected", "ingestion request rejected")
            .with_detail(json!({ "reason": message })),
    );
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// 500 response for a backend failure.
fn store_failure(state: &ServerState, err: &StoreError) -> Response {
    state.audit.record(
        &AuditEvent::error(INGEST_COMPONENT, "ingest_failed", "store operation failed")
            .with_detail(json!({ "reason": err.to_string() })),
    );
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "store unavailable" })))
        .into_response()
}

/// 404 response for an unknown identity.
fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "message not found" }))).into_response()
}

// ============================================================================
// SECTION: Request Helpers
// ============================================================================

/// Runs a synchronous backend call, shifting to a blocking context when available.
fn run_blocking<T>(call: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(call)
        }
        _ => call(),
    }
}

/// Runs a recorder with [`run_blocking`].
fn record_with_blocking(
    recorder: &EventRecorder,
    request: &CallbackRequest,
    context: &CallbackContext,
) -> RecordOutcome {
    run_blocking(|| recorder.handle(request, context))
}

/// Captures caller metadata for a callback.
fn callback_context(state: &ServerState, peer: SocketAddr, headers: &HeaderMap) -> CallbackContext {
    CallbackContext {
        origin: network_origin(state.trust_forwarded_for, Some(peer.ip()), headers),
        user_agent: user_agent(headers),
        received_at: Timestamp::now(),
    }
}

/// Resolves the caller's network origin.
///
/// The first `x-forwarded-for` entry wins when trusted, then the peer
/// address, then [`NetworkOrigin::UNKNOWN`].
pub(crate) fn network_origin(
    trust_forwarded_for: bool,
    peer: Option<IpAddr>,
    headers: &HeaderMap,
) -> NetworkOrigin {
    if trust_forwarded_for
        && let Some(forwarded) = headers.get(FORWARDED_FOR).and_then(|value| value.to_str().ok())
        && let Some(first) = forwarded.split(',').map(str::trim).find(|entry| !entry.is_empty())
    {
        return NetworkOrigin::new(first);
    }
    peer.map_or_else(NetworkOrigin::unknown, |ip| NetworkOrigin::new(ip.to_string()))
}

/// Caller agent string, bounded and defaulted.
pub(crate) fn user_agent(headers: &HeaderMap) -> String {
    let Some(agent) = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return UNKNOWN_AGENT.to_string();
    };
    let mut end = agent.len().min(MAX_USER_AGENT_BYTES);
    while !agent.is_char_boundary(end) {
        end -= 1;
    }
    agent[.. end].to_string()
}

/// Parses `url` and `emailId` from a raw query string.
pub(crate) fn parse_redirect_query(query: Option<&str>) -> CallbackRequest {
    let mut target_url = None;
    let mut identity = None;
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            URL_PARAM if target_url.is_none() => target_url = Some(value.into_owned()),
            IDENTITY_PARAM if identity.is_none() => identity = Some(value.into_owned()),
            _ => {}
        }
    }
    CallbackRequest::click(identity, target_url)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
