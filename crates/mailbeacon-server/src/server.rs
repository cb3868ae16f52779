// crates/mailbeacon-server/src/server.rs
// ============================================================================
// Module: Tracking Server
// Description: Backend wiring, routing, and the HTTP serve loop.
// Purpose: Build recorders from configuration and serve them over axum.
// Dependencies: axum, tokio, mailbeacon-core, mailbeacon-config, mailbeacon-store-sqlite
// ============================================================================

//! ## Overview
//! [`TrackerServer::from_config`] validates configuration, opens the tracking
//! store, rate limiter and audit sink, and wires two [`EventRecorder`]
//! instances over them. [`TrackerServer::serve`] binds the configured address.
//!
//! With `rate_limit.backend = "sqlite"` the limiter table lives in the
//! tracking database, so every server pointed at that database shares one
//! suppression window.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use mailbeacon_config::AuditSinkKind;
use mailbeacon_config::MailBeaconConfig;
use mailbeacon_config::RateLimitBackend;
use mailbeacon_config::StoreType;
use mailbeacon_core::AuditEvent;
use mailbeacon_core::AuditSink;
use mailbeacon_core::EventRecorder;
use mailbeacon_core::FileAuditSink;
use mailbeacon_core::InMemoryRateLimiter;
use mailbeacon_core::InMemoryTrackingStore;
use mailbeacon_core::NoopAuditSink;
use mailbeacon_core::RateLimiter;
use mailbeacon_core::SharedTrackingStore;
use mailbeacon_core::StderrAuditSink;
use mailbeacon_store_sqlite::SqliteTrackingStore;
use serde_json::json;
use tokio::net::TcpListener;

use crate::http;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit component label for server lifecycle events.
const COMPONENT: &str = "tracker_server";
/// Ingestion API collection route.
const MESSAGES_ROUTE: &str = "/api/messages";
/// Ingestion API item route.
const MESSAGE_ROUTE: &str = "/api/messages/{identity}";

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared state for request handlers.
pub(crate) struct ServerState {
    /// Open-event recorder.
    pub(crate) opens: EventRecorder,
    /// Click-event recorder.
    pub(crate) clicks: EventRecorder,
    /// Tracking store for the ingestion API.
    pub(crate) store: SharedTrackingStore,
    /// Audit sink.
    pub(crate) audit: Arc<dyn AuditSink>,
    /// Accepted ingestion tokens; empty disables auth.
    pub(crate) bearer_tokens: Vec<String>,
    /// Maximum ingestion body size.
    pub(crate) max_body_bytes: usize,
    /// Whether `x-forwarded-for` names the caller.
    pub(crate) trust_forwarded_for: bool,
}

// ============================================================================
// SECTION: Tracker Server
// ============================================================================

/// Tracking server instance.
pub struct TrackerServer {
    /// Validated configuration.
    config: MailBeaconConfig,
    /// Handler state.
    state: Arc<ServerState>,
}

impl TrackerServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or a backend
    /// cannot be opened.
    pub fn from_config(config: MailBeaconConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config)?;
        let (store, limiter) = build_backends(&config)?;
        Ok(Self::with_backends(config, store, limiter, audit))
    }

    /// Builds a server over caller-provided backends.
    #[must_use]
    pub fn with_backends(
        config: MailBeaconConfig,
        store: SharedTrackingStore,
        limiter: Arc<dyn RateLimiter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let state = ServerState {
            opens: EventRecorder::opens(store.clone(), Arc::clone(&limiter), Arc::clone(&audit)),
            clicks: EventRecorder::clicks(store.clone(), limiter, Arc::clone(&audit)),
            store,
            audit,
            bearer_tokens: config.server.bearer_tokens().to_vec(),
            max_body_bytes: config.server.max_body_bytes,
            trust_forwarded_for: config.server.trust_forwarded_for,
        };
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Returns the tracking store shared with the handlers.
    #[must_use]
    pub fn store(&self) -> SharedTrackingStore {
        self.state.store.clone()
    }

    /// Builds the axum router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        let marker = self.config.tracking.marker_path.as_str();
        let redirect = self.config.tracking.redirect_path.as_str();
        Router::new()
            .route(
                &format!("{marker}/{{identity}}"),
                get(http::marker_with_identity).options(http::preflight),
            )
            .route(marker, get(http::marker_without_identity).options(http::preflight))
            .route(
                &format!("{marker}/"),
                get(http::marker_without_identity).options(http::preflight),
            )
            .route(redirect, get(http::redirect).options(http::preflight))
            .route(MESSAGES_ROUTE, post(http::ingest_message))
            .route(MESSAGE_ROUTE, get(http::fetch_message))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the task is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_listener(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when serving fails.
    pub async fn serve_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener
            .local_addr()
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        emit_startup_events(&self.state, &self.config, local);
        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Backend Wiring
// ============================================================================

/// Opens the tracking store and rate limiter selected by configuration.
fn build_backends(
    config: &MailBeaconConfig,
) -> Result<(SharedTrackingStore, Arc<dyn RateLimiter>), ServerError> {
    let window_ms = config.rate_limit.window_millis();
    let sqlite = match config.store.store_type {
        StoreType::Memory => None,
        StoreType::Sqlite => {
            let sqlite_config = config
                .store
                .sqlite()
                .ok_or_else(|| ServerError::Config("sqlite store requires path".to_string()))?;
            let store = SqliteTrackingStore::new(&sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Some(store)
        }
    };
    let limiter: Arc<dyn RateLimiter> = match (config.rate_limit.backend, &sqlite) {
        (RateLimitBackend::Sqlite, Some(store)) => Arc::new(store.rate_limiter(window_ms)),
        (RateLimitBackend::Sqlite, None) => {
            return Err(ServerError::Config(
                "rate_limit.backend = sqlite requires store.type = sqlite".to_string(),
            ));
        }
        (RateLimitBackend::Memory, _) => {
            Arc::new(InMemoryRateLimiter::with_limits(window_ms, config.rate_limit.max_entries))
        }
    };
    let store = match sqlite {
        Some(store) => SharedTrackingStore::from_store(store),
        None => SharedTrackingStore::from_store(InMemoryTrackingStore::new()),
    };
    Ok((store, limiter))
}

/// Opens the configured audit sink.
fn build_audit_sink(config: &MailBeaconConfig) -> Result<Arc<dyn AuditSink>, ServerError> {
    match config.audit.sink {
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::File => {
            let path = config
                .audit
                .path
                .as_deref()
                .ok_or_else(|| ServerError::Config("audit file sink requires path".to_string()))?;
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
    }
}

/// Audits the listening address and the ingestion auth posture.
fn emit_startup_events(state: &ServerState, config: &MailBeaconConfig, local: SocketAddr) {
    state.audit.record(
        &AuditEvent::info(COMPONENT, "server_listening", "tracking server listening").with_detail(
            json!({
                "addr": local.to_string(),
                "marker_path": config.tracking.marker_path,
                "redirect_path": config.tracking.redirect_path,
                "rate_limit_backend": config.rate_limit.backend,
                "window_ms": config.rate_limit.window_ms,
            }),
        ),
    );
    if state.bearer_tokens.is_empty() {
        state.audit.record(&AuditEvent::warn(
            COMPONENT,
            "ingest_auth_disabled",
            "ingestion API accepts unauthenticated writes; configure server.auth.bearer_tokens",
        ));
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tracking server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Backend initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
