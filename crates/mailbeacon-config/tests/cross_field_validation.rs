//! Field and cross-field validation tests for mailbeacon-config.
// crates/mailbeacon-config/tests/cross_field_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Validate per-section limits and cross-section constraints.
// Purpose: Ensure invalid configurations fail closed with clear messages.
// =============================================================================

use mailbeacon_config::AuditSinkKind;
use mailbeacon_config::RateLimitBackend;
use mailbeacon_config::ServerAuthConfig;
use mailbeacon_config::StoreType;

mod common;

use common::TestResult;
use common::assert_invalid;

#[test]
fn sqlite_rate_limit_requires_sqlite_store() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.rate_limit.backend = RateLimitBackend::Sqlite;
    assert_invalid(config.validate(), "requires store.type = sqlite")?;
    config.store.store_type = StoreType::Sqlite;
    config.store.path = Some("tracking.db".into());
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn sqlite_store_requires_path_and_memory_rejects_one() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.store_type = StoreType::Sqlite;
    assert_invalid(config.validate(), "sqlite store requires path")?;
    config.store.store_type = StoreType::Memory;
    config.store.path = Some("tracking.db".into());
    assert_invalid(config.validate(), "memory store must not set path")
}

#[test]
fn rate_limit_window_bounds_are_enforced() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.rate_limit.window_ms = 999;
    assert_invalid(config.validate(), "rate_limit.window_ms")?;
    config.rate_limit.window_ms = 3_600_001;
    assert_invalid(config.validate(), "rate_limit.window_ms")?;
    config.rate_limit.window_ms = 1_000;
    config.rate_limit.max_entries = Some(0);
    assert_invalid(config.validate(), "max_entries must be greater than zero")
}

#[test]
fn endpoint_paths_are_validated() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.tracking.marker_path = "track/pixel".to_string();
    assert_invalid(config.validate(), "must start with '/'")?;
    config.tracking.marker_path = "/track/{id}".to_string();
    assert_invalid(config.validate(), "invalid characters")?;
    config.tracking.marker_path = "/api/pixel".to_string();
    assert_invalid(config.validate(), "/api prefix")?;
    config.tracking.marker_path = "/track/link".to_string();
    assert_invalid(config.validate(), "must differ")
}

#[test]
fn auth_tokens_are_validated() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.auth = Some(ServerAuthConfig {
        bearer_tokens: Vec::new(),
    });
    assert_invalid(config.validate(), "at least one bearer token")?;
    config.server.auth = Some(ServerAuthConfig {
        bearer_tokens: vec!["has space".to_string()],
    });
    assert_invalid(config.validate(), "whitespace")?;
    config.server.auth = Some(ServerAuthConfig {
        bearer_tokens: vec!["x".repeat(257)],
    });
    assert_invalid(config.validate(), "too long")
}

#[test]
fn bind_and_body_limits_are_validated() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.bind = "not-an-address".to_string();
    assert_invalid(config.validate(), "invalid server.bind")?;
    config.server.bind = "127.0.0.1:0".to_string();
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "greater than zero")
}

#[test]
fn audit_file_sink_requires_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.audit.sink = AuditSinkKind::File;
    assert_invalid(config.validate(), "requires audit.path")?;
    config.audit.sink = AuditSinkKind::None;
    config.audit.path = Some("audit.jsonl".to_string());
    assert_invalid(config.validate(), "only valid with audit.sink = file")
}

#[test]
fn compose_settings_are_validated() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.compose.tracker_base_url = "ftp://tracker.example.com".to_string();
    assert_invalid(config.validate(), "http or https")?;
    config.compose.tracker_base_url = "https://tracker.example.com?x=1".to_string();
    assert_invalid(config.validate(), "query or fragment")?;
    config.compose.tracker_base_url = "https://tracker.example.com".to_string();
    config.compose.request_timeout_ms = 10;
    assert_invalid(config.validate(), "request_timeout_ms")?;
    config.compose.request_timeout_ms = 5_000;
    config.compose.debounce_ms = 60_000;
    assert_invalid(config.validate(), "debounce_ms")
}
