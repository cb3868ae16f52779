// crates/mailbeacon-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for operators and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for mailbeacon configuration. The example is validated
//! by the crate's tests so it never drifts from the config model.

/// Returns a canonical example `mailbeacon.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "0.0.0.0:8787"
max_body_bytes = 65536
trust_forwarded_for = true

[server.auth]
bearer_tokens = ["change-me"]

[tracking]
marker_path = "/track/pixel"
redirect_path = "/track/link"

[rate_limit]
backend = "sqlite"
window_ms = 60000

[store]
type = "sqlite"
path = "mailbeacon.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[audit]
sink = "file"
path = "mailbeacon-audit.jsonl"

[compose]
tracker_base_url = "https://tracker.example.com"
debounce_ms = 500
tracking_enabled = true
request_timeout_ms = 5000
bearer_token = "change-me"
"#,
    )
}
