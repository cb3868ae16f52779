// crates/mailbeacon-server/src/security.rs
// ============================================================================
// Module: Server Security Helpers
// Description: Bearer token parsing and constant-time comparisons.
// Purpose: Authenticate ingestion API callers without timing side-channels.
// Dependencies: subtle
// ============================================================================

//! ## Overview
//! The ingestion API accepts `Authorization: Bearer <token>` when tokens are
//! configured. Tokens are compared in constant time and every configured
//! token is checked, so the response time does not reveal which one matched.

use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted authorization header size in bytes.
const MAX_AUTH_HEADER_BYTES: usize = 1024;

// ============================================================================
// SECTION: Constant-Time Comparisons
// ============================================================================

/// Compares two byte slices in constant time.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Compares two strings in constant time.
#[must_use]
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

// ============================================================================
// SECTION: Bearer Tokens
// ============================================================================

/// Extracts the token from a `Bearer` authorization header.
#[must_use]
pub fn parse_bearer_token(header: &str) -> Option<&str> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return None;
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Returns true when the header carries one of the configured tokens.
///
/// An empty token list disables authentication.
#[must_use]
pub fn authorize_bearer(tokens: &[String], auth_header: Option<&str>) -> bool {
    if tokens.is_empty() {
        return true;
    }
    let Some(token) = auth_header.and_then(parse_bearer_token) else {
        return false;
    };
    tokens.iter().fold(false, |matched, expected| matched | constant_time_eq_str(expected, token))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
