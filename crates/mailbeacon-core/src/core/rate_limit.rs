// crates/mailbeacon-core/src/core/rate_limit.rs
// ============================================================================
// Module: Rate-Limit Keys
// Description: Composite deduplication keys for open and click callbacks.
// Purpose: Collapse repeated callbacks from one origin within a window.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Open callbacks are keyed by identity and origin; click callbacks also
//! include the target URL so distinct links in one message count separately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::events::NetworkOrigin;
use crate::core::identity::MessageIdentity;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default suppression window in milliseconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: i64 = 60_000;

// ============================================================================
// SECTION: Key
// ============================================================================

/// Composite rate-limit key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Key for an open callback: `identity:origin`.
    #[must_use]
    pub fn open(identity: &MessageIdentity, origin: &NetworkOrigin) -> Self {
        Self(format!("{identity}:{origin}"))
    }

    /// Key for a click callback: `identity:url:origin`.
    #[must_use]
    pub fn click(identity: &MessageIdentity, target_url: &str, origin: &NetworkOrigin) -> Self {
        Self(format!("{identity}:{target_url}:{origin}"))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
