// crates/mailbeacon-core/src/core/time.rs
// ============================================================================
// Module: Mailbeacon Time Model
// Description: Unix-millisecond timestamps for records and rate limiting.
// Purpose: Keep time explicit so recording and windows are testable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! All records and rate-limit entries use [`Timestamp`], a unix epoch
//! millisecond value. Recording paths take the timestamp as an argument; only
//! transport edges call [`Timestamp::now`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix epoch timestamp in milliseconds.
///
/// # Invariants
/// - Monotonicity is a caller responsibility; values are not validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(value: i64) -> Self {
        Self(value)
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns a timestamp shifted forward by `millis`, saturating on overflow.
    #[must_use]
    pub const fn plus_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Returns the elapsed milliseconds since `earlier` (negative if `earlier` is later).
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}
