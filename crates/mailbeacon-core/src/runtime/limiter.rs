// crates/mailbeacon-core/src/runtime/limiter.rs
// ============================================================================
// Module: Mailbeacon In-Memory Rate Limiter
// Description: Process-local last-seen table with windowed suppression.
// Purpose: Deduplicate callbacks within a single process.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryRateLimiter`] keeps a `key -> last_seen` map under one mutex and
//! overrides [`RateLimiter::check_and_record`] so the check and the write are
//! one critical section. State is not shared across processes; deployments
//! with several server instances use the SQLite limiter instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::DEFAULT_RATE_LIMIT_WINDOW_MS;
use crate::core::RateLimitKey;
use crate::core::Timestamp;
use crate::interfaces::RateLimitError;
use crate::interfaces::RateLimiter;

// ============================================================================
// SECTION: Limiter
// ============================================================================

/// In-memory rate limiter.
#[derive(Debug, Clone)]
pub struct InMemoryRateLimiter {
    /// Last-seen table.
    entries: Arc<Mutex<HashMap<RateLimitKey, Timestamp>>>,
    /// Suppression window in milliseconds.
    window_ms: i64,
    /// Optional cap on table size; the oldest entry is dropped when reached.
    max_entries: Option<usize>,
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_WINDOW_MS)
    }
}

impl InMemoryRateLimiter {
    /// Creates a limiter with the given window and no size cap.
    #[must_use]
    pub fn new(window_ms: i64) -> Self {
        Self::with_limits(window_ms, None)
    }

    /// Creates a limiter with an explicit size cap.
    #[must_use]
    pub fn with_limits(window_ms: i64, max_entries: Option<usize>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            window_ms,
            max_entries,
        }
    }

    /// Returns the number of tracked keys.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when the table lock is poisoned.
    pub fn len(&self) -> Result<usize, RateLimitError> {
        Ok(self.lock()?.len())
    }

    /// Returns true when no keys are tracked.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when the table lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, RateLimitError> {
        Ok(self.lock()?.is_empty())
    }

    /// Locks the table.
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<RateLimitKey, Timestamp>>, RateLimitError> {
        self.entries
            .lock()
            .map_err(|_| RateLimitError::Limiter("rate limiter mutex poisoned".to_string()))
    }

    /// Suppression predicate shared by all paths.
    fn suppressed(&self, last_seen: Option<&Timestamp>, now: Timestamp) -> bool {
        last_seen.is_some_and(|last| now.millis_since(*last) < self.window_ms)
    }

    /// Drops entries older than the window; returns the count removed.
    fn evict_locked(&self, entries: &mut HashMap<RateLimitKey, Timestamp>, now: Timestamp) -> usize {
        let before = entries.len();
        entries.retain(|_, last| now.millis_since(*last) <= self.window_ms);
        before - entries.len()
    }

    /// Inserts a key, enforcing the size cap.
    fn insert_locked(
        &self,
        entries: &mut HashMap<RateLimitKey, Timestamp>,
        key: &RateLimitKey,
        now: Timestamp,
    ) {
        if let Some(max_entries) = self.max_entries
            && !entries.contains_key(key)
            && entries.len() >= max_entries
            && let Some(oldest) =
                entries.iter().min_by_key(|(_, last)| **last).map(|(key, _)| key.clone())
        {
            entries.remove(&oldest);
        }
        entries.insert(key.clone(), now);
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn window_ms(&self) -> i64 {
        self.window_ms
    }

    fn should_suppress(&self, key: &RateLimitKey, now: Timestamp) -> Result<bool, RateLimitError> {
        let entries = self.lock()?;
        Ok(self.suppressed(entries.get(key), now))
    }

    fn record_seen(&self, key: &RateLimitKey, now: Timestamp) -> Result<(), RateLimitError> {
        let mut entries = self.lock()?;
        self.insert_locked(&mut entries, key, now);
        Ok(())
    }

    fn evict_stale(&self, now: Timestamp) -> Result<usize, RateLimitError> {
        let mut entries = self.lock()?;
        Ok(self.evict_locked(&mut entries, now))
    }

    fn check_and_record(&self, key: &RateLimitKey, now: Timestamp) -> Result<bool, RateLimitError> {
        let mut entries = self.lock()?;
        if self.suppressed(entries.get(key), now) {
            return Ok(true);
        }
        self.insert_locked(&mut entries, key, now);
        self.evict_locked(&mut entries, now);
        drop(entries);
        Ok(false)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
