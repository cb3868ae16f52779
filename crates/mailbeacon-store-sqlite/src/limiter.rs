// crates/mailbeacon-store-sqlite/src/limiter.rs
// ============================================================================
// Module: SQLite Rate Limiter
// Description: Shared last-seen table with atomic check-and-set.
// Purpose: Hold the suppression window across every server instance.
// Dependencies: mailbeacon-core, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteRateLimiter`] stores `rate_key -> last_seen_at` in the
//! `rate_limit_entries` table. [`RateLimiter::check_and_record`] runs in one
//! `IMMEDIATE` transaction, which takes the database write lock before the
//! read, so two instances cannot both observe a key as fresh.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use mailbeacon_core::RateLimitError;
use mailbeacon_core::RateLimitKey;
use mailbeacon_core::RateLimiter;
use mailbeacon_core::Timestamp;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;

use crate::store::SqliteStoreConfig;
use crate::store::SqliteStoreError;
use crate::store::open_database;

// ============================================================================
// SECTION: Limiter
// ============================================================================

/// `SQLite`-backed rate limiter.
#[derive(Clone)]
pub struct SqliteRateLimiter {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Suppression window in milliseconds.
    window_ms: i64,
}

impl SqliteRateLimiter {
    /// Opens a limiter on its own connection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn open(config: &SqliteStoreConfig, window_ms: i64) -> Result<Self, SqliteStoreError> {
        Ok(Self::from_connection(Arc::new(Mutex::new(open_database(config)?)), window_ms))
    }

    /// Wraps an initialized connection.
    pub(crate) const fn from_connection(connection: Arc<Mutex<Connection>>, window_ms: i64) -> Self {
        Self {
            connection,
            window_ms,
        }
    }

    /// Locks the connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Oldest `last_seen_at` that is not stale at `now`.
    const fn stale_before(&self, now: Timestamp) -> i64 {
        now.as_unix_millis().saturating_sub(self.window_ms)
    }

    /// Reads the last-seen time for a key.
    fn last_seen(
        connection: &Connection,
        key: &RateLimitKey,
    ) -> Result<Option<Timestamp>, SqliteStoreError> {
        let value: Option<i64> = connection
            .query_row(
                "SELECT last_seen_at FROM rate_limit_entries WHERE rate_key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(value.map(Timestamp::from_unix_millis))
    }

    /// Upserts the last-seen time for a key.
    fn upsert(
        connection: &Connection,
        key: &RateLimitKey,
        now: Timestamp,
    ) -> Result<(), SqliteStoreError> {
        connection
            .execute(
                "INSERT INTO rate_limit_entries (rate_key, last_seen_at) VALUES (?1, ?2) ON \
                 CONFLICT(rate_key) DO UPDATE SET last_seen_at = excluded.last_seen_at",
                params![key.as_str(), now.as_unix_millis()],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Deletes stale entries.
    fn sweep(&self, connection: &Connection, now: Timestamp) -> Result<usize, SqliteStoreError> {
        connection
            .execute(
                "DELETE FROM rate_limit_entries WHERE last_seen_at < ?1",
                params![self.stale_before(now)],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))
    }

    /// Suppression predicate.
    const fn suppressed(&self, last_seen: Option<Timestamp>, now: Timestamp) -> bool {
        match last_seen {
            Some(last) => now.millis_since(last) < self.window_ms,
            None => false,
        }
    }
}

impl RateLimiter for SqliteRateLimiter {
    fn window_ms(&self) -> i64 {
        self.window_ms
    }

    fn should_suppress(&self, key: &RateLimitKey, now: Timestamp) -> Result<bool, RateLimitError> {
        let guard = self.lock()?;
        let last_seen = Self::last_seen(&guard, key)?;
        drop(guard);
        Ok(self.suppressed(last_seen, now))
    }

    fn record_seen(&self, key: &RateLimitKey, now: Timestamp) -> Result<(), RateLimitError> {
        let guard = self.lock()?;
        Self::upsert(&guard, key, now)?;
        drop(guard);
        Ok(())
    }

    fn evict_stale(&self, now: Timestamp) -> Result<usize, RateLimitError> {
        let guard = self.lock()?;
        let removed = self.sweep(&guard, now)?;
        drop(guard);
        Ok(removed)
    }

    fn check_and_record(&self, key: &RateLimitKey, now: Timestamp) -> Result<bool, RateLimitError> {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        if self.suppressed(Self::last_seen(&tx, key)?, now) {
            tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            return Ok(true);
        }
        Self::upsert(&tx, key, now)?;
        self.sweep(&tx, now)?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(false)
    }
}
