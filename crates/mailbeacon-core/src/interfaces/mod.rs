// crates/mailbeacon-core/src/interfaces/mod.rs
// ============================================================================
// Module: Mailbeacon Interfaces
// Description: Backend-agnostic storage, rate-limit, and audit interfaces.
// Purpose: Define the seams the recorder and servers are built against.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces keep the recording logic independent of where messages, events,
//! and rate-limit entries live. The in-memory implementations in
//! [`crate::runtime`] serve tests and single-process deployments; the
//! SQLite crate provides the durable backend shared across server instances.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AuditEvent;
use crate::core::ClickEvent;
use crate::core::MessageIdentity;
use crate::core::OpenEvent;
use crate::core::OutboundMessageRecord;
use crate::core::RateLimitKey;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Tracking Store
// ============================================================================

/// Tracking store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("tracking store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("tracking store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("tracking store version mismatch: {0}")]
    VersionMismatch(String),
    /// Input data is invalid.
    #[error("tracking store invalid data: {0}")]
    Invalid(String),
    /// Referenced message does not exist.
    #[error("tracking store message not found: {0}")]
    NotFound(String),
    /// Store reported an error.
    #[error("tracking store error: {0}")]
    Store(String),
}

/// Result of inserting an outbound message record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Record was stored.
    Inserted,
    /// A record with the same identity already existed; nothing changed.
    AlreadyExists,
}

/// Durable store for outbound messages and their events.
///
/// # Invariants
/// - Events are only stored for identities that have a message record.
/// - Appending an event and advancing the message status happen atomically.
/// - Message status never moves backwards.
pub trait TrackingStore: Send + Sync {
    /// Inserts a message record unless one with the same identity exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_message(&self, record: &OutboundMessageRecord) -> Result<InsertOutcome, StoreError>;

    /// Returns true when a record exists for the identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn message_exists(&self, identity: &MessageIdentity) -> Result<bool, StoreError>;

    /// Loads the record for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn load_message(
        &self,
        identity: &MessageIdentity,
    ) -> Result<Option<OutboundMessageRecord>, StoreError>;

    /// Appends an open event and advances the message to `opened`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the message is unknown.
    fn record_open(&self, event: &OpenEvent) -> Result<(), StoreError>;

    /// Appends a click event and advances the message to `clicked`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the message is unknown.
    fn record_click(&self, event: &ClickEvent) -> Result<(), StoreError>;

    /// Lists open events for an identity in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn open_events(&self, identity: &MessageIdentity) -> Result<Vec<OpenEvent>, StoreError>;

    /// Lists click events for an identity in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn click_events(&self, identity: &MessageIdentity) -> Result<Vec<ClickEvent>, StoreError>;
}

// ============================================================================
// SECTION: Rate Limiter
// ============================================================================

/// Rate limiter errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// Limiter state could not be read or written.
    #[error("rate limiter io error: {0}")]
    Io(String),
    /// Limiter reported an error.
    #[error("rate limiter error: {0}")]
    Limiter(String),
}

/// Keyed suppression of repeated callbacks within a time window.
///
/// A key is suppressed when `now - last_seen < window`. Entries with
/// `now - last_seen > window` are stale and may be evicted. Suppressed
/// requests do not refresh `last_seen`.
pub trait RateLimiter: Send + Sync {
    /// Suppression window in milliseconds.
    fn window_ms(&self) -> i64;

    /// Returns true when the key was seen within the window.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when limiter state is unavailable.
    fn should_suppress(&self, key: &RateLimitKey, now: Timestamp) -> Result<bool, RateLimitError>;

    /// Records the key as seen at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when limiter state is unavailable.
    fn record_seen(&self, key: &RateLimitKey, now: Timestamp) -> Result<(), RateLimitError>;

    /// Removes stale entries and returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when limiter state is unavailable.
    fn evict_stale(&self, now: Timestamp) -> Result<usize, RateLimitError>;

    /// Checks the key and, when not suppressed, records it and evicts stale
    /// entries. Returns true when the request is suppressed.
    ///
    /// The default composes the three primitives and is not atomic across
    /// them; implementations shared between concurrent callers override it.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when limiter state is unavailable.
    fn check_and_record(&self, key: &RateLimitKey, now: Timestamp) -> Result<bool, RateLimitError> {
        if self.should_suppress(key, now)? {
            return Ok(true);
        }
        self.record_seen(key, now)?;
        self.evict_stale(now)?;
        Ok(false)
    }
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Destination for structured audit events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event. Sinks never fail the caller.
    fn record(&self, event: &AuditEvent);
}
