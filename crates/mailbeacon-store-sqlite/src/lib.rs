// crates/mailbeacon-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Tracking Store
// Description: Durable TrackingStore and shared RateLimiter using SQLite.
// Purpose: Provide production persistence for messages, events, and windows.
// Dependencies: mailbeacon-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides [`SqliteTrackingStore`], a durable
//! [`mailbeacon_core::TrackingStore`], and [`SqliteRateLimiter`], a
//! [`mailbeacon_core::RateLimiter`] whose last-seen table lives in the same
//! database. Every server instance pointed at one database file shares the
//! suppression window. Security posture: database contents are untrusted and
//! decoded fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod limiter;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use limiter::SqliteRateLimiter;
pub use store::MAX_FIELD_BYTES;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteTrackingStore;
