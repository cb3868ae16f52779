// crates/mailbeacon-core/src/lib.rs
// ============================================================================
// Module: Mailbeacon Core Library
// Description: Public API surface for the mailbeacon tracking core.
// Purpose: Expose identity, data model, interfaces, and recording runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Mailbeacon core holds the pieces shared by the compose client and the
//! tracking server: the deterministic message identity, the outbound message
//! and event records, the storage and rate-limit interfaces, and the
//! [`EventRecorder`] that turns remote open/click callbacks into at most one
//! persisted event per key and window.
//!
//! Remote callers are uncontrolled mail clients. Every recording path is
//! fail-silent: outcomes are reported as values, never as errors the caller
//! could observe.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditSink;
pub use interfaces::InsertOutcome;
pub use interfaces::RateLimitError;
pub use interfaces::RateLimiter;
pub use interfaces::StoreError;
pub use interfaces::TrackingStore;
pub use runtime::CallbackContext;
pub use runtime::CallbackRequest;
pub use runtime::EventRecorder;
pub use runtime::FileAuditSink;
pub use runtime::InMemoryRateLimiter;
pub use runtime::InMemoryTrackingStore;
pub use runtime::NoopAuditSink;
pub use runtime::RecordOutcome;
pub use runtime::RejectReason;
pub use runtime::SharedTrackingStore;
pub use runtime::StderrAuditSink;
