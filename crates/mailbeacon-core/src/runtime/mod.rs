// crates/mailbeacon-core/src/runtime/mod.rs
// ============================================================================
// Module: Mailbeacon Runtime
// Description: Event recorder plus in-memory store, limiter, and audit sinks.
// Purpose: Execute the server-side recording pipeline against the interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the recording pipeline and the process-local
//! backends used by tests and single-instance deployments.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod limiter;
pub mod recorder;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use limiter::InMemoryRateLimiter;
pub use recorder::CallbackContext;
pub use recorder::CallbackRequest;
pub use recorder::EventRecorder;
pub use recorder::RecordOutcome;
pub use recorder::RejectReason;
pub use store::InMemoryTrackingStore;
pub use store::SharedTrackingStore;
