// crates/mailbeacon-core/src/core/mod.rs
// ============================================================================
// Module: Mailbeacon Core Types
// Description: Canonical identity, message, event, and audit types.
// Purpose: Provide stable, serializable types shared by client and server.
// Dependencies: base64, serde, serde_json
// ============================================================================

//! ## Overview
//! Core types are plain data. They carry no I/O and never read shared state;
//! the only wall-clock access is [`Timestamp::now`], used at the edges.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod events;
pub mod identity;
pub mod message;
pub mod rate_limit;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditLevel;
pub use events::ClickEvent;
pub use events::EventKind;
pub use events::NetworkOrigin;
pub use events::OpenEvent;
pub use events::UNKNOWN_AGENT;
pub use identity::IdentityError;
pub use identity::MAX_IDENTITY_LENGTH;
pub use identity::MessageIdentity;
pub use identity::PLACEHOLDER_SUBJECT;
pub use identity::UNKNOWN_RECIPIENT;
pub use identity::derive_identity;
pub use message::MessageStatus;
pub use message::OutboundMessageRecord;
pub use rate_limit::DEFAULT_RATE_LIMIT_WINDOW_MS;
pub use rate_limit::RateLimitKey;
pub use time::Timestamp;
