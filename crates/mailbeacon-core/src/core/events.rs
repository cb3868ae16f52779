// crates/mailbeacon-core/src/core/events.rs
// ============================================================================
// Module: Tracking Events
// Description: Append-only open and click event records.
// Purpose: Describe what the event recorder persists for each callback.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Open and click events are created by the event recorder and owned by the
//! backend. They are append-only; nothing mutates them after insertion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identity::MessageIdentity;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Agent string used when the caller sends none.
pub const UNKNOWN_AGENT: &str = "unknown";

// ============================================================================
// SECTION: Kinds
// ============================================================================

/// Kind of tracking callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Marker resource retrieval.
    Open,
    /// Rewritten link follow.
    Click,
}

impl EventKind {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Network Origin
// ============================================================================

/// Network origin of a callback (forwarded client address or peer address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkOrigin(String);

impl NetworkOrigin {
    /// Label used when no origin can be determined.
    pub const UNKNOWN: &'static str = "unknown";

    /// Creates an origin from a raw value, falling back to `unknown` when blank.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() { Self::unknown() } else { Self(trimmed.to_string()) }
    }

    /// Returns the `unknown` origin.
    #[must_use]
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    /// Returns the origin as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Recorded open of a tracked message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenEvent {
    /// Message identity.
    pub identity: MessageIdentity,
    /// Time the marker was retrieved.
    pub occurred_at: Timestamp,
    /// Approximate source location when known.
    pub source_location: Option<String>,
    /// Network origin of the retrieval.
    pub origin: NetworkOrigin,
    /// Caller agent string.
    pub user_agent: String,
}

/// Recorded click on a rewritten link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Message identity.
    pub identity: MessageIdentity,
    /// Time the redirect was requested.
    pub occurred_at: Timestamp,
    /// Original link destination.
    pub target_url: String,
    /// Network origin of the click.
    pub origin: NetworkOrigin,
    /// Caller agent string.
    pub user_agent: String,
}
