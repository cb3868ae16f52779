// crates/mailbeacon-core/src/core/message.rs
// ============================================================================
// Module: Outbound Message Records
// Description: Record of a tracked outbound message and its status.
// Purpose: Provide the join target that events are validated against.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`OutboundMessageRecord`] is created once by the compose client when a
//! tracked message is sent. The client never rewrites it; the server only
//! advances [`MessageStatus`] as open and click events arrive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identity::MessageIdentity;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Delivery status of a tracked message.
///
/// # Invariants
/// - Status only moves forward: `sent` < `opened` < `clicked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Message left the client; no event seen yet.
    Sent,
    /// At least one open was recorded.
    Opened,
    /// At least one link click was recorded.
    Clicked,
}

impl MessageStatus {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Opened => "opened",
            Self::Clicked => "clicked",
        }
    }

    /// Parses a canonical label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "sent" => Some(Self::Sent),
            "opened" => Some(Self::Opened),
            "clicked" => Some(Self::Clicked),
            _ => None,
        }
    }

    /// Returns the furthest of `self` and `next`.
    #[must_use]
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Record
// ============================================================================

/// Outbound message record persisted when a tracked message is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessageRecord {
    /// Message identity.
    pub id: MessageIdentity,
    /// Subject at send time.
    pub subject: String,
    /// Primary recipient at send time.
    pub recipient: String,
    /// Send time.
    pub sent_at: Timestamp,
    /// Current status.
    pub status: MessageStatus,
}

impl OutboundMessageRecord {
    /// Creates a freshly sent record.
    #[must_use]
    pub fn sent(
        id: MessageIdentity,
        subject: impl Into<String>,
        recipient: impl Into<String>,
        sent_at: Timestamp,
    ) -> Self {
        Self {
            id,
            subject: subject.into(),
            recipient: recipient.into(),
            sent_at,
            status: MessageStatus::Sent,
        }
    }
}
