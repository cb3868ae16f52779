// crates/mailbeacon-core/src/core/identity.rs
// ============================================================================
// Module: Message Identity
// Description: Deterministic identity derived from subject and recipient.
// Purpose: Join client-side injection with server-side event recording.
// Dependencies: base64, serde
// ============================================================================

//! ## Overview
//! A [`MessageIdentity`] is derived from the compose surface's subject and
//! recipient. Derivation is pure and total: the same pair always yields the
//! same identity, and missing fields fall back to fixed placeholders.
//!
//! Identities are not unique. Two messages with the same subject and
//! recipient share one identity; callers accept that collision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix carried by every derived identity.
pub const IDENTITY_PREFIX: &str = "email_";
/// Subject used when the surface has no subject.
pub const PLACEHOLDER_SUBJECT: &str = "No Subject";
/// Recipient sentinel used when no recipient can be resolved.
pub const UNKNOWN_RECIPIENT: &str = "Unknown";
/// Maximum identity length accepted from untrusted input.
pub const MAX_IDENTITY_LENGTH: usize = 2048;

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Opaque message identity shared by the client and the tracking server.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageIdentity(String);

impl MessageIdentity {
    /// Wraps an identity string without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses an identity received from an untrusted caller.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the value is empty, oversized, or
    /// contains control or whitespace characters.
    pub fn from_untrusted(raw: &str) -> Result<Self, IdentityError> {
        if raw.is_empty() {
            return Err(IdentityError::Empty);
        }
        if raw.len() > MAX_IDENTITY_LENGTH {
            return Err(IdentityError::TooLong {
                max: MAX_IDENTITY_LENGTH,
                actual: raw.len(),
            });
        }
        if raw.chars().any(|ch| ch.is_control() || ch.is_whitespace()) {
            return Err(IdentityError::InvalidCharacter);
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for MessageIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MessageIdentity {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identity parsing errors for untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Identity was empty.
    #[error("identity is empty")]
    Empty,
    /// Identity exceeded the maximum length.
    #[error("identity exceeds {max} bytes ({actual})")]
    TooLong {
        /// Maximum allowed bytes.
        max: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// Identity contained control or whitespace characters.
    #[error("identity contains invalid characters")]
    InvalidCharacter,
}

// ============================================================================
// SECTION: Derivation
// ============================================================================

/// Derives the message identity for a subject and recipient.
///
/// Blank inputs are replaced by [`PLACEHOLDER_SUBJECT`] and
/// [`UNKNOWN_RECIPIENT`], so derivation never fails. The identity is the
/// base64 encoding of `subject:recipient` with non-alphanumeric characters
/// removed, prefixed with [`IDENTITY_PREFIX`].
#[must_use]
pub fn derive_identity(subject: &str, recipient: &str) -> MessageIdentity {
    let subject = if subject.trim().is_empty() { PLACEHOLDER_SUBJECT } else { subject };
    let recipient = if recipient.trim().is_empty() { UNKNOWN_RECIPIENT } else { recipient };
    let encoded = STANDARD.encode(format!("{subject}:{recipient}"));
    let mut id = String::with_capacity(IDENTITY_PREFIX.len() + encoded.len());
    id.push_str(IDENTITY_PREFIX);
    id.extend(encoded.chars().filter(char::is_ascii_alphanumeric));
    MessageIdentity(id)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
