// crates/mailbeacon-compose/src/extract.rs
// ============================================================================
// Module: Metadata Extraction
// Description: Best-effort subject and recipient extraction from snapshots.
// Purpose: Resolve message metadata across webmail structural patterns.
// Dependencies: mailbeacon-core
// ============================================================================

//! ## Overview
//! Recipients are resolved from the first source that yields a value:
//!
//! 1. the `to` textarea,
//! 2. the `to` input,
//! 3. a presentation recipient chip,
//! 4. a "To" tooltip recipient chip,
//! 5. the text of the "To" field.
//!
//! Field values take the first comma-separated entry. When nothing matches
//! the recipient is [`Recipient::Unknown`]. Extraction never fails.

use mailbeacon_core::PLACEHOLDER_SUBJECT;
use mailbeacon_core::UNKNOWN_RECIPIENT;

use crate::host::SurfaceSnapshot;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Resolved recipient of a compose surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A recipient address was found.
    Resolved(String),
    /// No source yielded a recipient.
    Unknown,
}

impl Recipient {
    /// Recipient text; [`UNKNOWN_RECIPIENT`] when unresolved.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Resolved(value) => value,
            Self::Unknown => UNKNOWN_RECIPIENT,
        }
    }

    /// Returns true when a recipient was found.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Subject and recipient of a compose surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMetadata {
    /// Subject, or [`PLACEHOLDER_SUBJECT`].
    pub subject: String,
    /// Primary recipient.
    pub recipient: Recipient,
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts subject and recipient from a snapshot.
#[must_use]
pub fn extract_metadata(snapshot: &SurfaceSnapshot) -> MessageMetadata {
    MessageMetadata {
        subject: extract_subject(snapshot),
        recipient: extract_recipient(snapshot),
    }
}

/// Returns the subject, falling back to [`PLACEHOLDER_SUBJECT`].
#[must_use]
pub fn extract_subject(snapshot: &SurfaceSnapshot) -> String {
    snapshot
        .subject
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(PLACEHOLDER_SUBJECT)
        .to_string()
}

/// Resolves the primary recipient.
#[must_use]
pub fn extract_recipient(snapshot: &SurfaceSnapshot) -> Recipient {
    let resolved = first_entry(snapshot.to_textarea.as_deref())
        .or_else(|| first_entry(snapshot.to_input.as_deref()))
        .or_else(|| first_chip(&snapshot.presentation_emails))
        .or_else(|| first_chip(&snapshot.tooltip_emails))
        .or_else(|| first_entry(snapshot.to_field_text.as_deref()));
    match resolved {
        Some(value) if value != UNKNOWN_RECIPIENT => Recipient::Resolved(value),
        _ => Recipient::Unknown,
    }
}

/// First comma-separated entry of a field value, trimmed.
fn first_entry(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    let first = value.split(',').next().unwrap_or_default().trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// First non-empty chip address.
fn first_chip(emails: &[String]) -> Option<String> {
    emails.iter().map(|email| email.trim()).find(|email| !email.is_empty()).map(str::to_string)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
