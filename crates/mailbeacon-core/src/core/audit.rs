// crates/mailbeacon-core/src/core/audit.rs
// ============================================================================
// Module: Audit Events
// Description: Structured JSON-line audit payloads.
// Purpose: Describe each tracking decision as one structured JSON line.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are the only logging surface. Sinks serialize them as one
//! JSON object per line; see [`crate::AuditSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::core::identity::MessageIdentity;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Severity label for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    /// Normal operation.
    Info,
    /// Degraded but handled.
    Warn,
    /// Failure swallowed at a fail-silent boundary.
    Error,
}

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    /// Event identifier (for example `open_recorded`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Emitting component.
    pub component: &'static str,
    /// Severity.
    pub level: AuditLevel,
    /// Human-readable message.
    pub message: String,
    /// Message identity when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Structured detail.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub detail: Value,
}

impl AuditEvent {
    /// Creates an event with an explicit level, stamped with the current time.
    #[must_use]
    pub fn new(
        level: AuditLevel,
        component: &'static str,
        event: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event,
            timestamp_ms: Timestamp::now().as_unix_millis(),
            component,
            level,
            message: message.into(),
            identity: None,
            detail: Value::Null,
        }
    }

    /// Info-level event.
    #[must_use]
    pub fn info(component: &'static str, event: &'static str, message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Info, component, event, message)
    }

    /// Warn-level event.
    #[must_use]
    pub fn warn(component: &'static str, event: &'static str, message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Warn, component, event, message)
    }

    /// Error-level event.
    #[must_use]
    pub fn error(component: &'static str, event: &'static str, message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Error, component, event, message)
    }

    /// Attaches a message identity.
    #[must_use]
    pub fn with_identity(mut self, identity: &MessageIdentity) -> Self {
        self.identity = Some(identity.as_str().to_string());
        self
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}
