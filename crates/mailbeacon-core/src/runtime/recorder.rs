// crates/mailbeacon-core/src/runtime/recorder.rs
// ============================================================================
// Module: Mailbeacon Event Recorder
// Description: Validation, deduplication, and persistence of callbacks.
// Purpose: Turn remote open/click callbacks into at most one event per window.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! One [`EventRecorder`] handles opens and another handles clicks; they share
//! the same pipeline:
//!
//! 1. Parse the identity (and target URL for clicks).
//! 2. Check the rate-limit key; suppressed callbacks stop here.
//! 3. The key is recorded as seen and stale keys are evicted.
//! 4. Confirm the identity has an outbound message record.
//! 5. Persist the event.
//!
//! Every step yields a [`RecordOutcome`] instead of an error. Only a click
//! with missing fields is reported as [`RecordOutcome::Rejected`]; every
//! other outcome maps to the benign fallback response at the transport edge.
//!
//! Security posture: callers are uncontrolled mail clients. Identities are
//! parsed with [`MessageIdentity::from_untrusted`] and invalid values are
//! treated as unknown identities.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::json;

use crate::core::AuditEvent;
use crate::core::ClickEvent;
use crate::core::EventKind;
use crate::core::MessageIdentity;
use crate::core::NetworkOrigin;
use crate::core::OpenEvent;
use crate::core::RateLimitKey;
use crate::core::Timestamp;
use crate::interfaces::AuditSink;
use crate::interfaces::RateLimiter;
use crate::interfaces::StoreError;
use crate::interfaces::TrackingStore;
use crate::runtime::store::SharedTrackingStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Component label used in audit events.
const COMPONENT: &str = "event_recorder";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Fields parsed from a callback request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackRequest {
    /// Raw identity value, if present.
    pub identity: Option<String>,
    /// Raw target URL (clicks only), if present.
    pub target_url: Option<String>,
}

impl CallbackRequest {
    /// Request for an open callback.
    #[must_use]
    pub fn open(identity: Option<String>) -> Self {
        Self {
            identity,
            target_url: None,
        }
    }

    /// Request for a click callback.
    #[must_use]
    pub fn click(identity: Option<String>, target_url: Option<String>) -> Self {
        Self {
            identity,
            target_url,
        }
    }
}

/// Caller metadata captured at the transport edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackContext {
    /// Network origin of the caller.
    pub origin: NetworkOrigin,
    /// Caller agent string.
    pub user_agent: String,
    /// Time the request was received.
    pub received_at: Timestamp,
}

/// Reason a callback was rejected with a client error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Click callback carried no target URL.
    MissingTargetUrl,
    /// Click callback carried no identity.
    MissingIdentity,
}

impl RejectReason {
    /// Response body for every rejected click callback.
    pub const MESSAGE: &'static str = "URL and email ID required";

    /// Stable label for audit events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingTargetUrl => "missing_target_url",
            Self::MissingIdentity => "missing_identity",
        }
    }
}

/// Outcome of handling one callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new event was persisted.
    Recorded,
    /// The key was seen within the window; nothing was persisted.
    Suppressed,
    /// No message record exists for the identity (or it was malformed).
    UnknownIdentity,
    /// Open callback without an identity.
    MissingIdentity,
    /// Click callback missing required fields.
    Rejected(RejectReason),
    /// Backend failure; logged and swallowed.
    Failed(String),
}

impl RecordOutcome {
    /// Stable label for audit events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Suppressed => "suppressed",
            Self::UnknownIdentity => "unknown_identity",
            Self::MissingIdentity => "missing_identity",
            Self::Rejected(_) => "rejected",
            Self::Failed(_) => "failed",
        }
    }
}

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Event recorder for one callback kind.
#[derive(Clone)]
pub struct EventRecorder {
    /// Callback kind handled by this instance.
    kind: EventKind,
    /// Backend store.
    store: SharedTrackingStore,
    /// Rate limiter shared by both recorders.
    limiter: Arc<dyn RateLimiter>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl EventRecorder {
    /// Creates a recorder for the given kind.
    #[must_use]
    pub fn new(
        kind: EventKind,
        store: SharedTrackingStore,
        limiter: Arc<dyn RateLimiter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            kind,
            store,
            limiter,
            audit,
        }
    }

    /// Creates the open-event recorder.
    #[must_use]
    pub fn opens(
        store: SharedTrackingStore,
        limiter: Arc<dyn RateLimiter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::new(EventKind::Open, store, limiter, audit)
    }

    /// Creates the click-event recorder.
    #[must_use]
    pub fn clicks(
        store: SharedTrackingStore,
        limiter: Arc<dyn RateLimiter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::new(EventKind::Click, store, limiter, audit)
    }

    /// Returns the callback kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Handles one callback and reports what happened.
    #[must_use]
    pub fn handle(&self, request: &CallbackRequest, context: &CallbackContext) -> RecordOutcome {
        let identity = match self.parse(request) {
            Ok(identity) => identity,
            Err(outcome) => {
                self.audit_outcome(&outcome, None, context);
                return outcome;
            }
        };
        let Some(identity) = identity else {
            let outcome = RecordOutcome::UnknownIdentity;
            self.audit_outcome(&outcome, None, context);
            return outcome;
        };
        let target_url = request.target_url.as_deref().unwrap_or_default();

        let key = match self.kind {
            EventKind::Open => RateLimitKey::open(&identity, &context.origin),
            EventKind::Click => RateLimitKey::click(&identity, target_url, &context.origin),
        };
        match self.limiter.check_and_record(&key, context.received_at) {
            Ok(true) => {
                let outcome = RecordOutcome::Suppressed;
                self.audit_outcome(&outcome, Some(&identity), context);
                return outcome;
            }
            Ok(false) => {}
            Err(err) => {
                self.audit.record(
                    &AuditEvent::warn(COMPONENT, "rate_limit_unavailable", err.to_string())
                        .with_identity(&identity)
                        .with_detail(json!({ "kind": self.kind })),
                );
            }
        }

        let outcome = self.persist(&identity, target_url, context);
        self.audit_outcome(&outcome, Some(&identity), context);
        outcome
    }

    /// Extracts the identity, rejecting clicks with missing fields.
    ///
    /// `Ok(None)` means the identity was present but malformed.
    fn parse(&self, request: &CallbackRequest) -> Result<Option<MessageIdentity>, RecordOutcome> {
        let raw = request.identity.as_deref().filter(|value| !value.is_empty());
        if self.kind == EventKind::Click {
            if request.target_url.as_deref().is_none_or(str::is_empty) {
                return Err(RecordOutcome::Rejected(RejectReason::MissingTargetUrl));
            }
            if raw.is_none() {
                return Err(RecordOutcome::Rejected(RejectReason::MissingIdentity));
            }
        }
        let Some(raw) = raw else {
            return Err(RecordOutcome::MissingIdentity);
        };
        Ok(MessageIdentity::from_untrusted(raw).ok())
    }

    /// Validates the identity and persists the event.
    fn persist(
        &self,
        identity: &MessageIdentity,
        target_url: &str,
        context: &CallbackContext,
    ) -> RecordOutcome {
        match self.store.message_exists(identity) {
            Ok(true) => {}
            Ok(false) => return RecordOutcome::UnknownIdentity,
            Err(err) => return RecordOutcome::Failed(err.to_string()),
        }
        let result = match self.kind {
            EventKind::Open => self.store.record_open(&OpenEvent {
                identity: identity.clone(),
                occurred_at: context.received_at,
                source_location: None,
                origin: context.origin.clone(),
                user_agent: context.user_agent.clone(),
            }),
            EventKind::Click => self.store.record_click(&ClickEvent {
                identity: identity.clone(),
                occurred_at: context.received_at,
                target_url: target_url.to_string(),
                origin: context.origin.clone(),
                user_agent: context.user_agent.clone(),
            }),
        };
        match result {
            Ok(()) => RecordOutcome::Recorded,
            Err(StoreError::NotFound(_)) => RecordOutcome::UnknownIdentity,
            Err(err) => RecordOutcome::Failed(err.to_string()),
        }
    }

    /// Emits the audit event for an outcome.
    fn audit_outcome(
        &self,
        outcome: &RecordOutcome,
        identity: Option<&MessageIdentity>,
        context: &CallbackContext,
    ) {
        let (event, message) = match (self.kind, outcome) {
            (EventKind::Open, RecordOutcome::Recorded) => ("open_recorded", "open recorded"),
            (EventKind::Click, RecordOutcome::Recorded) => ("click_recorded", "click recorded"),
            (_, RecordOutcome::Suppressed) => {
                ("callback_suppressed", "duplicate callback within rate-limit window")
            }
            (_, RecordOutcome::UnknownIdentity) => ("callback_unknown", "identity not found"),
            (_, RecordOutcome::MissingIdentity) => {
                ("callback_missing_identity", "callback without identity")
            }
            (_, RecordOutcome::Rejected(_)) => ("callback_rejected", "missing required fields"),
            (_, RecordOutcome::Failed(_)) => ("callback_failed", "event persistence failed"),
        };
        let reason = match outcome {
            RecordOutcome::Rejected(reason) => Some(reason.label().to_string()),
            RecordOutcome::Failed(error) => Some(error.clone()),
            _ => None,
        };
        let detail = json!({
            "kind": self.kind,
            "outcome": outcome.label(),
            "origin": context.origin.as_str(),
            "reason": reason,
        });
        let mut audit = match outcome {
            RecordOutcome::Failed(_) => AuditEvent::error(COMPONENT, event, message),
            RecordOutcome::Rejected(_) => AuditEvent::warn(COMPONENT, event, message),
            _ => AuditEvent::info(COMPONENT, event, message),
        }
        .with_detail(detail);
        if let Some(identity) = identity {
            audit = audit.with_identity(identity);
        }
        self.audit.record(&audit);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
