// crates/mailbeacon-compose/src/interceptor.rs
// ============================================================================
// Module: Send Interceptor
// Description: Exactly-once handling of a send intent per compose surface.
// Purpose: Persist the outbound record, then embed tracking artifacts.
// Dependencies: mailbeacon-core, tokio
// ============================================================================

//! ## Overview
//! [`SendInterceptor::on_send_intent`] runs the send pipeline:
//!
//! 1. Skip when the runtime is invalid, another send is in progress, or the
//!    surface is not instrumented or was already sent.
//! 2. Re-read subject and recipient; abort when the recipient is unknown.
//! 3. Persist the [`OutboundMessageRecord`]; abort when that fails.
//! 4. Inject markers and rewrite links. A failure here is logged and the
//!    message goes out untracked.
//! 5. Mark the surface sent and notify the runtime.
//!
//! The in-progress flag ([`ProcessingFlag`]) is process-wide and always
//! cleared when the handler returns. A second send arriving while one is in
//! progress is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use mailbeacon_core::AuditEvent;
use mailbeacon_core::AuditSink;
use mailbeacon_core::InsertOutcome;
use mailbeacon_core::OutboundMessageRecord;
use mailbeacon_core::Timestamp;
use serde_json::json;

use crate::extract::extract_metadata;
use crate::host::ComposeHost;
use crate::host::RuntimeNotification;
use crate::host::SurfaceHandle;
use crate::inject::InjectError;
use crate::inject::InjectionReport;
use crate::inject::TrackingInjector;
use crate::ledger::MessageLedger;
use crate::surface::ComposeSurfaceState;
use crate::surface::SurfaceRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit component label.
const COMPONENT: &str = "send_interceptor";

// ============================================================================
// SECTION: Processing Flag
// ============================================================================

/// Process-wide "a send is being handled" flag.
#[derive(Debug, Clone, Default)]
pub struct ProcessingFlag {
    /// Shared flag value.
    busy: Arc<AtomicBool>,
}

impl ProcessingFlag {
    /// Creates a cleared flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag; `None` when it is already set.
    #[must_use]
    pub fn try_acquire(&self) -> Option<ProcessingGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Returns true while a send is being handled.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Clears the processing flag when dropped.
#[derive(Debug)]
pub struct ProcessingGuard {
    /// Shared flag value.
    busy: Arc<AtomicBool>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Reason a send intent was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendSkip {
    /// Runtime context is invalid.
    RuntimeInvalid,
    /// Another send is being handled.
    Busy,
    /// The surface is not tracked by the watcher.
    UnknownSurface,
    /// The surface has no send listener yet.
    NotInstrumented,
    /// The surface was already sent.
    AlreadyProcessed,
}

impl SendSkip {
    /// Stable label for audit events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RuntimeInvalid => "runtime_invalid",
            Self::Busy => "busy",
            Self::UnknownSurface => "unknown_surface",
            Self::NotInstrumented => "not_instrumented",
            Self::AlreadyProcessed => "already_processed",
        }
    }
}

/// Reason tracking was abandoned before injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendAbort {
    /// The surface disappeared.
    SurfaceGone,
    /// No recipient could be resolved.
    RecipientUnresolved,
    /// The outbound record could not be persisted.
    PersistFailed(String),
}

/// Outcome of one send intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was done.
    Skipped(SendSkip),
    /// Tracking was abandoned; the message goes out untracked.
    Aborted(SendAbort),
    /// The record was persisted but artifacts could not be embedded.
    InjectionFailed {
        /// The persisted record.
        record: OutboundMessageRecord,
        /// Injection failure.
        error: String,
    },
    /// The message is tracked.
    Tracked {
        /// The persisted record.
        record: OutboundMessageRecord,
        /// Whether the record was created by this send.
        created: bool,
        /// Injection details.
        report: InjectionReport,
    },
}

impl SendOutcome {
    /// Stable label for audit events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Skipped(_) => "skipped",
            Self::Aborted(_) => "aborted",
            Self::InjectionFailed {
                ..
            } => "injection_failed",
            Self::Tracked {
                ..
            } => "tracked",
        }
    }
}

// ============================================================================
// SECTION: Interceptor
// ============================================================================

/// Handles send intents for instrumented surfaces.
pub struct SendInterceptor {
    /// Record destination.
    ledger: Arc<dyn MessageLedger>,
    /// Artifact injector.
    injector: TrackingInjector,
    /// Process-wide in-progress flag.
    processing: ProcessingFlag,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl SendInterceptor {
    /// Creates an interceptor.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn MessageLedger>,
        injector: TrackingInjector,
        processing: ProcessingFlag,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            ledger,
            injector,
            processing,
            audit,
        }
    }

    /// Returns the processing flag shared by this interceptor.
    #[must_use]
    pub const fn processing(&self) -> &ProcessingFlag {
        &self.processing
    }

    /// Handles one send intent on `handle`.
    pub async fn on_send_intent<H: ComposeHost + ?Sized>(
        &self,
        host: &mut H,
        registry: &mut SurfaceRegistry,
        handle: SurfaceHandle,
        now: Timestamp,
    ) -> SendOutcome {
        let outcome = self.process(host, registry, handle, now).await;
        self.audit_outcome(handle, &outcome);
        outcome
    }

    /// Runs the pipeline under the processing flag.
    async fn process<H: ComposeHost + ?Sized>(
        &self,
        host: &mut H,
        registry: &mut SurfaceRegistry,
        handle: SurfaceHandle,
        now: Timestamp,
    ) -> SendOutcome {
        if !host.runtime_valid() {
            return SendOutcome::Skipped(SendSkip::RuntimeInvalid);
        }
        let Some(_guard) = self.processing.try_acquire() else {
            return SendOutcome::Skipped(SendSkip::Busy);
        };
        let identity = match registry.get(handle) {
            Some(state) if state.is_sent() => {
                return SendOutcome::Skipped(SendSkip::AlreadyProcessed);
            }
            Some(state) if !state.is_instrumented() => {
                return SendOutcome::Skipped(SendSkip::NotInstrumented);
            }
            Some(state) => match state.identity() {
                Some(identity) => identity.clone(),
                None => return SendOutcome::Skipped(SendSkip::UnknownSurface),
            },
            None => return SendOutcome::Skipped(SendSkip::UnknownSurface),
        };

        let Ok(Some(snapshot)) = host.snapshot(handle) else {
            return SendOutcome::Aborted(SendAbort::SurfaceGone);
        };
        let metadata = extract_metadata(&snapshot);
        if !metadata.recipient.is_resolved() {
            return SendOutcome::Aborted(SendAbort::RecipientUnresolved);
        }

        let record = OutboundMessageRecord::sent(
            identity.clone(),
            metadata.subject,
            metadata.recipient.as_str(),
            now,
        );
        let created = match self.ledger.persist(&record).await {
            Ok(outcome) => outcome == InsertOutcome::Inserted,
            Err(err) => return SendOutcome::Aborted(SendAbort::PersistFailed(err.to_string())),
        };

        let Some(body) = host.body_mut(handle) else {
            return SendOutcome::InjectionFailed {
                record,
                error: "message body is gone".to_string(),
            };
        };
        let report = match self.injector.inject(body, &identity) {
            Ok(report) => report,
            Err(err) => {
                return SendOutcome::InjectionFailed {
                    record,
                    error: err.to_string(),
                };
            }
        };
        self.audit_link_failures(&record, &report.links.failures);

        let marked = registry.get_mut(handle).is_some_and(ComposeSurfaceState::mark_sent);
        if !marked {
            self.audit.record(
                &AuditEvent::warn(COMPONENT, "mark_sent_failed", "surface left the instrumented phase")
                    .with_identity(&record.id)
                    .with_detail(json!({ "surface": handle.get() })),
            );
        }
        if let Err(err) = host.notify(RuntimeNotification::MessageSent {
            record: record.clone(),
        }) {
            self.audit.record(
                &AuditEvent::warn(COMPONENT, "notify_failed", err.to_string())
                    .with_identity(&record.id),
            );
        }
        SendOutcome::Tracked {
            record,
            created,
            report,
        }
    }

    /// Logs each failed link individually.
    fn audit_link_failures(&self, record: &OutboundMessageRecord, failures: &[InjectError]) {
        for failure in failures {
            self.audit.record(
                &AuditEvent::warn(COMPONENT, "link_rewrite_failed", failure.to_string())
                    .with_identity(&record.id),
            );
        }
    }

    /// Emits the audit event for an outcome.
    fn audit_outcome(&self, handle: SurfaceHandle, outcome: &SendOutcome) {
        let event = match outcome {
            SendOutcome::Skipped(reason) => AuditEvent::info(
                COMPONENT,
                "send_skipped",
                "send intent ignored",
            )
            .with_detail(json!({ "surface": handle.get(), "reason": reason.as_str() })),
            SendOutcome::Aborted(reason) => {
                let message = match reason {
                    SendAbort::SurfaceGone => "surface disappeared before send".to_string(),
                    SendAbort::RecipientUnresolved => {
                        "could not detect recipient, skipping tracking".to_string()
                    }
                    SendAbort::PersistFailed(err) => format!("failed to store message: {err}"),
                };
                AuditEvent::warn(COMPONENT, "send_untracked", message)
                    .with_detail(json!({ "surface": handle.get() }))
            }
            SendOutcome::InjectionFailed {
                record,
                error,
            } => AuditEvent::error(COMPONENT, "injection_failed", error.clone())
                .with_identity(&record.id)
                .with_detail(json!({ "surface": handle.get() })),
            SendOutcome::Tracked {
                record,
                created,
                report,
            } => AuditEvent::info(COMPONENT, "send_tracked", "tracking embedded")
                .with_identity(&record.id)
                .with_detail(json!({
                    "surface": handle.get(),
                    "created": created,
                    "links_rewritten": report.links.rewritten,
                    "link_failures": report.links.failures.len(),
                })),
        };
        self.audit.record(&event);
    }
}
