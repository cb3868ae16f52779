// crates/mailbeacon-compose/src/watcher.rs
// ============================================================================
// Module: Compose Surface Watcher
// Description: Idempotent reconciliation of live compose surfaces.
// Purpose: Assign identities and attach one send listener per surface.
// Dependencies: mailbeacon-core
// ============================================================================

//! ## Overview
//! [`SurfaceWatcher::reconcile`] runs after every mutation batch. For each
//! live surface it:
//!
//! 1. assigns an identity from the current subject and recipient if the
//!    surface has none;
//! 2. attaches exactly one send listener once the send affordance and body
//!    are present, tracking is enabled, and the recipient resolves.
//!
//! Surfaces whose handles vanish are dropped from the registry. A surface
//! whose recipient resolves to `Unknown` is left uninstrumented and produces
//! a single warning. Nothing here blocks sending.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use mailbeacon_core::AuditEvent;
use mailbeacon_core::AuditSink;
use mailbeacon_core::derive_identity;
use serde_json::json;

use crate::extract::extract_metadata;
use crate::host::ComposeHost;
use crate::host::SurfaceHandle;
use crate::surface::SurfaceRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit component label.
const COMPONENT: &str = "surface_watcher";

// ============================================================================
// SECTION: Report
// ============================================================================

/// Changes made by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// The pass was skipped because the runtime context is invalid.
    pub runtime_invalid: bool,
    /// Surfaces seen for the first time.
    pub discovered: Vec<SurfaceHandle>,
    /// Surfaces that received an identity.
    pub identified: Vec<SurfaceHandle>,
    /// Surfaces that received a send listener.
    pub instrumented: Vec<SurfaceHandle>,
    /// Surfaces left uninstrumented because the recipient is unknown.
    pub unresolved: Vec<SurfaceHandle>,
    /// Surfaces dropped because the host no longer reports them.
    pub removed: Vec<SurfaceHandle>,
}

// ============================================================================
// SECTION: Watcher
// ============================================================================

/// Observer of compose surfaces.
pub struct SurfaceWatcher {
    /// Surface state.
    registry: SurfaceRegistry,
    /// Whether new surfaces are instrumented.
    tracking_enabled: bool,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl SurfaceWatcher {
    /// Creates a watcher with an empty registry.
    #[must_use]
    pub fn new(tracking_enabled: bool, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            registry: SurfaceRegistry::new(),
            tracking_enabled,
            audit,
        }
    }

    /// Whether new surfaces are instrumented.
    #[must_use]
    pub const fn tracking_enabled(&self) -> bool {
        self.tracking_enabled
    }

    /// Updates the tracking preference.
    pub const fn set_tracking_enabled(&mut self, enabled: bool) {
        self.tracking_enabled = enabled;
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Returns the registry mutably.
    pub const fn registry_mut(&mut self) -> &mut SurfaceRegistry {
        &mut self.registry
    }

    /// Runs one reconciliation pass over the host's live surfaces.
    pub fn reconcile<H: ComposeHost + ?Sized>(&mut self, host: &mut H) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if !host.runtime_valid() {
            report.runtime_invalid = true;
            return report;
        }
        let handles = match host.surfaces() {
            Ok(handles) => handles,
            Err(err) => {
                self.audit.record(&AuditEvent::warn(
                    COMPONENT,
                    "surface_query_failed",
                    err.to_string(),
                ));
                return report;
            }
        };
        let live: BTreeSet<SurfaceHandle> = handles.iter().copied().collect();
        report.removed = self.registry.retain_live(&live);

        for handle in live {
            let snapshot = match host.snapshot(handle) {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => continue,
                Err(err) => {
                    self.audit.record(
                        &AuditEvent::warn(COMPONENT, "surface_snapshot_failed", err.to_string())
                            .with_detail(json!({ "surface": handle.get() })),
                    );
                    continue;
                }
            };
            let metadata = extract_metadata(&snapshot);
            let (state, inserted) = self.registry.discover(handle);
            if inserted {
                report.discovered.push(handle);
            }
            if state.identity().is_none() {
                let identity = derive_identity(&metadata.subject, metadata.recipient.as_str());
                if state.identify(identity) {
                    report.identified.push(handle);
                }
            }

            if state.is_instrumented()
                || !snapshot.has_send_affordance
                || !snapshot.has_body
                || !self.tracking_enabled
            {
                continue;
            }
            if !metadata.recipient.is_resolved() {
                report.unresolved.push(handle);
                if state.take_recipient_warning() {
                    let mut event = AuditEvent::warn(
                        COMPONENT,
                        "recipient_unresolved",
                        "could not detect recipient; surface left untracked",
                    )
                    .with_detail(json!({ "surface": handle.get() }));
                    if let Some(identity) = state.identity() {
                        event = event.with_identity(identity);
                    }
                    self.audit.record(&event);
                }
                continue;
            }
            match host.attach_send_listener(handle) {
                Ok(()) => {
                    if state.mark_instrumented() {
                        report.instrumented.push(handle);
                    }
                }
                Err(err) => {
                    self.audit.record(
                        &AuditEvent::warn(COMPONENT, "listener_attach_failed", err.to_string())
                            .with_detail(json!({ "surface": handle.get() })),
                    );
                }
            }
        }
        report
    }
}
