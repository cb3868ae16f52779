// crates/mailbeacon-compose/tests/watcher_reconcile.rs
// ============================================================================
// Module: Surface Watcher Tests
// Description: Reconciliation behavior across repeated mutation batches.
// Purpose: Validate stable identities, single listeners, and surface cleanup.
// Dependencies: mailbeacon-compose, mailbeacon-core
// ============================================================================

//! ## Overview
//! Drives [`SurfaceWatcher::reconcile`] against the in-memory host while the
//! surfaces change underneath it.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use common::CapturingAuditSink;
use common::FakeHost;
use mailbeacon_compose::SurfacePhase;
use mailbeacon_compose::SurfaceWatcher;
use mailbeacon_core::derive_identity;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn identity_is_assigned_once_and_never_reassigned() {
    let mut host = FakeHost::new();
    let handle = host.open(1, "Quarterly plan", "ana@example.com");
    let mut watcher = SurfaceWatcher::new(true, CapturingAuditSink::new());

    let report = watcher.reconcile(&mut host);
    assert_eq!(report.discovered, vec![handle]);
    assert_eq!(report.identified, vec![handle]);
    let expected = derive_identity("Quarterly plan", "ana@example.com");
    assert_eq!(watcher.registry().get(handle).unwrap().identity(), Some(&expected));

    host.surface_mut(handle).snapshot.subject = Some("Edited subject".to_string());
    let report = watcher.reconcile(&mut host);
    assert!(report.identified.is_empty());
    assert_eq!(watcher.registry().get(handle).unwrap().identity(), Some(&expected));
}

#[test]
fn repeated_passes_attach_a_single_listener() {
    let mut host = FakeHost::new();
    let handle = host.open(1, "Hello", "ana@example.com");
    let mut watcher = SurfaceWatcher::new(true, CapturingAuditSink::new());

    for _ in 0 .. 5 {
        watcher.reconcile(&mut host);
    }
    assert_eq!(host.surface(handle).listeners, 1);
    assert_eq!(watcher.registry().get(handle).unwrap().phase(), SurfacePhase::Instrumented);
}

#[test]
fn listener_waits_for_send_affordance_and_body() {
    let mut host = FakeHost::new();
    let handle = host.open(1, "Hello", "ana@example.com");
    host.surface_mut(handle).snapshot.has_send_affordance = false;
    let mut watcher = SurfaceWatcher::new(true, CapturingAuditSink::new());

    let report = watcher.reconcile(&mut host);
    assert!(report.instrumented.is_empty());
    assert_eq!(watcher.registry().get(handle).unwrap().phase(), SurfacePhase::Identified);

    host.surface_mut(handle).snapshot.has_send_affordance = true;
    let report = watcher.reconcile(&mut host);
    assert_eq!(report.instrumented, vec![handle]);
}

#[test]
fn closed_surfaces_are_dropped() {
    let mut host = FakeHost::new();
    let first = host.open(1, "One", "a@example.com");
    let second = host.open(2, "Two", "b@example.com");
    let mut watcher = SurfaceWatcher::new(true, CapturingAuditSink::new());
    watcher.reconcile(&mut host);
    assert_eq!(watcher.registry().len(), 2);

    host.close(first);
    let report = watcher.reconcile(&mut host);
    assert_eq!(report.removed, vec![first]);
    assert!(watcher.registry().get(first).is_none());
    assert!(watcher.registry().get(second).is_some());
}

#[test]
fn unknown_recipient_is_left_untracked_and_warned_once() {
    let mut host = FakeHost::new();
    let handle = host.open(1, "Draft", "");
    host.surface_mut(handle).snapshot.to_textarea = None;
    let audit = CapturingAuditSink::new();
    let mut watcher = SurfaceWatcher::new(true, audit.clone());

    let first = watcher.reconcile(&mut host);
    let second = watcher.reconcile(&mut host);
    assert_eq!(first.unresolved, vec![handle]);
    assert_eq!(second.unresolved, vec![handle]);
    assert_eq!(host.surface(handle).listeners, 0);
    assert_eq!(audit.count("recipient_unresolved"), 1);
    let state = watcher.registry().get(handle).unwrap();
    assert_eq!(state.identity(), Some(&derive_identity("Draft", "Unknown")));
    assert!(!state.is_instrumented());
}

#[test]
fn recipient_resolved_later_instruments_with_original_identity() {
    let mut host = FakeHost::new();
    let handle = host.open(1, "Draft", "");
    host.surface_mut(handle).snapshot.to_textarea = None;
    let mut watcher = SurfaceWatcher::new(true, CapturingAuditSink::new());
    watcher.reconcile(&mut host);

    host.surface_mut(handle).snapshot.presentation_emails = vec!["late@example.com".to_string()];
    let report = watcher.reconcile(&mut host);
    assert_eq!(report.instrumented, vec![handle]);
    let state = watcher.registry().get(handle).unwrap();
    assert_eq!(state.identity(), Some(&derive_identity("Draft", "Unknown")));
}

#[test]
fn disabled_tracking_skips_instrumentation() {
    let mut host = FakeHost::new();
    let handle = host.open(1, "Hello", "ana@example.com");
    let mut watcher = SurfaceWatcher::new(false, CapturingAuditSink::new());

    let report = watcher.reconcile(&mut host);
    assert_eq!(report.identified, vec![handle]);
    assert!(report.instrumented.is_empty());
    assert_eq!(host.surface(handle).listeners, 0);

    watcher.set_tracking_enabled(true);
    watcher.reconcile(&mut host);
    assert_eq!(host.surface(handle).listeners, 1);
}

#[test]
fn invalid_runtime_stops_the_pass() {
    let mut host = FakeHost::new();
    host.open(1, "Hello", "ana@example.com");
    host.invalid = true;
    let mut watcher = SurfaceWatcher::new(true, CapturingAuditSink::new());

    let report = watcher.reconcile(&mut host);
    assert!(report.runtime_invalid);
    assert!(watcher.registry().is_empty());
}
