// crates/mailbeacon-compose/tests/send_interceptor.rs
// ============================================================================
// Module: Send Interceptor Tests
// Description: Exactly-once send handling and failure paths.
// Purpose: Validate persist-then-inject ordering and untracked fallbacks.
// Dependencies: mailbeacon-compose, mailbeacon-core, async-trait, tokio
// ============================================================================

//! ## Overview
//! Runs the interceptor against the in-memory host with a store-backed or
//! failing ledger.

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

use std::sync::Arc;

use async_trait::async_trait;
use common::CapturingAuditSink;
use common::FakeHost;
use common::TRACKER;
use common::injector;
use common::memory_store;
use common::sample_body;
use common::store_interceptor;
use mailbeacon_compose::LedgerError;
use mailbeacon_compose::MessageLedger;
use mailbeacon_compose::ProcessingFlag;
use mailbeacon_compose::RuntimeNotification;
use mailbeacon_compose::SendAbort;
use mailbeacon_compose::SendInterceptor;
use mailbeacon_compose::SendOutcome;
use mailbeacon_compose::SendSkip;
use mailbeacon_compose::SurfaceHandle;
use mailbeacon_compose::SurfacePhase;
use mailbeacon_compose::SurfaceWatcher;
use mailbeacon_compose::inject::count_markers;
use mailbeacon_core::InsertOutcome;
use mailbeacon_core::MessageIdentity;
use mailbeacon_core::MessageStatus;
use mailbeacon_core::OutboundMessageRecord;
use mailbeacon_core::Timestamp;
use mailbeacon_core::TrackingStore;
use mailbeacon_core::derive_identity;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ledger that rejects every call.
struct FailingLedger;

#[async_trait]
impl MessageLedger for FailingLedger {
    async fn message_exists(&self, _identity: &MessageIdentity) -> Result<bool, LedgerError> {
        Err(LedgerError::Transport("connection refused".to_string()))
    }

    async fn insert_message(
        &self,
        _record: &OutboundMessageRecord,
    ) -> Result<InsertOutcome, LedgerError> {
        Err(LedgerError::Transport("connection refused".to_string()))
    }
}

fn instrumented(subject: &str, recipient: &str) -> (FakeHost, SurfaceWatcher, SurfaceHandle) {
    let mut host = FakeHost::new();
    let handle = host.open(7, subject, recipient);
    let mut watcher = SurfaceWatcher::new(true, CapturingAuditSink::new());
    let report = watcher.reconcile(&mut host);
    assert_eq!(report.instrumented, vec![handle]);
    (host, watcher, handle)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn repeated_send_intents_track_once() {
    let (mut host, mut watcher, handle) = instrumented("Launch", "ana@example.com");
    let store = memory_store();
    let audit = CapturingAuditSink::new();
    let interceptor = store_interceptor(&store, audit.clone());
    let identity = derive_identity("Launch", "ana@example.com");

    let first = interceptor
        .on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now())
        .await;
    let SendOutcome::Tracked {
        record,
        created,
        report,
    } = first
    else {
        panic!("expected tracked send, got {first:?}");
    };
    assert!(created);
    assert_eq!(record.id, identity);
    assert_eq!(record.recipient, "ana@example.com");
    assert_eq!(record.status, MessageStatus::Sent);
    assert_eq!(report.links.rewritten, 2);

    let second = interceptor
        .on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now())
        .await;
    assert_eq!(second, SendOutcome::Skipped(SendSkip::AlreadyProcessed));

    let body = &host.surface(handle).body;
    assert_eq!(count_markers(body, &identity, "primary"), 1);
    assert_eq!(count_markers(body, &identity, "backup"), 1);
    assert_eq!(host.notifications.len(), 1);
    assert!(matches!(
        &host.notifications[0],
        RuntimeNotification::MessageSent { record } if record.id == identity
    ));
    assert_eq!(watcher.registry().get(handle).unwrap().phase(), SurfacePhase::Sent);
    assert!(store.message_exists(&identity).unwrap());
    assert_eq!(audit.count("send_tracked"), 1);
    assert_eq!(audit.count("send_skipped"), 1);
}

#[tokio::test]
async fn links_point_at_redirect_with_original_destination() {
    let (mut host, mut watcher, handle) = instrumented("Links", "ana@example.com");
    let store = memory_store();
    let interceptor = store_interceptor(&store, CapturingAuditSink::new());

    interceptor.on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now()).await;

    let html = host.surface(handle).body.render_html();
    assert!(html.contains(&format!("{TRACKER}/track/link?url=https%3A%2F%2Fexample.com%2Fa")));
    assert!(html.contains("data-tracked=\"true\""));
    assert!(html.contains(&format!("{TRACKER}/track/pixel/")));
}

#[tokio::test]
async fn existing_record_counts_as_persisted() {
    let (mut host, mut watcher, handle) = instrumented("Again", "ana@example.com");
    let store = memory_store();
    let identity = derive_identity("Again", "ana@example.com");
    store
        .insert_message(&OutboundMessageRecord::sent(
            identity.clone(),
            "Again",
            "ana@example.com",
            Timestamp::from_unix_millis(1),
        ))
        .unwrap();
    let interceptor = store_interceptor(&store, CapturingAuditSink::new());

    let outcome =
        interceptor.on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now()).await;
    assert!(matches!(outcome, SendOutcome::Tracked { created: false, .. }));
    let stored = store.load_message(&identity).unwrap().unwrap();
    assert_eq!(stored.sent_at, Timestamp::from_unix_millis(1));
}

#[tokio::test]
async fn busy_flag_drops_concurrent_intent() {
    let (mut host, mut watcher, handle) = instrumented("Busy", "ana@example.com");
    let store = memory_store();
    let interceptor = store_interceptor(&store, CapturingAuditSink::new());

    let guard = interceptor.processing().try_acquire().unwrap();
    let outcome =
        interceptor.on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now()).await;
    assert_eq!(outcome, SendOutcome::Skipped(SendSkip::Busy));
    drop(guard);

    let outcome =
        interceptor.on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now()).await;
    assert_eq!(outcome.label(), "tracked");
    assert!(!interceptor.processing().is_busy());
}

#[tokio::test]
async fn persist_failure_sends_untracked() {
    let (mut host, mut watcher, handle) = instrumented("Offline", "ana@example.com");
    let audit = CapturingAuditSink::new();
    let interceptor =
        SendInterceptor::new(Arc::new(FailingLedger), injector(), ProcessingFlag::new(), audit.clone());

    let outcome =
        interceptor.on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now()).await;
    assert!(matches!(outcome, SendOutcome::Aborted(SendAbort::PersistFailed(_))));
    assert_eq!(host.surface(handle).body, sample_body());
    assert!(host.notifications.is_empty());
    assert_eq!(watcher.registry().get(handle).unwrap().phase(), SurfacePhase::Instrumented);
    assert!(!interceptor.processing().is_busy());
    assert_eq!(audit.count("send_untracked"), 1);
}

#[tokio::test]
async fn recipient_cleared_before_send_aborts() {
    let (mut host, mut watcher, handle) = instrumented("Cleared", "ana@example.com");
    host.surface_mut(handle).snapshot.to_textarea = None;
    let store = memory_store();
    let interceptor = store_interceptor(&store, CapturingAuditSink::new());

    let outcome =
        interceptor.on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now()).await;
    assert_eq!(outcome, SendOutcome::Aborted(SendAbort::RecipientUnresolved));
    assert!(!store.message_exists(&derive_identity("Cleared", "ana@example.com")).unwrap());
    assert_eq!(host.surface(handle).body, sample_body());
}

#[tokio::test]
async fn record_uses_subject_at_send_time_with_assigned_identity() {
    let (mut host, mut watcher, handle) = instrumented("Before", "ana@example.com");
    host.surface_mut(handle).snapshot.subject = Some("After".to_string());
    let store = memory_store();
    let interceptor = store_interceptor(&store, CapturingAuditSink::new());

    let outcome =
        interceptor.on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now()).await;
    let SendOutcome::Tracked { record, .. } = outcome else {
        panic!("expected tracked send");
    };
    assert_eq!(record.id, derive_identity("Before", "ana@example.com"));
    assert_eq!(record.subject, "After");
}

#[tokio::test]
async fn invalid_runtime_and_unknown_surface_are_skipped() {
    let (mut host, mut watcher, handle) = instrumented("Skip", "ana@example.com");
    let store = memory_store();
    let interceptor = store_interceptor(&store, CapturingAuditSink::new());

    let outcome = interceptor
        .on_send_intent(&mut host, watcher.registry_mut(), SurfaceHandle::new(99), Timestamp::now())
        .await;
    assert_eq!(outcome, SendOutcome::Skipped(SendSkip::UnknownSurface));

    host.invalid = true;
    let outcome =
        interceptor.on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now()).await;
    assert_eq!(outcome, SendOutcome::Skipped(SendSkip::RuntimeInvalid));
    assert!(host.notifications.is_empty());
}

#[tokio::test]
async fn surface_without_listener_is_never_tracked() {
    let mut host = FakeHost::new();
    let handle = host.open(7, "Quiet", "ana@example.com");
    let mut watcher = SurfaceWatcher::new(false, CapturingAuditSink::new());
    watcher.reconcile(&mut host);
    assert_eq!(watcher.registry().get(handle).unwrap().phase(), SurfacePhase::Identified);
    let store = memory_store();
    let audit = CapturingAuditSink::new();
    let interceptor = store_interceptor(&store, audit.clone());

    for _ in 0 .. 2 {
        let outcome = interceptor
            .on_send_intent(&mut host, watcher.registry_mut(), handle, Timestamp::now())
            .await;
        assert_eq!(outcome, SendOutcome::Skipped(SendSkip::NotInstrumented));
    }

    assert!(host.notifications.is_empty());
    assert_eq!(host.surface(handle).listeners, 0);
    assert_eq!(host.surface(handle).body, sample_body());
    assert!(!store.message_exists(&derive_identity("Quiet", "ana@example.com")).unwrap());
    assert_eq!(watcher.registry().get(handle).unwrap().phase(), SurfacePhase::Identified);
    assert_eq!(audit.count("send_skipped"), 2);
    assert_eq!(audit.count("send_tracked"), 0);
}
