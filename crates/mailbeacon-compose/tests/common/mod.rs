// crates/mailbeacon-compose/tests/common/mod.rs
// ============================================================================
// Module: Compose Test Harness
// Description: In-memory compose host and capturing audit sink.
// Purpose: Drive the watcher, interceptor, and agent without a browser.
// Dependencies: mailbeacon-compose, mailbeacon-core
// ============================================================================

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Shared helpers are not used by every test binary."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use mailbeacon_compose::BodyNode;
use mailbeacon_compose::ComposeHost;
use mailbeacon_compose::Element;
use mailbeacon_compose::HostError;
use mailbeacon_compose::MessageBody;
use mailbeacon_compose::ProcessingFlag;
use mailbeacon_compose::RuntimeNotification;
use mailbeacon_compose::SendInterceptor;
use mailbeacon_compose::StoreLedger;
use mailbeacon_compose::SurfaceHandle;
use mailbeacon_compose::SurfaceSnapshot;
use mailbeacon_compose::TrackingInjector;
use mailbeacon_core::AuditEvent;
use mailbeacon_core::AuditSink;
use mailbeacon_core::InMemoryTrackingStore;
use mailbeacon_core::SharedTrackingStore;
use url::Url;

// ============================================================================
// SECTION: Fake Host
// ============================================================================

/// One compose window held by [`FakeHost`].
#[derive(Debug, Clone)]
pub struct FakeSurface {
    pub snapshot: SurfaceSnapshot,
    pub body: MessageBody,
    pub listeners: usize,
}

/// In-memory webmail document.
#[derive(Debug, Default)]
pub struct FakeHost {
    pub invalid: bool,
    pub surfaces: BTreeMap<SurfaceHandle, FakeSurface>,
    pub notifications: Vec<RuntimeNotification>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a ready compose window and returns its handle.
    pub fn open(&mut self, raw: u64, subject: &str, recipient: &str) -> SurfaceHandle {
        let handle = SurfaceHandle::new(raw);
        self.surfaces.insert(
            handle,
            FakeSurface {
                snapshot: ready_snapshot(subject, recipient),
                body: sample_body(),
                listeners: 0,
            },
        );
        handle
    }

    pub fn close(&mut self, handle: SurfaceHandle) {
        self.surfaces.remove(&handle);
    }

    pub fn surface(&self, handle: SurfaceHandle) -> &FakeSurface {
        self.surfaces.get(&handle).expect("surface present")
    }

    pub fn surface_mut(&mut self, handle: SurfaceHandle) -> &mut FakeSurface {
        self.surfaces.get_mut(&handle).expect("surface present")
    }
}

impl ComposeHost for FakeHost {
    fn runtime_valid(&self) -> bool {
        !self.invalid
    }

    fn surfaces(&self) -> Result<Vec<SurfaceHandle>, HostError> {
        if self.invalid {
            return Err(HostError::RuntimeInvalid);
        }
        Ok(self.surfaces.keys().copied().collect())
    }

    fn snapshot(&self, handle: SurfaceHandle) -> Result<Option<SurfaceSnapshot>, HostError> {
        Ok(self.surfaces.get(&handle).map(|surface| surface.snapshot.clone()))
    }

    fn body_mut(&mut self, handle: SurfaceHandle) -> Option<&mut MessageBody> {
        self.surfaces.get_mut(&handle).map(|surface| &mut surface.body)
    }

    fn attach_send_listener(&mut self, handle: SurfaceHandle) -> Result<(), HostError> {
        let surface = self.surfaces.get_mut(&handle).ok_or(HostError::SurfaceGone(handle))?;
        surface.listeners += 1;
        Ok(())
    }

    fn notify(&mut self, notification: RuntimeNotification) -> Result<(), HostError> {
        self.notifications.push(notification);
        Ok(())
    }
}

/// Snapshot of a window with subject, recipient textarea, send button, and body.
pub fn ready_snapshot(subject: &str, recipient: &str) -> SurfaceSnapshot {
    SurfaceSnapshot {
        subject: Some(subject.to_string()),
        to_textarea: Some(recipient.to_string()),
        has_send_affordance: true,
        has_body: true,
        ..SurfaceSnapshot::default()
    }
}

/// Body with text and two links.
pub fn sample_body() -> MessageBody {
    MessageBody::from_nodes([
        BodyNode::text("Hi there, "),
        BodyNode::from(
            Element::new("a").with_attr("href", "https://example.com/a").with_child(BodyNode::text("a")),
        ),
        BodyNode::text(" and "),
        BodyNode::from(
            Element::new("p").with_child(
                Element::new("a")
                    .with_attr("href", "https://example.com/b")
                    .with_child(BodyNode::text("b")),
            ),
        ),
    ])
}

// ============================================================================
// SECTION: Audit Capture
// ============================================================================

/// Audit sink keeping every event.
#[derive(Debug, Default)]
pub struct CapturingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl CapturingAuditSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|entry| entry.event == event).count()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|entry| entry.event).collect()
    }
}

impl AuditSink for CapturingAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

pub const TRACKER: &str = "https://tracker.example";

pub fn injector() -> TrackingInjector {
    TrackingInjector::new(
        Url::parse(&format!("{TRACKER}/track/pixel")).unwrap(),
        Url::parse(&format!("{TRACKER}/track/link")).unwrap(),
    )
    .unwrap()
}

pub fn memory_store() -> SharedTrackingStore {
    SharedTrackingStore::from_store(InMemoryTrackingStore::new())
}

/// Interceptor writing to `store`.
pub fn store_interceptor(store: &SharedTrackingStore, audit: Arc<CapturingAuditSink>) -> SendInterceptor {
    SendInterceptor::new(
        Arc::new(StoreLedger::new(store.clone())),
        injector(),
        ProcessingFlag::new(),
        audit,
    )
}
