// crates/mailbeacon-compose/src/agent.rs
// ============================================================================
// Module: Compose Agent
// Description: Event-driven driver for the watcher and send interceptor.
// Purpose: Serialize host events onto one task and debounce send intents.
// Dependencies: tokio, mailbeacon-core, mailbeacon-config
// ============================================================================

//! ## Overview
//! [`ComposeAgent::run`] owns the host and consumes [`HostEvent`]s from a
//! `tokio` channel. Mutations trigger a reconciliation pass. Send intents are
//! debounced: the interceptor fires once the window passes with no further
//! intent, for the last surface signalled. Shutdown (or a closed channel)
//! flushes any pending intent before the host is handed back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use mailbeacon_config::ConfigError;
use mailbeacon_config::MailBeaconConfig;
use mailbeacon_core::AuditEvent;
use mailbeacon_core::AuditSink;
use mailbeacon_core::Timestamp;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::debounce::Debouncer;
use crate::host::ComposeHost;
use crate::host::HostEvent;
use crate::host::SurfaceHandle;
use crate::host::TrackingStatus;
use crate::inject::TrackingInjector;
use crate::interceptor::ProcessingFlag;
use crate::interceptor::SendInterceptor;
use crate::interceptor::SendOutcome;
use crate::ledger::MessageLedger;
use crate::watcher::ReconcileReport;
use crate::watcher::SurfaceWatcher;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit component label.
const COMPONENT: &str = "compose_agent";

// ============================================================================
// SECTION: Agent
// ============================================================================

/// Single-task driver for one webmail document.
pub struct ComposeAgent<H> {
    /// Document and runtime access.
    host: H,
    /// Surface observer.
    watcher: SurfaceWatcher,
    /// Send pipeline.
    interceptor: SendInterceptor,
    /// Pending send intent.
    debouncer: Debouncer<SurfaceHandle>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl<H: ComposeHost> ComposeAgent<H> {
    /// Assembles an agent from its parts.
    #[must_use]
    pub fn new(
        host: H,
        watcher: SurfaceWatcher,
        interceptor: SendInterceptor,
        debounce: Duration,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            host,
            watcher,
            interceptor,
            debouncer: Debouncer::new(debounce),
            audit,
        }
    }

    /// Builds an agent from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the tracking endpoints cannot be built.
    pub fn from_config(
        host: H,
        config: &MailBeaconConfig,
        ledger: Arc<dyn MessageLedger>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, AgentError> {
        let injector = TrackingInjector::from_config(config)?;
        let watcher = SurfaceWatcher::new(config.compose.tracking_enabled, Arc::clone(&audit));
        let interceptor =
            SendInterceptor::new(ledger, injector, ProcessingFlag::new(), Arc::clone(&audit));
        Ok(Self::new(
            host,
            watcher,
            interceptor,
            Duration::from_millis(config.compose.debounce_ms),
            audit,
        ))
    }

    /// Current tracking status.
    #[must_use]
    pub const fn tracking_status(&self) -> TrackingStatus {
        TrackingStatus {
            enabled: self.watcher.tracking_enabled(),
        }
    }

    /// Returns the host.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Returns the watcher.
    #[must_use]
    pub const fn watcher(&self) -> &SurfaceWatcher {
        &self.watcher
    }

    /// Runs one reconciliation pass.
    pub fn reconcile(&mut self) -> ReconcileReport {
        self.watcher.reconcile(&mut self.host)
    }

    /// Runs the interceptor for `handle` immediately.
    pub async fn fire(&mut self, handle: SurfaceHandle) -> SendOutcome {
        self.interceptor
            .on_send_intent(&mut self.host, self.watcher.registry_mut(), handle, Timestamp::now())
            .await
    }

    /// Consumes events until shutdown and returns the host.
    pub async fn run(mut self, mut events: mpsc::Receiver<HostEvent>) -> H {
        self.reconcile();
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    if !self.handle_event(event) {
                        break;
                    }
                }
                () = sleep_until_deadline(deadline) => {
                    if let Some(handle) = self.debouncer.take_due(Instant::now()) {
                        self.fire(handle).await;
                    }
                }
            }
        }
        if let Some(handle) = self.debouncer.take_pending() {
            self.fire(handle).await;
        }
        self.audit.record(&AuditEvent::info(COMPONENT, "agent_stopped", "compose agent stopped"));
        self.host
    }

    /// Applies one event; false stops the loop.
    fn handle_event(&mut self, event: HostEvent) -> bool {
        match event {
            HostEvent::Mutation => {
                self.reconcile();
            }
            HostEvent::SendIntent {
                handle,
                trigger,
            } => {
                self.debouncer.push(handle, Instant::now());
                self.audit.record(
                    &AuditEvent::info(COMPONENT, "send_intent", "send intent received")
                        .with_detail(json!({
                            "surface": handle.get(),
                            "trigger": trigger.as_str(),
                        })),
                );
            }
            HostEvent::PreferenceChanged {
                tracking_enabled,
            } => {
                self.watcher.set_tracking_enabled(tracking_enabled);
                self.audit.record(
                    &AuditEvent::info(COMPONENT, "preference_changed", "tracking preference updated")
                        .with_detail(json!({ "tracking_enabled": tracking_enabled })),
                );
                self.reconcile();
            }
            HostEvent::StatusRequest(reply) => {
                let _ = reply.send(self.tracking_status());
            }
            HostEvent::Shutdown => return false,
        }
        true
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Agent construction errors.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
