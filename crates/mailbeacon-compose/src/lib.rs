// crates/mailbeacon-compose/src/lib.rs
// ============================================================================
// Module: Mailbeacon Compose Library
// Description: Client-side compose instrumentation for tracked sends.
// Purpose: Identify compose surfaces, persist records, and embed tracking.
// Dependencies: mailbeacon-core, mailbeacon-config, reqwest, tokio
// ============================================================================

//! ## Overview
//! `mailbeacon-compose` runs next to a webmail compose window. The document
//! is reached through the [`ComposeHost`] trait, so the same logic drives a
//! real page binding or an in-memory fake.
//!
//! - [`SurfaceWatcher`] assigns each compose surface an identity and attaches
//!   one send listener once the surface is ready.
//! - [`SendInterceptor`] persists the outbound record on send, then embeds
//!   the open markers and rewrites links through [`TrackingInjector`].
//! - [`ComposeAgent`] serializes host events onto one task and debounces
//!   send intents.
//!
//! Nothing here blocks or delays the user's send: every failure leaves the
//! message untracked and is reported through the audit sink.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod agent;
pub mod body;
pub mod debounce;
pub mod extract;
pub mod host;
pub mod inject;
pub mod interceptor;
pub mod ledger;
pub mod surface;
pub mod watcher;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use agent::AgentError;
pub use agent::ComposeAgent;
pub use body::BodyNode;
pub use body::Element;
pub use body::MessageBody;
pub use extract::MessageMetadata;
pub use extract::Recipient;
pub use extract::extract_metadata;
pub use host::ComposeHost;
pub use host::HostError;
pub use host::HostEvent;
pub use host::RuntimeNotification;
pub use host::SendTrigger;
pub use host::SurfaceHandle;
pub use host::SurfaceSnapshot;
pub use host::TrackingStatus;
pub use inject::InjectError;
pub use inject::InjectionReport;
pub use inject::TrackingInjector;
pub use interceptor::ProcessingFlag;
pub use interceptor::SendAbort;
pub use interceptor::SendInterceptor;
pub use interceptor::SendOutcome;
pub use interceptor::SendSkip;
pub use ledger::HttpMessageLedger;
pub use ledger::LedgerError;
pub use ledger::MessageLedger;
pub use ledger::StoreLedger;
pub use surface::ComposeSurfaceState;
pub use surface::SurfacePhase;
pub use surface::SurfaceRegistry;
pub use watcher::ReconcileReport;
pub use watcher::SurfaceWatcher;
