// crates/mailbeacon-compose/src/host.rs
// ============================================================================
// Module: Compose Host Interface
// Description: Boundary between the compose agent and the webmail document.
// Purpose: Let the agent observe surfaces and edit bodies without a DOM.
// Dependencies: mailbeacon-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! The webmail document is owned by the host application. A [`ComposeHost`]
//! exposes just enough of it: live compose surfaces keyed by a stable
//! [`SurfaceHandle`], a structural [`SurfaceSnapshot`] of each, mutable access
//! to the message body, send-listener attachment, and runtime notifications.
//!
//! Hosts push [`HostEvent`] values to the agent. A send listener attached via
//! [`ComposeHost::attach_send_listener`] must emit [`HostEvent::SendIntent`]
//! for pointer activation of the send affordance and for the keyboard
//! shortcut recognized by [`is_send_shortcut`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use mailbeacon_core::OutboundMessageRecord;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::body::MessageBody;

// ============================================================================
// SECTION: Handles and Snapshots
// ============================================================================

/// Stable per-surface handle assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    /// Creates a handle from a host-assigned value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Structural view of one compose surface.
///
/// Each field mirrors one place a webmail client keeps message metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    /// Value of the subject input.
    pub subject: Option<String>,
    /// Value of the `textarea[name=to]` recipient field.
    pub to_textarea: Option<String>,
    /// Value of the `input[name=to]` recipient field.
    pub to_input: Option<String>,
    /// `email` attributes of recipient chips in presentation containers.
    pub presentation_emails: Vec<String>,
    /// `email` attributes of recipient chips inside the "To" tooltip.
    pub tooltip_emails: Vec<String>,
    /// Text content of the field labelled "To".
    pub to_field_text: Option<String>,
    /// Whether a send button is present.
    pub has_send_affordance: bool,
    /// Whether an editable message body is present.
    pub has_body: bool,
}

// ============================================================================
// SECTION: Events and Notifications
// ============================================================================

/// How a send intent was signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTrigger {
    /// Pointer activation of the send affordance.
    Pointer,
    /// Keyboard send shortcut.
    KeyboardShortcut,
}

impl SendTrigger {
    /// Stable label for audit events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pointer => "pointer",
            Self::KeyboardShortcut => "keyboard_shortcut",
        }
    }
}

/// Tracking status reported to the surrounding runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingStatus {
    /// Whether new surfaces are instrumented.
    pub enabled: bool,
}

/// Events the host pushes to the agent.
#[derive(Debug)]
pub enum HostEvent {
    /// A batch of structural changes to the document.
    Mutation,
    /// The user asked to send the message on a surface.
    SendIntent {
        /// Surface the intent belongs to.
        handle: SurfaceHandle,
        /// Signal that produced the intent.
        trigger: SendTrigger,
    },
    /// The tracking-enabled preference changed.
    PreferenceChanged {
        /// New preference value.
        tracking_enabled: bool,
    },
    /// The runtime asked for the current tracking status.
    StatusRequest(oneshot::Sender<TrackingStatus>),
    /// Stop the agent.
    Shutdown,
}

/// Notifications the agent posts to the surrounding runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeNotification {
    /// A tracked message was sent.
    MessageSent {
        /// The persisted record.
        record: OutboundMessageRecord,
    },
}

// ============================================================================
// SECTION: Host Trait
// ============================================================================

/// Access to the webmail document and the surrounding runtime.
pub trait ComposeHost: Send {
    /// Returns false once the runtime context has been invalidated.
    fn runtime_valid(&self) -> bool;

    /// Lists the handles of every live compose surface.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the document cannot be queried.
    fn surfaces(&self) -> Result<Vec<SurfaceHandle>, HostError>;

    /// Captures a snapshot of a surface; `None` when it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the document cannot be queried.
    fn snapshot(&self, handle: SurfaceHandle) -> Result<Option<SurfaceSnapshot>, HostError>;

    /// Returns the surface's message body for editing.
    fn body_mut(&mut self, handle: SurfaceHandle) -> Option<&mut MessageBody>;

    /// Attaches the send-intent listener to a surface.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the listener cannot be attached.
    fn attach_send_listener(&mut self, handle: SurfaceHandle) -> Result<(), HostError>;

    /// Posts a notification to the surrounding runtime.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the runtime rejects the message.
    fn notify(&mut self, notification: RuntimeNotification) -> Result<(), HostError>;
}

/// Returns true for the keyboard send shortcut (Ctrl/Cmd + Enter).
#[must_use]
pub fn is_send_shortcut(key: &str, ctrl: bool, meta: bool) -> bool {
    key == "Enter" && (ctrl || meta)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Host interaction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The runtime context is no longer valid.
    #[error("runtime context invalidated")]
    RuntimeInvalid,
    /// The surface no longer exists.
    #[error("surface {0} is gone")]
    SurfaceGone(SurfaceHandle),
    /// Document query or mutation failed.
    #[error("document error: {0}")]
    Document(String),
    /// Runtime messaging failed.
    #[error("runtime messaging error: {0}")]
    Messaging(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
