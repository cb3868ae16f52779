// crates/mailbeacon-compose/src/surface.rs
// ============================================================================
// Module: Compose Surface Registry
// Description: Per-surface state machine keyed by host handles.
// Purpose: Track identity, instrumentation, and send state per surface.
// Dependencies: mailbeacon-core
// ============================================================================

//! ## Overview
//! Every surface moves forward through
//! `Discovered -> Identified -> Instrumented -> Sent` and never back. The
//! [`SurfaceRegistry`] owns one [`ComposeSurfaceState`] per live handle and
//! drops it when the host stops reporting the handle.
//!
//! ## Invariants
//! - An identity, once assigned, is never replaced.
//! - `Sent` is terminal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use mailbeacon_core::MessageIdentity;

use crate::host::SurfaceHandle;

// ============================================================================
// SECTION: State
// ============================================================================

/// Lifecycle phase of a compose surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SurfacePhase {
    /// Seen, no identity yet.
    Discovered,
    /// Identity assigned.
    Identified,
    /// Send listener attached.
    Instrumented,
    /// Tracked send completed.
    Sent,
}

/// State attached to one compose surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeSurfaceState {
    /// Current phase.
    phase: SurfacePhase,
    /// Assigned identity.
    identity: Option<MessageIdentity>,
    /// Whether the unresolved-recipient warning was already emitted.
    recipient_warned: bool,
}

impl Default for ComposeSurfaceState {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeSurfaceState {
    /// Creates a freshly discovered surface.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: SurfacePhase::Discovered,
            identity: None,
            recipient_warned: false,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SurfacePhase {
        self.phase
    }

    /// Assigned identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&MessageIdentity> {
        self.identity.as_ref()
    }

    /// Whether the send listener is attached.
    #[must_use]
    pub fn is_instrumented(&self) -> bool {
        self.phase >= SurfacePhase::Instrumented
    }

    /// Whether a tracked send completed.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.phase == SurfacePhase::Sent
    }

    /// Assigns the identity. Returns false if one is already assigned.
    pub fn identify(&mut self, identity: MessageIdentity) -> bool {
        if self.identity.is_some() {
            return false;
        }
        self.identity = Some(identity);
        self.phase = SurfacePhase::Identified;
        true
    }

    /// Marks the listener attached. Returns false unless currently `Identified`.
    pub fn mark_instrumented(&mut self) -> bool {
        if self.phase != SurfacePhase::Identified {
            return false;
        }
        self.phase = SurfacePhase::Instrumented;
        true
    }

    /// Marks the send complete. Returns false unless currently `Instrumented`.
    pub fn mark_sent(&mut self) -> bool {
        if self.phase != SurfacePhase::Instrumented {
            return false;
        }
        self.phase = SurfacePhase::Sent;
        true
    }

    /// Records that the unresolved-recipient warning was emitted.
    ///
    /// Returns true the first time only.
    pub const fn take_recipient_warning(&mut self) -> bool {
        let first = !self.recipient_warned;
        self.recipient_warned = true;
        first
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of surface state keyed by handle.
#[derive(Debug, Clone, Default)]
pub struct SurfaceRegistry {
    /// State per live handle.
    surfaces: BTreeMap<SurfaceHandle, ComposeSurfaceState>,
}

impl SurfaceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            surfaces: BTreeMap::new(),
        }
    }

    /// Returns state for a handle.
    #[must_use]
    pub fn get(&self, handle: SurfaceHandle) -> Option<&ComposeSurfaceState> {
        self.surfaces.get(&handle)
    }

    /// Returns mutable state for a handle.
    pub fn get_mut(&mut self, handle: SurfaceHandle) -> Option<&mut ComposeSurfaceState> {
        self.surfaces.get_mut(&handle)
    }

    /// Returns state for a handle, inserting a discovered entry when absent.
    ///
    /// The flag is true when the entry was inserted.
    pub fn discover(&mut self, handle: SurfaceHandle) -> (&mut ComposeSurfaceState, bool) {
        let inserted = !self.surfaces.contains_key(&handle);
        (self.surfaces.entry(handle).or_default(), inserted)
    }

    /// Drops every handle not in `live`; returns the dropped handles.
    pub fn retain_live(&mut self, live: &BTreeSet<SurfaceHandle>) -> Vec<SurfaceHandle> {
        let removed: Vec<SurfaceHandle> =
            self.surfaces.keys().filter(|handle| !live.contains(handle)).copied().collect();
        for handle in &removed {
            self.surfaces.remove(handle);
        }
        removed
    }

    /// Number of tracked surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Returns true when no surfaces are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Iterates over tracked surfaces.
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceHandle, &ComposeSurfaceState)> {
        self.surfaces.iter().map(|(handle, state)| (*handle, state))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
