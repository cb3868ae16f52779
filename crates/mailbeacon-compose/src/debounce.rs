// crates/mailbeacon-compose/src/debounce.rs
// ============================================================================
// Module: Send Intent Debouncer
// Description: Single-slot trailing debounce for send intents.
// Purpose: Collapse bursts of send signals into one interceptor call.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! Each [`Debouncer::push`] replaces the pending item and restarts the
//! window. The item becomes due once the window elapses with no further
//! push, so a burst of signals fires once, with the last item.

use std::time::Duration;

use tokio::time::Instant;

/// Trailing-edge debouncer holding at most one pending item.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    /// Quiet period required before the item fires.
    window: Duration,
    /// Pending item and its deadline.
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Creates an idle debouncer.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Returns the debounce window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Replaces the pending item and restarts the window at `now`.
    pub fn push(&mut self, item: T, now: Instant) {
        self.pending = Some((item, now + self.window));
    }

    /// Deadline of the pending item.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Takes the pending item if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(item, _)| item),
            _ => None,
        }
    }

    /// Takes the pending item regardless of its deadline.
    pub fn take_pending(&mut self) -> Option<T> {
        self.pending.take().map(|(item, _)| item)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
