// crates/mailbeacon-core/src/runtime/store.rs
// ============================================================================
// Module: Mailbeacon In-Memory Store
// Description: In-memory tracking store for tests and single-process use.
// Purpose: Provide a TrackingStore without external dependencies.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryTrackingStore`] keeps messages and events behind one mutex so an
//! event append and its status change are observed together.
//! [`SharedTrackingStore`] wraps any store in a clonable `Arc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::ClickEvent;
use crate::core::MessageIdentity;
use crate::core::MessageStatus;
use crate::core::OpenEvent;
use crate::core::OutboundMessageRecord;
use crate::interfaces::InsertOutcome;
use crate::interfaces::StoreError;
use crate::interfaces::TrackingStore;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Tables held by the in-memory store.
#[derive(Debug, Default)]
struct Tables {
    /// Message records keyed by identity.
    messages: BTreeMap<MessageIdentity, OutboundMessageRecord>,
    /// Open events in insertion order.
    opens: Vec<OpenEvent>,
    /// Click events in insertion order.
    clicks: Vec<ClickEvent>,
}

/// In-memory tracking store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTrackingStore {
    /// Tables protected by a mutex.
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryTrackingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the tables.
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Store("tracking store mutex poisoned".to_string()))
    }
}

impl TrackingStore for InMemoryTrackingStore {
    fn insert_message(&self, record: &OutboundMessageRecord) -> Result<InsertOutcome, StoreError> {
        let mut tables = self.lock()?;
        if tables.messages.contains_key(&record.id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        tables.messages.insert(record.id.clone(), record.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn message_exists(&self, identity: &MessageIdentity) -> Result<bool, StoreError> {
        Ok(self.lock()?.messages.contains_key(identity))
    }

    fn load_message(
        &self,
        identity: &MessageIdentity,
    ) -> Result<Option<OutboundMessageRecord>, StoreError> {
        Ok(self.lock()?.messages.get(identity).cloned())
    }

    fn record_open(&self, event: &OpenEvent) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let Some(message) = tables.messages.get_mut(&event.identity) else {
            return Err(StoreError::NotFound(event.identity.to_string()));
        };
        message.status = message.status.advance(MessageStatus::Opened);
        tables.opens.push(event.clone());
        Ok(())
    }

    fn record_click(&self, event: &ClickEvent) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let Some(message) = tables.messages.get_mut(&event.identity) else {
            return Err(StoreError::NotFound(event.identity.to_string()));
        };
        message.status = message.status.advance(MessageStatus::Clicked);
        tables.clicks.push(event.clone());
        Ok(())
    }

    fn open_events(&self, identity: &MessageIdentity) -> Result<Vec<OpenEvent>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.opens.iter().filter(|event| event.identity == *identity).cloned().collect())
    }

    fn click_events(&self, identity: &MessageIdentity) -> Result<Vec<ClickEvent>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.clicks.iter().filter(|event| event.identity == *identity).cloned().collect())
    }
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared tracking store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedTrackingStore {
    /// Inner store implementation.
    inner: Arc<dyn TrackingStore>,
}

impl SharedTrackingStore {
    /// Wraps a tracking store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl TrackingStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn TrackingStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl TrackingStore for SharedTrackingStore {
    fn insert_message(&self, record: &OutboundMessageRecord) -> Result<InsertOutcome, StoreError> {
        self.inner.insert_message(record)
    }

    fn message_exists(&self, identity: &MessageIdentity) -> Result<bool, StoreError> {
        self.inner.message_exists(identity)
    }

    fn load_message(
        &self,
        identity: &MessageIdentity,
    ) -> Result<Option<OutboundMessageRecord>, StoreError> {
        self.inner.load_message(identity)
    }

    fn record_open(&self, event: &OpenEvent) -> Result<(), StoreError> {
        self.inner.record_open(event)
    }

    fn record_click(&self, event: &ClickEvent) -> Result<(), StoreError> {
        self.inner.record_click(event)
    }

    fn open_events(&self, identity: &MessageIdentity) -> Result<Vec<OpenEvent>, StoreError> {
        self.inner.open_events(identity)
    }

    fn click_events(&self, identity: &MessageIdentity) -> Result<Vec<ClickEvent>, StoreError> {
        self.inner.click_events(identity)
    }
}
