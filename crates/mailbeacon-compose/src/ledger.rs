// crates/mailbeacon-compose/src/ledger.rs
// ============================================================================
// Module: Message Ledger
// Description: Persistence of outbound message records from the client.
// Purpose: Store the record a tracked send is joined against server-side.
// Dependencies: async-trait, reqwest, mailbeacon-core, mailbeacon-config
// ============================================================================

//! ## Overview
//! A [`MessageLedger`] persists [`OutboundMessageRecord`] values.
//! [`MessageLedger::persist`] checks for an existing record first and treats
//! an existing identity as success, so re-sending a surface with the same
//! subject and recipient never fails on a duplicate.
//!
//! [`HttpMessageLedger`] talks to the tracking server's `/api/messages` API.
//! [`StoreLedger`] writes straight to a [`TrackingStore`] for in-process use.
//! Neither retries; a failure is reported once and the caller sends untracked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use mailbeacon_config::ComposeConfig;
use mailbeacon_core::InsertOutcome;
use mailbeacon_core::MessageIdentity;
use mailbeacon_core::OutboundMessageRecord;
use mailbeacon_core::SharedTrackingStore;
use mailbeacon_core::TrackingStore;
use reqwest::Client;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Ledger Trait
// ============================================================================

/// Destination for outbound message records.
#[async_trait]
pub trait MessageLedger: Send + Sync {
    /// Returns true when a record exists for the identity.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the backend cannot be reached.
    async fn message_exists(&self, identity: &MessageIdentity) -> Result<bool, LedgerError>;

    /// Inserts a record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the backend rejects the record.
    async fn insert_message(
        &self,
        record: &OutboundMessageRecord,
    ) -> Result<InsertOutcome, LedgerError>;

    /// Persists a record, treating an existing identity as success.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the existence check or insert fails.
    async fn persist(&self, record: &OutboundMessageRecord) -> Result<InsertOutcome, LedgerError> {
        if self.message_exists(&record.id).await? {
            return Ok(InsertOutcome::AlreadyExists);
        }
        self.insert_message(record).await
    }
}

// ============================================================================
// SECTION: HTTP Ledger
// ============================================================================

/// Ledger backed by the tracking server's ingestion API.
pub struct HttpMessageLedger {
    /// `/api/messages` collection URL.
    messages_url: Url,
    /// Optional bearer token.
    bearer_token: Option<String>,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl HttpMessageLedger {
    /// Builds a ledger for the given collection URL.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the URL or HTTP client is unusable.
    pub fn new(
        messages_url: Url,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        if messages_url.cannot_be_a_base() {
            return Err(LedgerError::Config(format!("invalid ledger url: {messages_url}")));
        }
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|err| LedgerError::Config(err.to_string()))?;
        Ok(Self {
            messages_url,
            bearer_token,
            client,
        })
    }

    /// Builds a ledger from compose configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the configuration is unusable.
    pub fn from_config(config: &ComposeConfig) -> Result<Self, LedgerError> {
        let url = config.messages_url().map_err(|err| LedgerError::Config(err.to_string()))?;
        Self::new(
            url,
            config.bearer_token.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// URL of one record.
    fn message_url(&self, identity: &MessageIdentity) -> Result<Url, LedgerError> {
        let mut url = self.messages_url.clone();
        url.path_segments_mut()
            .map_err(|()| LedgerError::Config(format!("invalid ledger url: {}", self.messages_url)))?
            .pop_if_empty()
            .push(identity.as_str());
        Ok(url)
    }

    /// Adds the bearer token when configured.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl MessageLedger for HttpMessageLedger {
    async fn message_exists(&self, identity: &MessageIdentity) -> Result<bool, LedgerError> {
        let url = self.message_url(identity)?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(LedgerError::Status(status.as_u16())),
        }
    }

    async fn insert_message(
        &self,
        record: &OutboundMessageRecord,
    ) -> Result<InsertOutcome, LedgerError> {
        let response = self
            .authorize(self.client.post(self.messages_url.clone()))
            .json(record)
            .send()
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        match response.status() {
            StatusCode::CREATED => Ok(InsertOutcome::Inserted),
            StatusCode::OK | StatusCode::CONFLICT => Ok(InsertOutcome::AlreadyExists),
            status => Err(LedgerError::Status(status.as_u16())),
        }
    }
}

// ============================================================================
// SECTION: Store Ledger
// ============================================================================

/// Ledger writing directly to a tracking store.
#[derive(Clone)]
pub struct StoreLedger {
    /// Target store.
    store: SharedTrackingStore,
}

impl StoreLedger {
    /// Wraps a shared store.
    #[must_use]
    pub const fn new(store: SharedTrackingStore) -> Self {
        Self {
            store,
        }
    }
}

#[async_trait]
impl MessageLedger for StoreLedger {
    async fn message_exists(&self, identity: &MessageIdentity) -> Result<bool, LedgerError> {
        self.store.message_exists(identity).map_err(|err| LedgerError::Store(err.to_string()))
    }

    async fn insert_message(
        &self,
        record: &OutboundMessageRecord,
    ) -> Result<InsertOutcome, LedgerError> {
        self.store.insert_message(record).map_err(|err| LedgerError::Store(err.to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Ledger configuration is unusable.
    #[error("ledger config error: {0}")]
    Config(String),
    /// Request could not be completed.
    #[error("ledger transport error: {0}")]
    Transport(String),
    /// Server answered with an unexpected status.
    #[error("ledger returned status {0}")]
    Status(u16),
    /// Store operation failed.
    #[error("ledger store error: {0}")]
    Store(String),
}
