// crates/mailbeacon-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Tracking Store
// Description: Durable TrackingStore backed by SQLite WAL.
// Purpose: Persist message records and append-only open/click events.
// Dependencies: mailbeacon-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`TrackingStore`] using `SQLite`. Message
//! records live in `messages`; opens and clicks are appended to
//! `open_events` and `link_clicks`. Each event append and the matching status
//! advance run in one transaction, and events for unknown identities are
//! rejected with [`StoreError::NotFound`].
//! Security posture: database contents are untrusted; rows that fail to
//! decode are reported as corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use mailbeacon_core::ClickEvent;
use mailbeacon_core::InsertOutcome;
use mailbeacon_core::MessageIdentity;
use mailbeacon_core::MessageStatus;
use mailbeacon_core::NetworkOrigin;
use mailbeacon_core::OpenEvent;
use mailbeacon_core::OutboundMessageRecord;
use mailbeacon_core::RateLimitError;
use mailbeacon_core::StoreError;
use mailbeacon_core::Timestamp;
use mailbeacon_core::TrackingStore;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

use crate::limiter::SqliteRateLimiter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum size of any text field accepted by the store.
pub const MAX_FIELD_BYTES: usize = 16 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` tracking store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config with default pragmas for the given path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row failed to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Referenced message does not exist.
    #[error("sqlite store message not found: {0}")]
    NotFound(String),
    /// Field exceeded the size limit.
    #[error("sqlite store field too large: {field} is {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Field name.
        field: &'static str,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual field size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            error @ SqliteStoreError::TooLarge {
                ..
            } => Self::Invalid(error.to_string()),
        }
    }
}

impl From<SqliteStoreError> for RateLimitError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            other => Self::Limiter(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed tracking store with WAL support.
#[derive(Clone)]
pub struct SqliteTrackingStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTrackingStore {
    /// Opens an `SQLite`-backed tracking store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        Ok(Self {
            connection: Arc::new(Mutex::new(open_database(config)?)),
        })
    }

    /// Returns a rate limiter sharing this store's connection.
    #[must_use]
    pub fn rate_limiter(&self, window_ms: i64) -> SqliteRateLimiter {
        SqliteRateLimiter::from_connection(Arc::clone(&self.connection), window_ms)
    }

    /// Locks the connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Inserts a message unless the identity already exists.
    fn insert_record(
        &self,
        record: &OutboundMessageRecord,
    ) -> Result<InsertOutcome, SqliteStoreError> {
        check_field("identity", record.id.as_str())?;
        check_field("subject", &record.subject)?;
        check_field("recipient", &record.recipient)?;
        let guard = self.lock()?;
        let inserted = guard
            .execute(
                "INSERT INTO messages (identity, subject, recipient, sent_at, status) VALUES (?1, \
                 ?2, ?3, ?4, ?5) ON CONFLICT(identity) DO NOTHING",
                params![
                    record.id.as_str(),
                    record.subject,
                    record.recipient,
                    record.sent_at.as_unix_millis(),
                    record.status.as_str()
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(if inserted == 0 { InsertOutcome::AlreadyExists } else { InsertOutcome::Inserted })
    }

    /// Loads a message record.
    fn load_record(
        &self,
        identity: &MessageIdentity,
    ) -> Result<Option<OutboundMessageRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT subject, recipient, sent_at, status FROM messages WHERE identity = ?1",
                params![identity.as_str()],
                |row| {
                    let subject: String = row.get(0)?;
                    let recipient: String = row.get(1)?;
                    let sent_at: i64 = row.get(2)?;
                    let status: String = row.get(3)?;
                    Ok((subject, recipient, sent_at, status))
                },
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        let Some((subject, recipient, sent_at, status)) = row else {
            return Ok(None);
        };
        Ok(Some(OutboundMessageRecord {
            id: identity.clone(),
            subject,
            recipient,
            sent_at: Timestamp::from_unix_millis(sent_at),
            status: parse_status(&status)?,
        }))
    }

    /// Appends an event row and advances status in one transaction.
    fn append_event(
        &self,
        identity: &MessageIdentity,
        next: MessageStatus,
        insert: impl FnOnce(&Transaction<'_>) -> Result<(), SqliteStoreError>,
    ) -> Result<(), SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let status: Option<String> = tx
            .query_row(
                "SELECT status FROM messages WHERE identity = ?1",
                params![identity.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let Some(status) = status else {
            return Err(SqliteStoreError::NotFound(identity.to_string()));
        };
        let current = parse_status(&status)?;
        insert(&tx)?;
        let advanced = current.advance(next);
        if advanced != current {
            tx.execute(
                "UPDATE messages SET status = ?2 WHERE identity = ?1",
                params![identity.as_str(), advanced.as_str()],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }

    /// Persists an open event.
    fn append_open(&self, event: &OpenEvent) -> Result<(), SqliteStoreError> {
        check_field("user_agent", &event.user_agent)?;
        check_field("origin", event.origin.as_str())?;
        if let Some(location) = &event.source_location {
            check_field("source_location", location)?;
        }
        self.append_event(&event.identity, MessageStatus::Opened, |tx| {
            tx.execute(
                "INSERT INTO open_events (identity, occurred_at, source_location, origin, \
                 user_agent) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.identity.as_str(),
                    event.occurred_at.as_unix_millis(),
                    event.source_location,
                    event.origin.as_str(),
                    event.user_agent
                ],
            )
            .map(|_| ())
            .map_err(|err| SqliteStoreError::Db(err.to_string()))
        })
    }

    /// Persists a click event.
    fn append_click(&self, event: &ClickEvent) -> Result<(), SqliteStoreError> {
        check_field("user_agent", &event.user_agent)?;
        check_field("origin", event.origin.as_str())?;
        check_field("target_url", &event.target_url)?;
        self.append_event(&event.identity, MessageStatus::Clicked, |tx| {
            tx.execute(
                "INSERT INTO link_clicks (identity, occurred_at, target_url, origin, user_agent) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.identity.as_str(),
                    event.occurred_at.as_unix_millis(),
                    event.target_url,
                    event.origin.as_str(),
                    event.user_agent
                ],
            )
            .map(|_| ())
            .map_err(|err| SqliteStoreError::Db(err.to_string()))
        })
    }

    /// Lists open events for an identity.
    fn list_opens(&self, identity: &MessageIdentity) -> Result<Vec<OpenEvent>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(
                "SELECT occurred_at, source_location, origin, user_agent FROM open_events WHERE \
                 identity = ?1 ORDER BY event_id",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![identity.as_str()], |row| {
                let occurred_at: i64 = row.get(0)?;
                let source_location: Option<String> = row.get(1)?;
                let origin: String = row.get(2)?;
                let user_agent: String = row.get(3)?;
                Ok(OpenEvent {
                    identity: identity.clone(),
                    occurred_at: Timestamp::from_unix_millis(occurred_at),
                    source_location,
                    origin: NetworkOrigin::new(origin),
                    user_agent,
                })
            })
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let events = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
        Ok(events)
    }

    /// Lists click events for an identity.
    fn list_clicks(&self, identity: &MessageIdentity) -> Result<Vec<ClickEvent>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(
                "SELECT occurred_at, target_url, origin, user_agent FROM link_clicks WHERE \
                 identity = ?1 ORDER BY event_id",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![identity.as_str()], |row| {
                let occurred_at: i64 = row.get(0)?;
                let target_url: String = row.get(1)?;
                let origin: String = row.get(2)?;
                let user_agent: String = row.get(3)?;
                Ok(ClickEvent {
                    identity: identity.clone(),
                    occurred_at: Timestamp::from_unix_millis(occurred_at),
                    target_url,
                    origin: NetworkOrigin::new(origin),
                    user_agent,
                })
            })
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let events = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
        Ok(events)
    }
}

impl TrackingStore for SqliteTrackingStore {
    fn insert_message(&self, record: &OutboundMessageRecord) -> Result<InsertOutcome, StoreError> {
        self.insert_record(record).map_err(StoreError::from)
    }

    fn message_exists(&self, identity: &MessageIdentity) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        let exists: Option<i64> = guard
            .query_row(
                "SELECT 1 FROM messages WHERE identity = ?1",
                params![identity.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(exists.is_some())
    }

    fn load_message(
        &self,
        identity: &MessageIdentity,
    ) -> Result<Option<OutboundMessageRecord>, StoreError> {
        self.load_record(identity).map_err(StoreError::from)
    }

    fn record_open(&self, event: &OpenEvent) -> Result<(), StoreError> {
        self.append_open(event).map_err(StoreError::from)
    }

    fn record_click(&self, event: &ClickEvent) -> Result<(), StoreError> {
        self.append_click(event).map_err(StoreError::from)
    }

    fn open_events(&self, identity: &MessageIdentity) -> Result<Vec<OpenEvent>, StoreError> {
        self.list_opens(identity).map_err(StoreError::from)
    }

    fn click_events(&self, identity: &MessageIdentity) -> Result<Vec<ClickEvent>, StoreError> {
        self.list_clicks(identity).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the path, opens a connection, and initializes the schema.
pub(crate) fn open_database(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    validate_store_path(&config.path)?;
    ensure_parent_dir(&config.path)?;
    let mut connection = open_connection(config)?;
    initialize_schema(&mut connection)?;
    Ok(connection)
}

/// Rejects oversized text fields.
fn check_field(field: &'static str, value: &str) -> Result<(), SqliteStoreError> {
    if value.len() > MAX_FIELD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            field,
            max_bytes: MAX_FIELD_BYTES,
            actual_bytes: value.len(),
        });
    }
    Ok(())
}

/// Parses a stored status label.
fn parse_status(label: &str) -> Result<MessageStatus, SqliteStoreError> {
    MessageStatus::parse(label)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown message status: {label}")))
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection
        .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS messages (
                    identity TEXT PRIMARY KEY,
                    subject TEXT NOT NULL,
                    recipient TEXT NOT NULL,
                    sent_at INTEGER NOT NULL,
                    status TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS open_events (
                    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    identity TEXT NOT NULL,
                    occurred_at INTEGER NOT NULL,
                    source_location TEXT,
                    origin TEXT NOT NULL,
                    user_agent TEXT NOT NULL,
                    FOREIGN KEY (identity) REFERENCES messages(identity) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_open_events_identity
                    ON open_events (identity);
                CREATE TABLE IF NOT EXISTS link_clicks (
                    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    identity TEXT NOT NULL,
                    occurred_at INTEGER NOT NULL,
                    target_url TEXT NOT NULL,
                    origin TEXT NOT NULL,
                    user_agent TEXT NOT NULL,
                    FOREIGN KEY (identity) REFERENCES messages(identity) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_link_clicks_identity
                    ON link_clicks (identity);
                CREATE TABLE IF NOT EXISTS rate_limit_entries (
                    rate_key TEXT PRIMARY KEY,
                    last_seen_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_rate_limit_entries_last_seen
                    ON rate_limit_entries (last_seen_at);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
