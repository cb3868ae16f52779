// crates/mailbeacon-config/src/config.rs
// ============================================================================
// Module: Mailbeacon Configuration
// Description: Configuration loading and validation for mailbeacon.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: mailbeacon-core, mailbeacon-store-sqlite, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `MAILBEACON_CONFIG`, then
//! `mailbeacon.toml`. Every section has defaults, so an empty file is a valid
//! single-process configuration with in-memory backends.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use mailbeacon_core::DEFAULT_RATE_LIMIT_WINDOW_MS;
use mailbeacon_store_sqlite::SqliteStoreConfig;
use mailbeacon_store_sqlite::SqliteStoreMode;
use mailbeacon_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "mailbeacon.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "MAILBEACON_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default server bind address.
pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:8787";
/// Default maximum request body size for the ingestion API.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
/// Maximum allowed request body size.
pub(crate) const MAX_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Maximum number of server auth tokens.
pub(crate) const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of a server auth token.
pub(crate) const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Default marker endpoint path.
pub(crate) const DEFAULT_MARKER_PATH: &str = "/track/pixel";
/// Default redirect endpoint path.
pub(crate) const DEFAULT_REDIRECT_PATH: &str = "/track/link";
/// Maximum length of an endpoint path.
pub(crate) const MAX_ENDPOINT_PATH_LENGTH: usize = 256;
/// Path prefix reserved for the ingestion API.
pub(crate) const RESERVED_API_PREFIX: &str = "/api";
/// Minimum allowed rate limit window in milliseconds.
pub(crate) const MIN_RATE_LIMIT_WINDOW_MS: u64 = 1_000;
/// Maximum allowed rate limit window in milliseconds.
pub(crate) const MAX_RATE_LIMIT_WINDOW_MS: u64 = 3_600_000;
/// Maximum number of tracked rate limit entries.
pub(crate) const MAX_RATE_LIMIT_ENTRIES: usize = 1_048_576;
/// Default `SQLite` busy timeout in milliseconds.
pub(crate) const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default tracker base URL used by the compose agent.
pub(crate) const DEFAULT_TRACKER_BASE_URL: &str = "http://127.0.0.1:8787";
/// Default send-intent debounce window in milliseconds.
pub(crate) const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// Maximum send-intent debounce window in milliseconds.
pub(crate) const MAX_DEBOUNCE_MS: u64 = 10_000;
/// Default ingestion request timeout in milliseconds.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Minimum ingestion request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum ingestion request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Mailbeacon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailBeaconConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Tracking endpoint configuration.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Rate limiter configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Tracking store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Compose agent configuration.
    #[serde(default)]
    pub compose: ComposeConfig,
    /// Optional config source metadata (not serialized).
    #[serde(skip)]
    pub source_modified_at: Option<SystemTime>,
}

impl MailBeaconConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.tracking.validate()?;
        self.rate_limit.validate()?;
        self.store.validate()?;
        self.audit.validate()?;
        self.compose.validate()?;
        if self.rate_limit.backend == RateLimitBackend::Sqlite
            && self.store.store_type != StoreType::Sqlite
        {
            return Err(ConfigError::Invalid(
                "rate_limit.backend = sqlite requires store.type = sqlite".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute marker endpoint URL the compose agent embeds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base URL and path cannot be joined.
    pub fn marker_url(&self) -> Result<Url, ConfigError> {
        self.compose.endpoint(&self.tracking.marker_path)
    }

    /// Absolute redirect endpoint URL the compose agent embeds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base URL and path cannot be joined.
    pub fn redirect_url(&self) -> Result<Url, ConfigError> {
        self.compose.endpoint(&self.tracking.redirect_path)
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum ingestion request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Use the first `x-forwarded-for` entry as the network origin.
    #[serde(default = "default_true")]
    pub trust_forwarded_for: bool,
    /// Optional bearer auth for the ingestion API.
    #[serde(default)]
    pub auth: Option<ServerAuthConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            trust_forwarded_for: true,
            auth: None,
        }
    }
}

impl ServerConfig {
    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid("server.max_body_bytes exceeds limit".to_string()));
        }
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }
        Ok(())
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid server.bind: {}", self.bind)))
    }

    /// Configured bearer tokens (empty when auth is disabled).
    #[must_use]
    pub fn bearer_tokens(&self) -> &[String] {
        match &self.auth {
            Some(auth) => auth.bearer_tokens.as_slice(),
            None => &[],
        }
    }
}

/// Bearer auth configuration for the ingestion API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerAuthConfig {
    /// Accepted bearer tokens.
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
}

impl ServerAuthConfig {
    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bearer_tokens.is_empty() {
            return Err(ConfigError::Invalid(
                "server.auth requires at least one bearer token".to_string(),
            ));
        }
        if self.bearer_tokens.len() > MAX_AUTH_TOKENS {
            return Err(ConfigError::Invalid("too many auth tokens".to_string()));
        }
        for token in &self.bearer_tokens {
            if token.trim().is_empty() {
                return Err(ConfigError::Invalid("auth token must be non-empty".to_string()));
            }
            if token.len() > MAX_AUTH_TOKEN_LENGTH {
                return Err(ConfigError::Invalid("auth token too long".to_string()));
            }
            if token.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(
                    "auth token must not contain whitespace".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tracking Endpoints
// ============================================================================

/// Tracking endpoint paths served by the server and embedded by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Marker retrieval path; the identity is appended as a final segment.
    #[serde(default = "default_marker_path")]
    pub marker_path: String,
    /// Redirect path; `url` and `emailId` are query parameters.
    #[serde(default = "default_redirect_path")]
    pub redirect_path: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            marker_path: default_marker_path(),
            redirect_path: default_redirect_path(),
        }
    }
}

impl TrackingConfig {
    /// Validates endpoint paths.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint_path("tracking.marker_path", &self.marker_path)?;
        validate_endpoint_path("tracking.redirect_path", &self.redirect_path)?;
        if self.marker_path == self.redirect_path {
            return Err(ConfigError::Invalid(
                "tracking.marker_path and tracking.redirect_path must differ".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Rate Limiting
// ============================================================================

/// Rate limiter backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitBackend {
    /// Process-local table.
    #[default]
    Memory,
    /// Table in the `SQLite` store, shared by every instance.
    Sqlite,
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Backend holding last-seen entries.
    #[serde(default)]
    pub backend: RateLimitBackend,
    /// Suppression window in milliseconds.
    #[serde(default = "default_rate_limit_window_ms")]
    pub window_ms: u64,
    /// Optional cap on in-memory entries.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: RateLimitBackend::default(),
            window_ms: default_rate_limit_window_ms(),
            max_entries: None,
        }
    }
}

impl RateLimitConfig {
    /// Validates rate limit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_RATE_LIMIT_WINDOW_MS ..= MAX_RATE_LIMIT_WINDOW_MS).contains(&self.window_ms) {
            return Err(ConfigError::Invalid(format!(
                "rate_limit.window_ms must be between {MIN_RATE_LIMIT_WINDOW_MS} and \
                 {MAX_RATE_LIMIT_WINDOW_MS}"
            )));
        }
        if let Some(max_entries) = self.max_entries {
            if max_entries == 0 {
                return Err(ConfigError::Invalid(
                    "rate_limit.max_entries must be greater than zero".to_string(),
                ));
            }
            if max_entries > MAX_RATE_LIMIT_ENTRIES {
                return Err(ConfigError::Invalid("rate_limit.max_entries too large".to_string()));
            }
            if self.backend == RateLimitBackend::Sqlite {
                return Err(ConfigError::Invalid(
                    "rate_limit.max_entries applies only to the memory backend".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Window as signed milliseconds for the limiter.
    #[must_use]
    pub fn window_millis(&self) -> i64 {
        i64::try_from(self.window_ms).unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_MS)
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Tracking store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use `SQLite`-backed durable store.
    Sqlite,
}

/// Tracking store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())
            }
        }
    }

    /// Returns the `SQLite` store settings when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard audit events.
    None,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// File path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.sink = file requires audit.path".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (_, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid with audit.sink = file".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Compose Agent
// ============================================================================

/// Compose agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeConfig {
    /// Base URL of the tracking server as seen by recipients.
    #[serde(default = "default_tracker_base_url")]
    pub tracker_base_url: String,
    /// Send-intent coalescing window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Initial tracking preference.
    #[serde(default = "default_true")]
    pub tracking_enabled: bool,
    /// Ingestion API request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Bearer token presented to the ingestion API.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            tracker_base_url: default_tracker_base_url(),
            debounce_ms: default_debounce_ms(),
            tracking_enabled: true,
            request_timeout_ms: default_request_timeout_ms(),
            bearer_token: None,
        }
    }
}

impl ComposeConfig {
    /// Validates compose configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Invalid(format!(
                "compose.debounce_ms must be at most {MAX_DEBOUNCE_MS}"
            )));
        }
        if !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "compose.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if let Some(token) = &self.bearer_token
            && (token.trim().is_empty()
                || token.len() > MAX_AUTH_TOKEN_LENGTH
                || token.chars().any(char::is_whitespace))
        {
            return Err(ConfigError::Invalid("compose.bearer_token is invalid".to_string()));
        }
        Ok(())
    }

    /// Parses the tracker base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL is malformed or not http(s).
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.tracker_base_url.trim()).map_err(|err| {
            ConfigError::Invalid(format!("compose.tracker_base_url is invalid: {err}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "compose.tracker_base_url must use http or https".to_string(),
            ));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "compose.tracker_base_url must not carry a query or fragment".to_string(),
            ));
        }
        Ok(url)
    }

    /// Joins an endpoint path onto the base URL, keeping any base path prefix.
    fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        let mut url = self.base_url()?;
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{prefix}{path}"));
        Ok(url)
    }

    /// Ingestion API URL for message records.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base URL is invalid.
    pub fn messages_url(&self) -> Result<Url, ConfigError> {
        self.endpoint("/api/messages")
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument, the environment, or the default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an HTTP endpoint path.
fn validate_endpoint_path(field: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') || value.len() < 2 {
        return Err(ConfigError::Invalid(format!("{field} must start with '/' and name a route")));
    }
    if value.len() > MAX_ENDPOINT_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if value.ends_with('/') {
        return Err(ConfigError::Invalid(format!("{field} must not end with '/'")));
    }
    if value.chars().any(|ch| {
        ch.is_whitespace() || ch.is_control() || matches!(ch, '?' | '#' | '{' | '}' | '*' | ':')
    }) {
        return Err(ConfigError::Invalid(format!("{field} contains invalid characters")));
    }
    if value == RESERVED_API_PREFIX || value.starts_with(&format!("{RESERVED_API_PREFIX}/")) {
        return Err(ConfigError::Invalid(format!("{field} must not use the /api prefix")));
    }
    Ok(())
}

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default ingestion body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns `true` for serde defaults.
const fn default_true() -> bool {
    true
}

/// Returns the default marker path.
fn default_marker_path() -> String {
    DEFAULT_MARKER_PATH.to_string()
}

/// Returns the default redirect path.
fn default_redirect_path() -> String {
    DEFAULT_REDIRECT_PATH.to_string()
}

/// Returns the default rate limit window.
const fn default_rate_limit_window_ms() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW_MS.unsigned_abs()
}

/// Returns the default store busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

/// Returns the default tracker base URL.
fn default_tracker_base_url() -> String {
    DEFAULT_TRACKER_BASE_URL.to_string()
}

/// Returns the default debounce window.
const fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

/// Returns the default ingestion request timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}
