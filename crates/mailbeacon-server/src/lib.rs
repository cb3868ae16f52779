// crates/mailbeacon-server/src/lib.rs
// ============================================================================
// Module: Mailbeacon Server Library
// Description: HTTP tracking server for marker, redirect, and ingestion routes.
// Purpose: Expose the event recorders and message store over HTTP.
// Dependencies: axum, tokio, mailbeacon-core, mailbeacon-config
// ============================================================================

//! ## Overview
//! The tracking server hosts three surfaces:
//!
//! - the marker endpoint, which always answers with the 43-byte GIF;
//! - the redirect endpoint, which always answers with a 302 to the original
//!   destination unless required parameters are missing;
//! - the `/api/messages` ingestion API the compose agent writes to.
//!
//! Marker and redirect callers are recipient mail clients and browsers. Their
//! responses never depend on whether the callback was recorded.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;
pub mod security;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::MARKER_GIF;
pub use server::ServerError;
pub use server::TrackerServer;
