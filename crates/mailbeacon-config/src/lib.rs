// crates/mailbeacon-config/src/lib.rs
// ============================================================================
// Module: Mailbeacon Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for mailbeacon.toml semantics.
// Dependencies: mailbeacon-core, mailbeacon-store-sqlite, serde, toml, url
// ============================================================================

//! ## Overview
//! `mailbeacon-config` defines the configuration shared by the tracking
//! server and the compose agent. Parsing is strict and validation fails
//! closed. Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
