// crates/mailbeacon-cli/src/lib.rs
// ============================================================================
// Module: Mailbeacon CLI Library
// Description: Shared helpers for the `mailbeacon` binary.
// Purpose: Expose the message catalog to the binary and its tests.
// Dependencies: crate::i18n
// ============================================================================

//! ## Overview
//! Library half of the `mailbeacon` command-line tool. User-facing strings
//! live in [`i18n`] and are formatted with the [`t!`] macro.

pub mod i18n;
