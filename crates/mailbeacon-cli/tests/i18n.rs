// crates/mailbeacon-cli/tests/i18n.rs
// ============================================================================
// Module: CLI i18n Tests
// Description: Exercises the translation catalog and placeholder substitution.
// Purpose: Ensure CLI user-facing strings route through stable i18n helpers.
// Dependencies: mailbeacon-cli i18n module and the `t!` macro.
// ============================================================================

//! ## Overview
//! Validates catalog lookup, key fallback, and macro formatting.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use mailbeacon_cli::i18n::MessageArg;
use mailbeacon_cli::i18n::translate;
use mailbeacon_cli::t;

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Confirms message arguments capture key/value pairs.
#[test]
fn message_arg_new_captures_key_and_value() {
    let arg = MessageArg::new("error", "boom");
    assert_eq!(arg.key, "error");
    assert_eq!(arg.value, "boom");
}

/// Confirms catalog entries resolve and replace placeholders.
#[test]
fn translate_substitutes_placeholders() {
    let result = translate("config.load_failed", vec![MessageArg::new("error", "bad toml")]);
    assert_eq!(result, "Failed to load config: bad toml");
}

/// Confirms missing keys fall back to the key string.
#[test]
fn translate_falls_back_to_key() {
    assert_eq!(translate("missing.key", Vec::new()), "missing.key");
}

/// Confirms the macro formats several named arguments.
#[test]
fn macro_formats_named_arguments() {
    let message = t!("output.write_failed", stream = "stdout", error = "broken pipe");
    assert_eq!(message, "Failed to write to stdout: broken pipe");
}
