// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging for the pulsemap workspace
//!
//! Every crate logs through the macros exported here so that one switch
//! controls the whole process.
//!
//! Usage:
//! - Set PULSEMAP_LOG=off (default) - no logs
//! - Set PULSEMAP_LOG=info - file commits, stage runs, expansion summaries
//! - Set PULSEMAP_LOG=debug - per-table and per-segment detail

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable selecting the minimum log level
pub const LOG_ENV: &str = "PULSEMAP_LOG";

static INIT: Once = Once::new();

/// Parse a PULSEMAP_LOG value.
///
/// Returns `Ok(None)` for "off", `Err` with the raw value when the level is
/// not recognized.
pub fn parse_level(value: &str) -> Result<Option<emit::Level>, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => Ok(None),
        "debug" => Ok(Some(emit::Level::Debug)),
        "info" => Ok(Some(emit::Level::Info)),
        "warn" => Ok(Some(emit::Level::Warn)),
        "error" => Ok(Some(emit::Level::Error)),
        _ => Err(value.to_string()),
    }
}

/// Initialize diagnostics from the PULSEMAP_LOG environment variable
///
/// Call once at startup; later calls are ignored.
#[allow(clippy::print_stderr)]
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let raw = std::env::var(LOG_ENV).unwrap_or_default();

        let level = match parse_level(&raw) {
            Ok(None) => return,
            Ok(Some(level)) => level,
            Err(unknown) => {
                // Logging is not up yet, so this one goes straight to stderr.
                eprintln!("Warning: Unknown {LOG_ENV} value '{unknown}', using 'info'");
                emit::Level::Info
            }
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // emit_term writes synchronously, nothing is left to flush at exit.
        std::mem::forget(rt);
    });
}

/// Log basic operations (files written, stages run, chains built)
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (per-table row counts, matched segments)
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable conditions (skipped entries, fallbacks)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that abort an operation
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

/// Short form of [`log_info!`]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Short form of [`log_debug!`]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Short form of [`log_warn!`]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Short form of [`log_error!`]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;
