// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

// Error handling utilities to keep "Failed to ..." messages uniform

use anyhow::{Result, anyhow};

/// Extension trait for Results to provide standardized error mapping
pub trait ErrorContext<T> {
    /// Map error with a context message
    fn with_context_msg(self, msg: &str) -> Result<T>;

    /// Map error with a context message naming a subject
    fn with_context_fmt(self, msg: &str, args: &dyn std::fmt::Display) -> Result<T>;

    /// Common error mapping for file operations
    fn file_context(self, operation: &str, path: &str) -> Result<T>;

    /// Common error mapping for settings operations
    fn settings_context(self, operation: &str) -> Result<T>;

    /// Common error mapping for table file operations
    fn table_context(self, operation: &str, path: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_context_msg(self, msg: &str) -> Result<T> {
        self.map_err(|e| anyhow!("{}: {}", msg, e))
    }

    fn with_context_fmt(self, msg: &str, args: &dyn std::fmt::Display) -> Result<T> {
        self.map_err(|e| anyhow!("{} {}: {}", msg, args, e))
    }

    fn file_context(self, operation: &str, path: &str) -> Result<T> {
        self.with_context_fmt(&format!("Failed to {}", operation), &path)
    }

    fn settings_context(self, operation: &str) -> Result<T> {
        self.with_context_msg(&format!("Failed to {} settings", operation))
    }

    fn table_context(self, operation: &str, path: &str) -> Result<T> {
        self.with_context_fmt(&format!("Failed to {} table file", operation), &path)
    }
}

/// Common error messages used across the commands
pub struct CommonErrors;

impl CommonErrors {
    /// Settings input with an extension we cannot read
    pub fn unknown_extension(input: &str) -> anyhow::Error {
        anyhow!(
            "Unknown file extension, can't read settings from \"{}\"",
            input
        )
    }

    /// A table file without settings at the requested location
    pub fn no_embedded_settings(file: &str, location: &str) -> anyhow::Error {
        anyhow!("No settings stored at '{}' in {}", location, file)
    }

    /// Some inputs of a batch could not be mapped
    pub fn batch_failed(failed: usize, total: usize) -> anyhow::Error {
        anyhow!("{} of {} input files failed", failed, total)
    }
}
