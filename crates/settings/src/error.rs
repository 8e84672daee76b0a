// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::tree::NodeKind;

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A leaf exists with another type, or a dotted path runs through a leaf
    #[error("Setting '{name}' is {found}, requested as {expected}")]
    TypeMismatch {
        name: String,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid setting name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Structurally valid JSON that has no settings counterpart
    #[error("Unsupported value at '{path}': {found}")]
    Unsupported { path: String, found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SettingsError {
    pub fn type_mismatch<S: Into<String>>(name: S, expected: NodeKind, found: NodeKind) -> Self {
        SettingsError::TypeMismatch {
            name: name.into(),
            expected,
            found,
        }
    }

    pub fn parse<S: Into<String>>(line: usize, column: usize, message: S) -> Self {
        SettingsError::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    pub fn invalid_name<S: Into<String>>(name: S, reason: &'static str) -> Self {
        SettingsError::InvalidName {
            name: name.into(),
            reason,
        }
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            return SettingsError::Io(err.into());
        }
        SettingsError::Parse {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}
