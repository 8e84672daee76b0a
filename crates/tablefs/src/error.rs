// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from table files, path expansion and chains
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The pattern has no in-file part after the file name
    #[error("No table name specified in '{0}'")]
    NoTableName(String),

    /// The pattern cannot be resolved to anything that exists
    #[error("Cannot resolve '{pattern}': {reason}")]
    PathResolution { pattern: String, reason: String },

    #[error("Entry not found: {location} in {}", file.display())]
    NotFound { file: PathBuf, location: String },

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid location '{location}': {reason}")]
    InvalidLocation {
        location: String,
        reason: &'static str,
    },

    #[error("Corrupt table file {}: {reason}", file.display())]
    Corrupt { file: PathBuf, reason: String },

    #[error("Glob error: {0}")]
    Glob(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] settings::SettingsError),
}

impl Error {
    pub fn not_found<P: AsRef<Path>, S: Into<String>>(file: P, location: S) -> Self {
        Error::NotFound {
            file: file.as_ref().to_path_buf(),
            location: location.into(),
        }
    }

    pub fn corrupt<P: AsRef<Path>, S: Into<String>>(file: P, reason: S) -> Self {
        Error::Corrupt {
            file: file.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn path_resolution<S: Into<String>, R: Into<String>>(pattern: S, reason: R) -> Self {
        Error::PathResolution {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_location<S: Into<String>>(location: S, reason: &'static str) -> Self {
        Error::InvalidLocation {
            location: location.into(),
            reason,
        }
    }
}
