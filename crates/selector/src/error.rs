// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use datafusion::common::SchemaError;
use datafusion::error::DataFusionError;
use settings::SettingsError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from mapping, reducing and tabulating
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown mapper '{0}'")]
    MapperNotFound(String),

    /// A stage reported failure; no output was written
    #[error("Stage '{stage}' failed on {input}: {message}")]
    Stage {
        stage: String,
        input: String,
        message: String,
    },

    #[error("Invalid mapper list '{spec}': {reason}")]
    InvalidMapperSpec { spec: String, reason: String },

    /// An expression names a column no table in the chain has
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Expression error: {0}")]
    Expression(#[from] DataFusionError),

    #[error("Output tag '{0}' is not usable in a file name")]
    InvalidTag(String),

    #[error(transparent)]
    TableFs(#[from] tablefs::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn invalid_spec<S: Into<String>, R: Into<String>>(spec: S, reason: R) -> Self {
        Error::InvalidMapperSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

/// True when planning failed because a referenced column does not exist
#[must_use]
pub fn is_missing_column(err: &DataFusionError) -> bool {
    matches!(
        err.find_root(),
        DataFusionError::SchemaError(SchemaError::FieldNotFound { .. }, _)
    )
}

/// Why a mapper stage could not produce its output
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

impl StageFailure {
    pub fn failed<S: Into<String>>(message: S) -> Self {
        StageFailure::Failed(message.into())
    }

    /// Attach the stage and input names
    #[must_use]
    pub fn into_error(self, stage: &str, input: &str) -> Error {
        match self {
            // Settings type mismatches keep their own kind.
            StageFailure::Settings(e) => Error::Settings(e),
            other => Error::Stage {
                stage: stage.to_string(),
                input: input.to_string(),
                message: other.to_string(),
            },
        }
    }
}
