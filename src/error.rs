//! Error types for the featurization pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while featurizing a chat transcript
#[derive(Debug, Error)]
pub enum FeaturizeError {
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Feature `{feature}` produced a non-finite value for row {row}")]
    FeatureContract { feature: String, row: usize },

    #[error("Row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl FeaturizeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FeaturizeError::Io {
            path: path.into(),
            source,
        }
    }
}
