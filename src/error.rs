use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while building a dataset.
///
/// Every variant aborts the run; the assembler never skips a file pair.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid rate parameters, empty input, or an unusable config file.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An input file could not be read or did not have the expected shape.
    #[error("failed to read {}: {message}", path.display())]
    DataAccess { path: PathBuf, message: String },

    /// Inputs disagree with each other (sampling rates, lengths).
    #[error("consistency error: {0}")]
    Consistency(String),
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    pub fn data_access(path: &Path, message: impl ToString) -> Self {
        PipelineError::DataAccess {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        PipelineError::Consistency(message.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
