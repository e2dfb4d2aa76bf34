//! Error types for the winner determination solver.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for solver operations
#[derive(Debug, Error)]
pub enum WdpError {
    /// Malformed line in a bid file
    #[error("Parse error in {path}:{line}: {message}", path = .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Invalid solver name, timeout, output directory or parameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by a solver backend
    #[error("Solver error: {0}")]
    Solver(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl WdpError {
    pub fn config(message: impl Into<String>) -> Self {
        WdpError::Config(message.into())
    }

    /// True for errors that only invalidate a single dataset in a batch run.
    pub fn is_dataset_scoped(&self) -> bool {
        matches!(self, WdpError::Parse { .. } | WdpError::Io(_))
    }
}

/// Result type alias for solver operations
pub type Result<T> = std::result::Result<T, WdpError>;
