//! Ingestion error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing tabular artifacts.
///
/// Row-level problems never show up here; they are normalized to missing
/// values instead.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Source artifact absent or unreadable
    #[error("Input artifact missing or unreadable: {}: {source}", .path.display())]
    InputMissing {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Source artifact lacks required columns
    #[error("Input artifact {} is missing columns: {}", .path.display(), .missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    /// CSV framing error
    #[error("CSV error in {} during {stage}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        stage: &'static str,
        source: csv::Error,
    },

    /// Write failure for an output artifact
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
