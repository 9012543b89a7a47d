//! Analytics error types.

use thiserror::Error;

/// Analytics errors.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// DuckDB error
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Data conversion error
    #[error("Data conversion error: {0}")]
    Conversion(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Domain invariant violated by query output
    #[error("Domain error: {0}")]
    Domain(#[from] crash_domain::DomainError),
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
