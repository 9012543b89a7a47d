//! # Dashboard Error Types
//!
//! Unified error handling over the pipeline crates.

use thiserror::Error;

/// Dashboard-level errors
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Ingest(#[from] crash_ingest::IngestError),

    #[error(transparent)]
    Analytics(#[from] crash_analytics::AnalyticsError),

    #[error(transparent)]
    Forecast(#[from] crash_forecast::ForecastError),
}

impl DashboardError {
    /// Pipeline stage that failed
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Ingest(_) => "load",
            Self::Analytics(_) => "aggregate",
            Self::Forecast(
                crash_forecast::ForecastError::ModelMissing { .. }
                | crash_forecast::ForecastError::InvalidModel { .. },
            ) => "load-model",
            Self::Forecast(crash_forecast::ForecastError::ModelFit(_)) => "fit",
            Self::Forecast(
                crash_forecast::ForecastError::Io { .. }
                | crash_forecast::ForecastError::Serialization { .. },
            ) => "persist",
            Self::Forecast(_) => "forecast",
        }
    }
}

/// Result type for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;
