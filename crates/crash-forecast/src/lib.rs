//! # Crash Forecast
//!
//! Yearly crash-count forecaster.
//!
//! Fits an ARIMA(1,1,1) model by conditional sum of squares, persists it as
//! a versioned JSON artifact, and serves point forecasts with a display
//! error band or full forecast distributions. Identification diagnostics
//! (differencing, ACF, PACF) live apart from the model.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod arima;
pub mod diagnostics;
pub mod error;
pub mod optimizer;
pub mod store;

pub use arima::{
    ArimaModel, DEFAULT_CONFIDENCE, ERROR_BAND_RATIO, ForecastDistribution, ForecastModel,
    MAX_HORIZON, MIN_OBSERVATIONS, ModelMetadata, display_error, forecast_points,
    forecast_years,
};
pub use diagnostics::{DEFAULT_MAX_LAG, Diagnostics, acf, diagnose, difference, pacf};
pub use error::{ForecastError, Result};
pub use store::{FORMAT_VERSION, load_arima, load_model, save_model};
