//! # Crash Records Dashboard
//!
//! Facade and CLI over the crash records pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │   Raw CSV        │───▶│  crash-ingest    │───▶│  Processed CSV   │
//! └──────────────────┘    └──────────────────┘    └──────────────────┘
//!                                                          │
//!                              ┌───────────────────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CrashDashboard                           │
//! │        (views, report, forecast, diagnostics)               │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │   crash-analytics       │   │      crash-forecast          │
//! │   (DuckDB views)        │   │   (ARIMA model artifact)     │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;

pub use config::{Config, LogFormat};
pub use context::{CrashDashboard, ForecastResponse};
pub use error::{DashboardError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
