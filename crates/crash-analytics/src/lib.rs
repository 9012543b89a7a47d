//! # Crash Analytics
//!
//! OLAP engine behind the crash records dashboard.
//! Uses DuckDB for columnar storage and fast analytical queries.
//!
//! ## Features
//!
//! - Gap-filled yearly incident counts with a linear trend
//! - Seasonal distribution
//! - Top-N rankings per category with view-relative shares
//! - Fatality totals per category and per cause and season
//! - JSON and Markdown reports

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod queries;
pub mod reports;

pub use engine::{AnalyticsEngine, resample_yearly, share_pct};
pub use error::{AnalyticsError, Result};
pub use queries::fit_trend;
pub use reports::{AnalyticsReport, TOP_CAUSES, TOP_RANKING, render_markdown};
