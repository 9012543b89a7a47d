//! # Dashboard Configuration
//!
//! Environment-based configuration for the pipeline and the CLI.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding every artifact
    pub data_dir: PathBuf,

    /// Raw source table, relative to `data_dir`
    pub raw_file: String,

    /// Normalized table, relative to `data_dir`
    pub processed_file: String,

    /// Persisted model, relative to `data_dir`
    pub model_file: String,

    /// Default number of years to forecast
    pub forecast_horizon: usize,

    /// Confidence level of forecast intervals
    pub confidence: f64,

    /// Logging level
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup; unset or unparseable keys
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup("CRASH_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),

            raw_file: lookup("CRASH_RAW_FILE").unwrap_or(defaults.raw_file),

            processed_file: lookup("CRASH_PROCESSED_FILE").unwrap_or(defaults.processed_file),

            model_file: lookup("CRASH_MODEL_FILE").unwrap_or(defaults.model_file),

            forecast_horizon: lookup("CRASH_FORECAST_HORIZON")
                .and_then(|v| v.parse().ok())
                .filter(|h: &usize| *h > 0)
                .unwrap_or(defaults.forecast_horizon),

            confidence: lookup("CRASH_CONFIDENCE")
                .and_then(|v| v.parse().ok())
                .filter(|c: &f64| *c > 0.0 && *c < 1.0)
                .unwrap_or(defaults.confidence),

            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),

            log_format: lookup("LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_format),
        }
    }

    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join(&self.raw_file)
    }

    pub fn processed_path(&self) -> PathBuf {
        self.data_dir.join(&self.processed_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(&self.model_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            raw_file: "crashes-raw.csv".to_string(),
            processed_file: "crashes-processed.csv".to_string(),
            model_file: "crashes_predictor_model.json".to_string(),
            forecast_horizon: 10,
            confidence: crash_forecast::DEFAULT_CONFIDENCE,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
