//! # Crash Records Dashboard CLI
//!
//! Binary entry point: normalize, fit, forecast, report, diagnostics.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crash_dashboard::{Config, CrashDashboard, DashboardError, LogFormat};
use crash_forecast::{DEFAULT_MAX_LAG, ForecastModel};

#[derive(Parser, Debug)]
#[command(name = "crash-dash", version)]
#[command(about = "Historical crash records: normalize, aggregate, forecast")]
struct Cli {
    /// Directory holding the data artifacts
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log output format (json or pretty)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize the raw table into the processed table
    Normalize,

    /// Fit the forecast model on the yearly series and persist it
    Fit,

    /// Forecast yearly crash counts from the persisted model
    Forecast {
        /// Number of years to forecast
        #[arg(long)]
        horizon: Option<usize>,

        /// Refit the model before forecasting
        #[arg(long)]
        refit: bool,

        /// Confidence level of the forecast interval
        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Print every dashboard view
    Report {
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },

    /// Print ACF and PACF of the differenced yearly series
    Diagnostics {
        /// Number of lags
        #[arg(long, default_value_t = DEFAULT_MAX_LAG)]
        lags: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReportFormat {
    Json,
    Markdown,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{json}");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Normalize => {
            let summary =
                crash_ingest::run_normalizer(&config.raw_path(), &config.processed_path())
                    .map_err(DashboardError::from)?;
            print_json(&summary)
        }
        Command::Fit => {
            let dashboard = CrashDashboard::load(config)?;
            let model = dashboard.fit_model()?;
            print_json(model.metadata())
        }
        Command::Forecast {
            horizon,
            refit,
            confidence,
        } => {
            let mut config = config.clone();
            if let Some(confidence) = confidence {
                config.confidence = confidence;
            }
            let dashboard = CrashDashboard::load(&config)?;
            let response = dashboard
                .forecast_response(horizon.unwrap_or(config.forecast_horizon), refit)?;
            print_json(&response)
        }
        Command::Report { format } => {
            let dashboard = CrashDashboard::load(config)?;
            match format {
                ReportFormat::Json => println!("{}", dashboard.report_json()?),
                ReportFormat::Markdown => print!("{}", dashboard.report_markdown()?),
            }
            Ok(())
        }
        Command::Diagnostics { lags } => {
            let dashboard = CrashDashboard::load(config)?;
            print_json(&dashboard.diagnostics(lags)?)
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(log_format) = cli.log_format {
        config.log_format = log_format;
    }

    init_tracing(&config);

    info!(
        version = crash_dashboard::VERSION,
        data_dir = %config.data_dir.display(),
        command = ?cli.command,
        "Starting crash-dash"
    );

    run(cli.command, &config).inspect_err(|err| {
        if let Some(err) = err.downcast_ref::<DashboardError>() {
            error!(stage = err.stage(), error = %err, "Command failed");
        }
    })
}
