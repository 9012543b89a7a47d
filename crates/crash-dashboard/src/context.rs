//! # Dashboard Context
//!
//! The presentation boundary: the normalized table is loaded once, and every
//! view, report and forecast is answered from it as plain data.

use std::path::{Path, PathBuf};

use crash_analytics::{AnalyticsEngine, AnalyticsReport};
use crash_domain::{
    CasualtyTotal, Category, CategoryCount, ForecastPoint, NormalizedRecord, YearlyCount,
    YearlySeries,
};
use crash_forecast::{
    ArimaModel, Diagnostics, ForecastDistribution, ForecastModel, ModelMetadata, diagnose,
    forecast_points, load_model, save_model,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;

/// Forecast answer handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub model: ModelMetadata,
    pub points: Vec<ForecastPoint>,
    pub distribution: ForecastDistribution,
}

/// Read-only facade over the normalized table and the persisted model.
pub struct CrashDashboard {
    engine: AnalyticsEngine,
    rows: usize,
    model_path: PathBuf,
    confidence: f64,
}

impl CrashDashboard {
    /// Load the processed table named by `config`.
    pub fn load(config: &Config) -> Result<Self> {
        let records = crash_ingest::load_normalized(&config.processed_path())?;
        Self::from_records(&records, config.model_path(), config.confidence)
    }

    /// Build a dashboard over records already in memory.
    pub fn from_records(
        records: &[NormalizedRecord],
        model_path: impl Into<PathBuf>,
        confidence: f64,
    ) -> Result<Self> {
        let engine = AnalyticsEngine::from_records(records)?;
        let misaligned = records.iter().filter(|r| !r.season_consistent()).count();
        if misaligned > 0 {
            warn!(rows = misaligned, "Stored season disagrees with date; using stored value");
        }
        Ok(Self {
            engine,
            rows: records.len(),
            model_path: model_path.into(),
            confidence,
        })
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn yearly_counts(&self) -> Result<Vec<YearlyCount>> {
        Ok(self.engine.yearly_counts()?)
    }

    pub fn seasonal_distribution(&self) -> Result<Vec<CategoryCount>> {
        Ok(self.engine.seasonal_distribution()?)
    }

    pub fn category_top_n(&self, category: Category, n: usize) -> Result<Vec<CategoryCount>> {
        Ok(self.engine.category_top_n(category, n)?)
    }

    pub fn casualties_by_category(&self, category: Category) -> Result<Vec<CasualtyTotal>> {
        Ok(self.engine.casualties_by_category(category)?)
    }

    pub fn report(&self) -> Result<AnalyticsReport> {
        Ok(self.engine.generate_report()?)
    }

    pub fn report_json(&self) -> Result<String> {
        Ok(self.engine.generate_report_json()?)
    }

    pub fn report_markdown(&self) -> Result<String> {
        Ok(self.engine.generate_report_markdown()?)
    }

    fn yearly_series(&self) -> Result<YearlySeries> {
        Ok(self.engine.yearly_series()?)
    }

    /// Differenced yearly series with its ACF and PACF.
    pub fn diagnostics(&self, max_lag: usize) -> Result<Diagnostics> {
        Ok(diagnose(&self.yearly_series()?.values(), max_lag))
    }

    /// Fit a fresh model on the yearly series and persist it.
    ///
    /// A failed fit leaves any previously persisted model untouched.
    pub fn fit_model(&self) -> Result<ArimaModel> {
        let series = self.yearly_series()?;
        info!(
            years = series.len(),
            first_year = ?series.first_year(),
            last_year = ?series.last_year(),
            "Fitting forecast model"
        );
        let model = ArimaModel::fit(&series)?;
        save_model(&self.model_path, &model)?;
        Ok(model)
    }

    fn model(&self, refit: bool) -> Result<Box<dyn ForecastModel>> {
        if refit {
            Ok(Box::new(self.fit_model()?))
        } else {
            Ok(load_model(&self.model_path)?)
        }
    }

    /// Point forecasts with display error for the next `horizon` years,
    /// from the persisted model.
    pub fn forecast(&self, horizon: usize) -> Result<Vec<ForecastPoint>> {
        let model = self.model(false)?;
        Ok(forecast_points(model.as_ref(), horizon)?)
    }

    /// Full forecast answer, optionally refitting the model first.
    pub fn forecast_response(&self, horizon: usize, refit: bool) -> Result<ForecastResponse> {
        let model = self.model(refit)?;
        let points = forecast_points(model.as_ref(), horizon)?;
        let distribution = model.get_forecast(horizon, self.confidence)?;
        Ok(ForecastResponse {
            model: model.metadata().clone(),
            points,
            distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crash_domain::Season;
    use crash_forecast::ForecastError;
    use crate::error::DashboardError;
    use tempfile::TempDir;

    fn records_over(years: i32) -> Vec<NormalizedRecord> {
        let mut records = Vec::new();
        for t in 0..years {
            let per_year = 3 + (t * 5) % 7;
            for i in 0..per_year {
                let month = u32::try_from(1 + (i % 12)).unwrap();
                let date = chrono::NaiveDate::from_ymd_opt(1960 + t, month, 15).unwrap();
                records.push(NormalizedRecord {
                    date: Some(date),
                    season: Some(Season::from_date(date)),
                    country: Some(if i % 2 == 0 { "Russia" } else { "USA" }.to_string()),
                    crash_cause: Some("Human factor".to_string()),
                    total_fatalities: Some(i64::from(i)),
                    ..Default::default()
                });
            }
        }
        records
    }

    #[test]
    fn test_views_through_facade() {
        let dir = TempDir::new().unwrap();
        let records = records_over(10);
        let dashboard =
            CrashDashboard::from_records(&records, dir.path().join("model.json"), 0.95).unwrap();

        let yearly = dashboard.yearly_counts().unwrap();
        assert_eq!(yearly.len(), 10);
        let total: i64 = yearly.iter().map(|p| p.count).sum();
        assert_eq!(total, i64::try_from(dashboard.rows()).unwrap());

        let top = dashboard.category_top_n(Category::Country, 10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(dashboard.seasonal_distribution().unwrap().len(), 4);
        assert_eq!(dashboard.casualties_by_category(Category::Cause).unwrap().len(), 1);
    }

    #[test]
    fn test_forecast_requires_persisted_model() {
        let dir = TempDir::new().unwrap();
        let dashboard =
            CrashDashboard::from_records(&records_over(30), dir.path().join("model.json"), 0.95)
                .unwrap();

        let err = dashboard.forecast(10).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Forecast(ForecastError::ModelMissing { .. })
        ));
        assert_eq!(err.stage(), "load-model");
    }

    #[test]
    fn test_fit_then_forecast() {
        let dir = TempDir::new().unwrap();
        let dashboard =
            CrashDashboard::from_records(&records_over(30), dir.path().join("model.json"), 0.95)
                .unwrap();

        let model = dashboard.fit_model().unwrap();
        assert!(dashboard.model_path().exists());
        assert_eq!(model.metadata().last_year, 1989);

        let first = dashboard.forecast(10).unwrap();
        let second = dashboard.forecast(10).unwrap();
        assert_eq!(first, second);
        let years: Vec<i32> = first.iter().map(|p| p.year).collect();
        assert_eq!(years, (1990..2000).collect::<Vec<_>>());

        let response = dashboard.forecast_response(10, false).unwrap();
        assert_eq!(response.model.model_id, model.metadata().model_id);
        assert_eq!(response.distribution.len(), 10);
    }

    #[test]
    fn test_failed_refit_keeps_previous_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let good = CrashDashboard::from_records(&records_over(30), &path, 0.95).unwrap();
        let model = good.fit_model().unwrap();

        let short = CrashDashboard::from_records(&records_over(3), &path, 0.95).unwrap();
        let err = short.forecast_response(10, true).unwrap_err();
        assert_eq!(err.stage(), "fit");

        let response = short.forecast_response(10, false).unwrap();
        assert_eq!(response.model.model_id, model.metadata().model_id);
    }

    #[test]
    fn test_diagnostics() {
        let dir = TempDir::new().unwrap();
        let dashboard =
            CrashDashboard::from_records(&records_over(30), dir.path().join("model.json"), 0.95)
                .unwrap();
        let diagnostics = dashboard.diagnostics(20).unwrap();
        assert_eq!(diagnostics.differenced.len(), 29);
        assert_eq!(diagnostics.acf.len(), 21);
    }
}
